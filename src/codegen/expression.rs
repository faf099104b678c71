//! Expression lowering. Every helper returns an [`Operand`]: the textual IR
//! value (register, literal, or inline constant expression) together with its
//! resolved static type.

use crate::error::{Error, Position, Result};
use crate::parser::ast::{BinaryOp, Expression, UnaryOp};

use super::types::IrType;
use super::Emitter;

#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub repr: String,
    pub ty: IrType,
}

impl Operand {
    fn new(repr: impl Into<String>, ty: IrType) -> Self {
        Self {
            repr: repr.into(),
            ty,
        }
    }
}

fn float_constant(value: f64) -> String {
    format!("0x{:016X}", value.to_bits())
}

impl Emitter {
    pub(crate) fn emit_expr(&mut self, expr: &Expression) -> Result<Operand> {
        match expr {
            Expression::Integer { value, .. } => {
                Ok(Operand::new(value.to_string(), IrType::Int))
            }
            Expression::Float { value, .. } => {
                Ok(Operand::new(float_constant(*value), IrType::Float))
            }
            Expression::Boolean { value, .. } => {
                Ok(Operand::new(value.to_string(), IrType::Bool))
            }
            Expression::Str { value, .. } => {
                let pointer = self.string_constant(value);
                Ok(Operand::new(pointer, IrType::Str))
            }
            Expression::Identifier { name, .. } => Ok(self.load_var(name)),
            Expression::Grouping { expr, .. } => self.emit_expr(expr),
            Expression::Unary { op, operand, .. } => self.emit_unary(*op, operand),
            Expression::Binary {
                op,
                lhs,
                rhs,
                position,
            } => self.emit_binary(*op, lhs, rhs, *position),
            Expression::Array { elements, .. } => self.emit_array(elements),
            Expression::Index { object, index, .. } => self.emit_index(object, index),
            Expression::Call {
                callee,
                args,
                position,
            } => self.emit_call(callee, args, *position),
            Expression::Map { position, .. }
            | Expression::Set { position, .. }
            | Expression::Tuple { position, .. }
            | Expression::Dot { position, .. } => Err(Error::compile(
                *position,
                "expression is not supported in compiled code",
            )),
        }
    }

    fn load_var(&mut self, name: &str) -> Operand {
        let ty = self.var_type(name);

        if ty == IrType::Bool {
            let raw = self.fresh();
            self.line(&format!("{raw} = load i8, i8* %{name}.addr"));
            let narrowed = self.fresh();
            self.line(&format!("{narrowed} = trunc i8 {raw} to i1"));
            return Operand::new(narrowed, IrType::Bool);
        }

        let ll = ty.llvm();
        let value = self.fresh();
        self.line(&format!("{value} = load {ll}, {ll}* %{name}.addr"));
        Operand::new(value, ty)
    }

    fn emit_unary(&mut self, op: UnaryOp, operand: &Expression) -> Result<Operand> {
        let operand = self.emit_expr(operand)?;
        let result = self.fresh();

        match op {
            UnaryOp::Not => {
                self.line(&format!("{result} = xor i1 {}, true", operand.repr));
                Ok(Operand::new(result, IrType::Bool))
            }
            UnaryOp::Neg if operand.ty == IrType::Float => {
                self.line(&format!("{result} = fneg double {}", operand.repr));
                Ok(Operand::new(result, IrType::Float))
            }
            UnaryOp::Neg => {
                self.line(&format!("{result} = sub i64 0, {}", operand.repr));
                Ok(Operand::new(result, IrType::Int))
            }
        }
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        position: Position,
    ) -> Result<Operand> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return self.emit_short_circuit(op, lhs, rhs);
        }

        let lhs = self.emit_expr(lhs)?;
        let rhs = self.emit_expr(rhs)?;

        if op.is_comparison() {
            return self.emit_comparison(op, lhs, rhs);
        }

        // string concatenation rides on '+'
        if op == BinaryOp::Add && lhs.ty == IrType::Str {
            let result = self.fresh();
            self.line(&format!(
                "{result} = call i8* @culebra_str_concat(i8* {}, i8* {})",
                lhs.repr, rhs.repr
            ));
            return Ok(Operand::new(result, IrType::Str));
        }

        let as_float =
            op == BinaryOp::Div || lhs.ty == IrType::Float || rhs.ty == IrType::Float;

        if as_float {
            let lhs = self.promote(lhs);
            let rhs = self.promote(rhs);
            let instr = match op {
                BinaryOp::Add => "fadd",
                BinaryOp::Sub => "fsub",
                BinaryOp::Mul => "fmul",
                BinaryOp::Div => "fdiv",
                _ => unreachable!("arithmetic operator"),
            };
            let result = self.fresh();
            self.line(&format!(
                "{result} = {instr} double {}, {}",
                lhs.repr, rhs.repr
            ));
            return Ok(Operand::new(result, IrType::Float));
        }

        let instr = match op {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            _ => {
                return Err(Error::compile(
                    position,
                    format!("operator '{op}' is not supported here in compiled code"),
                ));
            }
        };
        let result = self.fresh();
        self.line(&format!("{result} = {instr} i64 {}, {}", lhs.repr, rhs.repr));
        Ok(Operand::new(result, IrType::Int))
    }

    /// `a and b` / `a or b` as a branch diamond feeding an `i1` phi.
    fn emit_short_circuit(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Operand> {
        let n = self.next_label();
        let (name, short_value) = if op == BinaryOp::And {
            ("and", "false")
        } else {
            ("or", "true")
        };
        let rhs_label = format!("{name}.rhs.{n}");
        let end_label = format!("{name}.end.{n}");

        let lhs = self.emit_expr(lhs)?;
        let lhs_block = self.current_block.clone();

        if op == BinaryOp::And {
            self.line(&format!(
                "br i1 {}, label %{rhs_label}, label %{end_label}",
                lhs.repr
            ));
        } else {
            self.line(&format!(
                "br i1 {}, label %{end_label}, label %{rhs_label}",
                lhs.repr
            ));
        }
        self.terminated = true;

        self.start_block(&rhs_label);
        let rhs = self.emit_expr(rhs)?;
        let rhs_block = self.current_block.clone();
        self.branch_to(&end_label);

        self.start_block(&end_label);
        let result = self.fresh();
        self.line(&format!(
            "{result} = phi i1 [ {short_value}, %{lhs_block} ], [ {}, %{rhs_block} ]",
            rhs.repr
        ));

        Ok(Operand::new(result, IrType::Bool))
    }

    fn emit_comparison(&mut self, op: BinaryOp, lhs: Operand, rhs: Operand) -> Result<Operand> {
        let result = self.fresh();

        if lhs.ty == IrType::Bool {
            let cond = if op == BinaryOp::Eq { "eq" } else { "ne" };
            self.line(&format!(
                "{result} = icmp {cond} i1 {}, {}",
                lhs.repr, rhs.repr
            ));
            return Ok(Operand::new(result, IrType::Bool));
        }

        if lhs.ty == IrType::Float || rhs.ty == IrType::Float {
            let lhs = self.promote(lhs);
            let rhs = self.promote(rhs);
            let cond = match op {
                BinaryOp::Eq => "oeq",
                BinaryOp::Ne => "one",
                BinaryOp::Lt => "olt",
                BinaryOp::Le => "ole",
                BinaryOp::Gt => "ogt",
                BinaryOp::Ge => "oge",
                _ => unreachable!("comparison operator"),
            };
            self.line(&format!(
                "{result} = fcmp {cond} double {}, {}",
                lhs.repr, rhs.repr
            ));
            return Ok(Operand::new(result, IrType::Bool));
        }

        let cond = match op {
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "slt",
            BinaryOp::Le => "sle",
            BinaryOp::Gt => "sgt",
            BinaryOp::Ge => "sge",
            _ => unreachable!("comparison operator"),
        };
        self.line(&format!(
            "{result} = icmp {cond} i64 {}, {}",
            lhs.repr, rhs.repr
        ));
        Ok(Operand::new(result, IrType::Bool))
    }

    /// Truthiness of a condition operand as an `i1`.
    pub(crate) fn emit_condition(&mut self, expr: &Expression) -> Result<String> {
        let operand = self.emit_expr(expr)?;

        match operand.ty {
            IrType::Bool => Ok(operand.repr),
            IrType::Int => {
                let result = self.fresh();
                self.line(&format!("{result} = icmp ne i64 {}, 0", operand.repr));
                Ok(result)
            }
            IrType::Float => {
                let result = self.fresh();
                self.line(&format!(
                    "{result} = fcmp one double {}, {}",
                    operand.repr,
                    float_constant(0.0)
                ));
                Ok(result)
            }
            other => Err(Error::compile(
                expr.position(),
                format!("{other} cannot be used as a condition in compiled code"),
            )),
        }
    }

    fn promote(&mut self, operand: Operand) -> Operand {
        if operand.ty == IrType::Float {
            return operand;
        }
        let widened = self.fresh();
        self.line(&format!("{widened} = sitofp i64 {} to double", operand.repr));
        Operand::new(widened, IrType::Float)
    }

    /// Coerce a value into the 8-byte cell an array element occupies.
    pub(crate) fn to_cell(&mut self, operand: Operand) -> String {
        match operand.ty {
            IrType::Int => operand.repr,
            IrType::Float => {
                let cell = self.fresh();
                self.line(&format!("{cell} = bitcast double {} to i64", operand.repr));
                cell
            }
            IrType::Bool => {
                let cell = self.fresh();
                self.line(&format!("{cell} = zext i1 {} to i64", operand.repr));
                cell
            }
            _ => {
                let cell = self.fresh();
                self.line(&format!("{cell} = ptrtoint i8* {} to i64", operand.repr));
                cell
            }
        }
    }

    /// The inverse of [`to_cell`].
    fn from_cell(&mut self, cell: String, element: &IrType) -> Operand {
        match element {
            IrType::Int => Operand::new(cell, IrType::Int),
            IrType::Float => {
                let value = self.fresh();
                self.line(&format!("{value} = bitcast i64 {cell} to double"));
                Operand::new(value, IrType::Float)
            }
            IrType::Bool => {
                let value = self.fresh();
                self.line(&format!("{value} = trunc i64 {cell} to i1"));
                Operand::new(value, IrType::Bool)
            }
            _ => {
                let value = self.fresh();
                self.line(&format!("{value} = inttoptr i64 {cell} to i8*"));
                Operand::new(value, IrType::Str)
            }
        }
    }

    fn emit_array(&mut self, elements: &[Expression]) -> Result<Operand> {
        let mut operands = Vec::with_capacity(elements.len());
        for element in elements {
            operands.push(self.emit_expr(element)?);
        }
        let element_ty = operands
            .first()
            .map(|operand| operand.ty.clone())
            .unwrap_or(IrType::Int);

        let array = self.fresh();
        self.line(&format!(
            "{array} = call %array* @culebra_create_array(i64 {}, i64 8)",
            operands.len()
        ));

        for (i, operand) in operands.into_iter().enumerate() {
            let cell = self.to_cell(operand);
            self.line(&format!(
                "call void @culebra_array_set(%array* {array}, i64 {i}, i64 {cell})"
            ));
        }

        Ok(Operand::new(array, IrType::Array(Box::new(element_ty))))
    }

    fn emit_index(&mut self, object: &Expression, index: &Expression) -> Result<Operand> {
        let array = self.emit_expr(object)?;
        let index = self.emit_expr(index)?;

        let element = array
            .ty
            .element()
            .cloned()
            .ok_or_else(|| {
                Error::compile(
                    object.position(),
                    format!("{} is not indexable in compiled code", array.ty),
                )
            })?;

        let pointer = self.fresh();
        self.line(&format!(
            "{pointer} = call i8* @culebra_array_get(%array* {}, i64 {})",
            array.repr, index.repr
        ));
        let typed = self.fresh();
        self.line(&format!("{typed} = bitcast i8* {pointer} to i64*"));
        let cell = self.fresh();
        self.line(&format!("{cell} = load i64, i64* {typed}"));

        Ok(self.from_cell(cell, &element))
    }

    // ------------------------------------------------------------------
    // calls
    // ------------------------------------------------------------------

    fn emit_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        position: Position,
    ) -> Result<Operand> {
        if let Expression::Dot { object, name, .. } = callee {
            return self.emit_method(object, name, args, position);
        }

        let Expression::Identifier { name, .. } = callee else {
            return Err(Error::compile(
                position,
                "only named functions are callable in compiled code",
            ));
        };

        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            operands.push(self.emit_expr(arg)?);
        }

        if let Some(sig) = self.signature(name) {
            let (params, ret) = (sig.params.clone(), sig.ret.clone());
            let args = operands
                .iter()
                .zip(&params)
                .map(|(operand, ty)| format!("{} {}", ty.llvm(), operand.repr))
                .collect::<Vec<_>>()
                .join(", ");

            if ret == IrType::Void {
                self.line(&format!("call void @{name}({args})"));
                return Ok(Operand::new("undef", IrType::Void));
            }
            let result = self.fresh();
            self.line(&format!("{result} = call {} @{name}({args})", ret.llvm()));
            return Ok(Operand::new(result, ret));
        }

        self.emit_builtin(name, operands, position)
    }

    fn emit_builtin(
        &mut self,
        name: &str,
        args: Vec<Operand>,
        position: Position,
    ) -> Result<Operand> {
        match name {
            "print" => self.emit_print(args),
            "input" => {
                let prompt = match args.into_iter().next() {
                    Some(operand) => operand.repr,
                    None => self.string_constant(""),
                };
                let result = self.fresh();
                self.line(&format!(
                    "{result} = call i8* @culebra_input(i8* {prompt})"
                ));
                Ok(Operand::new(result, IrType::Str))
            }
            "len" => {
                let arg = args.into_iter().next().expect("typed arity");
                let result = self.fresh();
                if arg.ty == IrType::Str {
                    self.line(&format!("{result} = call i64 @culebra_len(i8* {})", arg.repr));
                } else {
                    self.line(&format!(
                        "{result} = call i64 @culebra_len_array(%array* {})",
                        arg.repr
                    ));
                }
                Ok(Operand::new(result, IrType::Int))
            }
            "chr" => {
                let arg = args.into_iter().next().expect("typed arity");
                let result = self.fresh();
                self.line(&format!("{result} = call i8* @culebra_chr(i64 {})", arg.repr));
                Ok(Operand::new(result, IrType::Str))
            }
            "ord" => {
                let arg = args.into_iter().next().expect("typed arity");
                let result = self.fresh();
                self.line(&format!("{result} = call i64 @culebra_ord(i8* {})", arg.repr));
                Ok(Operand::new(result, IrType::Int))
            }
            "int" => {
                let arg = args.into_iter().next().expect("typed arity");
                if arg.ty == IrType::Int {
                    return Ok(arg);
                }
                let result = self.fresh();
                self.line(&format!(
                    "{result} = fptosi double {} to i64",
                    arg.repr
                ));
                Ok(Operand::new(result, IrType::Int))
            }
            "float" => {
                let arg = args.into_iter().next().expect("typed arity");
                Ok(self.promote(arg))
            }
            "str" => {
                let arg = args.into_iter().next().expect("typed arity");
                self.stringify(arg)
            }
            "abs" => {
                let arg = args.into_iter().next().expect("typed arity");
                self.emit_abs(arg)
            }
            _ => Err(Error::compile(
                position,
                format!("call to unknown function '{name}'"),
            )),
        }
    }

    /// `print` overloads on the static type of a single argument; multiple
    /// arguments are stringified and handed to the variadic runtime call.
    fn emit_print(&mut self, args: Vec<Operand>) -> Result<Operand> {
        if let [arg] = args.as_slice() {
            let call = match arg.ty {
                IrType::Int => format!("call void @culebra_print_int(i64 {})", arg.repr),
                IrType::Float => {
                    format!("call void @culebra_print_float(double {})", arg.repr)
                }
                IrType::Bool => format!("call void @culebra_print_bool(i1 {})", arg.repr),
                _ => format!("call void @culebra_print_string(i8* {})", arg.repr),
            };
            self.line(&call);
            return Ok(Operand::new("undef", IrType::Void));
        }

        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.stringify(arg)?);
        }
        let list = parts
            .iter()
            .map(|operand| format!("i8* {}", operand.repr))
            .collect::<Vec<_>>()
            .join(", ");

        if list.is_empty() {
            self.line("call void (i32, ...) @culebra_print_multi(i32 0)");
        } else {
            self.line(&format!(
                "call void (i32, ...) @culebra_print_multi(i32 {}, {list})",
                parts.len()
            ));
        }

        Ok(Operand::new("undef", IrType::Void))
    }

    fn stringify(&mut self, operand: Operand) -> Result<Operand> {
        let call = match operand.ty {
            IrType::Str => return Ok(operand),
            IrType::Int => format!("call i8* @culebra_int_to_str(i64 {})", operand.repr),
            IrType::Float => {
                format!("call i8* @culebra_float_to_str(double {})", operand.repr)
            }
            IrType::Bool => format!("call i8* @culebra_bool_to_str(i1 {})", operand.repr),
            other => {
                return Err(Error::compile(
                    Position::default(),
                    format!("cannot convert {other} to a string in compiled code"),
                ));
            }
        };

        let result = self.fresh();
        self.line(&format!("{result} = {call}"));
        Ok(Operand::new(result, IrType::Str))
    }

    fn emit_abs(&mut self, operand: Operand) -> Result<Operand> {
        if operand.ty == IrType::Float {
            let negated = self.fresh();
            self.line(&format!("{negated} = fneg double {}", operand.repr));
            let is_negative = self.fresh();
            self.line(&format!(
                "{is_negative} = fcmp olt double {}, {}",
                operand.repr,
                float_constant(0.0)
            ));
            let result = self.fresh();
            self.line(&format!(
                "{result} = select i1 {is_negative}, double {negated}, double {}",
                operand.repr
            ));
            return Ok(Operand::new(result, IrType::Float));
        }

        let negated = self.fresh();
        self.line(&format!("{negated} = sub i64 0, {}", operand.repr));
        let is_negative = self.fresh();
        self.line(&format!("{is_negative} = icmp slt i64 {}, 0", operand.repr));
        let result = self.fresh();
        self.line(&format!(
            "{result} = select i1 {is_negative}, i64 {negated}, i64 {}",
            operand.repr
        ));
        Ok(Operand::new(result, IrType::Int))
    }

    /// Array and string methods lower to direct runtime calls; the type pass
    /// already limited receivers to those two kinds.
    fn emit_method(
        &mut self,
        object: &Expression,
        name: &str,
        args: &[Expression],
        position: Position,
    ) -> Result<Operand> {
        let receiver = self.emit_expr(object)?;

        match (&receiver.ty, name) {
            (IrType::Array(_), "push") => {
                let arg = self.emit_expr(&args[0])?;
                let cell = self.to_cell(arg);
                self.line(&format!(
                    "call void @culebra_array_push(%array* {}, i64 {cell})",
                    receiver.repr
                ));
                Ok(Operand::new("undef", IrType::Void))
            }
            (IrType::Array(element), "pop") => {
                let element = element.as_ref().clone();
                let cell = self.fresh();
                self.line(&format!(
                    "{cell} = call i64 @culebra_array_pop(%array* {})",
                    receiver.repr
                ));
                Ok(self.from_cell(cell, &element))
            }
            (IrType::Array(element), "sort") => {
                let symbol = match element.as_ref() {
                    IrType::Float => "culebra_array_sort_float",
                    IrType::Str => "culebra_array_sort_str",
                    _ => "culebra_array_sort_int",
                };
                self.line(&format!(
                    "call void @{symbol}(%array* {})",
                    receiver.repr
                ));
                Ok(Operand::new("undef", IrType::Void))
            }
            (IrType::Str, "split") => {
                let delimiter = self.emit_expr(&args[0])?;
                let result = self.fresh();
                self.line(&format!(
                    "{result} = call %array* @culebra_str_split(i8* {}, i8* {})",
                    receiver.repr, delimiter.repr
                ));
                Ok(Operand::new(
                    result,
                    IrType::Array(Box::new(IrType::Str)),
                ))
            }
            (ty, _) => Err(Error::compile(
                position,
                format!("{ty} has no method '{name}' in compiled code"),
            )),
        }
    }
}
