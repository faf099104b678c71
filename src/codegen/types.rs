//! Static type propagation for the compiled backend.
//!
//! The emitter is monomorphic: every expression must resolve to exactly one
//! concrete type before any IR is written. Literal types flow forward through
//! assignments, call sites pin parameter types (first concrete use wins), and
//! the first typed `return` fixes a function's return type. Whatever cannot
//! be pinned down this way is a `CompileError` — the compiled subset of the
//! language is deliberately smaller than the interpreted one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;

use crate::error::{Error, Position, Result};
use crate::parser::ast::{BinaryOp, Block, Expression, Program, Statement, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    Int,
    Float,
    Bool,
    Str,
    Array(Box<IrType>),
    Void,
}

impl IrType {
    pub fn llvm(&self) -> &'static str {
        match self {
            IrType::Int => "i64",
            IrType::Float => "double",
            IrType::Bool => "i1",
            IrType::Str => "i8*",
            IrType::Array(_) => "%array*",
            IrType::Void => "void",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, IrType::Int | IrType::Float)
    }

    pub fn element(&self) -> Option<&IrType> {
        match self {
            IrType::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrType::Int => f.write_str("integer"),
            IrType::Float => f.write_str("float"),
            IrType::Bool => f.write_str("boolean"),
            IrType::Str => f.write_str("string"),
            IrType::Array(element) => write!(f, "array of {element}"),
            IrType::Void => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub params: Vec<IrType>,
    pub ret: IrType,
}

/// The result of the propagation pass: one signature per user function, and
/// the full name→type table of every scope ("main" plus one per function).
#[derive(Debug, Default)]
pub struct ProgramTypes {
    pub functions: HashMap<String, FnSig>,
    pub locals: HashMap<String, BTreeMap<String, IrType>>,
}

pub fn check(program: &Program) -> Result<ProgramTypes> {
    Resolver::default().run(program)
}

#[derive(Clone, Copy)]
struct FnDef<'a> {
    params: &'a [String],
    body: &'a Block,
    position: Position,
}

/// Return-type slot for the function currently being inferred.
struct RetSlot {
    name: String,
    ty: Option<IrType>,
}

#[derive(Default)]
struct Resolver<'a> {
    defs: HashMap<&'a str, FnDef<'a>>,
    signatures: HashMap<String, FnSig>,
    pending_params: HashMap<String, Vec<IrType>>,
    pending_ret: HashMap<String, IrType>,
    in_progress: HashSet<String>,
    locals: HashMap<String, BTreeMap<String, IrType>>,
}

impl<'a> Resolver<'a> {
    fn run(mut self, program: &'a Program) -> Result<ProgramTypes> {
        for statement in &program.statements {
            if let Statement::FunctionDef {
                name,
                params,
                body,
                position,
            } = statement
            {
                let def = FnDef {
                    params,
                    body,
                    position: *position,
                };
                if self.defs.insert(name.as_str(), def).is_some() {
                    return Err(Error::compile(
                        *position,
                        format!("duplicate definition of function '{name}'"),
                    ));
                }
            }
        }

        let mut vars = BTreeMap::new();
        for statement in &program.statements {
            if matches!(statement, Statement::FunctionDef { .. }) {
                continue;
            }
            self.infer_stmt(&mut vars, statement, None)?;
        }
        self.locals.insert("main".to_owned(), vars);

        // functions no call site reached get the all-integers default
        let unresolved: Vec<String> = self
            .defs
            .keys()
            .filter(|name| !self.signatures.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        for name in unresolved {
            let def = self.defs[name.as_str()];
            self.resolve_function(&name, vec![IrType::Int; def.params.len()], def.position)?;
        }

        Ok(ProgramTypes {
            functions: self.signatures,
            locals: self.locals,
        })
    }

    fn resolve_function(
        &mut self,
        name: &str,
        args: Vec<IrType>,
        position: Position,
    ) -> Result<IrType> {
        if let Some(sig) = self.signatures.get(name) {
            if sig.params != args {
                return Err(Error::compile(
                    position,
                    format!("conflicting argument types for '{name}'"),
                ));
            }
            return Ok(sig.ret.clone());
        }

        if self.in_progress.contains(name) {
            // recursive call: parameters are pinned already, and the return
            // type is whatever the returns seen so far established
            if self.pending_params.get(name) != Some(&args) {
                return Err(Error::compile(
                    position,
                    format!("conflicting argument types for recursive call to '{name}'"),
                ));
            }
            return Ok(self
                .pending_ret
                .get(name)
                .cloned()
                .unwrap_or(IrType::Int));
        }

        let Some(def) = self.defs.get(name).copied() else {
            return Err(Error::compile(
                position,
                format!("call to unknown function '{name}'"),
            ));
        };

        if def.params.len() != args.len() {
            return Err(Error::compile(
                position,
                format!(
                    "{name}() expects {} arguments, got {}",
                    def.params.len(),
                    args.len()
                ),
            ));
        }
        if args.contains(&IrType::Void) {
            return Err(Error::compile(
                position,
                format!("cannot pass a none value to '{name}'"),
            ));
        }

        self.in_progress.insert(name.to_owned());
        self.pending_params.insert(name.to_owned(), args.clone());

        let mut vars: BTreeMap<String, IrType> = def
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        let mut slot = RetSlot {
            name: name.to_owned(),
            ty: None,
        };

        for statement in def.body {
            self.infer_stmt(&mut vars, statement, Some(&mut slot))?;
        }

        self.in_progress.remove(name);
        self.pending_params.remove(name);
        self.pending_ret.remove(name);

        let ret = slot.ty.unwrap_or(IrType::Void);
        self.signatures.insert(
            name.to_owned(),
            FnSig {
                params: args,
                ret: ret.clone(),
            },
        );
        self.locals.insert(name.to_owned(), vars);

        Ok(ret)
    }

    fn infer_stmt(
        &mut self,
        vars: &mut BTreeMap<String, IrType>,
        statement: &'a Statement,
        mut ret: Option<&mut RetSlot>,
    ) -> Result<()> {
        match statement {
            Statement::Expression { expr, .. } => {
                self.infer_expr(vars, expr)?;
                Ok(())
            }
            Statement::Assignment {
                target,
                value,
                position,
            } => self.infer_assignment(vars, target, value, *position),
            Statement::If {
                branches,
                else_body,
                ..
            } => {
                for branch in branches {
                    self.check_condition(vars, &branch.condition)?;
                    for statement in &branch.body {
                        self.infer_stmt(vars, statement, ret.as_deref_mut())?;
                    }
                }
                if let Some(body) = else_body {
                    for statement in body {
                        self.infer_stmt(vars, statement, ret.as_deref_mut())?;
                    }
                }
                Ok(())
            }
            Statement::While {
                condition, body, ..
            } => {
                self.check_condition(vars, condition)?;
                for statement in body {
                    self.infer_stmt(vars, statement, ret.as_deref_mut())?;
                }
                Ok(())
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                self.infer_stmt(vars, init, ret.as_deref_mut())?;
                self.check_condition(vars, condition)?;
                for statement in body {
                    self.infer_stmt(vars, statement, ret.as_deref_mut())?;
                }
                self.infer_stmt(vars, step, ret)?;
                Ok(())
            }
            Statement::FunctionDef { position, .. } => Err(Error::compile(
                *position,
                "nested function definitions are not supported in compiled code",
            )),
            Statement::Return { value, position } => {
                let Some(slot) = ret else {
                    return Err(Error::compile(*position, "'return' outside of a function"));
                };

                let ty = match value {
                    Some(expr) => self.infer_expr(vars, expr)?,
                    None => IrType::Void,
                };

                match &slot.ty {
                    None => {
                        self.pending_ret.insert(slot.name.clone(), ty.clone());
                        slot.ty = Some(ty);
                        Ok(())
                    }
                    Some(existing) if *existing == ty => Ok(()),
                    Some(existing) => Err(Error::compile(
                        *position,
                        format!(
                            "function '{}' returns both {existing} and {ty}",
                            slot.name
                        ),
                    )),
                }
            }
        }
    }

    fn infer_assignment(
        &mut self,
        vars: &mut BTreeMap<String, IrType>,
        target: &'a Expression,
        value: &'a Expression,
        position: Position,
    ) -> Result<()> {
        let ty = self.infer_expr(vars, value)?;

        match target {
            Expression::Identifier { name, .. } => {
                if ty == IrType::Void {
                    return Err(Error::compile(
                        position,
                        format!("cannot assign a none value to '{name}'"),
                    ));
                }
                match vars.get(name) {
                    None => {
                        vars.insert(name.clone(), ty);
                        Ok(())
                    }
                    Some(existing) if *existing == ty => Ok(()),
                    Some(existing) => Err(Error::compile(
                        position,
                        format!("'{name}' is {existing} but is reassigned as {ty}"),
                    )),
                }
            }
            Expression::Grouping { expr, .. } => {
                self.infer_assignment(vars, expr, value, position)
            }
            Expression::Index { object, index, .. } => {
                let object = self.infer_expr(vars, object)?;
                let index_ty = self.infer_expr(vars, index)?;
                if index_ty != IrType::Int {
                    return Err(Error::compile(
                        position,
                        format!("array indices must be integers, not {index_ty}"),
                    ));
                }
                let Some(element) = object.element() else {
                    return Err(Error::compile(
                        position,
                        format!("{object} does not support index assignment in compiled code"),
                    ));
                };
                if *element != ty {
                    return Err(Error::compile(
                        position,
                        format!("cannot store {ty} into an array of {element}"),
                    ));
                }
                Ok(())
            }
            other => Err(Error::compile(other.position(), "invalid assignment target")),
        }
    }

    fn check_condition(
        &mut self,
        vars: &mut BTreeMap<String, IrType>,
        condition: &'a Expression,
    ) -> Result<()> {
        let ty = self.infer_expr(vars, condition)?;
        if matches!(ty, IrType::Int | IrType::Float | IrType::Bool) {
            return Ok(());
        }
        Err(Error::compile(
            condition.position(),
            format!("{ty} cannot be used as a condition in compiled code"),
        ))
    }

    fn infer_expr(
        &mut self,
        vars: &mut BTreeMap<String, IrType>,
        expr: &'a Expression,
    ) -> Result<IrType> {
        match expr {
            Expression::Integer { .. } => Ok(IrType::Int),
            Expression::Float { .. } => Ok(IrType::Float),
            Expression::Str { .. } => Ok(IrType::Str),
            Expression::Boolean { .. } => Ok(IrType::Bool),
            Expression::Identifier { name, position } => {
                vars.get(name).cloned().ok_or_else(|| {
                    Error::compile(*position, format!("cannot determine the type of '{name}'"))
                })
            }
            Expression::Grouping { expr, .. } => self.infer_expr(vars, expr),
            Expression::Unary {
                op,
                operand,
                position,
            } => {
                let operand = self.infer_expr(vars, operand)?;
                match op {
                    UnaryOp::Neg if operand.is_numeric() => Ok(operand),
                    UnaryOp::Neg => Err(Error::compile(
                        *position,
                        format!("bad operand type for unary '-': {operand}"),
                    )),
                    UnaryOp::Not if operand == IrType::Bool => Ok(IrType::Bool),
                    UnaryOp::Not => Err(Error::compile(
                        *position,
                        format!("'not' requires a boolean in compiled code, got {operand}"),
                    )),
                }
            }
            Expression::Binary {
                op,
                lhs,
                rhs,
                position,
            } => {
                let lhs = self.infer_expr(vars, lhs)?;
                let rhs = self.infer_expr(vars, rhs)?;
                binary_result(*op, &lhs, &rhs, *position)
            }
            Expression::Array { elements, position } => {
                let Some(first) = elements.first() else {
                    return Err(Error::compile(
                        *position,
                        "cannot infer the element type of an empty array literal",
                    ));
                };
                let element = self.infer_expr(vars, first)?;
                if !matches!(
                    element,
                    IrType::Int | IrType::Float | IrType::Bool | IrType::Str
                ) {
                    return Err(Error::compile(
                        *position,
                        format!("arrays of {element} are not supported in compiled code"),
                    ));
                }
                for other in &elements[1..] {
                    let ty = self.infer_expr(vars, other)?;
                    if ty != element {
                        return Err(Error::compile(
                            other.position(),
                            format!("array literal mixes {element} and {ty}"),
                        ));
                    }
                }
                Ok(IrType::Array(Box::new(element)))
            }
            Expression::Index {
                object,
                index,
                position,
            } => {
                let object = self.infer_expr(vars, object)?;
                let index_ty = self.infer_expr(vars, index)?;
                if index_ty != IrType::Int {
                    return Err(Error::compile(
                        *position,
                        format!("array indices must be integers, not {index_ty}"),
                    ));
                }
                object.element().cloned().ok_or_else(|| {
                    Error::compile(
                        *position,
                        format!("{object} is not indexable in compiled code"),
                    )
                })
            }
            Expression::Call {
                callee,
                args,
                position,
            } => self.infer_call(vars, callee, args, *position),
            Expression::Map { position, .. }
            | Expression::Set { position, .. }
            | Expression::Tuple { position, .. } => Err(Error::compile(
                *position,
                "maps, sets, and tuples are not supported in compiled code",
            )),
            Expression::Dot { name, position, .. } => Err(Error::compile(
                *position,
                format!("method references are not values; call '{name}' directly"),
            )),
        }
    }

    fn infer_call(
        &mut self,
        vars: &mut BTreeMap<String, IrType>,
        callee: &'a Expression,
        args: &'a [Expression],
        position: Position,
    ) -> Result<IrType> {
        if let Expression::Dot { object, name, .. } = callee {
            let receiver = self.infer_expr(vars, object)?;
            let arg_types = args
                .iter()
                .map(|arg| self.infer_expr(vars, arg))
                .collect::<Result<Vec<_>>>()?;
            return method_result(&receiver, name, &arg_types, position);
        }

        let Expression::Identifier { name, .. } = callee else {
            return Err(Error::compile(
                position,
                "only named functions are callable in compiled code",
            ));
        };

        let arg_types = args
            .iter()
            .map(|arg| self.infer_expr(vars, arg))
            .collect::<Result<Vec<_>>>()?;

        // user definitions shadow the built-ins
        if self.defs.contains_key(name.as_str()) {
            return self.resolve_function(name, arg_types, position);
        }

        builtin_result(name, &arg_types, position)
    }
}

/// The static result type of a binary operator, or the reason it is not
/// compilable.
fn binary_result(
    op: BinaryOp,
    lhs: &IrType,
    rhs: &IrType,
    position: Position,
) -> Result<IrType> {
    use IrType::{Bool, Float, Int, Str};

    let mismatch = || {
        Error::compile(
            position,
            format!("unsupported operand types for '{op}': {lhs} and {rhs}"),
        )
    };

    match op {
        BinaryOp::And | BinaryOp::Or => {
            if *lhs == Bool && *rhs == Bool {
                Ok(Bool)
            } else {
                Err(Error::compile(
                    position,
                    format!("'{op}' requires boolean operands in compiled code"),
                ))
            }
        }
        BinaryOp::Add if *lhs == Str && *rhs == Str => Ok(Str),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            if !lhs.is_numeric() || !rhs.is_numeric() {
                return Err(mismatch());
            }
            if *lhs == Float || *rhs == Float {
                Ok(Float)
            } else {
                Ok(Int)
            }
        }
        BinaryOp::Div => {
            if lhs.is_numeric() && rhs.is_numeric() {
                Ok(Float)
            } else {
                Err(mismatch())
            }
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            if (lhs.is_numeric() && rhs.is_numeric()) || (*lhs == Bool && *rhs == Bool) {
                Ok(Bool)
            } else {
                Err(mismatch())
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if lhs.is_numeric() && rhs.is_numeric() {
                Ok(Bool)
            } else {
                Err(mismatch())
            }
        }
    }
}

/// Method typing for the compiled path: arrays and strings only, backed by
/// direct runtime calls.
fn method_result(
    receiver: &IrType,
    name: &str,
    args: &[IrType],
    position: Position,
) -> Result<IrType> {
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(Error::compile(
                position,
                format!("{name}() expects {n} argument(s), got {}", args.len()),
            ))
        }
    };

    match (receiver, name) {
        (IrType::Array(element), "push") => {
            arity(1)?;
            if args[0] != **element {
                return Err(Error::compile(
                    position,
                    format!("cannot push {} onto an array of {element}", args[0]),
                ));
            }
            Ok(IrType::Void)
        }
        (IrType::Array(element), "pop") => {
            arity(0)?;
            Ok((**element).clone())
        }
        (IrType::Array(element), "sort") => {
            arity(0)?;
            if !matches!(**element, IrType::Int | IrType::Float | IrType::Str) {
                return Err(Error::compile(
                    position,
                    format!("cannot sort an array of {element}"),
                ));
            }
            Ok(IrType::Void)
        }
        (IrType::Str, "split") => {
            arity(1)?;
            if args[0] != IrType::Str {
                return Err(Error::compile(
                    position,
                    format!("split() delimiter must be a string, not {}", args[0]),
                ));
            }
            Ok(IrType::Array(Box::new(IrType::Str)))
        }
        _ => Err(Error::compile(
            position,
            format!("{receiver} has no method '{name}' in compiled code"),
        )),
    }
}

/// Built-in typing for the compiled path. Only built-ins the runtime ABI can
/// express are available.
fn builtin_result(name: &str, args: &[IrType], position: Position) -> Result<IrType> {
    let one = || -> Result<&IrType> {
        if args.len() == 1 {
            Ok(&args[0])
        } else {
            Err(Error::compile(
                position,
                format!("{name}() expects 1 argument, got {}", args.len()),
            ))
        }
    };

    match name {
        "print" => {
            for arg in args {
                if !matches!(
                    arg,
                    IrType::Int | IrType::Float | IrType::Bool | IrType::Str
                ) {
                    return Err(Error::compile(
                        position,
                        format!("cannot print {arg} in compiled code"),
                    ));
                }
            }
            Ok(IrType::Void)
        }
        "len" => match one()? {
            IrType::Str | IrType::Array(_) => Ok(IrType::Int),
            other => Err(Error::compile(
                position,
                format!("len() is not supported for {other} in compiled code"),
            )),
        },
        "chr" => match one()? {
            IrType::Int => Ok(IrType::Str),
            other => Err(Error::compile(
                position,
                format!("chr() expects an integer, not {other}"),
            )),
        },
        "ord" => match one()? {
            IrType::Str => Ok(IrType::Int),
            other => Err(Error::compile(
                position,
                format!("ord() expects a string, not {other}"),
            )),
        },
        "int" => match one()? {
            IrType::Int | IrType::Float => Ok(IrType::Int),
            other => Err(Error::compile(
                position,
                format!("int() cannot convert {other} in compiled code"),
            )),
        },
        "float" => match one()? {
            IrType::Int | IrType::Float => Ok(IrType::Float),
            other => Err(Error::compile(
                position,
                format!("float() cannot convert {other} in compiled code"),
            )),
        },
        "str" => match one()? {
            IrType::Int | IrType::Float | IrType::Bool | IrType::Str => Ok(IrType::Str),
            other => Err(Error::compile(
                position,
                format!("str() cannot convert {other} in compiled code"),
            )),
        },
        "abs" => match one()? {
            ty if ty.is_numeric() => Ok(ty.clone()),
            other => Err(Error::compile(
                position,
                format!("abs() expects a number, not {other}"),
            )),
        },
        "input" => match args {
            [] | [IrType::Str] => Ok(IrType::Str),
            _ => Err(Error::compile(
                position,
                "input() expects an optional string prompt",
            )),
        },
        "read_file" | "read_lines" | "Map" | "Set" => Err(Error::compile(
            position,
            format!("{name}() is not supported in compiled code"),
        )),
        _ => Err(Error::compile(
            position,
            format!("call to unknown function '{name}'"),
        )),
    }
}
