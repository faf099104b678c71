//! Tree-walking evaluation of Culebra programs.
//!
//! `evaluate` runs the top-level statements in order against a global
//! environment seeded with the built-ins. Program output goes through the
//! interpreter's writer so embedders and tests can capture it.

mod builtins;
mod environment;
mod methods;
mod value;

pub use environment::Environment;
pub use value::{Builtin, Function, Key, Value};

use std::io::{self, Write};
use std::rc::Rc;

use log::debug;

use crate::error::{Error, Position, Result};
use crate::parser::ast::{BinaryOp, Block, Expression, Program, Statement, UnaryOp};

/// How a statement finished: fell through, or hit `return`. Only a function
/// call frame absorbs the `Return` variant.
enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter<W> {
    globals: Environment,
    output: W,
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            globals: Environment::global(),
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn evaluate(&mut self, program: &Program) -> Result<()> {
        debug!("interpreting {} top-level statements", program.statements.len());

        let globals = self.globals.clone();
        for statement in &program.statements {
            if let Flow::Return(_) = self.exec_stmt(statement, &globals)? {
                return Err(Error::syntax(
                    statement.position(),
                    "'return' outside of a function",
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn write_output(&mut self, text: &str, position: Position) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush())
            .map_err(|e| Error::value(position, format!("I/O error: {e}")))
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn exec_stmt(&mut self, statement: &Statement, env: &Environment) -> Result<Flow> {
        match statement {
            Statement::Expression { expr, .. } => {
                self.eval_expr(expr, env)?;
                Ok(Flow::Normal)
            }
            Statement::Assignment { target, value, .. } => {
                let value = self.eval_expr(value, env)?;
                self.assign_target(target, value, env)?;
                Ok(Flow::Normal)
            }
            Statement::If {
                branches,
                else_body,
                ..
            } => {
                for branch in branches {
                    if self.eval_expr(&branch.condition, env)?.is_truthy() {
                        return self.exec_block(&branch.body, env);
                    }
                }
                if let Some(body) = else_body {
                    return self.exec_block(body, env);
                }
                Ok(Flow::Normal)
            }
            Statement::While {
                condition, body, ..
            } => {
                while self.eval_expr(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                self.exec_stmt(init, env)?;
                while self.eval_expr(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                    self.exec_stmt(step, env)?;
                }
                Ok(Flow::Normal)
            }
            Statement::FunctionDef {
                name, params, body, ..
            } => {
                let function = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    env: env.clone(),
                };
                env.define(name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn exec_block(&mut self, block: &Block, env: &Environment) -> Result<Flow> {
        for statement in block {
            if let Flow::Return(value) = self.exec_stmt(statement, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn assign_target(
        &mut self,
        target: &Expression,
        value: Value,
        env: &Environment,
    ) -> Result<()> {
        match target {
            Expression::Identifier { name, .. } => {
                env.assign(name, value);
                Ok(())
            }
            Expression::Grouping { expr, .. } => self.assign_target(expr, value, env),
            Expression::Index {
                object,
                index,
                position,
            } => {
                let object = self.eval_expr(object, env)?;
                let index = self.eval_expr(index, env)?;
                self.assign_index(object, index, value, *position)
            }
            other => Err(Error::syntax(
                other.position(),
                "invalid assignment target",
            )),
        }
    }

    fn assign_index(
        &mut self,
        object: Value,
        index: Value,
        value: Value,
        position: Position,
    ) -> Result<()> {
        match object {
            Value::Array(elements) => {
                let Value::Integer(i) = index else {
                    return Err(Error::type_error(
                        position,
                        format!("array indices must be integers, not {}", index.type_name()),
                    ));
                };
                let mut elements = elements.borrow_mut();
                if i < 0 || i as usize >= elements.len() {
                    return Err(Error::index(
                        position,
                        format!("array index {i} out of range (length {})", elements.len()),
                    ));
                }
                elements[i as usize] = value;
                Ok(())
            }
            Value::Map(entries) => {
                let key = Key::from_value(&index).ok_or_else(|| {
                    Error::type_error(
                        position,
                        format!("unhashable key type: {}", index.type_name()),
                    )
                })?;
                entries.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(Error::type_error(
                position,
                format!("{} does not support index assignment", other.type_name()),
            )),
        }
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn eval_expr(&mut self, expr: &Expression, env: &Environment) -> Result<Value> {
        match expr {
            Expression::Integer { value, .. } => Ok(Value::Integer(*value)),
            Expression::Float { value, .. } => Ok(Value::Float(*value)),
            Expression::Str { value, .. } => Ok(Value::string(value)),
            Expression::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expression::Identifier { name, position } => env.get(name).ok_or_else(|| {
                Error::name(*position, format!("name '{name}' is not defined"))
            }),
            Expression::Grouping { expr, .. } => self.eval_expr(expr, env),
            Expression::Unary {
                op,
                operand,
                position,
            } => {
                let operand = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy())),
                    UnaryOp::Neg => match operand {
                        Value::Integer(n) => Ok(Value::Integer(n.wrapping_neg())),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(Error::type_error(
                            *position,
                            format!("bad operand type for unary '-': {}", other.type_name()),
                        )),
                    },
                }
            }
            Expression::Binary {
                op,
                lhs,
                rhs,
                position,
            } => self.eval_binary(*op, lhs, rhs, *position, env),
            Expression::Array { elements, .. } => {
                let values = elements
                    .iter()
                    .map(|element| self.eval_expr(element, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(values))
            }
            Expression::Tuple { elements, .. } => {
                let values = elements
                    .iter()
                    .map(|element| self.eval_expr(element, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Tuple(Rc::new(values)))
            }
            Expression::Map { entries, .. } => {
                let mut map = std::collections::HashMap::new();
                for (key_expr, value_expr) in entries {
                    let key = self.eval_expr(key_expr, env)?;
                    let key = Key::from_value(&key).ok_or_else(|| {
                        Error::type_error(
                            key_expr.position(),
                            format!("unhashable key type: {}", key.type_name()),
                        )
                    })?;
                    let value = self.eval_expr(value_expr, env)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(Rc::new(std::cell::RefCell::new(map))))
            }
            Expression::Set { elements, .. } => {
                let mut set = std::collections::HashSet::new();
                for element in elements {
                    let value = self.eval_expr(element, env)?;
                    let key = Key::from_value(&value).ok_or_else(|| {
                        Error::type_error(
                            element.position(),
                            format!("unhashable set element type: {}", value.type_name()),
                        )
                    })?;
                    set.insert(key);
                }
                Ok(Value::Set(Rc::new(std::cell::RefCell::new(set))))
            }
            Expression::Index {
                object,
                index,
                position,
            } => {
                let object = self.eval_expr(object, env)?;
                let index = self.eval_expr(index, env)?;
                self.eval_index(object, index, *position)
            }
            Expression::Dot { name, position, .. } => Err(Error::type_error(
                *position,
                format!("method references are not values; call '{name}' directly"),
            )),
            Expression::Call {
                callee,
                args,
                position,
            } => self.eval_call(callee, args, *position, env),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        position: Position,
        env: &Environment,
    ) -> Result<Value> {
        // `e.m(args…)` dispatches on the receiver's kind instead of going
        // through a callable value
        if let Expression::Dot { object, name, .. } = callee {
            let receiver = self.eval_expr(object, env)?;
            let args = self.eval_args(args, env)?;
            return self.call_method(receiver, name, args, position);
        }

        let callee = self.eval_expr(callee, env)?;
        let args = self.eval_args(args, env)?;

        match callee {
            Value::Function(function) => self.call_function(&function, args, position),
            Value::Builtin(builtin) => self.call_builtin(builtin, args, position),
            other => Err(Error::type_error(
                position,
                format!("{} is not callable", other.type_name()),
            )),
        }
    }

    fn eval_args(&mut self, args: &[Expression], env: &Environment) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval_expr(arg, env)).collect()
    }

    fn call_function(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        position: Position,
    ) -> Result<Value> {
        if args.len() != function.params.len() {
            return Err(Error::type_error(
                position,
                format!(
                    "{}() expects {} arguments, got {}",
                    function.name,
                    function.params.len(),
                    args.len()
                ),
            ));
        }

        let frame = function.env.child();
        for (param, arg) in function.params.iter().zip(args) {
            frame.define(param, arg);
        }

        match self.exec_block(&function.body, &frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        position: Position,
        env: &Environment,
    ) -> Result<Value> {
        // the logical operators short-circuit and yield the deciding value
        match op {
            BinaryOp::And => {
                let lhs = self.eval_expr(lhs, env)?;
                if !lhs.is_truthy() {
                    return Ok(lhs);
                }
                return self.eval_expr(rhs, env);
            }
            BinaryOp::Or => {
                let lhs = self.eval_expr(lhs, env)?;
                if lhs.is_truthy() {
                    return Ok(lhs);
                }
                return self.eval_expr(rhs, env);
            }
            _ => {}
        }

        let lhs = self.eval_expr(lhs, env)?;
        let rhs = self.eval_expr(rhs, env)?;

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.eval_arithmetic(op, lhs, rhs, position)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if !lhs.comparable_with(&rhs) {
                    return Err(Error::type_error(
                        position,
                        format!(
                            "cannot compare {} with {}",
                            lhs.type_name(),
                            rhs.type_name()
                        ),
                    ));
                }
                let equal = lhs.loosely_equals(&rhs);
                Ok(Value::Boolean(if op == BinaryOp::Eq { equal } else { !equal }))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.eval_ordering(op, lhs, rhs, position)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_arithmetic(
        &mut self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        position: Position,
    ) -> Result<Value> {
        use Value::{Float, Integer, Str};

        // string concatenation rides on '+'
        if let (BinaryOp::Add, Str(a), Str(b)) = (op, &lhs, &rhs) {
            return Ok(Value::string(format!("{a}{b}")));
        }

        let result = match (op, &lhs, &rhs) {
            // division always leaves the integers
            (BinaryOp::Div, Integer(a), Integer(b)) => Float(*a as f64 / *b as f64),
            (BinaryOp::Add, Integer(a), Integer(b)) => Integer(a.wrapping_add(*b)),
            (BinaryOp::Sub, Integer(a), Integer(b)) => Integer(a.wrapping_sub(*b)),
            (BinaryOp::Mul, Integer(a), Integer(b)) => Integer(a.wrapping_mul(*b)),
            _ => {
                let (Some(a), Some(b)) = (numeric(&lhs), numeric(&rhs)) else {
                    return Err(Error::type_error(
                        position,
                        format!(
                            "unsupported operand types for '{op}': {} and {}",
                            lhs.type_name(),
                            rhs.type_name()
                        ),
                    ));
                };
                match op {
                    BinaryOp::Add => Float(a + b),
                    BinaryOp::Sub => Float(a - b),
                    BinaryOp::Mul => Float(a * b),
                    BinaryOp::Div => Float(a / b),
                    _ => unreachable!("arithmetic operator"),
                }
            }
        };

        Ok(result)
    }

    fn eval_ordering(
        &mut self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        position: Position,
    ) -> Result<Value> {
        let ordering = match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => match (numeric(&lhs), numeric(&rhs)) {
                (Some(a), Some(b)) => a
                    .partial_cmp(&b)
                    .unwrap_or(std::cmp::Ordering::Equal),
                _ => {
                    return Err(Error::type_error(
                        position,
                        format!(
                            "'{op}' not supported between {} and {}",
                            lhs.type_name(),
                            rhs.type_name()
                        ),
                    ));
                }
            },
        };

        let result = match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::Le => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::Ge => ordering.is_ge(),
            _ => unreachable!("ordering operator"),
        };

        Ok(Value::Boolean(result))
    }

    fn eval_index(&mut self, object: Value, index: Value, position: Position) -> Result<Value> {
        match object {
            Value::Array(elements) => {
                let elements = elements.borrow();
                let i = integer_index(&index, elements.len(), position, "array")?;
                Ok(elements[i].clone())
            }
            Value::Tuple(elements) => {
                let i = integer_index(&index, elements.len(), position, "tuple")?;
                Ok(elements[i].clone())
            }
            Value::Str(s) => {
                let length = s.chars().count();
                let i = integer_index(&index, length, position, "string")?;
                let c = s.chars().nth(i).expect("index was bounds-checked");
                Ok(Value::string(c.to_string()))
            }
            Value::Map(entries) => {
                let key = Key::from_value(&index).ok_or_else(|| {
                    Error::type_error(
                        position,
                        format!("unhashable key type: {}", index.type_name()),
                    )
                })?;
                entries.borrow().get(&key).cloned().ok_or_else(|| {
                    Error::key(position, format!("key not found: {}", index))
                })
            }
            other => Err(Error::type_error(
                position,
                format!("{} is not indexable", other.type_name()),
            )),
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Bounds-checked non-negative index for sequences.
fn integer_index(
    index: &Value,
    length: usize,
    position: Position,
    kind: &str,
) -> Result<usize> {
    let Value::Integer(i) = index else {
        return Err(Error::type_error(
            position,
            format!("{kind} indices must be integers, not {}", index.type_name()),
        ));
    };

    if *i < 0 || *i as usize >= length {
        return Err(Error::index(
            position,
            format!("{kind} index {i} out of range (length {length})"),
        ));
    }

    Ok(*i as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(source: &str) -> String {
        let tokens = Lexer::new(source).lex().expect("lexing should succeed");
        let program = Parser::new(tokens).parse().expect("parsing should succeed");

        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter
            .evaluate(&program)
            .expect("evaluation should succeed");

        String::from_utf8(interpreter.into_output()).expect("output is UTF-8")
    }

    fn run_err(source: &str) -> Error {
        let tokens = Lexer::new(source).lex().expect("lexing should succeed");
        let program = Parser::new(tokens).parse().expect("parsing should succeed");

        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter
            .evaluate(&program)
            .expect_err("evaluation should fail")
    }

    #[test]
    fn test_arithmetic_and_print() {
        assert_eq!(run("print(1 + 2 * 3)\n"), "7\n");
    }

    #[test]
    fn test_division_always_float() {
        assert_eq!(run("print(6 / 3)\n"), "2.0\n");
        assert_eq!(run("print(7 / 2)\n"), "3.5\n");
    }

    #[test]
    fn test_mixed_arithmetic_promotes() {
        assert_eq!(run("print(1 + 2.5)\n"), "3.5\n");
        assert_eq!(run("print(2.5 + 1)\n"), "3.5\n");
        assert_eq!(run("print(2 * 3)\n"), "6\n");
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(run("print(\"foo\" + \"bar\")\n"), "foobar\n");
    }

    #[test]
    fn test_string_plus_integer_fails() {
        let error = run_err("\"a\" + 1\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_recursion() {
        let source = "\
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)
print(fib(10))
";
        assert_eq!(run(source), "55\n");
    }

    #[test]
    fn test_for_loop_array_sum() {
        let source = "\
a = [1, 2, 3, 4, 5]
s = 0
for i = 0; i < len(a); i = i + 1:
    s = s + a[i]
print(s)
";
        assert_eq!(run(source), "15\n");
    }

    #[test]
    fn test_short_circuit_skips_side_effect() {
        let source = "\
def side():
    print(\"x\")
    return true
r = false and side()
print(r)
";
        assert_eq!(run(source), "false\n");
    }

    #[test]
    fn test_logical_operators_return_deciding_value() {
        assert_eq!(run("print(0 or 5)\n"), "5\n");
        assert_eq!(run("print(1 and 2)\n"), "2\n");
        assert_eq!(run("print(0 and 2)\n"), "0\n");
        assert_eq!(run("print(not 0)\n"), "true\n");
    }

    #[test]
    fn test_split_sort_abs() {
        let source = "\
parts = \"3 1 2\".split(\" \")
nums = []
for i = 0; i < len(parts); i = i + 1:
    nums.push(int(parts[i]))
nums.sort()
print(nums[0])
print(abs(0 - nums[2]))
";
        assert_eq!(run(source), "1\n3\n");
    }

    #[test]
    fn test_map_and_set_semantics() {
        let source = "\
m = Map()
m.set(\"a\", 1)
m.set(\"a\", 2)
print(m.get(\"a\"))
s = {1, 2, 2, 3}
print(len(s))
";
        assert_eq!(run(source), "2\n3\n");
    }

    #[test]
    fn test_while_loop() {
        let source = "\
n = 0
while n < 3:
    print(n)
    n = n + 1
";
        assert_eq!(run(source), "0\n1\n2\n");
    }

    #[test]
    fn test_if_elif_else_chain() {
        let source = "\
def grade(n):
    if n > 2:
        return \"big\"
    elif n > 1:
        return \"mid\"
    else:
        return \"small\"
print(grade(3))
print(grade(2))
print(grade(0))
";
        assert_eq!(run(source), "big\nmid\nsmall\n");
    }

    #[test]
    fn test_function_scope_does_not_leak() {
        let source = "\
def f():
    local = 42
    return local
f()
print(local)
";
        let error = run_err(source);
        assert_eq!(error.kind, ErrorKind::Name);
    }

    #[test]
    fn test_assignment_updates_enclosing_scope() {
        let source = "\
total = 0
def bump():
    total = total + 1
bump()
bump()
print(total)
";
        assert_eq!(run(source), "2\n");
    }

    #[test]
    fn test_closure_captures_definition_environment() {
        // lexical scoping: offset resolves `base` in its defining
        // environment, not in its caller's frame
        let source = "\
base = 10
def offset(n):
    return base + n
def caller(base):
    return offset(5)
print(caller(99))
";
        assert_eq!(run(source), "15\n");
    }

    #[test]
    fn test_function_fallthrough_returns_none() {
        let source = "\
def noop():
    x = 1
print(noop())
";
        assert_eq!(run(source), "None\n");
    }

    #[test]
    fn test_return_at_top_level_is_error() {
        let error = run_err("return 1\n");
        assert_eq!(error.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_arity_mismatch() {
        let error = run_err("def f(a, b):\n    return a\nf(1)\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_call_of_non_callable() {
        let error = run_err("x = 1\nx()\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_undefined_name() {
        let error = run_err("print(missing)\n");
        assert_eq!(error.kind, ErrorKind::Name);
    }

    #[test]
    fn test_index_out_of_range() {
        let error = run_err("a = [1]\nprint(a[3])\n");
        assert_eq!(error.kind, ErrorKind::Index);
    }

    #[test]
    fn test_negative_index_rejected() {
        let error = run_err("a = [1, 2]\nprint(a[0 - 1])\n");
        assert_eq!(error.kind, ErrorKind::Index);
    }

    #[test]
    fn test_string_indexing() {
        assert_eq!(run("print(\"abc\"[1])\n"), "b\n");
    }

    #[test]
    fn test_tuple_indexing_and_immutability() {
        assert_eq!(run("t = (1, 2, 3)\nprint(t[2])\n"), "3\n");

        let error = run_err("t = (1, 2)\nt[0] = 5\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_map_missing_key() {
        let error = run_err("m = Map()\nprint(m[\"a\"])\n");
        assert_eq!(error.kind, ErrorKind::Key);
    }

    #[test]
    fn test_map_index_assignment_creates_key() {
        let source = "\
m = Map()
m[\"k\"] = 7
print(m[\"k\"])
";
        assert_eq!(run(source), "7\n");
    }

    #[test]
    fn test_unhashable_key_is_type_error() {
        let error = run_err("m = Map()\nm[[1]] = 2\n");
        assert_eq!(error.kind, ErrorKind::Type);

        let error = run_err("s = {[1], 2}\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_tuple_as_map_key() {
        let source = "\
m = Map()
m[(1, 2)] = \"pair\"
print(m[(1, 2)])
";
        assert_eq!(run(source), "pair\n");
    }

    #[test]
    fn test_cross_type_equality_is_error() {
        let error = run_err("1 == \"a\"\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_cross_type_ordering_is_error() {
        let error = run_err("1 < \"a\"\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_numeric_equality_promotes() {
        assert_eq!(run("print(1 == 1.0)\n"), "true\n");
        assert_eq!(run("print(2 != 2.5)\n"), "true\n");
    }

    #[test]
    fn test_string_ordering() {
        assert_eq!(run("print(\"abc\" < \"abd\")\n"), "true\n");
    }

    #[test]
    fn test_collection_equality() {
        assert_eq!(run("print([1, 2] == [1, 2])\n"), "true\n");
        assert_eq!(run("print((1, 2) == (1, 2))\n"), "true\n");
        assert_eq!(run("print({1, 2} == {2, 1})\n"), "true\n");
        assert_eq!(
            run("print({\"a\": 1, \"b\": 2} == {\"b\": 2, \"a\": 1})\n"),
            "true\n"
        );
    }

    #[test]
    fn test_bare_method_reference_is_error() {
        let error = run_err("a = [1]\nx = a.push\n");
        assert_eq!(error.kind, ErrorKind::Type);
    }

    #[test]
    fn test_builtin_rebinding_at_top_level() {
        // the write rule updates the bottom-frame binding in place
        assert_eq!(run("len = 5\nprint(len)\n"), "5\n");
    }

    #[test]
    fn test_evaluation_order_left_to_right() {
        let source = "\
def trace(n):
    print(n)
    return n
trace(1) + trace(2) * trace(3)
";
        assert_eq!(run(source), "1\n2\n3\n");
    }
}
