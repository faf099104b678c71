//! Dispatch for the native built-in functions. Each handler validates its own
//! arguments; the table of names lives with the environment seeding in
//! `environment.rs`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::error::{Error, Position, Result};

use super::value::{Builtin, Value};
use super::Interpreter;

impl<W: Write> Interpreter<W> {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        position: Position,
    ) -> Result<Value> {
        match builtin {
            Builtin::Print => self.builtin_print(args, position),
            Builtin::Input => self.builtin_input(args, position),
            Builtin::Len => builtin_len(args, position),
            Builtin::Chr => builtin_chr(args, position),
            Builtin::Ord => builtin_ord(args, position),
            Builtin::Int => builtin_int(args, position),
            Builtin::Float => builtin_float(args, position),
            Builtin::Str => {
                let [value] = unpack(args, "str", position)?;
                Ok(Value::string(value.to_string()))
            }
            Builtin::Abs => builtin_abs(args, position),
            Builtin::ReadFile => {
                let [value] = unpack(args, "read_file", position)?;
                Ok(Value::string(read_file(&value, position)?))
            }
            Builtin::ReadLines => {
                let [value] = unpack(args, "read_lines", position)?;
                let lines = read_file(&value, position)?
                    .lines()
                    .map(Value::string)
                    .collect();
                Ok(Value::array(lines))
            }
            Builtin::MapNew => {
                expect_no_args(&args, "Map", position)?;
                Ok(Value::Map(Rc::new(RefCell::new(HashMap::new()))))
            }
            Builtin::SetNew => {
                expect_no_args(&args, "Set", position)?;
                Ok(Value::Set(Rc::new(RefCell::new(HashSet::new()))))
            }
        }
    }

    /// Arguments separated by single spaces, then a newline. `print()` with
    /// no arguments emits the bare newline.
    fn builtin_print(&mut self, args: Vec<Value>, position: Position) -> Result<Value> {
        let line = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        self.write_output(&line, position)?;
        self.write_output("\n", position)?;

        Ok(Value::None)
    }

    fn builtin_input(&mut self, args: Vec<Value>, position: Position) -> Result<Value> {
        match args.as_slice() {
            [] => {}
            [Value::Str(prompt)] => {
                let prompt = prompt.to_string();
                self.write_output(&prompt, position)?;
            }
            [other] => {
                return Err(Error::type_error(
                    position,
                    format!("input() prompt must be a string, not {}", other.type_name()),
                ));
            }
            _ => {
                return Err(Error::type_error(
                    position,
                    format!("input() expects at most 1 argument, got {}", args.len()),
                ));
            }
        }

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::value(position, format!("I/O error: {e}")))?;

        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }

        Ok(Value::string(line))
    }
}

fn unpack<const N: usize>(
    args: Vec<Value>,
    name: &str,
    position: Position,
) -> Result<[Value; N]> {
    let count = args.len();
    args.try_into().map_err(|_| {
        Error::type_error(
            position,
            format!("{name}() expects {N} argument(s), got {count}"),
        )
    })
}

fn expect_no_args(args: &[Value], name: &str, position: Position) -> Result<()> {
    if !args.is_empty() {
        return Err(Error::type_error(
            position,
            format!("{name}() expects no arguments, got {}", args.len()),
        ));
    }
    Ok(())
}

fn builtin_len(args: Vec<Value>, position: Position) -> Result<Value> {
    let [value] = unpack(args, "len", position)?;

    let length = match &value {
        Value::Str(s) => s.chars().count(),
        Value::Array(elements) => elements.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        Value::Set(elements) => elements.borrow().len(),
        Value::Tuple(elements) => elements.len(),
        other => {
            return Err(Error::type_error(
                position,
                format!("{} has no length", other.type_name()),
            ));
        }
    };

    Ok(Value::Integer(length as i64))
}

fn builtin_chr(args: Vec<Value>, position: Position) -> Result<Value> {
    let [value] = unpack(args, "chr", position)?;

    let Value::Integer(code) = value else {
        return Err(Error::type_error(
            position,
            format!("chr() expects an integer, not {}", value.type_name()),
        ));
    };

    let c = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| Error::value(position, format!("chr() argument {code} is not a valid code point")))?;

    Ok(Value::string(c.to_string()))
}

fn builtin_ord(args: Vec<Value>, position: Position) -> Result<Value> {
    let [value] = unpack(args, "ord", position)?;

    let Value::Str(s) = &value else {
        return Err(Error::type_error(
            position,
            format!("ord() expects a string, not {}", value.type_name()),
        ));
    };

    let c = s
        .chars()
        .next()
        .ok_or_else(|| Error::value(position, "ord() expects a non-empty string"))?;

    Ok(Value::Integer(c as i64))
}

fn builtin_int(args: Vec<Value>, position: Position) -> Result<Value> {
    let [value] = unpack(args, "int", position)?;

    match value {
        Value::Integer(n) => Ok(Value::Integer(n)),
        Value::Float(f) => Ok(Value::Integer(f.trunc() as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| Error::value(position, format!("invalid integer literal: '{s}'"))),
        other => Err(Error::type_error(
            position,
            format!("int() cannot convert {}", other.type_name()),
        )),
    }
}

fn builtin_float(args: Vec<Value>, position: Position) -> Result<Value> {
    let [value] = unpack(args, "float", position)?;

    match value {
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Integer(n) => Ok(Value::Float(n as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::value(position, format!("invalid float literal: '{s}'"))),
        other => Err(Error::type_error(
            position,
            format!("float() cannot convert {}", other.type_name()),
        )),
    }
}

fn builtin_abs(args: Vec<Value>, position: Position) -> Result<Value> {
    let [value] = unpack(args, "abs", position)?;

    match value {
        Value::Integer(n) => Ok(Value::Integer(n.wrapping_abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(Error::type_error(
            position,
            format!("abs() expects a number, not {}", other.type_name()),
        )),
    }
}

fn read_file(value: &Value, position: Position) -> Result<String> {
    let Value::Str(path) = value else {
        return Err(Error::type_error(
            position,
            format!("expected a path string, not {}", value.type_name()),
        ));
    };

    fs::read_to_string(path.as_ref()).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::file_not_found(position, format!("no such file: '{path}'"))
        }
        _ => Error::value(position, format!("cannot read '{path}': {e}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value> {
        Interpreter::with_output(Vec::new()).call_builtin(builtin, args, Position::default())
    }

    #[test]
    fn test_len() {
        assert_eq!(
            call(Builtin::Len, vec![Value::string("abc")]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            call(Builtin::Len, vec![Value::array(vec![Value::Integer(1)])]).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            call(Builtin::Len, vec![Value::Integer(1)]).unwrap_err().kind,
            ErrorKind::Type
        );
    }

    #[test]
    fn test_chr_ord_roundtrip() {
        assert_eq!(
            call(Builtin::Chr, vec![Value::Integer(65)]).unwrap(),
            Value::string("A")
        );
        assert_eq!(
            call(Builtin::Ord, vec![Value::string("A")]).unwrap(),
            Value::Integer(65)
        );
        assert_eq!(
            call(Builtin::Chr, vec![Value::Integer(-1)]).unwrap_err().kind,
            ErrorKind::Value
        );
        assert_eq!(
            call(Builtin::Ord, vec![Value::string("")]).unwrap_err().kind,
            ErrorKind::Value
        );
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(
            call(Builtin::Int, vec![Value::string("42")]).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            call(Builtin::Int, vec![Value::Float(3.9)]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            call(Builtin::Int, vec![Value::string("nope")])
                .unwrap_err()
                .kind,
            ErrorKind::Value
        );
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(
            call(Builtin::Float, vec![Value::Integer(2)]).unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            call(Builtin::Float, vec![Value::string("2.5")]).unwrap(),
            Value::Float(2.5)
        );
    }

    #[test]
    fn test_str_of_values() {
        assert_eq!(
            call(Builtin::Str, vec![Value::Float(1.0)]).unwrap(),
            Value::string("1.0")
        );
        assert_eq!(
            call(Builtin::Str, vec![Value::Boolean(true)]).unwrap(),
            Value::string("true")
        );
    }

    #[test]
    fn test_abs() {
        assert_eq!(
            call(Builtin::Abs, vec![Value::Integer(-3)]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            call(Builtin::Abs, vec![Value::Float(-2.5)]).unwrap(),
            Value::Float(2.5)
        );
    }

    #[test]
    fn test_read_file_missing() {
        let error = call(
            Builtin::ReadFile,
            vec![Value::string("/no/such/file/anywhere")],
        )
        .unwrap_err();

        assert_eq!(error.kind, ErrorKind::FileNotFound);
    }

    #[test]
    fn test_print_writes_spaced_line() {
        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter
            .call_builtin(
                Builtin::Print,
                vec![Value::Integer(1), Value::string("a")],
                Position::default(),
            )
            .unwrap();
        interpreter
            .call_builtin(Builtin::Print, vec![], Position::default())
            .unwrap();

        let output = String::from_utf8(interpreter.into_output()).unwrap();
        assert_eq!(output, "1 a\n\n");
    }
}
