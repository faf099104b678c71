//! Method dispatch on receiver kind. Each value kind owns a closed method
//! table; `e.m(args…)` lands here with `e` already evaluated.

use std::cmp::Ordering;
use std::io::Write;

use crate::error::{Error, Position, Result};

use super::value::{Key, Value};
use super::Interpreter;

impl<W: Write> Interpreter<W> {
    pub(crate) fn call_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        position: Position,
    ) -> Result<Value> {
        match &receiver {
            Value::Array(_) => array_method(&receiver, name, args, position),
            Value::Map(_) => map_method(&receiver, name, args, position),
            Value::Set(_) => set_method(&receiver, name, args, position),
            Value::Str(_) => string_method(&receiver, name, args, position),
            other => Err(Error::attribute(
                position,
                format!("{} has no method '{name}'", other.type_name()),
            )),
        }
    }
}

fn expect_arity(args: &[Value], n: usize, name: &str, position: Position) -> Result<()> {
    if args.len() != n {
        return Err(Error::type_error(
            position,
            format!("{name}() expects {n} argument(s), got {}", args.len()),
        ));
    }
    Ok(())
}

fn unknown_method(kind: &str, name: &str, position: Position) -> Error {
    Error::attribute(position, format!("{kind} has no method '{name}'"))
}

fn as_key(value: &Value, position: Position) -> Result<Key> {
    Key::from_value(value).ok_or_else(|| {
        Error::type_error(
            position,
            format!("unhashable type: {}", value.type_name()),
        )
    })
}

fn array_method(
    receiver: &Value,
    name: &str,
    mut args: Vec<Value>,
    position: Position,
) -> Result<Value> {
    let Value::Array(elements) = receiver else {
        unreachable!("dispatched on array");
    };

    match name {
        "push" => {
            expect_arity(&args, 1, "push", position)?;
            elements.borrow_mut().push(args.remove(0));
            Ok(Value::None)
        }
        "pop" => {
            expect_arity(&args, 0, "pop", position)?;
            elements
                .borrow_mut()
                .pop()
                .ok_or_else(|| Error::index(position, "pop from empty array"))
        }
        "sort" => {
            expect_arity(&args, 0, "sort", position)?;
            sort_in_place(&mut elements.borrow_mut(), position)?;
            Ok(Value::None)
        }
        _ => Err(unknown_method("array", name, position)),
    }
}

/// Ascending in-place sort. All elements must be numeric, or all strings.
fn sort_in_place(elements: &mut [Value], position: Position) -> Result<()> {
    let all_numeric = elements.iter().all(Value::is_numeric);
    let all_strings = elements.iter().all(|v| matches!(v, Value::Str(_)));

    if all_numeric {
        elements.sort_by(|a, b| {
            let a = numeric(a);
            let b = numeric(b);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
        return Ok(());
    }

    if all_strings {
        elements.sort_by(|a, b| match (a, b) {
            (Value::Str(a), Value::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => Ordering::Equal,
        });
        return Ok(());
    }

    Err(Error::type_error(
        position,
        "sort() requires all elements to be numbers, or all strings",
    ))
}

fn numeric(value: &Value) -> f64 {
    match value {
        Value::Integer(n) => *n as f64,
        Value::Float(f) => *f,
        _ => 0.0,
    }
}

fn map_method(
    receiver: &Value,
    name: &str,
    mut args: Vec<Value>,
    position: Position,
) -> Result<Value> {
    let Value::Map(entries) = receiver else {
        unreachable!("dispatched on map");
    };

    match name {
        "get" => {
            expect_arity(&args, 1, "get", position)?;
            let key = as_key(&args[0], position)?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::key(position, format!("key not found: {}", args[0])))
        }
        "set" => {
            expect_arity(&args, 2, "set", position)?;
            let value = args.remove(1);
            let key = as_key(&args[0], position)?;
            entries.borrow_mut().insert(key, value);
            Ok(Value::None)
        }
        "has" => {
            expect_arity(&args, 1, "has", position)?;
            let key = as_key(&args[0], position)?;
            Ok(Value::Boolean(entries.borrow().contains_key(&key)))
        }
        "remove" => {
            expect_arity(&args, 1, "remove", position)?;
            let key = as_key(&args[0], position)?;
            entries
                .borrow_mut()
                .remove(&key)
                .ok_or_else(|| Error::key(position, format!("key not found: {}", args[0])))?;
            Ok(Value::None)
        }
        _ => Err(unknown_method("map", name, position)),
    }
}

fn set_method(
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
    position: Position,
) -> Result<Value> {
    let Value::Set(elements) = receiver else {
        unreachable!("dispatched on set");
    };

    match name {
        "add" => {
            expect_arity(&args, 1, "add", position)?;
            let key = as_key(&args[0], position)?;
            elements.borrow_mut().insert(key);
            Ok(Value::None)
        }
        "remove" => {
            expect_arity(&args, 1, "remove", position)?;
            let key = as_key(&args[0], position)?;
            if !elements.borrow_mut().remove(&key) {
                return Err(Error::key(
                    position,
                    format!("element not found: {}", args[0]),
                ));
            }
            Ok(Value::None)
        }
        "has" => {
            expect_arity(&args, 1, "has", position)?;
            let key = as_key(&args[0], position)?;
            Ok(Value::Boolean(elements.borrow().contains(&key)))
        }
        _ => Err(unknown_method("set", name, position)),
    }
}

fn string_method(
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
    position: Position,
) -> Result<Value> {
    let Value::Str(s) = receiver else {
        unreachable!("dispatched on string");
    };

    match name {
        "split" => {
            expect_arity(&args, 1, "split", position)?;
            let Value::Str(delimiter) = &args[0] else {
                return Err(Error::type_error(
                    position,
                    format!(
                        "split() delimiter must be a string, not {}",
                        args[0].type_name()
                    ),
                ));
            };
            if delimiter.is_empty() {
                return Err(Error::value(position, "split() delimiter must not be empty"));
            }

            let parts = s
                .split(delimiter.as_ref())
                .map(Value::string)
                .collect();
            Ok(Value::array(parts))
        }
        _ => Err(unknown_method("string", name, position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn call(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value> {
        Interpreter::with_output(Vec::new()).call_method(
            receiver,
            name,
            args,
            Position::default(),
        )
    }

    #[test]
    fn test_array_push_pop() {
        let array = Value::array(vec![Value::Integer(1)]);

        call(array.clone(), "push", vec![Value::Integer(2)]).unwrap();
        assert_eq!(
            call(array.clone(), "pop", vec![]).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            call(array.clone(), "pop", vec![]).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            call(array, "pop", vec![]).unwrap_err().kind,
            ErrorKind::Index
        );
    }

    #[test]
    fn test_array_sort_numeric() {
        let array = Value::array(vec![
            Value::Integer(3),
            Value::Float(1.5),
            Value::Integer(2),
        ]);

        call(array.clone(), "sort", vec![]).unwrap();

        assert_eq!(
            array,
            Value::array(vec![
                Value::Float(1.5),
                Value::Integer(2),
                Value::Integer(3),
            ])
        );
    }

    #[test]
    fn test_array_sort_strings() {
        let array = Value::array(vec![
            Value::string("pear"),
            Value::string("apple"),
            Value::string("fig"),
        ]);

        call(array.clone(), "sort", vec![]).unwrap();

        assert_eq!(
            array,
            Value::array(vec![
                Value::string("apple"),
                Value::string("fig"),
                Value::string("pear"),
            ])
        );
    }

    #[test]
    fn test_array_sort_mixed_rejected() {
        let array = Value::array(vec![Value::Integer(1), Value::string("a")]);

        assert_eq!(
            call(array, "sort", vec![]).unwrap_err().kind,
            ErrorKind::Type
        );
    }

    #[test]
    fn test_map_methods() {
        let map = call(Value::None, "nope", vec![]).unwrap_err();
        assert_eq!(map.kind, ErrorKind::Attribute);

        let map = Interpreter::with_output(Vec::new())
            .call_builtin(super::super::Builtin::MapNew, vec![], Position::default())
            .unwrap();

        call(
            map.clone(),
            "set",
            vec![Value::string("k"), Value::Integer(1)],
        )
        .unwrap();

        assert_eq!(
            call(map.clone(), "get", vec![Value::string("k")]).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            call(map.clone(), "has", vec![Value::string("k")]).unwrap(),
            Value::Boolean(true)
        );

        call(map.clone(), "remove", vec![Value::string("k")]).unwrap();
        assert_eq!(
            call(map.clone(), "get", vec![Value::string("k")])
                .unwrap_err()
                .kind,
            ErrorKind::Key
        );
        assert_eq!(
            call(map, "remove", vec![Value::string("k")])
                .unwrap_err()
                .kind,
            ErrorKind::Key
        );
    }

    #[test]
    fn test_set_methods() {
        let set = Interpreter::with_output(Vec::new())
            .call_builtin(super::super::Builtin::SetNew, vec![], Position::default())
            .unwrap();

        call(set.clone(), "add", vec![Value::Integer(1)]).unwrap();
        call(set.clone(), "add", vec![Value::Integer(1)]).unwrap();

        assert_eq!(
            call(set.clone(), "has", vec![Value::Integer(1)]).unwrap(),
            Value::Boolean(true)
        );

        call(set.clone(), "remove", vec![Value::Integer(1)]).unwrap();
        assert_eq!(
            call(set.clone(), "remove", vec![Value::Integer(1)])
                .unwrap_err()
                .kind,
            ErrorKind::Key
        );

        let unhashable = call(set, "add", vec![Value::array(vec![])]).unwrap_err();
        assert_eq!(unhashable.kind, ErrorKind::Type);
    }

    #[test]
    fn test_string_split() {
        let parts = call(
            Value::string("a,b,,c"),
            "split",
            vec![Value::string(",")],
        )
        .unwrap();

        assert_eq!(
            parts,
            Value::array(vec![
                Value::string("a"),
                Value::string("b"),
                Value::string(""),
                Value::string("c"),
            ])
        );
    }

    #[test]
    fn test_string_split_empty_delimiter() {
        let error = call(Value::string("ab"), "split", vec![Value::string("")]).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Value);
    }

    #[test]
    fn test_unknown_method_is_attribute_error() {
        let error = call(Value::array(vec![]), "reverse", vec![]).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Attribute);
    }
}
