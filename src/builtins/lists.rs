//! List operations: list, cons, car, cdr, nth, length, count, empty?, reverse, append
//!
//! Lists are persistent: every operation builds a new list and leaves
//! its arguments untouched. `first`/`rest` are aliases for `car`/`cdr`.

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_TWO};
use crate::value::Value;
use std::sync::Arc;

/// Creates a new list containing the given elements in order
pub fn builtin_list(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::List(args.to_vec()))
}

/// Constructs a new list by prepending elem to list
pub fn builtin_cons(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("cons", ARITY_TWO, args.len()));
    }

    let mut result = vec![args[0].clone()];
    match &args[1] {
        Value::List(items) => result.extend(items.iter().cloned()),
        Value::Nil => (),
        other => return Err(EvalError::type_error("cons", "list", other, 2)),
    }
    Ok(Value::List(result))
}

/// Returns the first element of a list. Also called 'head'.
pub fn builtin_car(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("car", ARITY_ONE, args.len()));
    }

    match &args[0] {
        Value::List(items) if !items.is_empty() => Ok(items[0].clone()),
        Value::List(_) => Err(EvalError::type_error(
            "car",
            "non-empty list",
            &args[0],
            1,
        )),
        other => Err(EvalError::type_error("car", "list", other, 1)),
    }
}

/// Returns all elements except the first. Also called 'tail'.
pub fn builtin_cdr(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("cdr", ARITY_ONE, args.len()));
    }

    match &args[0] {
        Value::List(items) if !items.is_empty() => Ok(Value::List(items[1..].to_vec())),
        Value::List(_) => Err(EvalError::type_error(
            "cdr",
            "non-empty list",
            &args[0],
            1,
        )),
        other => Err(EvalError::type_error("cdr", "list", other, 1)),
    }
}

/// Returns the element at a zero-based index, nil when out of range
pub fn builtin_nth(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("nth", ARITY_TWO, args.len()));
    }

    let items = match &args[0] {
        Value::List(items) => items,
        other => return Err(EvalError::type_error("nth", "list", other, 1)),
    };
    let index = match &args[1] {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => *n as usize,
        other => {
            return Err(EvalError::type_error(
                "nth",
                "non-negative integer",
                other,
                2,
            ))
        }
    };

    Ok(items.get(index).cloned().unwrap_or(Value::Nil))
}

/// Returns the number of elements in a list
pub fn builtin_length(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("length", ARITY_ONE, args.len()));
    }

    match &args[0] {
        Value::List(items) => Ok(Value::Number(items.len() as f64)),
        Value::Nil => Ok(Value::Number(0.0)),
        other => Err(EvalError::type_error("length", "list", other, 1)),
    }
}

/// Element count of any sized collection: list, hash map, or string
pub fn builtin_count(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("count", ARITY_ONE, args.len()));
    }

    match &args[0] {
        Value::List(items) => Ok(Value::Number(items.len() as f64)),
        Value::HashMap(map) => Ok(Value::Number(map.len() as f64)),
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Nil => Ok(Value::Number(0.0)),
        other => Err(EvalError::type_error("count", "collection", other, 1)),
    }
}

/// Tests if a list is empty (nil or ())
pub fn builtin_empty_q(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("empty?", ARITY_ONE, args.len()));
    }

    match &args[0] {
        Value::List(items) => Ok(Value::Bool(items.is_empty())),
        Value::String(s) => Ok(Value::Bool(s.is_empty())),
        Value::HashMap(map) => Ok(Value::Bool(map.is_empty())),
        Value::Nil => Ok(Value::Bool(true)),
        other => Err(EvalError::type_error("empty?", "collection", other, 1)),
    }
}

/// Returns the list with its elements in reverse order
pub fn builtin_reverse(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("reverse", ARITY_ONE, args.len()));
    }

    match &args[0] {
        Value::List(items) => Ok(Value::List(items.iter().rev().cloned().collect())),
        Value::Nil => Ok(Value::List(vec![])),
        other => Err(EvalError::type_error("reverse", "list", other, 1)),
    }
}

/// Concatenates lists; nil arguments count as empty lists
pub fn builtin_append(args: &[Value]) -> Result<Value, EvalError> {
    let mut result = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        match arg {
            Value::List(items) => result.extend(items.iter().cloned()),
            Value::Nil => (),
            other => return Err(EvalError::type_error("append", "list", other, i + 1)),
        }
    }
    Ok(Value::List(result))
}

/// Register all list builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("list".to_string(), Value::Builtin(builtin_list));
    env.define("cons".to_string(), Value::Builtin(builtin_cons));
    env.define("car".to_string(), Value::Builtin(builtin_car));
    env.define("first".to_string(), Value::Builtin(builtin_car));
    env.define("cdr".to_string(), Value::Builtin(builtin_cdr));
    env.define("rest".to_string(), Value::Builtin(builtin_cdr));
    env.define("nth".to_string(), Value::Builtin(builtin_nth));
    env.define("length".to_string(), Value::Builtin(builtin_length));
    env.define("count".to_string(), Value::Builtin(builtin_count));
    env.define("empty?".to_string(), Value::Builtin(builtin_empty_q));
    env.define("reverse".to_string(), Value::Builtin(builtin_reverse));
    env.define("append".to_string(), Value::Builtin(builtin_append));
}
