//! String operations: str, string-length, substring, string-upper, string-lower, string-contains?

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_TWO, ARITY_TWO_OR_THREE};
use crate::value::Value;
use std::sync::Arc;

fn as_string<'a>(function: &str, value: &'a Value, position: usize) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_error(function, "string", other, position)),
    }
}

/// Concatenates the message forms of all arguments into one string.
///
/// # Examples
///
/// ```lisp
/// (str "n = " 42) => "n = 42"
/// (str) => ""
/// ```
pub fn builtin_str(args: &[Value]) -> Result<Value, EvalError> {
    let mut result = String::new();
    for arg in args {
        result.push_str(&arg.to_display_string());
    }
    Ok(Value::String(result))
}

/// Returns the number of characters in a string
pub fn builtin_string_length(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(
            "string-length",
            ARITY_ONE,
            args.len(),
        ));
    }
    let s = as_string("string-length", &args[0], 1)?;
    Ok(Value::Number(s.chars().count() as f64))
}

/// Extracts characters from start (inclusive) to end (exclusive), with
/// end defaulting to the end of the string. Indices clamp to bounds.
pub fn builtin_substring(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::arity_error(
            "substring",
            ARITY_TWO_OR_THREE,
            args.len(),
        ));
    }

    let s = as_string("substring", &args[0], 1)?;
    let index = |value: &Value, position: usize| -> Result<usize, EvalError> {
        match value {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
            other => Err(EvalError::type_error(
                "substring",
                "non-negative integer",
                other,
                position,
            )),
        }
    };

    let chars: Vec<char> = s.chars().collect();
    let start = index(&args[1], 2)?.min(chars.len());
    let end = match args.get(2) {
        Some(value) => index(value, 3)?.min(chars.len()),
        None => chars.len(),
    };
    let end = end.max(start);

    Ok(Value::String(chars[start..end].iter().collect()))
}

/// Uppercases a string
pub fn builtin_string_upper(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(
            "string-upper",
            ARITY_ONE,
            args.len(),
        ));
    }
    let s = as_string("string-upper", &args[0], 1)?;
    Ok(Value::String(s.to_uppercase()))
}

/// Lowercases a string
pub fn builtin_string_lower(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(
            "string-lower",
            ARITY_ONE,
            args.len(),
        ));
    }
    let s = as_string("string-lower", &args[0], 1)?;
    Ok(Value::String(s.to_lowercase()))
}

/// Tests whether the first string contains the second
pub fn builtin_string_contains_q(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error(
            "string-contains?",
            ARITY_TWO,
            args.len(),
        ));
    }
    let haystack = as_string("string-contains?", &args[0], 1)?;
    let needle = as_string("string-contains?", &args[1], 2)?;
    Ok(Value::Bool(haystack.contains(needle)))
}

/// Register all string builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("str".to_string(), Value::Builtin(builtin_str));
    env.define(
        "string-length".to_string(),
        Value::Builtin(builtin_string_length),
    );
    env.define("substring".to_string(), Value::Builtin(builtin_substring));
    env.define(
        "string-upper".to_string(),
        Value::Builtin(builtin_string_upper),
    );
    env.define(
        "string-lower".to_string(),
        Value::Builtin(builtin_string_lower),
    );
    env.define(
        "string-contains?".to_string(),
        Value::Builtin(builtin_string_contains_q),
    );
}
