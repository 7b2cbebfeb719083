//! Higher-order sequence operations: map, filter, reduce, apply, range
//!
//! These call back into the evaluator through
//! [`crate::eval::apply_function`], so any callable works as the
//! function argument: closures, builtins, or keywords.

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE_OR_TWO, ARITY_THREE, ARITY_TWO};
use crate::eval;
use crate::value::Value;
use std::sync::Arc;

fn as_list<'a>(
    function: &str,
    value: &'a Value,
    position: usize,
) -> Result<&'a [Value], EvalError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(EvalError::type_error(function, "list", other, position)),
    }
}

/// Applies a function to every element, collecting the results.
///
/// # Examples
///
/// ```lisp
/// (map (fn [x] (* x x)) (list 1 2 3)) => (1 4 9)
/// (map :name (list {:name "A"} {:name "B"})) => ("A" "B")
/// ```
pub fn builtin_map(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("map", ARITY_TWO, args.len()));
    }

    let items = as_list("map", &args[1], 2)?;
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        result.push(eval::apply_function(&args[0], &[item.clone()])?);
    }
    Ok(Value::List(result))
}

/// Keeps the elements the predicate answers truthy for.
pub fn builtin_filter(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("filter", ARITY_TWO, args.len()));
    }

    let items = as_list("filter", &args[1], 2)?;
    let mut result = Vec::new();
    for item in items {
        if eval::apply_function(&args[0], &[item.clone()])?.is_truthy() {
            result.push(item.clone());
        }
    }
    Ok(Value::List(result))
}

/// Left fold: `(reduce f init (list a b c))` is `(f (f (f init a) b) c)`.
pub fn builtin_reduce(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity_error("reduce", ARITY_THREE, args.len()));
    }

    let items = as_list("reduce", &args[2], 3)?;
    let mut accumulator = args[1].clone();
    for item in items {
        accumulator = eval::apply_function(&args[0], &[accumulator, item.clone()])?;
    }
    Ok(accumulator)
}

/// Calls a function with a list's elements as its arguments.
pub fn builtin_apply(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("apply", ARITY_TWO, args.len()));
    }

    let call_args = as_list("apply", &args[1], 2)?;
    eval::apply_function(&args[0], call_args)
}

/// `(range n)` counts 0..n-1; `(range a b)` counts a..b-1.
pub fn builtin_range(args: &[Value]) -> Result<Value, EvalError> {
    let bound = |value: &Value, position: usize| -> Result<i64, EvalError> {
        match value {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
            other => Err(EvalError::type_error("range", "integer", other, position)),
        }
    };

    let (start, end) = match args {
        [end] => (0, bound(end, 1)?),
        [start, end] => (bound(start, 1)?, bound(end, 2)?),
        _ => return Err(EvalError::arity_error("range", ARITY_ONE_OR_TWO, args.len())),
    };

    Ok(Value::List(
        (start..end).map(|n| Value::Number(n as f64)).collect(),
    ))
}

/// Register all sequence builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("map".to_string(), Value::Builtin(builtin_map));
    env.define("filter".to_string(), Value::Builtin(builtin_filter));
    env.define("reduce".to_string(), Value::Builtin(builtin_reduce));
    env.define("apply".to_string(), Value::Builtin(builtin_apply));
    env.define("range".to_string(), Value::Builtin(builtin_range));
}
