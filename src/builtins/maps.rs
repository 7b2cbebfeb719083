//! Hash map operations: hash-map, get, assoc, dissoc, keys, vals, contains?
//!
//! Maps are persistent and keyed by canonical strings: a string key `k`
//! is stored as `k`, a keyword key `k` as `:k`, so the two kinds never
//! collide. `keys` reconstructs the original key values from their
//! canonical form.

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_THREE, ARITY_AT_LEAST_TWO, ARITY_ONE, ARITY_TWO};
use crate::value::{map_key, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn as_map<'a>(
    function: &str,
    value: &'a Value,
    position: usize,
) -> Result<&'a HashMap<String, Value>, EvalError> {
    match value {
        Value::HashMap(map) => Ok(map),
        other => Err(EvalError::type_error(function, "hash-map", other, position)),
    }
}

/// Builds a map from alternating keys and values.
///
/// # Examples
///
/// ```lisp
/// (hash-map :name "A" :age 30) => {:age 30 :name "A"}
/// (hash-map) => {}
/// ```
pub fn builtin_hash_map(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() % 2 != 0 {
        return Err(EvalError::arity_error(
            "hash-map",
            "an even number of",
            args.len(),
        ));
    }

    let mut map = HashMap::new();
    for (i, pair) in args.chunks(2).enumerate() {
        let key = map_key("hash-map", &pair[0], i * 2 + 1)?;
        map.insert(key, pair[1].clone());
    }
    Ok(Value::HashMap(map))
}

/// Looks a key up, with an optional default for the missing case.
pub fn builtin_get(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::arity_error("get", "2-3", args.len()));
    }

    let map = as_map("get", &args[0], 1)?;
    let key = map_key("get", &args[1], 2)?;
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    Ok(map.get(&key).cloned().unwrap_or(default))
}

/// Returns a new map with the given keys set (immutable operation).
pub fn builtin_assoc(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 3 || args.len() % 2 != 1 {
        return Err(EvalError::arity_error(
            "assoc",
            ARITY_AT_LEAST_THREE,
            args.len(),
        ));
    }

    let mut map = as_map("assoc", &args[0], 1)?.clone();
    for (i, pair) in args[1..].chunks(2).enumerate() {
        let key = map_key("assoc", &pair[0], i * 2 + 2)?;
        map.insert(key, pair[1].clone());
    }
    Ok(Value::HashMap(map))
}

/// Returns a new map without the given keys.
pub fn builtin_dissoc(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity_error(
            "dissoc",
            ARITY_AT_LEAST_TWO,
            args.len(),
        ));
    }

    let mut map = as_map("dissoc", &args[0], 1)?.clone();
    for (i, key) in args[1..].iter().enumerate() {
        map.remove(&map_key("dissoc", key, i + 2)?);
    }
    Ok(Value::HashMap(map))
}

fn key_to_value(canonical: &str) -> Value {
    match canonical.strip_prefix(':') {
        Some(keyword) => Value::Keyword(keyword.to_string()),
        None => Value::String(canonical.to_string()),
    }
}

/// Returns the map's keys as a list, in sorted canonical order.
pub fn builtin_keys(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("keys", ARITY_ONE, args.len()));
    }

    let map = as_map("keys", &args[0], 1)?;
    let mut canonical: Vec<_> = map.keys().collect();
    canonical.sort();
    Ok(Value::List(
        canonical.iter().map(|key| key_to_value(key)).collect(),
    ))
}

/// Returns the map's values as a list, keyed in sorted canonical order.
pub fn builtin_vals(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("vals", ARITY_ONE, args.len()));
    }

    let map = as_map("vals", &args[0], 1)?;
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(key, _)| key.clone());
    Ok(Value::List(
        entries.into_iter().map(|(_, value)| value.clone()).collect(),
    ))
}

/// Tests whether the map contains the key.
pub fn builtin_contains_q(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("contains?", ARITY_TWO, args.len()));
    }

    let map = as_map("contains?", &args[0], 1)?;
    let key = map_key("contains?", &args[1], 2)?;
    Ok(Value::Bool(map.contains_key(&key)))
}

/// Register all hash map builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("hash-map".to_string(), Value::Builtin(builtin_hash_map));
    env.define("get".to_string(), Value::Builtin(builtin_get));
    env.define("assoc".to_string(), Value::Builtin(builtin_assoc));
    env.define("dissoc".to_string(), Value::Builtin(builtin_dissoc));
    env.define("keys".to_string(), Value::Builtin(builtin_keys));
    env.define("vals".to_string(), Value::Builtin(builtin_vals));
    env.define("contains?".to_string(), Value::Builtin(builtin_contains_q));
}
