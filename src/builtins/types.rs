//! Type predicates: one per value kind
//!
//! `number?` answers true for both numeric representations; `bignum?`
//! distinguishes the arbitrary-precision kind.

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE};
use crate::value::Value;
use std::sync::Arc;

fn one_arg<'a>(function: &str, args: &'a [Value]) -> Result<&'a Value, EvalError> {
    match args {
        [value] => Ok(value),
        _ => Err(EvalError::arity_error(function, ARITY_ONE, args.len())),
    }
}

pub fn builtin_number_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("number?", args)?;
    Ok(Value::Bool(matches!(
        value,
        Value::Number(_) | Value::BigNumber(_)
    )))
}

pub fn builtin_bignum_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("bignum?", args)?;
    Ok(Value::Bool(matches!(value, Value::BigNumber(_))))
}

pub fn builtin_string_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("string?", args)?;
    Ok(Value::Bool(matches!(value, Value::String(_))))
}

pub fn builtin_bool_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("bool?", args)?;
    Ok(Value::Bool(matches!(value, Value::Bool(_))))
}

pub fn builtin_keyword_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("keyword?", args)?;
    Ok(Value::Bool(matches!(value, Value::Keyword(_))))
}

pub fn builtin_symbol_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("symbol?", args)?;
    Ok(Value::Bool(matches!(value, Value::Symbol(_))))
}

pub fn builtin_list_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("list?", args)?;
    Ok(Value::Bool(matches!(value, Value::List(_))))
}

pub fn builtin_map_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("map?", args)?;
    Ok(Value::Bool(matches!(value, Value::HashMap(_))))
}

pub fn builtin_nil_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("nil?", args)?;
    Ok(Value::Bool(matches!(value, Value::Nil)))
}

pub fn builtin_fn_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("fn?", args)?;
    Ok(Value::Bool(matches!(
        value,
        Value::Function { .. } | Value::Builtin(_)
    )))
}

pub fn builtin_macro_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("macro?", args)?;
    Ok(Value::Bool(matches!(value, Value::Macro { .. })))
}

pub fn builtin_module_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("module?", args)?;
    Ok(Value::Bool(matches!(value, Value::Module(_))))
}

pub fn builtin_channel_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("channel?", args)?;
    Ok(Value::Bool(matches!(value, Value::Channel(_))))
}

pub fn builtin_atom_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("atom?", args)?;
    Ok(Value::Bool(matches!(value, Value::Atom(_))))
}

pub fn builtin_future_q(args: &[Value]) -> Result<Value, EvalError> {
    let value = one_arg("future?", args)?;
    Ok(Value::Bool(matches!(value, Value::Future(_))))
}

/// Register all type predicates in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("number?".to_string(), Value::Builtin(builtin_number_q));
    env.define("bignum?".to_string(), Value::Builtin(builtin_bignum_q));
    env.define("string?".to_string(), Value::Builtin(builtin_string_q));
    env.define("bool?".to_string(), Value::Builtin(builtin_bool_q));
    env.define("keyword?".to_string(), Value::Builtin(builtin_keyword_q));
    env.define("symbol?".to_string(), Value::Builtin(builtin_symbol_q));
    env.define("list?".to_string(), Value::Builtin(builtin_list_q));
    env.define("map?".to_string(), Value::Builtin(builtin_map_q));
    env.define("nil?".to_string(), Value::Builtin(builtin_nil_q));
    env.define("fn?".to_string(), Value::Builtin(builtin_fn_q));
    env.define("macro?".to_string(), Value::Builtin(builtin_macro_q));
    env.define("module?".to_string(), Value::Builtin(builtin_module_q));
    env.define("channel?".to_string(), Value::Builtin(builtin_channel_q));
    env.define("atom?".to_string(), Value::Builtin(builtin_atom_q));
    env.define("future?".to_string(), Value::Builtin(builtin_future_q));
}
