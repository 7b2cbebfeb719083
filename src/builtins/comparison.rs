//! Comparison operations: =, <, >, <=, >=
//!
//! All comparisons are variadic and chain pairwise: `(< 1 2 3)` holds
//! when every adjacent pair holds. `=` is polymorphic: numbers compare
//! by numeric value across representations, everything else by deep
//! equality within the same kind.

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE};
use crate::number::Num;
use crate::value::Value;
use std::cmp::Ordering;
use std::sync::Arc;

fn compare_chain(
    name: &str,
    args: &[Value],
    holds: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error(name, ARITY_AT_LEAST_ONE, 0));
    }

    let mut prev = Num::from_value(name, &args[0], 1)?;
    for (i, arg) in args[1..].iter().enumerate() {
        let next = Num::from_value(name, arg, i + 2)?;
        match prev.compare(&next) {
            Some(ordering) if holds(ordering) => prev = next,
            // NaN comparisons never hold
            _ => return Ok(Value::Bool(false)),
        }
    }
    Ok(Value::Bool(true))
}

/// Polymorphic equality over all value kinds.
pub fn builtin_eq(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("=", ARITY_AT_LEAST_ONE, 0));
    }
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

pub fn builtin_lt(args: &[Value]) -> Result<Value, EvalError> {
    compare_chain("<", args, |ord| ord == Ordering::Less)
}

pub fn builtin_le(args: &[Value]) -> Result<Value, EvalError> {
    compare_chain("<=", args, |ord| ord != Ordering::Greater)
}

pub fn builtin_gt(args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(">", args, |ord| ord == Ordering::Greater)
}

pub fn builtin_ge(args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(">=", args, |ord| ord != Ordering::Less)
}

/// Register all comparison builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("=".to_string(), Value::Builtin(builtin_eq));
    env.define("<".to_string(), Value::Builtin(builtin_lt));
    env.define("<=".to_string(), Value::Builtin(builtin_le));
    env.define(">".to_string(), Value::Builtin(builtin_gt));
    env.define(">=".to_string(), Value::Builtin(builtin_ge));
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_chained_less_than() {
        let args = [Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
        assert_eq!(builtin_lt(&args).unwrap(), Value::Bool(true));

        let broken = [Value::Number(1.0), Value::Number(3.0), Value::Number(2.0)];
        assert_eq!(builtin_lt(&broken).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_le_ge_allow_equal() {
        let args = [Value::Number(2.0), Value::Number(2.0)];
        assert_eq!(builtin_le(&args).unwrap(), Value::Bool(true));
        assert_eq!(builtin_ge(&args).unwrap(), Value::Bool(true));
        assert_eq!(builtin_lt(&args).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_eq_across_number_representations() {
        let args = [Value::Number(42.0), Value::BigNumber(BigInt::from(42))];
        assert_eq!(builtin_eq(&args).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_eq_deep_on_lists() {
        let a = Value::List(vec![Value::Number(1.0), Value::String("x".to_string())]);
        let b = Value::List(vec![Value::Number(1.0), Value::String("x".to_string())]);
        assert_eq!(builtin_eq(&[a, b]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_eq_distinct_kinds_are_unequal() {
        let args = [Value::Number(1.0), Value::String("1".to_string())];
        assert_eq!(builtin_eq(&args).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_compare_big_with_float() {
        let args = [
            Value::Number(1.0),
            Value::BigNumber("1000000000000000000000".parse().unwrap()),
        ];
        assert_eq!(builtin_lt(&args).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_comparing_non_numbers_is_type_error() {
        let args = [Value::String("a".to_string()), Value::Number(1.0)];
        assert!(matches!(
            builtin_lt(&args),
            Err(EvalError::TypeMismatch { .. })
        ));
    }
}
