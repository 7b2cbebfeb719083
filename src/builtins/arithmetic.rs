//! Arithmetic operations: +, -, *, /, %
//!
//! Variadic numeric operations over the promoting tower in
//! [`crate::number`]: results stay IEEE doubles until precision demands
//! arbitrary-precision integers.
//!
//! - `+`: Sum of all arguments (identity: 0)
//! - `-`: Subtract subsequent args from first, or negate if single arg
//! - `*`: Product of all arguments (identity: 1)
//! - `/`: Divide first by subsequent args, or reciprocal if single arg
//! - `%`: Remainder with the sign of the dividend - exactly 2 args

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE, ARITY_TWO};
use crate::number::Num;
use crate::value::Value;
use std::sync::Arc;

/// Returns the sum of all arguments.
///
/// # Examples
///
/// ```lisp
/// (+ 1 2 3) => 6
/// (+) => 0
/// ```
pub fn builtin_add(args: &[Value]) -> Result<Value, EvalError> {
    let mut sum = Num::Float(0.0);
    for (i, arg) in args.iter().enumerate() {
        let operand = Num::from_value("+", arg, i + 1)?;
        sum = sum.add(operand, "+")?;
    }
    Ok(sum.into_value())
}

/// Subtracts subsequent arguments from the first; negates a single one.
///
/// # Examples
///
/// ```lisp
/// (- 10 3 2) => 5
/// (- 5) => -5
/// ```
pub fn builtin_sub(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("-", ARITY_AT_LEAST_ONE, 0));
    }

    let first = Num::from_value("-", &args[0], 1)?;
    if args.len() == 1 {
        return Ok(first.negate().into_value());
    }

    let mut result = first;
    for (i, arg) in args[1..].iter().enumerate() {
        let operand = Num::from_value("-", arg, i + 2)?;
        result = result.sub(operand, "-")?;
    }
    Ok(result.into_value())
}

/// Returns the product of all arguments.
///
/// # Examples
///
/// ```lisp
/// (* 2 3 4) => 24
/// (*) => 1
/// ```
pub fn builtin_mul(args: &[Value]) -> Result<Value, EvalError> {
    let mut product = Num::Float(1.0);
    for (i, arg) in args.iter().enumerate() {
        let operand = Num::from_value("*", arg, i + 1)?;
        product = product.mul(operand, "*")?;
    }
    Ok(product.into_value())
}

/// Divides the first argument by subsequent arguments, or takes the
/// reciprocal of a single one.
///
/// # Examples
///
/// ```lisp
/// (/ 20 4) => 5
/// (/ 7 2) => 3.5
/// ```
pub fn builtin_div(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("/", ARITY_AT_LEAST_ONE, 0));
    }

    let first = Num::from_value("/", &args[0], 1)?;
    if args.len() == 1 {
        return Ok(Num::Float(1.0).div(first, "/")?.into_value());
    }

    let mut result = first;
    for (i, arg) in args[1..].iter().enumerate() {
        let operand = Num::from_value("/", arg, i + 2)?;
        result = result.div(operand, "/")?;
    }
    Ok(result.into_value())
}

/// Returns the remainder when num1 is divided by num2.
///
/// # Examples
///
/// ```lisp
/// (% 17 5) => 2
/// (% -7 2) => -1
/// ```
pub fn builtin_mod(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("%", ARITY_TWO, args.len()));
    }

    let dividend = Num::from_value("%", &args[0], 1)?;
    let divisor = Num::from_value("%", &args[1], 2)?;
    Ok(dividend.rem(divisor, "%")?.into_value())
}

/// Register all arithmetic builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("+".to_string(), Value::Builtin(builtin_add));
    env.define("-".to_string(), Value::Builtin(builtin_sub));
    env.define("*".to_string(), Value::Builtin(builtin_mul));
    env.define("/".to_string(), Value::Builtin(builtin_div));
    env.define("%".to_string(), Value::Builtin(builtin_mod));
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_add_identity_and_sum() {
        assert_eq!(builtin_add(&[]).unwrap(), Value::Number(0.0));
        let args = [Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
        assert_eq!(builtin_add(&args).unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_sub_negation_and_chain() {
        assert_eq!(
            builtin_sub(&[Value::Number(5.0)]).unwrap(),
            Value::Number(-5.0)
        );
        let args = [Value::Number(10.0), Value::Number(3.0), Value::Number(2.0)];
        assert_eq!(builtin_sub(&args).unwrap(), Value::Number(5.0));
        assert!(matches!(
            builtin_sub(&[]),
            Err(EvalError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn test_mul_promotes_to_bignumber() {
        let args = [Value::Number(1e15), Value::Number(1e15)];
        match builtin_mul(&args).unwrap() {
            Value::BigNumber(big) => {
                assert_eq!(big.to_string(), "1000000000000000000000000000000")
            }
            other => panic!("expected BigNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_big_operand_is_sticky() {
        let args = [Value::BigNumber(BigInt::from(2)), Value::Number(3.0)];
        assert_eq!(
            builtin_mul(&args).unwrap(),
            Value::BigNumber(BigInt::from(6))
        );
    }

    #[test]
    fn test_div_fractional_and_by_zero() {
        let args = [Value::Number(7.0), Value::Number(2.0)];
        assert_eq!(builtin_div(&args).unwrap(), Value::Number(3.5));
        assert_eq!(
            builtin_div(&[Value::Number(1.0), Value::Number(0.0)]).unwrap_err(),
            EvalError::DivisionByZero
        );
    }

    #[test]
    fn test_mod_sign_of_dividend() {
        let args = [Value::Number(-7.0), Value::Number(2.0)];
        assert_eq!(builtin_mod(&args).unwrap(), Value::Number(-1.0));
    }

    #[test]
    fn test_non_number_is_type_error() {
        let args = [Value::Number(1.0), Value::String("x".to_string())];
        assert!(matches!(
            builtin_add(&args),
            Err(EvalError::TypeMismatch { .. })
        ));
    }
}
