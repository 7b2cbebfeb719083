// ABOUTME: Numeric tower shared by arithmetic and comparison builtins

//! Numbers are IEEE-754 doubles until they can no longer be: an operation
//! whose integral result leaves the 2^53 safe range, or any operation
//! touching a `BigNumber`, is carried out exactly in `BigInt`. The
//! promotion logic lives here so the builtins stay table-shaped.

use crate::error::EvalError;
use crate::value::Value;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// Largest magnitude at which every integer is exactly representable in
/// an f64 (2^53).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A number lifted out of a `Value` for arithmetic.
#[derive(Debug, Clone)]
pub enum Num {
    Float(f64),
    Big(BigInt),
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

fn integral_big(f: f64) -> Option<BigInt> {
    if is_integral(f) {
        BigInt::from_f64(f)
    } else {
        None
    }
}

/// Numeric equality between the two representations.
pub fn float_equals_big(f: f64, big: &BigInt) -> bool {
    match integral_big(f) {
        Some(as_big) => as_big == *big,
        None => false,
    }
}

impl Num {
    pub fn from_value(function: &str, value: &Value, position: usize) -> Result<Num, EvalError> {
        match value {
            Value::Number(n) => Ok(Num::Float(*n)),
            Value::BigNumber(n) => Ok(Num::Big(n.clone())),
            other => Err(EvalError::type_error(function, "number", other, position)),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Num::Float(f) => Value::Number(f),
            Num::Big(b) => Value::BigNumber(b),
        }
    }

    /// Exact integer view, for operations forced into `BigInt`. A float
    /// with a fractional part has no exact integer meaning, so mixing it
    /// with a `BigNumber` is a type error.
    fn big(&self, function: &str) -> Result<BigInt, EvalError> {
        match self {
            Num::Big(b) => Ok(b.clone()),
            Num::Float(f) => integral_big(*f).ok_or_else(|| EvalError::TypeMismatch {
                function: function.to_string(),
                expected: "integer-valued number".to_string(),
                actual: format!("{}", f),
                position: 0,
            }),
        }
    }

    pub fn add(self, rhs: Num, function: &str) -> Result<Num, EvalError> {
        match (&self, &rhs) {
            (Num::Float(a), Num::Float(b)) => {
                let sum = a + b;
                if is_integral(*a) && is_integral(*b) && sum.abs() > MAX_SAFE_INTEGER {
                    return Ok(Num::Big(self.big(function)? + rhs.big(function)?));
                }
                Ok(Num::Float(sum))
            }
            _ => Ok(Num::Big(self.big(function)? + rhs.big(function)?)),
        }
    }

    pub fn sub(self, rhs: Num, function: &str) -> Result<Num, EvalError> {
        match (&self, &rhs) {
            (Num::Float(a), Num::Float(b)) => {
                let diff = a - b;
                if is_integral(*a) && is_integral(*b) && diff.abs() > MAX_SAFE_INTEGER {
                    return Ok(Num::Big(self.big(function)? - rhs.big(function)?));
                }
                Ok(Num::Float(diff))
            }
            _ => Ok(Num::Big(self.big(function)? - rhs.big(function)?)),
        }
    }

    pub fn mul(self, rhs: Num, function: &str) -> Result<Num, EvalError> {
        match (&self, &rhs) {
            (Num::Float(a), Num::Float(b)) => {
                let product = a * b;
                // Checked integer multiply: redo exactly when the f64
                // product leaves the safe range.
                if is_integral(*a) && is_integral(*b) && product.abs() > MAX_SAFE_INTEGER {
                    return Ok(Num::Big(self.big(function)? * rhs.big(function)?));
                }
                Ok(Num::Float(product))
            }
            _ => Ok(Num::Big(self.big(function)? * rhs.big(function)?)),
        }
    }

    pub fn div(self, rhs: Num, function: &str) -> Result<Num, EvalError> {
        match (&self, &rhs) {
            (Num::Float(a), Num::Float(b)) => {
                if *b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Num::Float(a / b))
            }
            _ => {
                let denom = rhs.big(function)?;
                if denom.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                // BigInt division truncates toward zero
                Ok(Num::Big(self.big(function)? / denom))
            }
        }
    }

    pub fn rem(self, rhs: Num, function: &str) -> Result<Num, EvalError> {
        match (&self, &rhs) {
            (Num::Float(a), Num::Float(b)) => {
                if *b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                // % takes the sign of the dividend (truncated division)
                Ok(Num::Float(a % b))
            }
            _ => {
                let denom = rhs.big(function)?;
                if denom.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Num::Big(self.big(function)? % denom))
            }
        }
    }

    pub fn negate(self) -> Num {
        match self {
            Num::Float(f) => Num::Float(-f),
            Num::Big(b) => Num::Big(-b),
        }
    }

    pub fn compare(&self, rhs: &Num) -> Option<Ordering> {
        match (self, rhs) {
            (Num::Float(a), Num::Float(b)) => a.partial_cmp(b),
            (Num::Big(a), Num::Big(b)) => Some(a.cmp(b)),
            (Num::Float(a), Num::Big(b)) => match integral_big(*a) {
                Some(as_big) => Some(as_big.cmp(b)),
                None => a.partial_cmp(&big_to_f64(b)),
            },
            (Num::Big(a), Num::Float(b)) => match integral_big(*b) {
                Some(as_big) => Some(a.cmp(&as_big)),
                None => big_to_f64(a).partial_cmp(b),
            },
        }
    }
}

fn big_to_f64(b: &BigInt) -> f64 {
    b.to_f64().unwrap_or_else(|| {
        if b.is_negative() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    })
}
