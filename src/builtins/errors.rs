//! User-raised errors: error
//!
//! `(error "message" ...)` aborts the current evaluation with a user
//! error. Message pieces render bare, the way println renders them.

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE};
use crate::value::Value;
use std::sync::Arc;

/// Raises a user error built from the message forms of all arguments
pub fn builtin_error(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("error", ARITY_AT_LEAST_ONE, 0));
    }

    let message = args
        .iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(" ");
    Err(EvalError::UserError(message))
}

/// Register error builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("error".to_string(), Value::Builtin(builtin_error));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_bare_message() {
        let args = [
            Value::String("bad input:".to_string()),
            Value::Number(7.0),
        ];
        assert_eq!(
            builtin_error(&args).unwrap_err(),
            EvalError::UserError("bad input: 7".to_string())
        );
    }

    #[test]
    fn test_error_requires_a_message() {
        assert!(matches!(
            builtin_error(&[]),
            Err(EvalError::ArityMismatch { .. })
        ));
    }
}
