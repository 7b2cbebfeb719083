// ABOUTME: Error types for evaluation failures in the Lisp interpreter

use crate::value::Value;
use thiserror::Error;

// ===== Arity constant strings (eliminates allocations in error paths) =====
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_ONE_OR_TWO: &str = "1-2";
pub const ARITY_ZERO_OR_ONE: &str = "0-1";
pub const ARITY_TWO_OR_THREE: &str = "2-3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_AT_LEAST_TWO: &str = "at least 2";
pub const ARITY_AT_LEAST_THREE: &str = "at least 3";

/// Errors are first-class: a future carries one across threads, so the
/// whole enum stays cheap to clone.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound symbol: {0}")]
    UnboundSymbol(String),

    #[error("{function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    ArityMismatch {
        function: String,
        expected: String, // "2", "1-3", "at least 1"
        actual: usize,
    },

    #[error("{function}: expected {expected}, got {actual} at argument {position}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
        position: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot evaluate an empty application")]
    EmptyApplication,

    #[error("value is not callable")]
    NotCallable,

    #[error("{form}: {message}")]
    BadSpecialForm { form: String, message: String },

    #[error("module {module} has no export named {name}")]
    BadExport { module: String, name: String },

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("io error: {0}")]
    IOError(String),

    #[error("send on closed channel")]
    SendOnClosed,

    #[error("{0}")]
    UserError(String),
}

impl EvalError {
    /// Create a type mismatch error with full context
    pub fn type_error(function: &str, expected: &str, actual: &Value, position: usize) -> Self {
        EvalError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
            position,
        }
    }

    /// Create an arity error with expected and actual counts
    pub fn arity_error(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::ArityMismatch {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    /// Create a malformed special form error
    pub fn special_form(form: &str, message: impl Into<String>) -> Self {
        EvalError::BadSpecialForm {
            form: form.to_string(),
            message: message.into(),
        }
    }
}
