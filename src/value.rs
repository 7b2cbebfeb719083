// ABOUTME: Value types representing runtime Lisp data

use crate::ast::Expr;
use crate::concurrency::{AtomCell, Channel, FutureCell};
use crate::env::Environment;
use crate::error::EvalError;
use crate::modules::ModuleValue;
use crate::number;
use num_bigint::BigInt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a host-implemented builtin function.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, EvalError>;

/// A runtime value. Everything shared between tasks (environments,
/// channels, atoms, futures, modules) sits behind an `Arc` so values can
/// cross `go` thread boundaries; all other variants are structurally
/// immutable.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    BigNumber(BigInt),
    String(String),
    Bool(bool),
    Keyword(String),
    /// Quoted identifier. Produced by `quote` and consumed by macro
    /// expansion; a symbol never survives ordinary evaluation.
    Symbol(String),
    List(Vec<Value>),
    /// Keys are canonical strings: a string key `k` is stored as `k`, a
    /// keyword key `k` as `:k`. The two never collide.
    HashMap(HashMap<String, Value>),
    Function {
        params: Vec<String>,
        body: Vec<Expr>,
        env: Arc<Environment>,
    },
    Builtin(BuiltinFn),
    Macro {
        params: Vec<String>,
        body: Vec<Expr>,
        env: Arc<Environment>,
    },
    Module(Arc<ModuleValue>),
    Channel(Arc<Channel>),
    Atom(Arc<AtomCell>),
    Future(Arc<FutureCell>),
    Nil,
}

impl Value {
    /// Only `#f` and `nil` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Nil)
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::BigNumber(_) => "bignum",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::HashMap(_) => "hash-map",
            Value::Function { .. } => "function",
            Value::Builtin(_) => "builtin",
            Value::Macro { .. } => "macro",
            Value::Module(_) => "module",
            Value::Channel(_) => "channel",
            Value::Atom(_) => "atom",
            Value::Future(_) => "future",
            Value::Nil => "nil",
        }
    }

    /// Rendering for message contexts (`println`, `str`, `error`):
    /// strings appear bare, everything else as its printed form.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Canonical hash-map key for a string or keyword value.
pub fn map_key(function: &str, key: &Value, position: usize) -> Result<String, EvalError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Keyword(k) => Ok(format!(":{}", k)),
        other => Err(EvalError::type_error(
            function,
            "string or keyword",
            other,
            position,
        )),
    }
}

fn write_map(f: &mut fmt::Formatter<'_>, map: &HashMap<String, Value>) -> fmt::Result {
    write!(f, "{{")?;
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(k, _)| *k); // Sort for consistent display
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        if key.starts_with(':') {
            write!(f, "{} {}", key, value)?;
        } else {
            write!(f, "\"{}\" {}", key, value)?;
        }
    }
    write!(f, "}}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Whole numbers display without the trailing .0
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::BigNumber(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::HashMap(map) => write_map(f, map),
            Value::Function { params, .. } => write!(f, "#<function({})>", params.join(" ")),
            Value::Builtin(_) => write!(f, "#<builtin>"),
            Value::Macro { params, .. } => write!(f, "#<macro({})>", params.join(" ")),
            Value::Module(m) => write!(f, "#<module:{}>", m.name),
            Value::Channel(_) => write!(f, "#<channel>"),
            Value::Atom(_) => write!(f, "#<atom>"),
            Value::Future(_) => write!(f, "#<future>"),
            Value::Nil => write!(f, "nil"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Numbers compare by numeric value across representations
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::BigNumber(a), Value::BigNumber(b)) => a == b,
            (Value::Number(f), Value::BigNumber(b)) | (Value::BigNumber(b), Value::Number(f)) => {
                number::float_equals_big(*f, b)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::HashMap(a), Value::HashMap(b)) => a == b,
            // Shared and callable values compare by identity
            (Value::Builtin(a), Value::Builtin(b)) => *a as *const () == *b as *const (),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::Channel(a), Value::Channel(b)) => Arc::ptr_eq(a, b),
            (Value::Atom(a), Value::Atom(b)) => Arc::ptr_eq(a, b),
            (Value::Future(a), Value::Future(b)) => Arc::ptr_eq(a, b),
            (
                Value::Function {
                    params: pa,
                    body: ba,
                    env: ea,
                },
                Value::Function {
                    params: pb,
                    body: bb,
                    env: eb,
                },
            ) => Arc::ptr_eq(ea, eb) && pa == pb && ba == bb,
            (
                Value::Macro {
                    params: pa,
                    body: ba,
                    env: ea,
                },
                Value::Macro {
                    params: pb,
                    body: bb,
                    env: eb,
                },
            ) => Arc::ptr_eq(ea, eb) && pa == pb && ba == bb,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}
