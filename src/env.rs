// ABOUTME: Environment module for managing variable bindings and scopes

use crate::error::EvalError;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A lexical frame: an ordered mapping from symbol name to value plus an
/// optional parent. Frames are shared across `go` tasks, hence `Arc` and
/// a lock rather than single-threaded interior mutability.
#[derive(Debug)]
pub struct Environment {
    bindings: RwLock<HashMap<String, Value>>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    /// Creates a new root environment with no parent
    pub fn new() -> Arc<Self> {
        Arc::new(Environment {
            bindings: RwLock::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment with a parent
    pub fn with_parent(parent: Arc<Environment>) -> Arc<Self> {
        Arc::new(Environment {
            bindings: RwLock::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Defines a binding in THIS frame (doesn't walk the parent chain)
    pub fn define(&self, name: String, value: Value) {
        self.bindings.write().insert(name, value);
    }

    /// Looks up a symbol in this frame, then parent frames recursively
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.read().get(name) {
            return Some(value.clone());
        }

        if let Some(ref parent) = self.parent {
            return parent.get(name);
        }

        None
    }

    /// Captures the environment as seen at closure-creation time.
    ///
    /// Every currently-visible binding is flattened into one frozen
    /// frame (nearer frames win), so later redefinitions of a captured
    /// name do not reach the closure. The parent stays the live chain:
    /// names that do not exist yet at capture time (recursive and
    /// mutually recursive definitions) still resolve once defined.
    pub fn snapshot(env: &Arc<Environment>) -> Arc<Environment> {
        let mut flat: HashMap<String, Value> = HashMap::new();
        let mut current = Some(Arc::clone(env));
        while let Some(frame) = current {
            for (name, value) in frame.bindings.read().iter() {
                flat.entry(name.clone()).or_insert_with(|| value.clone());
            }
            current = frame.parent.clone();
        }
        Arc::new(Environment {
            bindings: RwLock::new(flat),
            parent: Some(Arc::clone(env)),
        })
    }

    /// Overwrites an existing binding wherever it lives in the chain.
    /// Backs the `set!` form.
    pub fn set(&self, name: &str, value: Value) -> Result<(), EvalError> {
        {
            let mut bindings = self.bindings.write();
            if bindings.contains_key(name) {
                bindings.insert(name.to_string(), value);
                return Ok(());
            }
        }

        if let Some(ref parent) = self.parent {
            return parent.set(name, value);
        }

        Err(EvalError::UnboundSymbol(name.to_string()))
    }
}
