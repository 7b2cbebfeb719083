// ABOUTME: Module values, the process-wide registry, and require/load

//! Modules are frozen maps of exported bindings. The registry is
//! process-wide and distinct from the symbol table, so a module and a
//! variable may share a name. Loading is at-most-once per canonical
//! path: concurrent `require` calls for the same file observe the same
//! cached module and the file's body runs exactly once.

use crate::ast::Expr;
use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE, ARITY_AT_LEAST_TWO, ARITY_ONE};
use crate::eval;
use crate::parser;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A named, frozen collection of exported bindings.
#[derive(Debug)]
pub struct ModuleValue {
    pub name: String,
    pub exports: HashMap<String, Value>,
}

#[derive(Default)]
struct Registry {
    /// Declared names and `require :as` aliases.
    by_name: HashMap<String, Arc<ModuleValue>>,
    /// Canonical source paths, for require's load-once cache.
    by_path: HashMap<PathBuf, Arc<ModuleValue>>,
}

static REGISTRY: Mutex<Option<Registry>> = Mutex::new(None);

/// Serializes first loads so a file's body never runs twice even when
/// two tasks `require` it at the same moment.
static LOAD_LOCK: Mutex<()> = Mutex::new(());

fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let mut guard = REGISTRY.lock();
    f(guard.get_or_insert_with(Registry::default))
}

pub fn register_module(module: Arc<ModuleValue>) {
    with_registry(|reg| {
        reg.by_name.insert(module.name.clone(), module);
    });
}

pub fn register_alias(alias: &str, module: Arc<ModuleValue>) {
    with_registry(|reg| {
        reg.by_name.insert(alias.to_string(), module);
    });
}

pub fn lookup_module(name: &str) -> Option<Arc<ModuleValue>> {
    with_registry(|reg| reg.by_name.get(name).cloned())
}

fn cached_by_path(path: &Path) -> Option<Arc<ModuleValue>> {
    with_registry(|reg| reg.by_path.get(path).cloned())
}

/// `(module NAME (export S1 S2 ...) body...)`
pub fn eval_module(args: &[Expr], env: &Arc<Environment>) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity_error("module", ARITY_AT_LEAST_TWO, args.len()));
    }

    let name = args[0]
        .as_symbol()
        .ok_or_else(|| EvalError::special_form("module", "module name must be a symbol"))?;

    let export_names = parse_export_list(&args[1])?;

    // The body runs in a fresh child environment; only the declared
    // exports escape it.
    let module_env = Environment::with_parent(Arc::clone(env));
    for form in &args[2..] {
        eval::eval(form, &module_env)?;
    }

    let mut exports = HashMap::new();
    for export in export_names {
        let value = module_env.get(&export).ok_or_else(|| EvalError::BadExport {
            module: name.to_string(),
            name: export.clone(),
        })?;
        exports.insert(export, value);
    }

    let module = Arc::new(ModuleValue {
        name: name.to_string(),
        exports,
    });
    register_module(Arc::clone(&module));
    Ok(Value::Module(module))
}

fn parse_export_list(expr: &Expr) -> Result<Vec<String>, EvalError> {
    let items = match expr {
        Expr::List(items) if items.first().and_then(Expr::as_symbol) == Some("export") => items,
        _ => {
            return Err(EvalError::special_form(
                "module",
                "second argument must be an (export ...) list",
            ))
        }
    };

    items[1..]
        .iter()
        .map(|item| {
            item.as_symbol().map(str::to_string).ok_or_else(|| {
                EvalError::special_form("module", "export names must be symbols")
            })
        })
        .collect()
}

/// `(import NAME)`: copy every export into the current environment
/// under its bare name.
pub fn eval_import(args: &[Expr], env: &Arc<Environment>) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("import", ARITY_ONE, args.len()));
    }

    let name = args[0]
        .as_symbol()
        .ok_or_else(|| EvalError::special_form("import", "module name must be a symbol"))?;

    let module =
        lookup_module(name).ok_or_else(|| EvalError::ModuleNotFound(name.to_string()))?;

    for (export, value) in &module.exports {
        env.define(export.clone(), value.clone());
    }
    Ok(Value::Module(module))
}

/// `(require "PATH" [:as ALIAS] [:only (S1 S2)])`
pub fn eval_require(args: &[Expr], env: &Arc<Environment>) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error(
            "require",
            ARITY_AT_LEAST_ONE,
            args.len(),
        ));
    }

    let path = match eval::eval(&args[0], env)? {
        Value::String(path) => path,
        other => return Err(EvalError::type_error("require", "string path", &other, 1)),
    };

    let options = parse_require_options(&args[1..])?;
    let module = load_module(&path)?;

    match options {
        RequireOptions::All => {
            for (export, value) in &module.exports {
                env.define(export.clone(), value.clone());
            }
        }
        RequireOptions::Alias(alias) => {
            // Alias-only: qualified access, no bare names injected
            register_alias(&alias, Arc::clone(&module));
        }
        RequireOptions::Only(names) => {
            for name in names {
                let value = module.exports.get(&name).ok_or_else(|| EvalError::BadExport {
                    module: module.name.clone(),
                    name: name.clone(),
                })?;
                env.define(name, value.clone());
            }
        }
    }

    Ok(Value::Module(module))
}

enum RequireOptions {
    All,
    Alias(String),
    Only(Vec<String>),
}

fn parse_require_options(args: &[Expr]) -> Result<RequireOptions, EvalError> {
    match args {
        [] => Ok(RequireOptions::All),
        [Expr::Keyword(k), Expr::Symbol(alias)] if k == "as" => {
            Ok(RequireOptions::Alias(alias.clone()))
        }
        [Expr::Keyword(k), Expr::List(names)] if k == "only" => {
            let names = names
                .iter()
                .map(|name| {
                    name.as_symbol().map(str::to_string).ok_or_else(|| {
                        EvalError::special_form("require", ":only names must be symbols")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RequireOptions::Only(names))
        }
        _ => Err(EvalError::special_form(
            "require",
            "options are :as ALIAS or :only (name ...)",
        )),
    }
}

/// Loads a module file, consulting and filling the path cache.
fn load_module(path: &str) -> Result<Arc<ModuleValue>, EvalError> {
    let canonical = fs::canonicalize(path)
        .map_err(|err| EvalError::IOError(format!("{}: {}", path, err)))?;

    if let Some(module) = cached_by_path(&canonical) {
        return Ok(module);
    }

    let _loading = LOAD_LOCK.lock();
    // Another task may have finished the load while we waited
    if let Some(module) = cached_by_path(&canonical) {
        return Ok(module);
    }

    let source = fs::read_to_string(&canonical)
        .map_err(|err| EvalError::IOError(format!("{}: {}", path, err)))?;
    let forms = parser::parse_program(&source)
        .map_err(|err| EvalError::IOError(format!("{}: {}", path, err)))?;

    // Module files evaluate against a fresh root; top-level forms other
    // than the module form run as setup.
    let file_env = Environment::new();
    crate::builtins::register_builtins(file_env.clone());

    let mut module = None;
    for form in &forms {
        if let Value::Module(m) = eval::eval(form, &file_env)? {
            module = Some(m);
        }
    }

    let module = module.ok_or_else(|| {
        EvalError::IOError(format!("{}: file does not define a module", path))
    })?;

    with_registry(|reg| {
        reg.by_path.insert(canonical, Arc::clone(&module));
    });
    Ok(module)
}

/// `(load "PATH")`: evaluate every top-level form of the file in the
/// current environment, returning the last value.
pub fn eval_load(args: &[Expr], env: &Arc<Environment>) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("load", ARITY_ONE, args.len()));
    }

    let path = match eval::eval(&args[0], env)? {
        Value::String(path) => path,
        other => return Err(EvalError::type_error("load", "string path", &other, 1)),
    };

    let source = fs::read_to_string(&path)
        .map_err(|err| EvalError::IOError(format!("{}: {}", path, err)))?;
    let forms = parser::parse_program(&source)
        .map_err(|err| EvalError::IOError(format!("{}: {}", path, err)))?;

    eval::eval_program(&forms, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;

    fn run(src: &str) -> Result<Value, EvalError> {
        let env = Environment::new();
        register_builtins(env.clone());
        let forms = parser::parse_program(src).expect("parse failure");
        eval::eval_program(&forms, &env)
    }

    #[test]
    fn test_module_exports_only_declared_names() {
        let src = r#"
            (module mod-hidden (export visible)
              (def secret 1)
              (defn visible [] 2))
            (import mod-hidden)
            (visible)
        "#;
        assert_eq!(run(src).unwrap(), Value::Number(2.0));

        let leak = r#"
            (module mod-hidden2 (export shown)
              (def secret 1)
              (defn shown [] 2))
            (import mod-hidden2)
            secret
        "#;
        assert_eq!(
            run(leak).unwrap_err(),
            EvalError::UnboundSymbol("secret".to_string())
        );
    }

    #[test]
    fn test_missing_export_is_bad_export() {
        let src = "(module mod-missing (export ghost) (def real 1))";
        assert_eq!(
            run(src).unwrap_err(),
            EvalError::BadExport {
                module: "mod-missing".to_string(),
                name: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_module_display_and_value() {
        let src = "(module mod-shown (export x) (def x 1))";
        let value = run(src).unwrap();
        assert_eq!(value.to_string(), "#<module:mod-shown>");
    }

    #[test]
    fn test_import_unknown_module() {
        assert_eq!(
            run("(import never-defined)").unwrap_err(),
            EvalError::ModuleNotFound("never-defined".to_string())
        );
    }

    #[test]
    fn test_qualified_access_through_registry() {
        let src = r#"
            (module mod-qualified (export double) (defn double [x] (* x 2)))
            (mod-qualified.double 21)
        "#;
        assert_eq!(run(src).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn test_require_missing_file_is_io_error() {
        let err = run("(require \"/no/such/file.lisp\")").unwrap_err();
        assert!(matches!(err, EvalError::IOError(_)));
    }

    #[test]
    fn test_module_and_variable_namespaces_are_distinct() {
        let src = r#"
            (module mod-ns (export f) (defn f [] 1))
            (def mod-ns 99)
            (mod-ns.f)
        "#;
        assert_eq!(run(src).unwrap(), Value::Number(1.0));
    }
}
