// ABOUTME: Tests for the module system: module/import/require/load semantics

use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tandem_lisp::builtins::register_builtins;
use tandem_lisp::env::Environment;
use tandem_lisp::error::EvalError;
use tandem_lisp::eval::eval_program;
use tandem_lisp::parser;
use tandem_lisp::value::Value;

fn setup() -> Arc<Environment> {
    let env = Environment::new();
    register_builtins(env.clone());
    env
}

fn eval_src(code: &str, env: &Arc<Environment>) -> Result<Value, EvalError> {
    let forms = parser::parse_program(code).expect("parse failure");
    eval_program(&forms, env)
}

/// Writes a module source file under the system temp directory and
/// returns its path. File names are unique per test to keep the
/// process-wide path cache honest.
fn write_module_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tandem_lisp_{}_{}.lisp", name, std::process::id()));
    fs::write(&path, contents).expect("failed to write module file");
    path
}

#[test]
#[serial]
fn test_module_import_scenario() {
    let env = setup();
    let src = r#"
        (module sq-mod (export sq) (defn sq [x] (* x x)))
        (import sq-mod)
        (sq 7)
    "#;
    assert_eq!(eval_src(src, &env).unwrap(), Value::Number(49.0));
}

#[test]
#[serial]
fn test_module_body_is_private() {
    let env = setup();
    let src = r#"
        (module priv-mod (export shown)
          (def hidden 1)
          (defn shown [] hidden))
        (import priv-mod)
        (shown)
    "#;
    assert_eq!(eval_src(src, &env).unwrap(), Value::Number(1.0));
    assert_eq!(
        eval_src("hidden", &env).unwrap_err(),
        EvalError::UnboundSymbol("hidden".to_string())
    );
}

#[test]
#[serial]
fn test_require_injects_all_exports() {
    let path = write_module_file(
        "req_all",
        r#"
            (module req-all (export add3 sub3)
              (defn add3 [x] (+ x 3))
              (defn sub3 [x] (- x 3)))
        "#,
    );

    let env = setup();
    let src = format!(
        "(require \"{}\") (list (add3 4) (sub3 4))",
        path.display()
    );
    assert_eq!(
        eval_src(&src, &env).unwrap(),
        Value::List(vec![Value::Number(7.0), Value::Number(1.0)])
    );
}

#[test]
#[serial]
fn test_require_as_registers_alias_only() {
    let path = write_module_file(
        "req_alias",
        r#"
            (module req-alias (export double)
              (defn double [x] (* x 2)))
        "#,
    );

    let env = setup();
    let src = format!("(require \"{}\" :as u) (u.double 21)", path.display());
    assert_eq!(eval_src(&src, &env).unwrap(), Value::Number(42.0));

    // Bare names are not injected under :as
    assert_eq!(
        eval_src("(double 2)", &env).unwrap_err(),
        EvalError::UnboundSymbol("double".to_string())
    );
}

#[test]
#[serial]
fn test_require_only_selected_names() {
    let path = write_module_file(
        "req_only",
        r#"
            (module req-only (export fst snd)
              (defn fst [] 1)
              (defn snd [] 2))
        "#,
    );

    let env = setup();
    let src = format!("(require \"{}\" :only (fst)) (fst)", path.display());
    assert_eq!(eval_src(&src, &env).unwrap(), Value::Number(1.0));
    assert_eq!(
        eval_src("(snd)", &env).unwrap_err(),
        EvalError::UnboundSymbol("snd".to_string())
    );
}

#[test]
#[serial]
fn test_require_only_unknown_name_is_bad_export() {
    let path = write_module_file(
        "req_unknown",
        r#"
            (module req-unknown (export real)
              (defn real [] 1))
        "#,
    );

    let env = setup();
    let src = format!("(require \"{}\" :only (ghost))", path.display());
    assert_eq!(
        eval_src(&src, &env).unwrap_err(),
        EvalError::BadExport {
            module: "req-unknown".to_string(),
            name: "ghost".to_string(),
        }
    );
}

#[test]
#[serial]
fn test_require_loads_at_most_once() {
    // The module body bumps its own atom; a second require must reuse
    // the cached module instead of re-running the body.
    let path = write_module_file(
        "req_counter",
        r#"
            (module req-counter (export hits)
              (def hits (atom 0))
              (swap! hits (fn [x] (+ x 1))))
        "#,
    );

    let env = setup();
    let first = format!("(require \"{}\") (def h1 hits) (deref hits)", path.display());
    assert_eq!(eval_src(&first, &env).unwrap(), Value::Number(1.0));

    let second = format!(
        "(require \"{}\") (list (deref hits) (= h1 hits))",
        path.display()
    );
    assert_eq!(
        eval_src(&second, &env).unwrap(),
        Value::List(vec![Value::Number(1.0), Value::Bool(true)])
    );
}

#[test]
#[serial]
fn test_concurrent_require_yields_one_load() {
    let path = write_module_file(
        "req_conc",
        r#"
            (module req-conc (export hits)
              (def hits (atom 0))
              (swap! hits (fn [x] (+ x 1))))
        "#,
    );

    let env = setup();
    let src = format!(
        r#"
            (def f1 (go (require "{0}")))
            (def f2 (go (require "{0}")))
            (future-wait f1)
            (future-wait f2)
            (import req-conc)
            (deref hits)
        "#,
        path.display()
    );
    assert_eq!(eval_src(&src, &env).unwrap(), Value::Number(1.0));
}

#[test]
#[serial]
fn test_require_missing_file() {
    let env = setup();
    let err = eval_src("(require \"/definitely/not/here.lisp\")", &env).unwrap_err();
    assert!(matches!(err, EvalError::IOError(_)));
}

#[test]
#[serial]
fn test_require_file_without_module_form() {
    let path = write_module_file("req_plain", "(def x 1)\n(+ x 1)\n");

    let env = setup();
    let src = format!("(require \"{}\")", path.display());
    assert!(matches!(
        eval_src(&src, &env).unwrap_err(),
        EvalError::IOError(_)
    ));
}

#[test]
#[serial]
fn test_load_evaluates_in_current_env() {
    let path = write_module_file("load_plain", "(def loaded-x 41)\n(+ loaded-x 1)\n");

    let env = setup();
    let src = format!("(load \"{}\")", path.display());
    assert_eq!(eval_src(&src, &env).unwrap(), Value::Number(42.0));
    // Definitions land in the calling environment
    assert_eq!(eval_src("loaded-x", &env).unwrap(), Value::Number(41.0));
}

#[test]
#[serial]
fn test_qualified_access_and_module_registry() {
    let env = setup();
    let src = r#"
        (module qual-mod (export triple) (defn triple [x] (* x 3)))
        (qual-mod.triple 5)
    "#;
    assert_eq!(eval_src(src, &env).unwrap(), Value::Number(15.0));

    // A dotted name that matches no module stays unbound
    assert_eq!(
        eval_src("(no-such.member 1)", &env).unwrap_err(),
        EvalError::UnboundSymbol("no-such.member".to_string())
    );
}
