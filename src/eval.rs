// ABOUTME: Evaluator module: trampoline core, special forms, application

use crate::ast::Expr;
use crate::concurrency::FutureCell;
use crate::env::Environment;
use crate::error::{
    EvalError, ARITY_AT_LEAST_THREE, ARITY_AT_LEAST_TWO, ARITY_ONE, ARITY_ONE_OR_TWO, ARITY_TWO,
    ARITY_TWO_OR_THREE,
};
use crate::macros;
use crate::modules;
use crate::value::Value;
use std::sync::Arc;
use std::thread;

/// One turn of the trampoline. Special forms with tail positions return
/// `Continue` instead of recursing, so tail calls reuse the loop frame.
enum Step {
    Done(Value),
    Continue(Expr, Arc<Environment>),
}

/// Heads that receive their arguments unevaluated. Kept apart from the
/// generic application path; everything else callable is an ordinary
/// binding in the environment.
#[derive(Clone, Copy)]
enum SpecialForm {
    Quote,
    If,
    And,
    Or,
    Not,
    Def,
    Set,
    Fn,
    Lambda,
    Defn,
    Defun,
    Do,
    Defmacro,
    Module,
    Import,
    Require,
    Load,
    Go,
}

fn special_form(name: &str) -> Option<SpecialForm> {
    use SpecialForm::*;
    Some(match name {
        "quote" => Quote,
        "if" => If,
        "and" => And,
        "or" => Or,
        "not" => Not,
        "def" | "define" => Def,
        "set!" => Set,
        "fn" => Fn,
        "lambda" => Lambda,
        "defn" => Defn,
        "defun" => Defun,
        "do" => Do,
        "defmacro" => Defmacro,
        "module" => Module,
        "import" => Import,
        "require" => Require,
        "load" => Load,
        "go" => Go,
        _ => return None,
    })
}

/// Main evaluation function with tail call optimization
pub fn eval(expr: &Expr, env: &Arc<Environment>) -> Result<Value, EvalError> {
    let mut expr = expr.clone();
    let mut env = Arc::clone(env);
    loop {
        match eval_step(expr, env)? {
            Step::Done(value) => return Ok(value),
            Step::Continue(next_expr, next_env) => {
                expr = next_expr;
                env = next_env;
            }
        }
    }
}

/// Evaluate a sequence of top-level forms, returning the last value.
pub fn eval_program(forms: &[Expr], env: &Arc<Environment>) -> Result<Value, EvalError> {
    let mut result = Value::Nil;
    for form in forms {
        result = eval(form, env)?;
    }
    Ok(result)
}

/// Apply an already-evaluated callee to already-evaluated arguments.
/// Entry point for builtins that invoke Lisp functions (`swap!`).
pub fn apply_function(callee: &Value, args: &[Value]) -> Result<Value, EvalError> {
    match apply(callee.clone(), args.to_vec())? {
        Step::Done(value) => Ok(value),
        Step::Continue(expr, env) => eval(&expr, &env),
    }
}

fn eval_step(expr: Expr, env: Arc<Environment>) -> Result<Step, EvalError> {
    match expr {
        // Self-evaluating nodes
        Expr::Number(n) => Ok(Step::Done(Value::Number(n))),
        Expr::BigNumber(n) => Ok(Step::Done(Value::BigNumber(n))),
        Expr::String(s) => Ok(Step::Done(Value::String(s))),
        Expr::Bool(b) => Ok(Step::Done(Value::Bool(b))),
        Expr::Keyword(k) => Ok(Step::Done(Value::Keyword(k))),
        Expr::Nil => Ok(Step::Done(Value::Nil)),

        Expr::Symbol(name) => lookup_symbol(&name, &env).map(Step::Done),

        // Brackets appear only as parameter lists of fn/defn/defmacro
        Expr::Bracket(_) => Err(EvalError::special_form(
            "[]",
            "bracket form is only valid as a parameter list",
        )),

        Expr::List(items) => eval_list(items, env),
    }
}

/// Symbol resolution: the environment chain first, then qualified module
/// access for names with a single dot (`alias.member`).
fn lookup_symbol(name: &str, env: &Arc<Environment>) -> Result<Value, EvalError> {
    if let Some(value) = env.get(name) {
        return Ok(value);
    }

    if let Some((alias, member)) = name.split_once('.') {
        if !alias.is_empty() && !member.is_empty() && !member.contains('.') {
            if let Some(module) = modules::lookup_module(alias) {
                if let Some(value) = module.exports.get(member) {
                    return Ok(value.clone());
                }
            }
        }
    }

    Err(EvalError::UnboundSymbol(name.to_string()))
}

fn eval_list(items: Vec<Expr>, env: Arc<Environment>) -> Result<Step, EvalError> {
    if items.is_empty() {
        return Err(EvalError::EmptyApplication);
    }

    if let Some(name) = items[0].as_symbol() {
        if let Some(form) = special_form(name) {
            let name = name.to_string();
            return eval_special(form, &name, &items[1..], env);
        }
    }

    let callee = eval(&items[0], &env)?;

    // A macro head expands with the unevaluated tail; the expansion
    // re-enters the loop in the caller's environment, in tail position.
    if let Value::Macro {
        params,
        body,
        env: macro_env,
    } = &callee
    {
        let name = items[0].as_symbol().unwrap_or("macro").to_string();
        let expansion = macros::expand(&name, params, body, macro_env, &items[1..])?;
        return Ok(Step::Continue(expansion, env));
    }

    // Eager left-to-right argument evaluation
    let mut args = Vec::with_capacity(items.len() - 1);
    for arg in &items[1..] {
        args.push(eval(arg, &env)?);
    }

    apply(callee, args)
}

fn apply(callee: Value, args: Vec<Value>) -> Result<Step, EvalError> {
    match callee {
        Value::Function {
            params,
            body,
            env: closure_env,
        } => {
            if params.len() != args.len() {
                return Err(EvalError::arity_error(
                    "function",
                    params.len().to_string(),
                    args.len(),
                ));
            }

            let frame = Environment::with_parent(closure_env);
            for (param, arg) in params.iter().zip(args) {
                frame.define(param.clone(), arg);
            }

            // Body forms before the last are effects; the last is the
            // tail position.
            let (last, init) = body.split_last().ok_or_else(|| {
                EvalError::special_form("fn", "function has an empty body")
            })?;
            for form in init {
                eval(form, &frame)?;
            }
            Ok(Step::Continue(last.clone(), frame))
        }

        Value::Builtin(func) => func(&args).map(Step::Done),

        Value::Keyword(name) => keyword_lookup(&name, &args).map(Step::Done),

        _ => Err(EvalError::NotCallable),
    }
}

/// Keywords in head position look themselves up in a hash map, with an
/// optional default for the missing case.
fn keyword_lookup(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let display = format!(":{}", name);
    if args.is_empty() || args.len() > 2 {
        return Err(EvalError::arity_error(&display, ARITY_ONE_OR_TWO, args.len()));
    }

    let map = match &args[0] {
        Value::HashMap(map) => map,
        other => return Err(EvalError::type_error(&display, "hash-map", other, 1)),
    };

    match map.get(&display) {
        Some(value) => Ok(value.clone()),
        None => Ok(args.get(1).cloned().unwrap_or(Value::Nil)),
    }
}

// ============================================================================
// Special forms
// ============================================================================

enum ParamStyle {
    Bracket,
    List,
    Either,
}

fn parse_params(form: &str, expr: &Expr, style: ParamStyle) -> Result<Vec<String>, EvalError> {
    let items = match (&style, expr) {
        (ParamStyle::Bracket, Expr::Bracket(items)) => items,
        (ParamStyle::List, Expr::List(items)) => items,
        (ParamStyle::Either, Expr::Bracket(items)) | (ParamStyle::Either, Expr::List(items)) => {
            items
        }
        (ParamStyle::Bracket, _) => {
            return Err(EvalError::special_form(
                form,
                "parameters must be a bracket form, e.g. [x y]",
            ))
        }
        _ => {
            return Err(EvalError::special_form(
                form,
                "parameters must be a list form, e.g. (x y)",
            ))
        }
    };

    items
        .iter()
        .map(|param| {
            param
                .as_symbol()
                .map(str::to_string)
                .ok_or_else(|| EvalError::special_form(form, "parameter names must be symbols"))
        })
        .collect()
}

fn eval_special(
    form: SpecialForm,
    name: &str,
    args: &[Expr],
    env: Arc<Environment>,
) -> Result<Step, EvalError> {
    match form {
        SpecialForm::Quote => {
            if args.len() != 1 {
                return Err(EvalError::arity_error(name, ARITY_ONE, args.len()));
            }
            Ok(Step::Done(macros::expr_to_value(&args[0])))
        }

        SpecialForm::If => {
            if args.len() < 2 || args.len() > 3 {
                return Err(EvalError::arity_error(name, ARITY_TWO_OR_THREE, args.len()));
            }
            let condition = eval(&args[0], &env)?;
            if condition.is_truthy() {
                Ok(Step::Continue(args[1].clone(), env))
            } else if let Some(else_branch) = args.get(2) {
                Ok(Step::Continue(else_branch.clone(), env))
            } else {
                Ok(Step::Done(Value::Nil))
            }
        }

        SpecialForm::And => {
            let mut last = Value::Bool(true);
            for arg in args {
                last = eval(arg, &env)?;
                if !last.is_truthy() {
                    return Ok(Step::Done(Value::Bool(false)));
                }
            }
            Ok(Step::Done(last))
        }

        SpecialForm::Or => {
            for arg in args {
                let value = eval(arg, &env)?;
                if value.is_truthy() {
                    return Ok(Step::Done(value));
                }
            }
            Ok(Step::Done(Value::Bool(false)))
        }

        SpecialForm::Not => {
            if args.len() != 1 {
                return Err(EvalError::arity_error(name, ARITY_ONE, args.len()));
            }
            let value = eval(&args[0], &env)?;
            Ok(Step::Done(Value::Bool(!value.is_truthy())))
        }

        SpecialForm::Def => {
            if args.len() != 2 {
                return Err(EvalError::arity_error(name, ARITY_TWO, args.len()));
            }
            let symbol = args[0]
                .as_symbol()
                .ok_or_else(|| EvalError::special_form(name, "first argument must be a symbol"))?;
            let value = eval(&args[1], &env)?;
            env.define(symbol.to_string(), value.clone());
            Ok(Step::Done(value))
        }

        SpecialForm::Set => {
            if args.len() != 2 {
                return Err(EvalError::arity_error(name, ARITY_TWO, args.len()));
            }
            let symbol = args[0]
                .as_symbol()
                .ok_or_else(|| EvalError::special_form(name, "first argument must be a symbol"))?;
            let value = eval(&args[1], &env)?;
            env.set(symbol, value.clone())?;
            Ok(Step::Done(value))
        }

        SpecialForm::Fn | SpecialForm::Lambda => {
            if args.len() < 2 {
                return Err(EvalError::arity_error(name, ARITY_AT_LEAST_TWO, args.len()));
            }
            let style = if matches!(form, SpecialForm::Fn) {
                ParamStyle::Bracket
            } else {
                ParamStyle::List
            };
            let params = parse_params(name, &args[0], style)?;
            Ok(Step::Done(Value::Function {
                params,
                body: args[1..].to_vec(),
                env: Environment::snapshot(&env),
            }))
        }

        SpecialForm::Defn | SpecialForm::Defun => {
            if args.len() < 3 {
                return Err(EvalError::arity_error(name, ARITY_AT_LEAST_THREE, args.len()));
            }
            let symbol = args[0]
                .as_symbol()
                .ok_or_else(|| EvalError::special_form(name, "function name must be a symbol"))?;
            let style = if matches!(form, SpecialForm::Defn) {
                ParamStyle::Bracket
            } else {
                ParamStyle::Either
            };
            let params = parse_params(name, &args[1], style)?;
            let function = Value::Function {
                params,
                body: args[2..].to_vec(),
                env: Environment::snapshot(&env),
            };
            env.define(symbol.to_string(), function.clone());
            Ok(Step::Done(function))
        }

        SpecialForm::Do => match args.split_last() {
            None => Ok(Step::Done(Value::Nil)),
            Some((last, init)) => {
                for arg in init {
                    eval(arg, &env)?;
                }
                Ok(Step::Continue(last.clone(), env))
            }
        },

        SpecialForm::Defmacro => {
            if args.len() < 3 {
                return Err(EvalError::arity_error(name, ARITY_AT_LEAST_THREE, args.len()));
            }
            let symbol = args[0]
                .as_symbol()
                .ok_or_else(|| EvalError::special_form(name, "macro name must be a symbol"))?;
            let params = parse_params(name, &args[1], ParamStyle::Bracket)?;
            let value = Value::Macro {
                params,
                body: args[2..].to_vec(),
                env: Environment::snapshot(&env),
            };
            env.define(symbol.to_string(), value.clone());
            Ok(Step::Done(value))
        }

        SpecialForm::Module => modules::eval_module(args, &env).map(Step::Done),
        SpecialForm::Import => modules::eval_import(args, &env).map(Step::Done),
        SpecialForm::Require => modules::eval_require(args, &env).map(Step::Done),
        SpecialForm::Load => modules::eval_load(args, &env).map(Step::Done),

        SpecialForm::Go => {
            if args.len() != 1 {
                return Err(EvalError::arity_error(name, ARITY_ONE, args.len()));
            }
            let future = Arc::new(FutureCell::new());
            let cell = Arc::clone(&future);
            let body = args[0].clone();
            let task_env = Arc::clone(&env);
            // The task inherits the current environment snapshot; its
            // result or error lands in the future.
            thread::spawn(move || {
                cell.complete(eval(&body, &task_env));
            });
            Ok(Step::Done(Value::Future(future)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;
    use crate::parser;

    fn run(src: &str) -> Result<Value, EvalError> {
        let env = Environment::new();
        register_builtins(env.clone());
        let forms = parser::parse_program(src).expect("parse failure");
        eval_program(&forms, &env)
    }

    #[test]
    fn test_self_evaluating_literals() {
        assert_eq!(run("42").unwrap(), Value::Number(42.0));
        assert_eq!(run("\"hi\"").unwrap(), Value::String("hi".to_string()));
        assert_eq!(run("#t").unwrap(), Value::Bool(true));
        assert_eq!(run(":k").unwrap(), Value::Keyword("k".to_string()));
        assert_eq!(run("nil").unwrap(), Value::Nil);
    }

    #[test]
    fn test_unbound_symbol() {
        assert_eq!(
            run("missing").unwrap_err(),
            EvalError::UnboundSymbol("missing".to_string())
        );
    }

    #[test]
    fn test_empty_application() {
        assert_eq!(run("()").unwrap_err(), EvalError::EmptyApplication);
    }

    #[test]
    fn test_bracket_outside_parameters_is_error() {
        assert!(matches!(
            run("[1 2]").unwrap_err(),
            EvalError::BadSpecialForm { .. }
        ));
    }

    #[test]
    fn test_def_returns_value_and_binds() {
        assert_eq!(run("(def x 7)").unwrap(), Value::Number(7.0));
        assert_eq!(run("(def x 7) (+ x 1)").unwrap(), Value::Number(8.0));
        assert_eq!(run("(define y 2) y").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_set_rebinds_existing() {
        let src = "(def x 1) (set! x (+ x 4)) x";
        assert_eq!(run(src).unwrap(), Value::Number(5.0));

        assert_eq!(
            run("(set! ghost 1)").unwrap_err(),
            EvalError::UnboundSymbol("ghost".to_string())
        );
    }

    #[test]
    fn test_if_branches_and_truthiness() {
        assert_eq!(run("(if #t 1 2)").unwrap(), Value::Number(1.0));
        assert_eq!(run("(if #f 1 2)").unwrap(), Value::Number(2.0));
        assert_eq!(run("(if #f 1)").unwrap(), Value::Nil);
        assert_eq!(run("(if nil 1 2)").unwrap(), Value::Number(2.0));
        // 0, "" and () are all truthy
        assert_eq!(run("(if 0 1 2)").unwrap(), Value::Number(1.0));
        assert_eq!(run("(if \"\" 1 2)").unwrap(), Value::Number(1.0));
        assert_eq!(run("(if (list) 1 2)").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert_eq!(run("(and)").unwrap(), Value::Bool(true));
        assert_eq!(run("(or)").unwrap(), Value::Bool(false));
        assert_eq!(run("(and 1 2 3)").unwrap(), Value::Number(3.0));
        assert_eq!(run("(and 1 #f 3)").unwrap(), Value::Bool(false));
        assert_eq!(run("(or #f nil 7)").unwrap(), Value::Number(7.0));
        assert_eq!(run("(or #f nil)").unwrap(), Value::Bool(false));
        // Short-circuit: the unbound symbol is never reached
        assert_eq!(run("(or 1 boom)").unwrap(), Value::Number(1.0));
        assert_eq!(run("(and #f boom)").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_not() {
        assert_eq!(run("(not nil)").unwrap(), Value::Bool(true));
        assert_eq!(run("(not 0)").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_do_sequences_and_returns_last() {
        assert_eq!(run("(do)").unwrap(), Value::Nil);
        assert_eq!(run("(do 1 2 3)").unwrap(), Value::Number(3.0));
        assert_eq!(run("(do (def x 5) (+ x 1))").unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_fn_requires_brackets_lambda_requires_list() {
        assert_eq!(run("((fn [x] (* x x)) 6)").unwrap(), Value::Number(36.0));
        assert_eq!(run("((lambda (x) (* x x)) 6)").unwrap(), Value::Number(36.0));
        assert!(matches!(
            run("(fn (x) x)").unwrap_err(),
            EvalError::BadSpecialForm { .. }
        ));
        assert!(matches!(
            run("(lambda [x] x)").unwrap_err(),
            EvalError::BadSpecialForm { .. }
        ));
    }

    #[test]
    fn test_defn_defun_parameter_styles() {
        assert_eq!(run("(defn sq [x] (* x x)) (sq 7)").unwrap(), Value::Number(49.0));
        assert_eq!(run("(defun sq2 (x) (* x x)) (sq2 7)").unwrap(), Value::Number(49.0));
        assert_eq!(run("(defun sq3 [x] (* x x)) (sq3 7)").unwrap(), Value::Number(49.0));
        assert!(matches!(
            run("(defn bad (x) x)").unwrap_err(),
            EvalError::BadSpecialForm { .. }
        ));
    }

    #[test]
    fn test_multi_form_function_body() {
        let src = "(def a (atom 0)) (defn touch [] (reset! a 9) 42) (touch)";
        assert_eq!(run(src).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn test_closure_captures_creation_environment() {
        // Rebinding a free variable after capture does not reach the closure
        let src = "(def n 10) (def f (fn [x] (+ x n))) (def n 99) (f 1)";
        assert_eq!(run(src).unwrap(), Value::Number(11.0));

        // Rebinding the symbol that named the function does not either
        let rebind = "(def f (fn [x] x)) (def g f) (def f (fn [x] 0)) (g 5)";
        assert_eq!(run(rebind).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_closure_over_call_frame() {
        let src = "(defn make-adder [n] (fn [x] (+ x n))) (def add5 (make-adder 5)) (add5 10)";
        assert_eq!(run(src).unwrap(), Value::Number(15.0));
    }

    #[test]
    fn test_function_arity_checked() {
        let err = run("((fn [x y] x) 1)").unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { .. }));
    }

    #[test]
    fn test_not_callable() {
        assert_eq!(run("(42 1)").unwrap_err(), EvalError::NotCallable);
    }

    #[test]
    fn test_quote_returns_data() {
        assert_eq!(
            run("(quote (a b))").unwrap(),
            Value::List(vec![
                Value::Symbol("a".to_string()),
                Value::Symbol("b".to_string())
            ])
        );
        assert_eq!(run("'x").unwrap(), Value::Symbol("x".to_string()));
    }

    #[test]
    fn test_tco_deep_recursion() {
        let src = r#"
            (defn sum [n acc]
              (if (= n 0) acc (sum (- n 1) (+ acc n))))
            (sum 10000 0)
        "#;
        assert_eq!(run(src).unwrap(), Value::Number(50005000.0));
    }

    #[test]
    fn test_tco_mutual_recursion() {
        let src = r#"
            (defn even? [n] (if (= n 0) #t (odd? (- n 1))))
            (defn odd? [n] (if (= n 0) #f (even? (- n 1))))
            (even? 10000)
        "#;
        assert_eq!(run(src).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_tco_through_do() {
        let src = r#"
            (defn countdown [n]
              (if (= n 0) 0 (do (countdown (- n 1)))))
            (countdown 10000)
        "#;
        assert_eq!(run(src).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_defmacro_and_expansion() {
        let src = r#"
            (defmacro when [c b] (list (quote if) c b (quote nil)))
            (when (> 3 1) 42)
        "#;
        assert_eq!(run(src).unwrap(), Value::Number(42.0));

        let miss = r#"
            (defmacro when [c b] (list (quote if) c b (quote nil)))
            (when (< 3 1) 42)
        "#;
        assert_eq!(run(miss).unwrap(), Value::Nil);
    }

    #[test]
    fn test_macro_arguments_are_not_evaluated() {
        // The macro discards its argument, so the unbound symbol inside
        // never evaluates.
        let src = r#"
            (defmacro ignore [x] (quote nil))
            (ignore (boom))
        "#;
        assert_eq!(run(src).unwrap(), Value::Nil);
    }

    #[test]
    fn test_macro_requires_bracket_params() {
        assert!(matches!(
            run("(defmacro m (x) x)").unwrap_err(),
            EvalError::BadSpecialForm { .. }
        ));
    }

    #[test]
    fn test_keyword_as_lookup_function() {
        let src = "(def h (hash-map :name \"A\" :age 30)) (:age h)";
        assert_eq!(run(src).unwrap(), Value::Number(30.0));

        let missing = "(def h (hash-map :a 1)) (:b h)";
        assert_eq!(run(missing).unwrap(), Value::Nil);

        let with_default = "(def h (hash-map :a 1)) (:b h 9)";
        assert_eq!(run(with_default).unwrap(), Value::Number(9.0));

        let not_a_map = "(:k 42)";
        assert!(matches!(
            run(not_a_map).unwrap_err(),
            EvalError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_go_returns_future() {
        let src = "(future-wait (go (+ 1 2)))";
        assert_eq!(run(src).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_error_in_argument_aborts_application() {
        let err = run("(+ 1 (car 2))").unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }
}
