// ABOUTME: Quote-boundary conversions and macro expansion

//! AST nodes and runtime values stay distinct tagged types; they cross
//! over in exactly two places. `quote` turns an expression into data via
//! [`expr_to_value`], and a macro's result turns back into syntax via
//! [`value_to_expr`] before the evaluator continues with the expansion.

use crate::ast::Expr;
use crate::env::Environment;
use crate::error::EvalError;
use crate::eval;
use crate::value::Value;
use std::sync::Arc;

/// Quoted syntax as data: lists become `List` values, symbols become
/// `Symbol` values, literals carry over. Brackets quote as plain lists.
pub fn expr_to_value(expr: &Expr) -> Value {
    match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::BigNumber(n) => Value::BigNumber(n.clone()),
        Expr::String(s) => Value::String(s.clone()),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Keyword(k) => Value::Keyword(k.clone()),
        Expr::Symbol(s) => Value::Symbol(s.clone()),
        Expr::List(items) | Expr::Bracket(items) => {
            Value::List(items.iter().map(expr_to_value).collect())
        }
        Expr::Nil => Value::Nil,
    }
}

/// The symmetric conversion for macro output. Values with no syntactic
/// form (functions, channels, maps, ...) cannot appear in an expansion.
pub fn value_to_expr(value: &Value) -> Result<Expr, EvalError> {
    match value {
        Value::Number(n) => Ok(Expr::Number(*n)),
        Value::BigNumber(n) => Ok(Expr::BigNumber(n.clone())),
        Value::String(s) => Ok(Expr::String(s.clone())),
        Value::Bool(b) => Ok(Expr::Bool(*b)),
        Value::Keyword(k) => Ok(Expr::Keyword(k.clone())),
        Value::Symbol(s) => Ok(Expr::Symbol(s.clone())),
        Value::List(items) => Ok(Expr::List(
            items.iter().map(value_to_expr).collect::<Result<_, _>>()?,
        )),
        Value::Nil => Ok(Expr::Nil),
        other => Err(EvalError::special_form(
            "defmacro",
            format!(
                "macro expansion contains a {} value with no syntactic form",
                other.type_name()
            ),
        )),
    }
}

/// Expands one macro call: binds parameters to the unevaluated argument
/// ASTs (as quoted data), evaluates the body in a child of the macro's
/// definition environment, and converts the result back to syntax.
pub fn expand(
    name: &str,
    params: &[String],
    body: &[Expr],
    definition_env: &Arc<Environment>,
    args: &[Expr],
) -> Result<Expr, EvalError> {
    if params.len() != args.len() {
        return Err(EvalError::arity_error(
            name,
            params.len().to_string(),
            args.len(),
        ));
    }

    let frame = Environment::with_parent(Arc::clone(definition_env));
    for (param, arg) in params.iter().zip(args) {
        frame.define(param.clone(), expr_to_value(arg));
    }

    let mut expansion = Value::Nil;
    for form in body {
        expansion = eval::eval(form, &frame)?;
    }
    value_to_expr(&expansion)
}
