//! Console output: print, println
//!
//! Strings print bare; every other value prints its readable form.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::Value;
use std::sync::Arc;

fn render(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prints all arguments separated by spaces, without a trailing newline
pub fn builtin_print(args: &[Value]) -> Result<Value, EvalError> {
    print!("{}", render(args));
    Ok(Value::Nil)
}

/// Prints all arguments separated by spaces, followed by a newline
pub fn builtin_println(args: &[Value]) -> Result<Value, EvalError> {
    println!("{}", render(args));
    Ok(Value::Nil)
}

/// Register console builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("print".to_string(), Value::Builtin(builtin_print));
    env.define("println".to_string(), Value::Builtin(builtin_println));
}
