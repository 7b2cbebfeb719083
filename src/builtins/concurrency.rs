//! Concurrency built-ins: channels, atoms, and futures
//!
//! - **chan** - create a channel; `(chan)` is an unbuffered rendezvous,
//!   `(chan n)` a FIFO of capacity n
//! - **chan-send!** / **chan-recv!** / **chan-try-recv!** - blocking
//!   send, blocking receive, non-blocking receive
//! - **chan-close!** / **chan-closed?** - close (idempotent, buffer
//!   still drains) and inspect
//! - **atom** / **deref** / **reset!** / **swap!** - mutex-guarded cell
//! - **future-wait** - block on the future a `go` form returned
//!
//! Tasks themselves are spawned by the `go` special form; everything
//! here operates on already-evaluated values.

use crate::concurrency::{AtomCell, Channel, FutureCell};
use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_TWO, ARITY_ZERO_OR_ONE};
use crate::eval;
use crate::value::Value;
use std::sync::Arc;

fn as_channel<'a>(
    function: &str,
    value: &'a Value,
) -> Result<&'a Arc<Channel>, EvalError> {
    match value {
        Value::Channel(channel) => Ok(channel),
        other => Err(EvalError::type_error(function, "channel", other, 1)),
    }
}

fn as_atom<'a>(function: &str, value: &'a Value) -> Result<&'a Arc<AtomCell>, EvalError> {
    match value {
        Value::Atom(atom) => Ok(atom),
        other => Err(EvalError::type_error(function, "atom", other, 1)),
    }
}

/// Creates a channel: unbuffered without arguments, buffered with a
/// non-negative integer capacity.
pub fn builtin_chan(args: &[Value]) -> Result<Value, EvalError> {
    let capacity = match args {
        [] => 0,
        [Value::Number(n)] if *n >= 0.0 && n.fract() == 0.0 => *n as usize,
        [other] => {
            return Err(EvalError::type_error(
                "chan",
                "non-negative integer capacity",
                other,
                1,
            ))
        }
        _ => return Err(EvalError::arity_error("chan", ARITY_ZERO_OR_ONE, args.len())),
    };
    Ok(Value::Channel(Arc::new(Channel::new(capacity))))
}

/// Blocking send; true on success, an error once the channel is closed
pub fn builtin_chan_send(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("chan-send!", ARITY_TWO, args.len()));
    }
    let channel = as_channel("chan-send!", &args[0])?;
    channel.send(args[1].clone())?;
    Ok(Value::Bool(true))
}

/// Blocking receive; nil once the channel is closed and drained
pub fn builtin_chan_recv(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("chan-recv!", ARITY_ONE, args.len()));
    }
    Ok(as_channel("chan-recv!", &args[0])?.recv())
}

/// Non-blocking receive; nil when nothing is immediately available
pub fn builtin_chan_try_recv(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(
            "chan-try-recv!",
            ARITY_ONE,
            args.len(),
        ));
    }
    Ok(as_channel("chan-try-recv!", &args[0])?.try_recv())
}

/// Closes the channel. Idempotent; buffered values remain deliverable.
pub fn builtin_chan_close(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("chan-close!", ARITY_ONE, args.len()));
    }
    as_channel("chan-close!", &args[0])?.close();
    Ok(Value::Nil)
}

pub fn builtin_chan_closed_q(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(
            "chan-closed?",
            ARITY_ONE,
            args.len(),
        ));
    }
    Ok(Value::Bool(as_channel("chan-closed?", &args[0])?.is_closed()))
}

/// Creates a mutable cell holding the given value
pub fn builtin_atom(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("atom", ARITY_ONE, args.len()));
    }
    Ok(Value::Atom(Arc::new(AtomCell::new(args[0].clone()))))
}

/// Snapshot of the atom's current value
pub fn builtin_deref(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("deref", ARITY_ONE, args.len()));
    }
    Ok(as_atom("deref", &args[0])?.load())
}

/// Atomically stores a value, returning it
pub fn builtin_reset(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("reset!", ARITY_TWO, args.len()));
    }
    as_atom("reset!", &args[0])?.store(args[1].clone());
    Ok(args[1].clone())
}

/// Atomically replaces the value with `(f current)`. The cell's mutex
/// is held across the update function, so concurrent swaps serialize.
pub fn builtin_swap(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("swap!", ARITY_TWO, args.len()));
    }
    let atom = as_atom("swap!", &args[0])?;
    let update = &args[1];
    atom.update(|current| eval::apply_function(update, &[current.clone()]))
}

/// Blocks until the future resolves, yielding the task's value or
/// propagating its error
pub fn builtin_future_wait(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("future-wait", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Value::Future(future) => future.wait(),
        other => Err(EvalError::type_error("future-wait", "future", other, 1)),
    }
}

/// Register all concurrency builtins in the environment
pub fn register(env: &Arc<Environment>) {
    env.define("chan".to_string(), Value::Builtin(builtin_chan));
    env.define("chan-send!".to_string(), Value::Builtin(builtin_chan_send));
    env.define("chan-recv!".to_string(), Value::Builtin(builtin_chan_recv));
    env.define(
        "chan-try-recv!".to_string(),
        Value::Builtin(builtin_chan_try_recv),
    );
    env.define(
        "chan-close!".to_string(),
        Value::Builtin(builtin_chan_close),
    );
    env.define(
        "chan-closed?".to_string(),
        Value::Builtin(builtin_chan_closed_q),
    );
    env.define("atom".to_string(), Value::Builtin(builtin_atom));
    env.define("deref".to_string(), Value::Builtin(builtin_deref));
    env.define("reset!".to_string(), Value::Builtin(builtin_reset));
    env.define("swap!".to_string(), Value::Builtin(builtin_swap));
    env.define(
        "future-wait".to_string(),
        Value::Builtin(builtin_future_wait),
    );
}
