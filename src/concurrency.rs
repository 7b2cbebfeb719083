// ABOUTME: Shared runtime cells backing channels, atoms, and futures

//! The three shared-mutable value kinds. Channels wrap crossbeam queues;
//! `chan-close!` works by dropping the stored sender, after which
//! crossbeam drains the remaining buffer to receivers and then reports
//! disconnection. Atoms serialize updates under a mutex. Futures are
//! write-once cells completed by the thread a `go` form spawns.

use crate::error::EvalError;
use crate::value::Value;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};

/// A FIFO channel. Capacity 0 is a rendezvous: a send completes exactly
/// when a receive pairs with it.
#[derive(Debug)]
pub struct Channel {
    sender: Mutex<Option<Sender<Value>>>,
    receiver: Receiver<Value>,
}

impl Channel {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Channel {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Blocking send. The live sender is cloned out of the slot so the
    /// lock is never held across the (possibly blocking) send itself.
    pub fn send(&self, value: Value) -> Result<(), EvalError> {
        let sender = match &*self.sender.lock() {
            Some(tx) => tx.clone(),
            None => return Err(EvalError::SendOnClosed),
        };
        sender.send(value).map_err(|_| EvalError::SendOnClosed)
    }

    /// Blocking receive. `Nil` once the channel is closed and drained.
    pub fn recv(&self) -> Value {
        self.receiver.recv().unwrap_or(Value::Nil)
    }

    /// Non-blocking receive. `Nil` when nothing is immediately ready,
    /// whether the channel is merely empty or closed and drained.
    pub fn try_recv(&self) -> Value {
        match self.receiver.try_recv() {
            Ok(value) => value,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Value::Nil,
        }
    }

    /// Idempotent. Buffered values remain deliverable afterwards.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// A mutex-guarded mutable cell. `swap!` holds the lock across the user
/// update function so concurrent swaps serialize.
#[derive(Debug)]
pub struct AtomCell {
    value: Mutex<Value>,
}

impl AtomCell {
    pub fn new(value: Value) -> Self {
        AtomCell {
            value: Mutex::new(value),
        }
    }

    pub fn load(&self) -> Value {
        self.value.lock().clone()
    }

    pub fn store(&self, value: Value) {
        *self.value.lock() = value;
    }

    /// Applies `update` to the current value under the lock and stores
    /// the result. An error from the update function leaves the cell
    /// untouched; the lock is released either way.
    pub fn update<F>(&self, update: F) -> Result<Value, EvalError>
    where
        F: FnOnce(&Value) -> Result<Value, EvalError>,
    {
        let mut guard = self.value.lock();
        let next = update(&guard)?;
        *guard = next.clone();
        Ok(next)
    }
}

#[derive(Debug, Clone)]
pub enum FutureState {
    Pending,
    Done(Value),
    Failed(EvalError),
}

/// Write-once result cell of a spawned task.
#[derive(Debug)]
pub struct FutureCell {
    state: Mutex<FutureState>,
    done: Condvar,
}

impl FutureCell {
    pub fn new() -> Self {
        FutureCell {
            state: Mutex::new(FutureState::Pending),
            done: Condvar::new(),
        }
    }

    /// Transitions pending → done/failed at most once; later completions
    /// are ignored.
    pub fn complete(&self, result: Result<Value, EvalError>) {
        let mut state = self.state.lock();
        if matches!(*state, FutureState::Pending) {
            *state = match result {
                Ok(value) => FutureState::Done(value),
                Err(err) => FutureState::Failed(err),
            };
            self.done.notify_all();
        }
    }

    /// Blocks until the future is no longer pending, then yields the
    /// task's value or propagates its error.
    pub fn wait(&self) -> Result<Value, EvalError> {
        let mut state = self.state.lock();
        while matches!(*state, FutureState::Pending) {
            self.done.wait(&mut state);
        }
        match &*state {
            FutureState::Done(value) => Ok(value.clone()),
            FutureState::Failed(err) => Err(err.clone()),
            FutureState::Pending => unreachable!(),
        }
    }
}

impl Default for FutureCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_buffered_channel_fifo() {
        let ch = Channel::new(3);
        ch.send(Value::Number(1.0)).unwrap();
        ch.send(Value::Number(2.0)).unwrap();
        assert_eq!(ch.recv(), Value::Number(1.0));
        assert_eq!(ch.recv(), Value::Number(2.0));
    }

    #[test]
    fn test_closed_channel_drains_then_nil() {
        let ch = Channel::new(2);
        ch.send(Value::Number(10.0)).unwrap();
        ch.close();
        assert_eq!(ch.recv(), Value::Number(10.0));
        assert_eq!(ch.recv(), Value::Nil);
    }

    #[test]
    fn test_send_on_closed_is_error() {
        let ch = Channel::new(1);
        ch.close();
        ch.close(); // idempotent
        assert!(ch.is_closed());
        assert_eq!(ch.send(Value::Nil).unwrap_err(), EvalError::SendOnClosed);
    }

    #[test]
    fn test_try_recv_never_blocks() {
        let ch = Channel::new(1);
        assert_eq!(ch.try_recv(), Value::Nil);
        ch.send(Value::Bool(true)).unwrap();
        assert_eq!(ch.try_recv(), Value::Bool(true));
    }

    #[test]
    fn test_rendezvous_pairs_send_with_recv() {
        let ch = Arc::new(Channel::new(0));
        let sender = Arc::clone(&ch);
        let handle = thread::spawn(move || sender.send(Value::Number(7.0)));
        assert_eq!(ch.recv(), Value::Number(7.0));
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_atom_update_serializes() {
        let atom = Arc::new(AtomCell::new(Value::Number(0.0)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = Arc::clone(&atom);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    cell.update(|current| match current {
                        Value::Number(n) => Ok(Value::Number(n + 1.0)),
                        _ => unreachable!(),
                    })
                    .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(atom.load(), Value::Number(800.0));
    }

    #[test]
    fn test_atom_update_error_leaves_value() {
        let atom = AtomCell::new(Value::Number(5.0));
        let err = atom.update(|_| Err(EvalError::NotCallable)).unwrap_err();
        assert_eq!(err, EvalError::NotCallable);
        assert_eq!(atom.load(), Value::Number(5.0));
    }

    #[test]
    fn test_future_completes_once() {
        let cell = FutureCell::new();
        cell.complete(Ok(Value::Number(1.0)));
        cell.complete(Ok(Value::Number(2.0)));
        assert_eq!(cell.wait().unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_future_wait_blocks_until_complete() {
        let cell = Arc::new(FutureCell::new());
        let completer = Arc::clone(&cell);
        thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            completer.complete(Ok(Value::Bool(true)));
        });
        assert_eq!(cell.wait().unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_future_delivers_task_error() {
        let cell = FutureCell::new();
        cell.complete(Err(EvalError::DivisionByZero));
        assert_eq!(cell.wait().unwrap_err(), EvalError::DivisionByZero);
    }
}
