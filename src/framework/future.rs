//! One-shot results of queued tasks.

use std::fmt;

use crate::errors::{AsterError, Result};

/// Handle to the result of a queued task.
///
/// If the task is dropped before it runs (the framework was destroyed),
/// the future resolves to [`AsterError::Cancelled`].
pub struct TaskFuture<T> {
    receiver: flume::Receiver<Result<T>>,
}

/// Completing side of a [`TaskFuture`].
pub(crate) struct TaskPromise<T> {
    sender: flume::Sender<Result<T>>,
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture").field("done", &self.is_done()).finish()
    }
}

impl<T> TaskPromise<T> {
    pub(crate) fn complete(self, result: Result<T>) {
        // The future may have been dropped; nobody is waiting then.
        let _ = self.sender.send(result);
    }
}

impl<T> TaskFuture<T> {
    pub(crate) fn channel() -> (TaskPromise<T>, TaskFuture<T>) {
        let (sender, receiver) = flume::bounded(1);
        (TaskPromise { sender }, TaskFuture { receiver })
    }

    /// An already completed future.
    #[must_use]
    pub fn ready(result: Result<T>) -> Self {
        let (promise, future) = Self::channel();
        promise.complete(result);
        future
    }

    /// A future whose task will never run.
    #[must_use]
    pub fn cancelled() -> Self {
        let (_, future) = Self::channel();
        future
    }

    /// Whether `get` would return without blocking.
    #[must_use]
    pub fn is_done(&self) -> bool {
        !self.receiver.is_empty() || self.receiver.is_disconnected()
    }

    /// Blocks until the task has run and returns its result.
    ///
    /// Calling this from a task for a future of the same group deadlocks:
    /// the group's worker is the one waiting.
    pub fn get(self) -> Result<T> {
        self.receiver.recv().unwrap_or(Err(AsterError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_promise_cancels() {
        let (promise, future) = TaskFuture::<u32>::channel();
        assert!(!future.is_done());
        drop(promise);
        assert!(future.is_done());
        assert!(matches!(future.get(), Err(AsterError::Cancelled)));
    }

    #[test]
    fn completed_promise_delivers() {
        let (promise, future) = TaskFuture::channel();
        let waiter = std::thread::spawn(move || future.get());
        promise.complete(Ok(7));
        assert_eq!(waiter.join().unwrap().unwrap(), 7);
        assert!(matches!(TaskFuture::<()>::cancelled().get(), Err(AsterError::Cancelled)));
    }
}
