/*!
 * Cancellable Threads
 * Threads whose whole body runs inside a cancellation context
 */

use super::token::{CancelToken, Cancelled, Delivery};
use crate::core::{Result, TrampolineConfig, TrampolineError};
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

/// Run `f`, turning a cancellation unwind into `Err(Cancelled)`
///
/// Any other panic keeps unwinding.
pub fn run_cancellable<T>(f: impl FnOnce() -> T) -> std::result::Result<T, Cancelled> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<Cancelled>() {
            Ok(cancelled) => Err(*cancelled),
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// How a cancellable thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome<T> {
    /// The body returned normally
    Completed(T),
    /// A cancellation point unwound the body
    Cancelled(Cancelled),
}

impl<T> ThreadOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ThreadOutcome::Cancelled(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            ThreadOutcome::Completed(value) => Some(value),
            ThreadOutcome::Cancelled(_) => None,
        }
    }
}

/// Handle to a thread spawned with [`spawn`]
pub struct CancellableThread<T> {
    token: CancelToken,
    handle: JoinHandle<std::result::Result<T, Cancelled>>,
}

impl<T> CancellableThread<T> {
    /// Token of the spawned thread
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Request cancellation and interrupt the thread if it is blocked
    pub fn cancel(&self, config: &TrampolineConfig) -> Result<Delivery> {
        self.token.cancel(config)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the thread; foreign panics are resumed on the caller
    pub fn join(self) -> ThreadOutcome<T> {
        match self.handle.join() {
            Ok(Ok(value)) => ThreadOutcome::Completed(value),
            Ok(Err(cancelled)) => ThreadOutcome::Cancelled(cancelled),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

/// Spawn a named thread whose body runs with its own token entered
pub fn spawn<F, T>(name: impl Into<String>, f: F) -> Result<CancellableThread<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (token_tx, token_rx) = flume::bounded(1);

    let handle = std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            let token = CancelToken::for_current_thread();
            let _scope = token.enter();
            let _ = token_tx.send(token.clone());
            run_cancellable(f)
        })
        .map_err(|e| TrampolineError::thread_spawn(e.to_string()))?;

    let token = token_rx
        .recv()
        .map_err(|_| TrampolineError::thread_spawn("thread exited before publishing its token"))?;

    Ok(CancellableThread { token, handle })
}
