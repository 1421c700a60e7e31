/*!
 * Cancellation Tokens
 *
 * A token carries one thread's cancellation state: the request flag, the
 * enable state and the phase of the cancellation-point protocol. It is
 * associated with the calling context through [`CancelToken::enter`] and
 * read by every cancellation point on that thread.
 *
 * ## Protocol
 *
 * ```text
 * Running ──enter point──▶ InCancellationPoint ──kernel returns──▶ Running
 *                               │
 *                               └─request seen at entry or on EINTR──▶ Cancelled
 * ```
 *
 * The target stores its phase before loading the request flag; the
 * canceller stores the flag before loading the phase. Both use SeqCst, so
 * at least one side sees the other: either the entry check fires, or the
 * canceller finds the target inside the point and interrupts it.
 */

use super::interrupt;
use crate::core::{Result, TrampolineConfig, TrampolineError};
use nix::sys::pthread::{pthread_self, Pthread};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, instrument, warn};

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<CancelToken>> = const { RefCell::new(None) };
    static TARGETED: ThreadExit = const { ThreadExit(RefCell::new(Vec::new())) };
}

/// Marks every token targeting this thread dead when the thread exits
///
/// Thread-local destructors run before the thread becomes joinable, so a
/// token's `pthread_t` is never signalled after a join could have freed it.
struct ThreadExit(RefCell<Vec<Weak<TokenInner>>>);

impl ThreadExit {
    fn register(&self, inner: &Arc<TokenInner>) {
        let mut targeted = self.0.borrow_mut();
        targeted.retain(|weak| weak.strong_count() > 0);
        targeted.push(Arc::downgrade(inner));
    }
}

impl Drop for ThreadExit {
    fn drop(&mut self) {
        for inner in self.0.get_mut().drain(..).filter_map(|weak| weak.upgrade()) {
            *inner.alive.lock() = false;
        }
    }
}

/// Phase of the cancellation-point protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelPhase {
    /// Outside any cancellation point
    Running = 0,
    /// Between the entry check and the kernel's return
    InCancellationPoint = 1,
    /// Unwind started; the interrupted call never returns
    Cancelled = 2,
}

impl CancelPhase {
    #[inline(always)]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CancelPhase::Running,
            1 => CancelPhase::InCancellationPoint,
            _ => CancelPhase::Cancelled,
        }
    }
}

/// Unwind payload of a cancelled call
///
/// Never returned as a value by a wrapper; recovered with
/// [`run_cancellable`](super::run_cancellable) or
/// [`CancellableThread::join`](super::CancellableThread::join).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled {
    /// Token that was cancelled
    pub token: u64,
    /// Cancellation point that observed the request
    pub operation: &'static str,
}

/// What `cancel()` achieved before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Target was not in a cancellation point (or has cancellation
    /// disabled); it observes the request at its next one
    Pending,
    /// Target observed the request and is unwinding
    Observed,
    /// Target's call completed before it saw the interrupt; the request
    /// stays pending for its next cancellation point
    ///
    /// An interrupt already in flight when the call completed is still
    /// delivered, so the target's next interruptible syscall may see one
    /// `EINTR`. Cancellation points retry it; other callers must be ready
    /// for it as with any non-restarting handler.
    Completed,
}

struct TokenInner {
    id: u64,
    thread: Pthread,
    /// Cleared under the lock when the target thread exits
    alive: Mutex<bool>,
    requested: AtomicBool,
    enabled: AtomicBool,
    phase: AtomicU8,
}

/// Cancellation state of one thread
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("id", &self.inner.id)
            .field("requested", &self.is_requested())
            .field("enabled", &self.is_enabled())
            .field("phase", &self.phase())
            .finish()
    }
}

impl CancelToken {
    /// Create a token targeting the calling thread
    pub fn for_current_thread() -> Self {
        let inner = Arc::new(TokenInner {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            thread: pthread_self(),
            alive: Mutex::new(true),
            requested: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            phase: AtomicU8::new(CancelPhase::Running as u8),
        });
        // a thread already tearing down its locals is never signalled
        if TARGETED.try_with(|exit| exit.register(&inner)).is_err() {
            *inner.alive.lock() = false;
        }
        Self { inner }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    pub fn phase(&self) -> CancelPhase {
        CancelPhase::from_u8(self.inner.phase.load(Ordering::SeqCst))
    }

    /// Whether the target thread is still running
    pub fn is_alive(&self) -> bool {
        *self.inner.alive.lock()
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Associate this token with the calling context until the scope drops
    ///
    /// Scopes nest; dropping one restores the token that was current before.
    pub fn enter(&self) -> CancelScope {
        debug_assert_eq!(
            self.inner.thread,
            pthread_self(),
            "token entered on a thread it does not target"
        );
        let previous = CURRENT.with(|current| current.borrow_mut().replace(self.clone()));
        CancelScope {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Defer cancellation until the guard drops
    pub fn disable(&self) -> DisableGuard {
        let was_enabled = self.inner.enabled.swap(false, Ordering::SeqCst);
        DisableGuard {
            token: self.clone(),
            was_enabled,
        }
    }

    /// Set the request flag without interrupting the target
    ///
    /// Returns `true` if this was the first request.
    pub fn request(&self) -> bool {
        let first = !self.inner.requested.swap(true, Ordering::SeqCst);
        if first {
            debug!(token = self.inner.id, "cancellation requested");
        }
        first
    }

    /// Request cancellation and interrupt the target if it is blocked
    ///
    /// While the target sits in a cancellation point, the interrupt signal
    /// is re-sent every `kick_interval` until it leaves the point or
    /// `delivery_timeout` elapses. The signal is only sent while the target
    /// thread is alive and still inside the point; once it has exited the
    /// outcome is read from its final phase.
    #[instrument(skip(self, config), fields(token = self.inner.id), level = "debug")]
    pub fn cancel(&self, config: &TrampolineConfig) -> Result<Delivery> {
        self.request();
        interrupt::ensure_installed(config.interrupt_signal)?;

        let start = Instant::now();
        let mut kicks = 0u32;

        loop {
            match self.phase() {
                CancelPhase::Cancelled => {
                    debug!(kicks, "cancellation observed");
                    return Ok(Delivery::Observed);
                }
                CancelPhase::Running if kicks == 0 => return Ok(Delivery::Pending),
                CancelPhase::Running => return Ok(Delivery::Completed),
                CancelPhase::InCancellationPoint => {
                    if !self.is_enabled() {
                        return Ok(Delivery::Pending);
                    }
                    let waited = start.elapsed();
                    if waited >= config.delivery_timeout() {
                        warn!(
                            kicks,
                            waited_ms = waited.as_millis() as u64,
                            "cancellation not observed"
                        );
                        return Err(TrampolineError::DeliveryTimeout {
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    {
                        let alive = self.inner.alive.lock();
                        if !*alive {
                            return Ok(self.settled(kicks));
                        }
                        // the call may have returned since the phase was read
                        if self.phase() != CancelPhase::InCancellationPoint {
                            continue;
                        }
                        // SAFETY: the target clears `alive` under this lock
                        // before it exits, so the thread id is still valid
                        unsafe { interrupt::deliver(self.inner.thread, config.interrupt_signal)? };
                    }
                    kicks = kicks.saturating_add(1);
                    std::thread::sleep(config.kick_interval());
                }
            }
        }
    }

    /// Outcome for a target that can no longer be signalled
    fn settled(&self, kicks: u32) -> Delivery {
        match self.phase() {
            CancelPhase::Cancelled => Delivery::Observed,
            _ if kicks == 0 => Delivery::Pending,
            _ => Delivery::Completed,
        }
    }

    /// Request is set and cancellation is enabled
    #[inline(always)]
    pub(crate) fn pending(&self) -> bool {
        self.is_requested() && self.is_enabled()
    }

    /// Enter a cancellation point; the guard leaves it on normal return
    #[inline]
    pub(crate) fn begin(&self) -> PointGuard<'_> {
        self.inner
            .phase
            .store(CancelPhase::InCancellationPoint as u8, Ordering::SeqCst);
        PointGuard { token: self }
    }

    /// Act on an observed request: mark the token and unwind the stack
    #[cold]
    pub(crate) fn unwind(&self, operation: &'static str) -> ! {
        self.inner
            .phase
            .store(CancelPhase::Cancelled as u8, Ordering::SeqCst);
        debug!(token = self.inner.id, operation, "unwinding cancelled call");
        std::panic::resume_unwind(Box::new(Cancelled {
            token: self.inner.id,
            operation,
        }))
    }
}

/// Token of the calling context, if any
pub fn current() -> Option<CancelToken> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Explicit cancellation point without a kernel call
///
/// Unwinds if the context's token has an enabled, pending request.
pub fn test_cancel() {
    if let Some(token) = current() {
        if token.pending() {
            let _point = token.begin();
            token.unwind("test_cancel");
        }
    }
}

/// Restores the previous context token on drop
#[must_use = "the token is only current while the scope is alive"]
pub struct CancelScope {
    previous: Option<CancelToken>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Re-enables cancellation on drop, if it was enabled before
#[must_use = "cancellation is only deferred while the guard is alive"]
pub struct DisableGuard {
    token: CancelToken,
    was_enabled: bool,
}

impl Drop for DisableGuard {
    fn drop(&mut self) {
        if self.was_enabled {
            self.token.inner.enabled.store(true, Ordering::SeqCst);
        }
    }
}

/// Leaves the cancellation point unless the call was cancelled
pub(crate) struct PointGuard<'a> {
    token: &'a CancelToken,
}

impl Drop for PointGuard<'_> {
    fn drop(&mut self) {
        let _ = self.token.inner.phase.compare_exchange(
            CancelPhase::InCancellationPoint as u8,
            CancelPhase::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
