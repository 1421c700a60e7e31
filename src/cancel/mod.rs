/*!
 * Cancellation Module
 *
 * Thread cancellation for blocking calls:
 * - Token: per-thread request, enable state and protocol phase
 * - Interrupt: the non-restarting signal that knocks a thread out of the kernel
 * - Thread: run-to-outcome helpers and cancellable threads
 */

mod interrupt;
mod thread;
mod token;

pub use interrupt::{ensure_installed, is_installed};
pub use thread::{run_cancellable, spawn, CancellableThread, ThreadOutcome};
pub use token::{
    current, test_cancel, CancelPhase, CancelScope, CancelToken, Cancelled, Delivery,
    DisableGuard,
};
