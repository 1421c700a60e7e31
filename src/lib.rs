/*!
 * Syscall Trampoline Library
 *
 * Kernel call dispatch for a C library layer, with cancellation points
 * for blocking calls and socketcall multiplexing where the ABI needs it.
 */

pub mod cancel;
pub mod core;
pub mod monitoring;
pub mod syscalls;

// Re-exports
pub use crate::cancel::{CancelToken, Cancelled, Delivery, ThreadOutcome};
pub use crate::core::{Result, TrampolineConfig, TrampolineError};
pub use crate::monitoring::init_tracing;
pub use crate::syscalls::{Operation, SocketAddrBuf, Trampoline};
