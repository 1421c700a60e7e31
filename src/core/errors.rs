/*!
 * Error Types
 * Management-surface errors with thiserror and miette support
 *
 * The syscall path itself never produces these: kernel failures travel as
 * `nix::errno::Errno`, unchanged, and cancellation is an unwind.
 */

use libc::c_int;
use miette::Diagnostic;
use nix::errno::Errno;
use thiserror::Error;

/// Errors raised while configuring or driving cancellation
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum TrampolineError {
    #[error("Failed to install interrupt handler for signal {signal}: {errno}")]
    #[diagnostic(
        code(cancel::handler_install),
        help("The interrupt signal must be catchable. Pick a real-time signal via TRAMPOLINE_CONFIG.")
    )]
    HandlerInstall { signal: c_int, errno: Errno },

    #[error("Failed to deliver interrupt signal: {errno}")]
    #[diagnostic(
        code(cancel::delivery),
        help("The target thread may already have exited.")
    )]
    Delivery { errno: Errno },

    #[error("Cancellation not observed after {waited_ms}ms")]
    #[diagnostic(
        code(cancel::delivery_timeout),
        help("The target thread probably blocks the interrupt signal. The request stays pending.")
    )]
    DeliveryTimeout { waited_ms: u64 },

    #[error("Failed to spawn cancellable thread: {0}")]
    #[diagnostic(code(cancel::thread_spawn))]
    ThreadSpawn(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("TRAMPOLINE_CONFIG must hold a JSON object with TrampolineConfig fields.")
    )]
    Config(String),
}

impl TrampolineError {
    /// Create a configuration error
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a thread spawn error
    #[inline]
    pub fn thread_spawn(msg: impl Into<String>) -> Self {
        Self::ThreadSpawn(msg.into())
    }
}

/// Result alias for the management surface
pub type Result<T, E = TrampolineError> = std::result::Result<T, E>;
