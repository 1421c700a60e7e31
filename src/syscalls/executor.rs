/*!
 * Trampoline Executor
 * Routes typed operations to the kernel through the right invoker
 */

use super::classification::CallClass;
use super::invoker::{self, Kernel, LinuxKernel};
use super::socketcall::{native_socket_abi, NativeSocketAbi, SocketAbi};
use super::types::{ArgBlock, Operation, RawCall, Route};
use crate::cancel;
use crate::core::TrampolineConfig;
use libc::c_long;
use std::sync::OnceLock;
use tracing::{trace, warn};

static NATIVE: OnceLock<Trampoline> = OnceLock::new();

/// Dispatcher from operation descriptors to kernel calls
///
/// Holds the kernel entry, the socket call strategy and the configuration;
/// carries no per-call state, so one instance serves every thread.
pub struct Trampoline<K = LinuxKernel, S = NativeSocketAbi> {
    kernel: K,
    socket_abi: S,
    config: TrampolineConfig,
}

impl Trampoline {
    /// Process-wide trampoline over the running kernel
    ///
    /// Configured from `TRAMPOLINE_CONFIG` on first use; a malformed value
    /// is logged and replaced by defaults.
    pub fn native() -> &'static Trampoline {
        NATIVE.get_or_init(|| {
            let config = TrampolineConfig::from_env().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring trampoline configuration");
                TrampolineConfig::default()
            });
            Trampoline::with_parts(LinuxKernel, native_socket_abi(), config)
        })
    }
}

impl<K: Kernel, S: SocketAbi> Trampoline<K, S> {
    pub fn with_parts(kernel: K, socket_abi: S, config: TrampolineConfig) -> Self {
        Self {
            kernel,
            socket_abi,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrampolineConfig {
        &self.config
    }

    #[inline]
    pub fn socket_abi(&self) -> &S {
        &self.socket_abi
    }

    /// Issue one operation and return the raw kernel result
    ///
    /// Cancellation points read the calling context's token; without one
    /// they still get the EINTR retry policy.
    ///
    /// # Safety
    ///
    /// Pointer arguments inside `op` must be valid for the operation, as the
    /// corresponding C function would require.
    pub unsafe fn invoke(&self, op: &Operation) -> c_long {
        // must outlive the kernel call: multiplexed calls point into it
        let mut block = ArgBlock::default();
        let call = match op.route() {
            Route::Direct(number) => RawCall::new(number, op.words()),
            Route::Socket(socket_op) => self.socket_abi.lower(socket_op, op.words(), &mut block),
        };

        let ret = match op.classify() {
            CallClass::Plain => invoker::plain_call(&self.kernel, &call),
            CallClass::CancellationPoint => {
                let token = cancel::current();
                invoker::cancellable_call(
                    &self.kernel,
                    &call,
                    token.as_ref(),
                    self.config.max_eintr_retries,
                    op.name(),
                )
            }
        };

        trace!(operation = op.name(), number = call.number, ret, "syscall returned");
        ret
    }
}
