/*!
 * Syscall Invoker
 *
 * The single point where a descriptor becomes a kernel call. Two entries:
 * - `plain_call`: issue the call, return the raw result
 * - `cancellable_call`: the same, wrapped in the cancellation-point protocol
 *
 * Raw results follow the kernel convention: non-negative on success,
 * `-errno` on failure.
 */

use super::types::{encode_errno, RawCall};
use crate::cancel::CancelToken;
use crate::monitoring::CallSpan;
use libc::c_long;
use nix::errno::Errno;
use tracing::trace;

/// Kernel entry primitive
///
/// Closures `Fn(&RawCall) -> c_long` implement this, which is how tests
/// script kernel behavior.
pub trait Kernel: Send + Sync {
    /// Issue one kernel call and return its raw result
    ///
    /// # Safety
    ///
    /// Every pointer in `call.args` must be valid for whatever syscall
    /// `call.number` does with it, for the duration of the call.
    unsafe fn syscall(&self, call: &RawCall) -> c_long;
}

impl<F> Kernel for F
where
    F: Fn(&RawCall) -> c_long + Send + Sync,
{
    #[inline]
    unsafe fn syscall(&self, call: &RawCall) -> c_long {
        self(call)
    }
}

/// The running Linux kernel, through `libc::syscall`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinuxKernel;

impl Kernel for LinuxKernel {
    #[inline]
    unsafe fn syscall(&self, call: &RawCall) -> c_long {
        let [a, b, c, d, e, f] = call.args;
        let ret = libc::syscall(call.number, a, b, c, d, e, f);
        // libc folds the result into -1/errno; unfold it back
        if ret == -1 {
            encode_errno(Errno::last())
        } else {
            ret
        }
    }
}

/// Issue a call with no cancellation handling
///
/// # Safety
///
/// See [`Kernel::syscall`].
#[inline]
pub unsafe fn plain_call<K: Kernel + ?Sized>(kernel: &K, call: &RawCall) -> c_long {
    kernel.syscall(call)
}

/// Issue a call as a cancellation point
///
/// With a token, a pending request is checked before the kernel is
/// entered and again after every `EINTR`; either check unwinds instead of
/// returning. An `EINTR` without a pending request is retried, at most
/// `max_eintr_retries` times when a bound is set, after which the `EINTR`
/// is returned. Any other result, including success that raced with a
/// request, is returned as is.
///
/// # Safety
///
/// See [`Kernel::syscall`].
pub unsafe fn cancellable_call<K: Kernel + ?Sized>(
    kernel: &K,
    call: &RawCall,
    token: Option<&CancelToken>,
    max_eintr_retries: Option<u32>,
    operation: &'static str,
) -> c_long {
    let span = CallSpan::new(operation, token.map(CancelToken::id));
    let _entered = span.enter();

    let _point = token.map(CancelToken::begin);
    if let Some(token) = token {
        if token.pending() {
            span.record_cancelled();
            token.unwind(operation);
        }
    }

    let interrupted = encode_errno(Errno::EINTR);
    let mut retries = 0u32;

    loop {
        let ret = kernel.syscall(call);
        if ret != interrupted {
            span.record_retries(retries);
            span.record_result(ret);
            return ret;
        }

        if let Some(token) = token {
            if token.pending() {
                span.record_retries(retries);
                span.record_cancelled();
                token.unwind(operation);
            }
        }

        if max_eintr_retries.is_some_and(|max| retries >= max) {
            span.record_retries(retries);
            span.record_result(ret);
            return ret;
        }

        retries += 1;
        trace!(operation, retries, "EINTR without pending cancellation, retrying");
    }
}
