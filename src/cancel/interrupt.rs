/*!
 * Interrupt Signal
 *
 * Cancellation reaches a thread blocked in the kernel through a signal whose
 * handler is installed without `SA_RESTART`: the handler itself does
 * nothing, but its delivery makes the blocked syscall return `EINTR`, after
 * which the cancellation point re-checks its token.
 */

use crate::core::{Result, TrampolineError};
use libc::c_int;
use nix::errno::Errno;
use nix::sys::pthread::Pthread;
use parking_lot::Mutex;
use std::{mem, ptr};
use tracing::debug;

/// Signals whose handler this process has already installed
static INSTALLED: Mutex<Vec<c_int>> = parking_lot::const_mutex(Vec::new());

extern "C" fn on_interrupt(_signal: c_int) {}

/// Install the no-op, non-restarting handler for `signal` once per process
pub fn ensure_installed(signal: c_int) -> Result<()> {
    let mut installed = INSTALLED.lock();
    if installed.contains(&signal) {
        return Ok(());
    }

    // SAFETY: `action` is fully initialized before use, and the handler is
    // async-signal-safe (it does nothing).
    let rc = unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = on_interrupt as extern "C" fn(c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signal, &action, ptr::null_mut())
    };
    if rc != 0 {
        return Err(TrampolineError::HandlerInstall {
            signal,
            errno: Errno::last(),
        });
    }

    installed.push(signal);
    debug!(signal, "interrupt handler installed");
    Ok(())
}

/// Whether the handler for `signal` has been installed by this process
pub fn is_installed(signal: c_int) -> bool {
    INSTALLED.lock().contains(&signal)
}

/// Send `signal` to one thread
///
/// # Safety
///
/// `thread` must not have exited.
pub(crate) unsafe fn deliver(thread: Pthread, signal: c_int) -> Result<()> {
    let rc = libc::pthread_kill(thread, signal);
    if rc != 0 {
        return Err(TrampolineError::Delivery {
            errno: Errno::from_raw(rc),
        });
    }
    Ok(())
}
