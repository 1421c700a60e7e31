/*!
 * Kernel ABI Limits and Constants
 *
 * Centralized location for the numbers the trampoline hands to the kernel
 * verbatim, and the defaults for cancellation delivery.
 *
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 * - Values tuned for delivery latency are marked with [PERF]
 */

use libc::c_long;

// =============================================================================
// SIGNAL SETS
// =============================================================================

/// Highest signal number plus one, as the kernel counts them
/// [LINUX-COMPAT] MIPS kernels carry 128 signals, everyone else 64
#[cfg(any(target_arch = "mips", target_arch = "mips64"))]
pub const KERNEL_NSIG: usize = 129;

/// Highest signal number plus one, as the kernel counts them
/// [LINUX-COMPAT] MIPS kernels carry 128 signals, everyone else 64
#[cfg(not(any(target_arch = "mips", target_arch = "mips64")))]
pub const KERNEL_NSIG: usize = 65;

/// Byte length of the kernel's signal set
///
/// This is what `signalfd4` expects as its size argument. It is much smaller
/// than `size_of::<sigset_t>()` on glibc (128 bytes), and the kernel rejects
/// any other value with `EINVAL`.
pub const KERNEL_SIGSET_BYTES: usize = KERNEL_NSIG / 8;

// =============================================================================
// SOCKETCALL MULTIPLEX TAGS
// =============================================================================

/// [LINUX-COMPAT] `SYS_SOCKET` in `linux/net.h`
pub const SOCKETCALL_SOCKET: c_long = 1;

/// [LINUX-COMPAT] `SYS_SOCKETPAIR` in `linux/net.h`
pub const SOCKETCALL_SOCKETPAIR: c_long = 8;

/// [LINUX-COMPAT] `SYS_SENDMSG` in `linux/net.h`
pub const SOCKETCALL_SENDMSG: c_long = 16;

/// [LINUX-COMPAT] `SYS_ACCEPT4` in `linux/net.h`
pub const SOCKETCALL_ACCEPT4: c_long = 18;

/// Number of argument words every syscall descriptor carries
pub const SYSCALL_MAX_ARGS: usize = 6;

/// Errors are reported as `-errno` in the range `-4095..=-1`
/// [LINUX-COMPAT] Matches the kernel's `MAX_ERRNO`
pub const MAX_ERRNO: c_long = 4095;

// =============================================================================
// CANCELLATION DELIVERY
// =============================================================================

/// Interval between interrupt signals while the target sits in a cancellation point (1ms)
/// [PERF] Bounds the window between the entry check and kernel entry
pub const DEFAULT_KICK_INTERVAL_US: u64 = 1_000;

/// Give up delivering a cancellation after 5s
/// Only reached when the target blocks the interrupt signal
pub const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 5_000;

/// Aggressive preset: kick every 100μs
pub const AGGRESSIVE_KICK_INTERVAL_US: u64 = 100;

/// Aggressive preset: give up after 500ms
pub const AGGRESSIVE_DELIVERY_TIMEOUT_MS: u64 = 500;
