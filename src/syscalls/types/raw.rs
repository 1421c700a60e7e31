/*!
 * Raw Syscall Descriptor
 * The word-level form an operation takes at the kernel boundary
 */

use crate::core::limits::{MAX_ERRNO, SYSCALL_MAX_ARGS};
use libc::c_long;
use nix::errno::Errno;

/// One kernel call: a syscall number and six word-sized arguments
///
/// Unused trailing arguments are zero. Built fresh per invocation and never
/// retained past the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCall {
    pub number: c_long,
    pub args: [c_long; SYSCALL_MAX_ARGS],
}

impl RawCall {
    #[inline]
    pub const fn new(number: c_long, args: [c_long; SYSCALL_MAX_ARGS]) -> Self {
        Self { number, args }
    }
}

/// Argument block for multiplexed calls
///
/// The kernel reads the operation's arguments through a pointer to this
/// block, so it must stay alive until the call returns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ArgBlock(pub [c_long; SYSCALL_MAX_ARGS]);

impl ArgBlock {
    /// Address of the block as a syscall argument word
    #[inline]
    pub fn as_word(&self) -> c_long {
        self.0.as_ptr() as c_long
    }
}

/// Whether a raw kernel result encodes `-errno`
#[inline(always)]
pub fn is_error(ret: c_long) -> bool {
    (-MAX_ERRNO..0).contains(&ret)
}

/// Split a raw kernel result into success value or errno, without remapping
#[inline]
pub fn decode(ret: c_long) -> Result<c_long, Errno> {
    if is_error(ret) {
        Err(Errno::from_raw(-ret as i32))
    } else {
        Ok(ret)
    }
}

/// Raw result for an errno, as the kernel would report it
#[inline(always)]
pub fn encode_errno(errno: Errno) -> c_long {
    -(errno as c_long)
}
