/*!
 * Socket Call Multiplexer
 *
 * Some kernel ABIs reach every socket operation through one `socketcall`
 * entry that takes a sub-operation tag and a pointer to an argument block.
 * Others give each operation its own syscall number. The strategy is picked
 * once per target through [`NativeSocketAbi`]; the executor never branches
 * on it per call.
 */

use super::types::{ArgBlock, RawCall, SocketOp, Words};
use libc::c_long;

/// Strategy for lowering a socket operation to a kernel call
pub trait SocketAbi: Send + Sync {
    /// Build the kernel call for `op`
    ///
    /// `block` is scratch space owned by the caller. Multiplexed strategies
    /// store the arguments there and pass its address, so the caller must
    /// keep it alive until the returned call has been issued.
    fn lower(&self, op: SocketOp, words: Words, block: &mut ArgBlock) -> RawCall;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// One dedicated syscall number per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Direct;

impl SocketAbi for Direct {
    #[inline]
    fn lower(&self, op: SocketOp, words: Words, _block: &mut ArgBlock) -> RawCall {
        RawCall::new(op.direct_number(), words)
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// A single `socketcall`-style entry: `number(tag, &args)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplexed {
    number: c_long,
}

impl Multiplexed {
    /// Multiplexer issuing `number` as the shared entry point
    pub const fn new(number: c_long) -> Self {
        Self { number }
    }

    /// The target's own `socketcall` syscall
    #[cfg(any(target_arch = "x86", target_arch = "s390x"))]
    pub const fn native() -> Self {
        Self::new(libc::SYS_socketcall)
    }

    pub const fn number(&self) -> c_long {
        self.number
    }
}

impl SocketAbi for Multiplexed {
    #[inline]
    fn lower(&self, op: SocketOp, words: Words, block: &mut ArgBlock) -> RawCall {
        block.0 = words;
        RawCall::new(self.number, [op.tag(), block.as_word(), 0, 0, 0, 0])
    }

    fn name(&self) -> &'static str {
        "socketcall"
    }
}

/// Socket call strategy of the compilation target
#[cfg(any(target_arch = "x86", target_arch = "s390x"))]
pub type NativeSocketAbi = Multiplexed;

/// Socket call strategy of the compilation target
#[cfg(not(any(target_arch = "x86", target_arch = "s390x")))]
pub type NativeSocketAbi = Direct;

/// Construct the target's strategy
#[cfg(any(target_arch = "x86", target_arch = "s390x"))]
pub const fn native_socket_abi() -> NativeSocketAbi {
    Multiplexed::native()
}

/// Construct the target's strategy
#[cfg(not(any(target_arch = "x86", target_arch = "s390x")))]
pub const fn native_socket_abi() -> NativeSocketAbi {
    Direct
}
