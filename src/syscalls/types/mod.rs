/*!
 * Syscall Types Module
 * Typed operation descriptors and their raw kernel-boundary form
 */

mod operation;
mod raw;

// Re-export all public types
pub use operation::{
    Accept4Args, Operation, Pipe2Args, Route, SendmsgArgs, SignalfdArgs, SocketArgs, SocketOp,
    SocketpairArgs, Words,
};
pub use raw::{decode, encode_errno, is_error, ArgBlock, RawCall};
