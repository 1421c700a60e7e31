/*!
 * Syscalls Module
 *
 * Descriptor-driven kernel calls:
 * - Types: raw call descriptors and typed operations
 * - Invoker: plain and cancellable kernel entry
 * - Socketcall: direct vs multiplexed socket call lowering
 * - Executor: routes operations through the invoker
 * - Wrappers / ABI: typed and C-shaped surfaces
 */

pub mod abi;
mod classification;
mod executor;
mod invoker;
mod socketcall;
mod types;
mod wrappers;

pub use classification::CallClass;
pub use executor::Trampoline;
pub use invoker::{cancellable_call, plain_call, Kernel, LinuxKernel};
pub use socketcall::{native_socket_abi, Direct, Multiplexed, NativeSocketAbi, SocketAbi};
pub use types::*;
pub use wrappers::{
    accept4, pipe2, sendmsg, sendmsg_slices, signalfd, signalfd_update, socket, socketpair,
    SocketAddrBuf,
};
