/*!
 * Operation Descriptors
 *
 * One strongly typed argument struct per wrapped call. Arguments stay typed
 * until the executor lowers them to raw words right before the kernel call.
 *
 * Pointer fields are borrowed from the caller for the duration of one call;
 * the kernel reads or fills them, the trampoline never dereferences them.
 */

use crate::core::limits::{
    KERNEL_SIGSET_BYTES, SOCKETCALL_ACCEPT4, SOCKETCALL_SENDMSG, SOCKETCALL_SOCKET,
    SOCKETCALL_SOCKETPAIR, SYSCALL_MAX_ARGS,
};
use libc::{c_int, c_long, msghdr, sigset_t, sockaddr, socklen_t};

/// Words of a call, in the kernel's natural argument order
pub type Words = [c_long; SYSCALL_MAX_ARGS];

/// `signalfd(fd, mask, flags)`; `fd == -1` creates a new descriptor
#[derive(Debug, Clone, Copy)]
pub struct SignalfdArgs {
    pub fd: c_int,
    pub mask: *const sigset_t,
    pub flags: c_int,
}

/// `accept4(fd, addr, addr_len, flags)`; `addr_len` is in/out
#[derive(Debug, Clone, Copy)]
pub struct Accept4Args {
    pub fd: c_int,
    pub addr: *mut sockaddr,
    pub addr_len: *mut socklen_t,
    pub flags: c_int,
}

/// `sendmsg(fd, msg, flags)`; the header is opaque to the trampoline
#[derive(Debug, Clone, Copy)]
pub struct SendmsgArgs {
    pub fd: c_int,
    pub msg: *const msghdr,
    pub flags: c_int,
}

/// `socket(domain, type, protocol)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketArgs {
    pub domain: c_int,
    pub socket_type: c_int,
    pub protocol: c_int,
}

/// `socketpair(domain, type, protocol, fds)`; the kernel fills `fds`
#[derive(Debug, Clone, Copy)]
pub struct SocketpairArgs {
    pub domain: c_int,
    pub socket_type: c_int,
    pub protocol: c_int,
    pub fds: *mut [c_int; 2],
}

/// `pipe2(fds, flags)`; the kernel fills `fds`
#[derive(Debug, Clone, Copy)]
pub struct Pipe2Args {
    pub fds: *mut [c_int; 2],
    pub flags: c_int,
}

/// Logical socket-family operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOp {
    Socket,
    Socketpair,
    Sendmsg,
    Accept4,
}

impl SocketOp {
    /// Sub-operation tag for the multiplexed `socketcall` entry
    #[inline]
    pub const fn tag(self) -> c_long {
        match self {
            SocketOp::Socket => SOCKETCALL_SOCKET,
            SocketOp::Socketpair => SOCKETCALL_SOCKETPAIR,
            SocketOp::Sendmsg => SOCKETCALL_SENDMSG,
            SocketOp::Accept4 => SOCKETCALL_ACCEPT4,
        }
    }

    /// Dedicated syscall number on ABIs that have one
    #[inline]
    pub const fn direct_number(self) -> c_long {
        match self {
            SocketOp::Socket => libc::SYS_socket,
            SocketOp::Socketpair => libc::SYS_socketpair,
            SocketOp::Sendmsg => libc::SYS_sendmsg,
            SocketOp::Accept4 => libc::SYS_accept4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SocketOp::Socket => "socket",
            SocketOp::Socketpair => "socketpair",
            SocketOp::Sendmsg => "sendmsg",
            SocketOp::Accept4 => "accept4",
        }
    }
}

/// How an operation reaches the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Its own syscall number on every ABI
    Direct(c_long),
    /// Through the socket call multiplexer
    Socket(SocketOp),
}

/// A wrapped call with its typed arguments
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Signalfd(SignalfdArgs),
    Accept4(Accept4Args),
    Sendmsg(SendmsgArgs),
    Socket(SocketArgs),
    Socketpair(SocketpairArgs),
    Pipe2(Pipe2Args),
}

impl Operation {
    pub const fn name(&self) -> &'static str {
        match self {
            Operation::Signalfd(_) => "signalfd",
            Operation::Accept4(_) => "accept4",
            Operation::Sendmsg(_) => "sendmsg",
            Operation::Socket(_) => "socket",
            Operation::Socketpair(_) => "socketpair",
            Operation::Pipe2(_) => "pipe2",
        }
    }

    #[inline]
    pub const fn route(&self) -> Route {
        match self {
            Operation::Signalfd(_) => Route::Direct(libc::SYS_signalfd4),
            Operation::Pipe2(_) => Route::Direct(libc::SYS_pipe2),
            Operation::Accept4(_) => Route::Socket(SocketOp::Accept4),
            Operation::Sendmsg(_) => Route::Socket(SocketOp::Sendmsg),
            Operation::Socket(_) => Route::Socket(SocketOp::Socket),
            Operation::Socketpair(_) => Route::Socket(SocketOp::Socketpair),
        }
    }

    /// Lower the typed arguments to raw words
    ///
    /// This is the only place arguments lose their types.
    pub fn words(&self) -> Words {
        match *self {
            Operation::Signalfd(a) => [
                a.fd as c_long,
                a.mask as c_long,
                KERNEL_SIGSET_BYTES as c_long,
                a.flags as c_long,
                0,
                0,
            ],
            Operation::Accept4(a) => [
                a.fd as c_long,
                a.addr as c_long,
                a.addr_len as c_long,
                a.flags as c_long,
                0,
                0,
            ],
            Operation::Sendmsg(a) => [a.fd as c_long, a.msg as c_long, a.flags as c_long, 0, 0, 0],
            Operation::Socket(a) => [
                a.domain as c_long,
                a.socket_type as c_long,
                a.protocol as c_long,
                0,
                0,
                0,
            ],
            Operation::Socketpair(a) => [
                a.domain as c_long,
                a.socket_type as c_long,
                a.protocol as c_long,
                a.fds as c_long,
                0,
                0,
            ],
            Operation::Pipe2(a) => [a.fds as c_long, a.flags as c_long, 0, 0, 0, 0],
        }
    }
}
