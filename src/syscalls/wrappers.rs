/*!
 * Typed Wrappers
 *
 * Rust-facing versions of the wrapped calls. Each one adapts typed
 * arguments into an operation descriptor and hands it to the executor;
 * nothing is validated that the kernel would reject anyway. Errors are the
 * kernel's errno, unchanged. New descriptors come back as `OwnedFd`, so
 * ownership moves to the caller only on success.
 *
 * `accept4` and `sendmsg` are cancellation points: with a token entered on
 * the calling thread, they unwind instead of returning once cancelled.
 */

use super::executor::Trampoline;
use super::invoker::Kernel;
use super::socketcall::SocketAbi;
use super::types::{
    decode, Accept4Args, Operation, Pipe2Args, SendmsgArgs, SignalfdArgs, SocketArgs,
    SocketpairArgs,
};
use libc::{c_int, c_long, c_void, msghdr, sockaddr, sockaddr_storage, socklen_t};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::SigSet;
use nix::sys::signalfd::SfdFlags;
use nix::sys::socket::{AddressFamily, MsgFlags, SockFlag, SockType};
use std::io::IoSlice;
use std::mem;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

/// Caller-owned buffer for a peer address filled by `accept4`
#[derive(Clone)]
pub struct SocketAddrBuf {
    storage: sockaddr_storage,
    len: socklen_t,
}

impl SocketAddrBuf {
    pub fn new() -> Self {
        Self {
            // SAFETY: all-zero is a valid sockaddr_storage (AF_UNSPEC)
            storage: unsafe { mem::zeroed() },
            len: Self::capacity(),
        }
    }

    #[inline]
    const fn capacity() -> socklen_t {
        mem::size_of::<sockaddr_storage>() as socklen_t
    }

    /// Address family the kernel wrote, `AF_UNSPEC` before any call
    pub fn family(&self) -> c_int {
        c_int::from(self.storage.ss_family)
    }

    /// Length the kernel reported; may exceed the buffer for truncated addresses
    pub fn len(&self) -> socklen_t {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address bytes that fit in the buffer
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.len.min(Self::capacity()) as usize;
        // SAFETY: `len` never exceeds the size of `storage`
        unsafe { std::slice::from_raw_parts(&self.storage as *const _ as *const u8, len) }
    }

    /// Pointers for the kernel, with the in/out length reset to capacity
    fn as_out_params(&mut self) -> (*mut sockaddr, *mut socklen_t) {
        self.len = Self::capacity();
        (
            &mut self.storage as *mut sockaddr_storage as *mut sockaddr,
            &mut self.len as *mut socklen_t,
        )
    }
}

impl Default for SocketAddrBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SocketAddrBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketAddrBuf")
            .field("family", &self.family())
            .field("len", &self.len)
            .finish()
    }
}

#[inline]
fn owned_fd(ret: c_long) -> Result<OwnedFd, Errno> {
    let fd = decode(ret)?;
    // SAFETY: the kernel just created this descriptor for us
    Ok(unsafe { OwnedFd::from_raw_fd(fd as RawFd) })
}

#[inline]
fn owned_pair(ret: c_long, fds: [c_int; 2]) -> Result<(OwnedFd, OwnedFd), Errno> {
    decode(ret)?;
    // SAFETY: on success the kernel filled both slots with new descriptors
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

impl<K: Kernel, S: SocketAbi> Trampoline<K, S> {
    /// Create a socket
    pub fn socket(
        &self,
        domain: AddressFamily,
        socket_type: SockType,
        flags: SockFlag,
        protocol: c_int,
    ) -> Result<OwnedFd, Errno> {
        let op = Operation::Socket(SocketArgs {
            domain: domain as c_int,
            socket_type: socket_type as c_int | flags.bits(),
            protocol,
        });
        // SAFETY: no pointer arguments
        owned_fd(unsafe { self.invoke(&op) })
    }

    /// Create a pair of connected sockets
    pub fn socketpair(
        &self,
        domain: AddressFamily,
        socket_type: SockType,
        flags: SockFlag,
        protocol: c_int,
    ) -> Result<(OwnedFd, OwnedFd), Errno> {
        let mut fds: [c_int; 2] = [-1, -1];
        let op = Operation::Socketpair(SocketpairArgs {
            domain: domain as c_int,
            socket_type: socket_type as c_int | flags.bits(),
            protocol,
            fds: &mut fds,
        });
        // SAFETY: `fds` outlives the call
        let ret = unsafe { self.invoke(&op) };
        owned_pair(ret, fds)
    }

    /// Create a pipe; returns `(read end, write end)`
    pub fn pipe2(&self, flags: OFlag) -> Result<(OwnedFd, OwnedFd), Errno> {
        let mut fds: [c_int; 2] = [-1, -1];
        let op = Operation::Pipe2(Pipe2Args {
            fds: &mut fds,
            flags: flags.bits(),
        });
        // SAFETY: `fds` outlives the call
        let ret = unsafe { self.invoke(&op) };
        owned_pair(ret, fds)
    }

    /// Create a descriptor that reads the signals in `mask`
    ///
    /// The signals must also be blocked, or they are delivered normally.
    pub fn signalfd(&self, mask: &SigSet, flags: SfdFlags) -> Result<OwnedFd, Errno> {
        let mask: &libc::sigset_t = mask.as_ref();
        let op = Operation::Signalfd(SignalfdArgs {
            fd: -1,
            mask,
            flags: flags.bits(),
        });
        // SAFETY: `mask` outlives the call
        owned_fd(unsafe { self.invoke(&op) })
    }

    /// Replace the mask of an existing signalfd
    pub fn signalfd_update(
        &self,
        fd: BorrowedFd<'_>,
        mask: &SigSet,
        flags: SfdFlags,
    ) -> Result<(), Errno> {
        let mask: &libc::sigset_t = mask.as_ref();
        let op = Operation::Signalfd(SignalfdArgs {
            fd: fd.as_raw_fd(),
            mask,
            flags: flags.bits(),
        });
        // SAFETY: `mask` outlives the call
        decode(unsafe { self.invoke(&op) }).map(drop)
    }

    /// Accept a connection, optionally recording the peer address
    ///
    /// Cancellation point.
    pub fn accept4(
        &self,
        fd: BorrowedFd<'_>,
        peer: Option<&mut SocketAddrBuf>,
        flags: SockFlag,
    ) -> Result<OwnedFd, Errno> {
        let (addr, addr_len) = match peer {
            Some(buf) => buf.as_out_params(),
            None => (std::ptr::null_mut(), std::ptr::null_mut()),
        };
        let op = Operation::Accept4(Accept4Args {
            fd: fd.as_raw_fd(),
            addr,
            addr_len,
            flags: flags.bits(),
        });
        // SAFETY: `peer` is mutably borrowed for the duration of the call
        owned_fd(unsafe { self.invoke(&op) })
    }

    /// Send a message described by a raw header
    ///
    /// Cancellation point.
    ///
    /// # Safety
    ///
    /// Every pointer in `msg` (name, iovecs, control) must be valid for
    /// reads of its stated length.
    pub unsafe fn sendmsg(
        &self,
        fd: BorrowedFd<'_>,
        msg: &msghdr,
        flags: MsgFlags,
    ) -> Result<usize, Errno> {
        let op = Operation::Sendmsg(SendmsgArgs {
            fd: fd.as_raw_fd(),
            msg,
            flags: flags.bits(),
        });
        decode(self.invoke(&op)).map(|sent| sent as usize)
    }

    /// Send the concatenation of `iov` with optional ancillary data
    ///
    /// Cancellation point.
    pub fn sendmsg_slices(
        &self,
        fd: BorrowedFd<'_>,
        iov: &[IoSlice<'_>],
        control: &[u8],
        flags: MsgFlags,
    ) -> Result<usize, Errno> {
        // SAFETY: all-zero is a valid empty header; musl pads it privately
        let mut msg: msghdr = unsafe { mem::zeroed() };
        // IoSlice is ABI-compatible with iovec
        msg.msg_iov = iov.as_ptr() as *mut libc::iovec;
        msg.msg_iovlen = iov.len() as _;
        if !control.is_empty() {
            msg.msg_control = control.as_ptr() as *mut c_void;
            msg.msg_controllen = control.len() as _;
        }
        // SAFETY: the header only points into `iov` and `control`
        unsafe { self.sendmsg(fd, &msg, flags) }
    }
}

/// [`Trampoline::socket`] on the native trampoline
pub fn socket(
    domain: AddressFamily,
    socket_type: SockType,
    flags: SockFlag,
    protocol: c_int,
) -> Result<OwnedFd, Errno> {
    Trampoline::native().socket(domain, socket_type, flags, protocol)
}

/// [`Trampoline::socketpair`] on the native trampoline
pub fn socketpair(
    domain: AddressFamily,
    socket_type: SockType,
    flags: SockFlag,
    protocol: c_int,
) -> Result<(OwnedFd, OwnedFd), Errno> {
    Trampoline::native().socketpair(domain, socket_type, flags, protocol)
}

/// [`Trampoline::pipe2`] on the native trampoline
pub fn pipe2(flags: OFlag) -> Result<(OwnedFd, OwnedFd), Errno> {
    Trampoline::native().pipe2(flags)
}

/// [`Trampoline::signalfd`] on the native trampoline
pub fn signalfd(mask: &SigSet, flags: SfdFlags) -> Result<OwnedFd, Errno> {
    Trampoline::native().signalfd(mask, flags)
}

/// [`Trampoline::signalfd_update`] on the native trampoline
pub fn signalfd_update(fd: BorrowedFd<'_>, mask: &SigSet, flags: SfdFlags) -> Result<(), Errno> {
    Trampoline::native().signalfd_update(fd, mask, flags)
}

/// [`Trampoline::accept4`] on the native trampoline
pub fn accept4(
    fd: BorrowedFd<'_>,
    peer: Option<&mut SocketAddrBuf>,
    flags: SockFlag,
) -> Result<OwnedFd, Errno> {
    Trampoline::native().accept4(fd, peer, flags)
}

/// [`Trampoline::sendmsg`] on the native trampoline
///
/// # Safety
///
/// See [`Trampoline::sendmsg`].
pub unsafe fn sendmsg(fd: BorrowedFd<'_>, msg: &msghdr, flags: MsgFlags) -> Result<usize, Errno> {
    Trampoline::native().sendmsg(fd, msg, flags)
}

/// [`Trampoline::sendmsg_slices`] on the native trampoline
pub fn sendmsg_slices(
    fd: BorrowedFd<'_>,
    iov: &[IoSlice<'_>],
    control: &[u8],
    flags: MsgFlags,
) -> Result<usize, Errno> {
    Trampoline::native().sendmsg_slices(fd, iov, control, flags)
}
