/*!
 * C ABI Entry Points
 *
 * The wrapped calls with their exact POSIX/Linux signatures: success value
 * or `-1` with `errno` set to the kernel's code. They use the `C-unwind`
 * ABI so a cancelled `accept4`/`sendmsg` can unwind through them.
 *
 * The symbols are not exported unmangled; linking them over the host libc
 * is left to the embedding library.
 */

use super::executor::Trampoline;
use super::types::{
    decode, Accept4Args, Operation, Pipe2Args, SendmsgArgs, SignalfdArgs, SocketArgs,
    SocketpairArgs,
};
use libc::{c_int, c_long, msghdr, sigset_t, sockaddr, socklen_t, ssize_t};
use nix::errno::Errno;

/// Fold a raw kernel result into the libc return convention
#[inline]
fn syscall_ret(ret: c_long) -> c_long {
    match decode(ret) {
        Ok(value) => value,
        Err(errno) => {
            Errno::set_raw(errno as i32);
            -1
        }
    }
}

/// POSIX-style `signalfd`.
///
/// # Safety
///
/// `sigs` must point to a valid signal set.
pub unsafe extern "C-unwind" fn signalfd(fd: c_int, sigs: *const sigset_t, flags: c_int) -> c_int {
    let op = Operation::Signalfd(SignalfdArgs {
        fd,
        mask: sigs,
        flags,
    });
    syscall_ret(Trampoline::native().invoke(&op)) as c_int
}

/// POSIX-style `accept4`. Cancellation point.
///
/// # Safety
///
/// `addr` and `len` must both be null, or `len` must point to the size of
/// the writable buffer at `addr`.
pub unsafe extern "C-unwind" fn accept4(
    fd: c_int,
    addr: *mut sockaddr,
    len: *mut socklen_t,
    flg: c_int,
) -> c_int {
    let op = Operation::Accept4(Accept4Args {
        fd,
        addr,
        addr_len: len,
        flags: flg,
    });
    syscall_ret(Trampoline::native().invoke(&op)) as c_int
}

/// POSIX-style `sendmsg`. Cancellation point.
///
/// # Safety
///
/// `msg` must point to a valid message header whose buffers are readable.
pub unsafe extern "C-unwind" fn sendmsg(fd: c_int, msg: *const msghdr, flags: c_int) -> ssize_t {
    let op = Operation::Sendmsg(SendmsgArgs { fd, msg, flags });
    syscall_ret(Trampoline::native().invoke(&op)) as ssize_t
}

/// POSIX-style `socket`.
///
/// # Safety
///
/// No pointer arguments; unsafe only for symmetry with the C surface.
pub unsafe extern "C-unwind" fn socket(domain: c_int, type_: c_int, protocol: c_int) -> c_int {
    let op = Operation::Socket(SocketArgs {
        domain,
        socket_type: type_,
        protocol,
    });
    syscall_ret(Trampoline::native().invoke(&op)) as c_int
}

/// POSIX-style `socketpair`.
///
/// # Safety
///
/// `fd` must be writable for two descriptors.
pub unsafe extern "C-unwind" fn socketpair(
    domain: c_int,
    type_: c_int,
    protocol: c_int,
    fd: *mut [c_int; 2],
) -> c_int {
    let op = Operation::Socketpair(SocketpairArgs {
        domain,
        socket_type: type_,
        protocol,
        fds: fd,
    });
    syscall_ret(Trampoline::native().invoke(&op)) as c_int
}

/// Linux `pipe2`.
///
/// # Safety
///
/// `fd` must be writable for two descriptors.
pub unsafe extern "C-unwind" fn pipe2(fd: *mut [c_int; 2], flag: c_int) -> c_int {
    let op = Operation::Pipe2(Pipe2Args { fds: fd, flags: flag });
    syscall_ret(Trampoline::native().invoke(&op)) as c_int
}
