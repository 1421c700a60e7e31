/*!
 * Typed Wrapper Tests
 * Descriptor-returning calls against the running kernel
 */

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::pthread::{pthread_kill, pthread_self};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::SfdFlags;
use nix::sys::socket::{AddressFamily, MsgFlags, SockFlag, SockType};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs::File;
use std::io::{ErrorKind, IoSlice, Read, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use syscall_trampoline::syscalls::{self, Direct, LinuxKernel};
use syscall_trampoline::{SocketAddrBuf, Trampoline, TrampolineConfig};
use tempfile::tempdir;

#[test]
fn test_socketpair_is_connected() {
    let (a, b) = syscalls::socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC,
        0,
    )
    .unwrap();
    let mut first = UnixStream::from(a);
    let mut second = UnixStream::from(b);
    let mut buf = [0u8; 2];

    second.write_all(b"hi").unwrap();
    first.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hi");

    first.write_all(b"yo").unwrap();
    second.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"yo");
}

#[test]
fn test_socket_returns_fresh_descriptors() {
    let first = syscalls::socket(AddressFamily::Unix, SockType::Datagram, SockFlag::empty(), 0)
        .unwrap();
    let second = syscalls::socket(AddressFamily::Unix, SockType::Datagram, SockFlag::empty(), 0)
        .unwrap();

    assert_ne!(first.as_raw_fd(), second.as_raw_fd());
}

#[test]
fn test_direct_strategy_works_on_every_target() {
    let trampoline = Trampoline::with_parts(LinuxKernel, Direct, TrampolineConfig::default());
    let fd = trampoline
        .socket(AddressFamily::Unix, SockType::Stream, SockFlag::SOCK_CLOEXEC, 0)
        .unwrap();
    assert!(fd.as_raw_fd() >= 0);
}

#[test]
fn test_nonblocking_pipe_reports_would_block() {
    let (read_end, write_end) = syscalls::pipe2(OFlag::O_NONBLOCK | OFlag::O_CLOEXEC).unwrap();
    let mut reader = File::from(read_end);
    let mut buf = [0u8; 8];

    let err = reader.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WouldBlock);

    let mut writer = File::from(write_end);
    writer.write_all(b"pipe").unwrap();
    assert_eq!(reader.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], b"pipe");
}

#[test]
#[serial]
fn test_signalfd_reads_pending_signal() {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGUSR1);
    mask.thread_block().unwrap();

    let fd = syscalls::signalfd(&mask, SfdFlags::SFD_CLOEXEC).unwrap();
    pthread_kill(pthread_self(), Signal::SIGUSR1).unwrap();

    let mut info = [0u8; std::mem::size_of::<libc::signalfd_siginfo>()];
    File::from(fd).read_exact(&mut info).unwrap();
    let signo = u32::from_ne_bytes([info[0], info[1], info[2], info[3]]);

    mask.thread_unblock().unwrap();
    assert_eq!(signo, libc::SIGUSR1 as u32);
}

#[test]
#[serial]
fn test_signalfd_update_keeps_descriptor() {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGUSR2);
    let fd = syscalls::signalfd(&mask, SfdFlags::SFD_NONBLOCK).unwrap();

    mask.add(Signal::SIGUSR1);
    syscalls::signalfd_update(fd.as_fd(), &mask, SfdFlags::empty()).unwrap();

    // nothing pending: the non-blocking descriptor reports EAGAIN
    let mut info = [0u8; std::mem::size_of::<libc::signalfd_siginfo>()];
    let err = File::from(fd).read(&mut info).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EAGAIN));
}

#[test]
fn test_signalfd_update_rejects_other_descriptors() {
    let (read_end, _write_end) = syscalls::pipe2(OFlag::O_CLOEXEC).unwrap();
    let mask = SigSet::empty();

    let err = syscalls::signalfd_update(read_end.as_fd(), &mask, SfdFlags::empty()).unwrap_err();
    assert_eq!(err, Errno::EINVAL);
}

#[test]
fn test_sendmsg_slices_gathers_buffers() {
    let (a, b) = syscalls::socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC,
        0,
    )
    .unwrap();

    let iov = [IoSlice::new(b"ab"), IoSlice::new(b"cd")];
    let sent = syscalls::sendmsg_slices(a.as_fd(), &iov, &[], MsgFlags::empty()).unwrap();
    assert_eq!(sent, 4);

    let mut buf = [0u8; 4];
    UnixStream::from(b).read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"abcd");
}

#[test]
fn test_sendmsg_to_closed_peer_is_epipe() {
    let (a, b) = syscalls::socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC,
        0,
    )
    .unwrap();
    drop(b);

    let iov = [IoSlice::new(b"lost")];
    let err = syscalls::sendmsg_slices(a.as_fd(), &iov, &[], MsgFlags::MSG_NOSIGNAL).unwrap_err();
    assert_eq!(err, Errno::EPIPE);
}

#[test]
fn test_accept4_records_peer_family() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("listener.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let mut client = UnixStream::connect(&path).unwrap();

    let mut peer = SocketAddrBuf::new();
    let conn = syscalls::accept4(listener.as_fd(), Some(&mut peer), SockFlag::SOCK_CLOEXEC)
        .unwrap();

    assert_eq!(peer.family(), libc::AF_UNIX);
    assert!(!peer.is_empty());

    client.write_all(b"x").unwrap();
    let mut buf = [0u8; 1];
    UnixStream::from(conn).read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"x");
}

#[test]
fn test_accept4_without_peer_buffer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("anon.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let _client = UnixStream::connect(&path).unwrap();

    let conn = syscalls::accept4(listener.as_fd(), None, SockFlag::SOCK_NONBLOCK).unwrap();
    assert!(conn.as_raw_fd() >= 0);
}
