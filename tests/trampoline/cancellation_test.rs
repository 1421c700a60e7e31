/*!
 * Cancellation Point Tests
 * Cancelling threads that are about to block, or already blocked, in the kernel
 */

use nix::sys::socket::{AddressFamily, MsgFlags, SockFlag, SockType};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::{ErrorKind, IoSlice, Read};
use std::os::fd::AsFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::time::{Duration, Instant};
use syscall_trampoline::cancel::{self, CancelPhase, CancelToken, Delivery, ThreadOutcome};
use syscall_trampoline::syscalls;
use syscall_trampoline::TrampolineConfig;
use tempfile::tempdir;

fn listen(dir: &Path) -> (UnixListener, std::path::PathBuf) {
    let path = dir.join("cancel.sock");
    let listener = UnixListener::bind(&path).unwrap();
    (listener, path)
}

/// Spin until the token's thread sits inside a cancellation point
fn wait_for_phase(token: &CancelToken, phase: CancelPhase) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while token.phase() != phase {
        assert!(Instant::now() < deadline, "thread never reached {:?}", phase);
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
#[serial]
fn test_request_before_entry_skips_kernel() {
    let dir = tempdir().unwrap();
    let (listener, _path) = listen(dir.path());

    let token = CancelToken::for_current_thread();
    let _scope = token.enter();
    token.request();

    // nobody connects: reaching the kernel would block forever
    let outcome = cancel::run_cancellable(|| {
        syscalls::accept4(listener.as_fd(), None, SockFlag::SOCK_CLOEXEC)
    });

    let cancelled = outcome.unwrap_err();
    assert_eq!(cancelled.operation, "accept4");
    assert_eq!(cancelled.token, token.id());
    assert_eq!(token.phase(), CancelPhase::Cancelled);
}

#[test]
#[serial]
fn test_blocked_accept_is_interrupted() {
    let dir = tempdir().unwrap();
    let (listener, path) = listen(dir.path());
    let shared = listener.try_clone().unwrap();

    let thread = cancel::spawn("blocked-accept", move || {
        syscalls::accept4(shared.as_fd(), None, SockFlag::SOCK_CLOEXEC).map(drop)
    })
    .unwrap();

    wait_for_phase(thread.token(), CancelPhase::InCancellationPoint);
    let delivery = thread.cancel(&TrampolineConfig::aggressive()).unwrap();
    assert_eq!(delivery, Delivery::Observed);

    match thread.join() {
        ThreadOutcome::Cancelled(cancelled) => assert_eq!(cancelled.operation, "accept4"),
        ThreadOutcome::Completed(result) => panic!("accept4 returned {:?}", result),
    }

    // the listener is untouched by the cancelled call
    let _client = UnixStream::connect(&path).unwrap();
    let conn = syscalls::accept4(listener.as_fd(), None, SockFlag::SOCK_CLOEXEC);
    assert!(conn.is_ok());
}

#[test]
#[serial]
fn test_request_outside_point_is_observed_later() {
    let dir = tempdir().unwrap();
    let (listener, _path) = listen(dir.path());
    let (go_tx, go_rx) = flume::bounded::<()>(0);

    let thread = cancel::spawn("late-accept", move || {
        let _ = go_rx.recv();
        syscalls::accept4(listener.as_fd(), None, SockFlag::SOCK_CLOEXEC).map(drop)
    })
    .unwrap();

    let delivery = thread.cancel(&TrampolineConfig::aggressive()).unwrap();
    assert_eq!(delivery, Delivery::Pending);

    go_tx.send(()).unwrap();
    assert!(thread.join().is_cancelled());
}

#[test]
#[serial]
fn test_disabled_thread_finishes_its_call() {
    let dir = tempdir().unwrap();
    let (listener, path) = listen(dir.path());

    let thread = cancel::spawn("deferred-accept", move || {
        let token = cancel::current().unwrap();
        let _deferred = token.disable();
        syscalls::accept4(listener.as_fd(), None, SockFlag::SOCK_CLOEXEC).map(drop)
    })
    .unwrap();

    wait_for_phase(thread.token(), CancelPhase::InCancellationPoint);
    let delivery = thread.cancel(&TrampolineConfig::aggressive()).unwrap();
    assert_eq!(delivery, Delivery::Pending);

    let _client = UnixStream::connect(&path).unwrap();
    assert_eq!(thread.join(), ThreadOutcome::Completed(Ok(())));
}

#[test]
#[serial]
fn test_cancelled_sendmsg_sends_nothing() {
    let (a, b) = syscalls::socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC | SockFlag::SOCK_NONBLOCK,
        0,
    )
    .unwrap();

    let token = CancelToken::for_current_thread();
    let _scope = token.enter();
    token.request();

    let iov = [IoSlice::new(b"never")];
    let outcome = cancel::run_cancellable(|| {
        syscalls::sendmsg_slices(a.as_fd(), &iov, &[], MsgFlags::empty())
    });
    assert_eq!(outcome.unwrap_err().operation, "sendmsg");

    let mut buf = [0u8; 8];
    let err = UnixStream::from(b).read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WouldBlock);
}

#[test]
#[serial]
fn test_plain_calls_ignore_pending_request() {
    let token = CancelToken::for_current_thread();
    let _scope = token.enter();
    token.request();

    let outcome = cancel::run_cancellable(|| {
        syscalls::pipe2(nix::fcntl::OFlag::O_CLOEXEC).map(drop)
    });
    assert_eq!(outcome, Ok(Ok(())));
    assert_eq!(token.phase(), CancelPhase::Running);
}
