/*!
 * Call Classification
 *
 * Compile-time classification of wrapped calls into plain calls and
 * cancellation points.
 *
 * A call is a cancellation point when it can block without bound on
 * something outside the caller's control: a peer that never connects, a
 * send buffer that never drains. Everything else returns after a
 * kernel-bounded delay and goes through the plain invoker.
 */

use super::types::{Operation, SocketOp};

/// Invocation class of a wrapped call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Kernel-bounded latency; no cancellation handling
    Plain,

    /// May block indefinitely; cancellation is observed at entry and on EINTR
    CancellationPoint,
}

impl SocketOp {
    #[inline]
    pub const fn classify(self) -> CallClass {
        match self {
            SocketOp::Accept4 | SocketOp::Sendmsg => CallClass::CancellationPoint,
            SocketOp::Socket | SocketOp::Socketpair => CallClass::Plain,
        }
    }
}

impl Operation {
    #[inline]
    pub const fn classify(&self) -> CallClass {
        match self {
            Operation::Accept4(_) => SocketOp::Accept4.classify(),
            Operation::Sendmsg(_) => SocketOp::Sendmsg.classify(),
            Operation::Socket(_) => SocketOp::Socket.classify(),
            Operation::Socketpair(_) => SocketOp::Socketpair.classify(),
            Operation::Signalfd(_) | Operation::Pipe2(_) => CallClass::Plain,
        }
    }

    #[inline(always)]
    pub const fn is_cancellation_point(&self) -> bool {
        matches!(self.classify(), CallClass::CancellationPoint)
    }
}
