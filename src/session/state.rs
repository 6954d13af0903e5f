//! Session state machine
//!
//! Tracks the lifecycle of the single upstream connection. The connection
//! handle and the boundary only exist in the states where they are valid.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::protocol::{Boundary, CrlfRealigner};
use crate::registry::ViewerId;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No upstream connection, no viewers
    Idle,
    /// Upstream request sent, waiting for response headers
    Connecting,
    /// Upstream streaming to at least one viewer
    Active,
}

/// A viewer waiting for the upstream headers
#[derive(Debug)]
pub(crate) struct Waiter {
    pub id: ViewerId,
    pub sink: mpsc::Sender<Bytes>,
    pub reply: oneshot::Sender<Result<Boundary>>,
}

/// A live upstream connection with known framing
#[derive(Debug)]
pub(crate) struct ActiveUpstream {
    /// Connection attempt this state belongs to
    pub generation: u64,

    /// Producer task reading the upstream body
    pub task: JoinHandle<()>,

    /// Boundary parsed from the upstream headers
    pub boundary: Boundary,

    /// CRLF repair state across chunks
    pub realigner: CrlfRealigner,

    /// Upstream reached end of stream; outputs have been ended
    pub finished: bool,
}

/// Complete session state
#[derive(Debug)]
pub(crate) enum SessionState {
    Idle,
    Connecting {
        generation: u64,
        task: JoinHandle<()>,
        waiters: Vec<Waiter>,
    },
    Active(ActiveUpstream),
}

impl SessionState {
    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Connecting { .. } => SessionPhase::Connecting,
            SessionState::Active(_) => SessionPhase::Active,
        }
    }

    /// Generation of the current connection attempt, if any
    pub fn generation(&self) -> Option<u64> {
        match self {
            SessionState::Idle => None,
            SessionState::Connecting { generation, .. } => Some(*generation),
            SessionState::Active(active) => Some(active.generation),
        }
    }

    /// Boundary of the live connection, if headers have arrived
    pub fn boundary(&self) -> Option<&Boundary> {
        match self {
            SessionState::Active(active) => Some(&active.boundary),
            _ => None,
        }
    }

    /// Stop the producer task, closing the upstream connection
    ///
    /// Leaves `Idle` in place and returns the previous state so the caller
    /// can settle any waiters.
    pub fn shut_down(&mut self) -> SessionState {
        let previous = std::mem::replace(self, SessionState::Idle);
        match &previous {
            SessionState::Idle => {}
            SessionState::Connecting { task, .. } => task.abort(),
            SessionState::Active(active) => active.task.abort(),
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shut_down_aborts_task() {
        let task = tokio::spawn(std::future::pending::<()>());
        let mut state = SessionState::Active(ActiveUpstream {
            generation: 3,
            task,
            boundary: Boundary::new("frame"),
            realigner: CrlfRealigner::new(),
            finished: false,
        });

        assert_eq!(state.phase(), SessionPhase::Active);
        assert_eq!(state.generation(), Some(3));
        assert_eq!(state.boundary().map(|b| b.token()), Some("frame"));

        let previous = state.shut_down();
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert_eq!(state.generation(), None);

        let SessionState::Active(active) = previous else {
            panic!("expected active state");
        };
        assert!(active.task.await.unwrap_err().is_cancelled());
    }
}
