//! Session actor
//!
//! The single mutation point for a proxy session. Viewer attach/detach
//! requests and upstream events all arrive as messages and are handled one
//! at a time, so the registry and the connection state need no locks.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, ProtocolError, Result, TransportError};
use crate::protocol::{Boundary, CrlfRealigner};
use crate::registry::{ViewerId, ViewerRegistry, ViewerWriteError};
use crate::stats::RelayStats;

use super::config::SessionConfig;
use super::state::{ActiveUpstream, SessionPhase, SessionState, Waiter};
use super::upstream::{run_upstream, UpstreamConnector, UpstreamEvent};

/// Requests sent to the actor by session handles and viewer streams
#[derive(Debug)]
pub(crate) enum Command {
    /// Admit a viewer; replied to once the boundary is known
    Attach {
        id: ViewerId,
        sink: mpsc::Sender<Bytes>,
        reply: oneshot::Sender<Result<Boundary>>,
    },
    /// Viewer disconnected
    Detach { id: ViewerId },
    /// Statistics snapshot
    Stats { reply: oneshot::Sender<RelayStats> },
}

pub(crate) struct SessionActor<C: UpstreamConnector> {
    config: SessionConfig,
    connector: Arc<C>,
    state: SessionState,
    viewers: ViewerRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::Sender<UpstreamEvent>,
    events_rx: mpsc::Receiver<UpstreamEvent>,
    next_generation: u64,
    stats: RelayStats,
}

impl<C: UpstreamConnector> SessionActor<C> {
    pub fn new(
        config: SessionConfig,
        connector: Arc<C>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.upstream_buffer);

        Self {
            config,
            connector,
            state: SessionState::Idle,
            viewers: ViewerRegistry::new(),
            commands,
            events_tx,
            events_rx,
            next_generation: 0,
            stats: RelayStats::new(),
        }
    }

    /// Run until every session handle and viewer stream is gone
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.close_upstream();
        self.viewers.end();
        tracing::debug!(upstream = %self.config.upstream_url, "Session actor stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Attach { id, sink, reply } => self.attach(id, sink, reply),
            Command::Detach { id } => self.detach(id),
            Command::Stats { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn attach(
        &mut self,
        id: ViewerId,
        sink: mpsc::Sender<Bytes>,
        reply: oneshot::Sender<Result<Boundary>>,
    ) {
        // The viewer's response stream is already gone; nothing to do
        if sink.is_closed() {
            tracing::debug!(viewer_id = %id, "Viewer gone before attach");
            return;
        }

        if let SessionState::Idle = self.state {
            let (generation, task) = self.spawn_upstream();
            self.state = SessionState::Connecting {
                generation,
                task,
                waiters: vec![Waiter { id, sink, reply }],
            };
            return;
        }

        match &mut self.state {
            SessionState::Connecting { waiters, .. } => {
                tracing::debug!(viewer_id = %id, "Viewer waiting for upstream headers");
                waiters.push(Waiter { id, sink, reply });
            }
            SessionState::Active(active) if active.finished => {
                tracing::debug!(viewer_id = %id, "Upstream already ended, rejecting viewer");
                let _ = reply.send(Err(Error::UpstreamEnded));
            }
            SessionState::Active(active) => {
                let boundary = active.boundary.clone();
                self.viewers.admit(id, sink);
                tracing::info!(
                    viewer_id = %id,
                    viewers = self.viewers.len(),
                    "Viewer admitted"
                );
                let _ = reply.send(Ok(boundary));
            }
            SessionState::Idle => {}
        }
    }

    fn detach(&mut self, id: ViewerId) {
        let now_empty = match &mut self.state {
            SessionState::Idle => false,
            SessionState::Connecting { waiters, .. } => {
                let before = waiters.len();
                waiters.retain(|w| w.id != id);
                before != waiters.len() && waiters.is_empty()
            }
            SessionState::Active(_) => match self.viewers.remove(id) {
                Some(entry) => {
                    tracing::info!(
                        viewer_id = %id,
                        bytes_sent = entry.bytes_sent,
                        connected_ms = entry.duration().as_millis() as u64,
                        viewers = self.viewers.len(),
                        "Viewer detached"
                    );
                    self.viewers.is_empty()
                }
                None => false,
            },
        };

        if now_empty {
            tracing::debug!("Last viewer left, closing upstream");
            self.close_upstream();
        }
    }

    fn handle_event(&mut self, event: UpstreamEvent) {
        let generation = match &event {
            UpstreamEvent::Connected { generation, .. }
            | UpstreamEvent::Chunk { generation, .. }
            | UpstreamEvent::Finished { generation, .. } => *generation,
        };

        if self.state.generation() != Some(generation) {
            tracing::trace!(generation, "Discarding event from closed upstream connection");
            return;
        }

        match event {
            UpstreamEvent::Connected { content_type, .. } => self.on_connected(content_type),
            UpstreamEvent::Chunk { data, .. } => self.on_chunk(data),
            UpstreamEvent::Finished { error, .. } => self.on_finished(error),
        }
    }

    fn on_connected(&mut self, content_type: Option<String>) {
        if self.state.phase() != SessionPhase::Connecting {
            return;
        }

        let boundary = content_type
            .as_deref()
            .ok_or(ProtocolError::MissingContentType)
            .and_then(Boundary::from_content_type);

        let boundary = match boundary {
            Ok(boundary) => boundary,
            Err(e) => {
                tracing::error!(
                    upstream = %self.config.upstream_url,
                    error = %e,
                    "Cannot parse upstream multipart framing"
                );
                for waiter in self.close_upstream() {
                    let _ = waiter.reply.send(Err(Error::Protocol(e.clone())));
                }
                return;
            }
        };

        let SessionState::Connecting {
            generation,
            task,
            waiters,
        } = std::mem::replace(&mut self.state, SessionState::Idle)
        else {
            return;
        };

        tracing::info!(
            upstream = %self.config.upstream_url,
            boundary = %boundary,
            generation,
            "Upstream connected"
        );

        for waiter in waiters {
            if waiter.sink.is_closed() {
                continue;
            }
            self.viewers.admit(waiter.id, waiter.sink);
            tracing::info!(viewer_id = %waiter.id, viewers = self.viewers.len(), "Viewer admitted");
            let _ = waiter.reply.send(Ok(boundary.clone()));
        }

        self.state = SessionState::Active(ActiveUpstream {
            generation,
            task,
            boundary,
            realigner: CrlfRealigner::new(),
            finished: false,
        });

        if self.viewers.is_empty() {
            tracing::debug!("Every waiting viewer left during connect");
            self.close_upstream();
        }
    }

    fn on_chunk(&mut self, data: Bytes) {
        let SessionState::Active(active) = &mut self.state else {
            return;
        };
        if active.finished {
            return;
        }

        let repaired_before = active.realigner.repaired();
        let data = active.realigner.realign(data, &active.boundary);
        if active.realigner.repaired() > repaired_before {
            self.stats.chunks_repaired += 1;
        }

        self.stats.chunks_received += 1;
        self.stats.bytes_received += data.len() as u64;

        let outcome = self.viewers.broadcast(&data, &active.boundary);

        for (id, error) in &outcome.failed {
            if *error == ViewerWriteError::Lagging {
                self.stats.chunks_skipped += 1;
                tracing::debug!(viewer_id = %id, "Viewer stalled, resuming at next boundary");
            }
        }

        for id in outcome.closed() {
            tracing::debug!(viewer_id = %id, "Viewer output closed during broadcast");
            self.detach(id);
        }
    }

    fn on_finished(&mut self, error: Option<TransportError>) {
        match &mut self.state {
            SessionState::Connecting { .. } => {
                let error = error.unwrap_or_else(|| {
                    TransportError::Body("stream ended before headers".into())
                });
                tracing::warn!(
                    upstream = %self.config.upstream_url,
                    error = %error,
                    "Upstream connection failed"
                );
                for waiter in self.close_upstream() {
                    let _ = waiter.reply.send(Err(Error::Transport(error.clone())));
                }
            }
            SessionState::Active(active) => {
                match &error {
                    Some(e) => tracing::warn!(
                        upstream = %self.config.upstream_url,
                        error = %e,
                        "Upstream stream failed"
                    ),
                    None => tracing::info!(upstream = %self.config.upstream_url, "Upstream stream ended"),
                }
                active.finished = true;
                let ended = self.viewers.end();
                tracing::debug!(viewers = ended, "Ended viewer outputs");
            }
            SessionState::Idle => {}
        }
    }

    /// Start a producer task for a new connection attempt
    fn spawn_upstream(&mut self) -> (u64, JoinHandle<()>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.stats.connections_opened += 1;

        tracing::info!(
            upstream = %self.config.upstream_url,
            generation,
            "Opening upstream connection"
        );

        let task = tokio::spawn(run_upstream(
            Arc::clone(&self.connector),
            self.config.upstream_url.clone(),
            generation,
            self.config.connect_timeout,
            self.events_tx.clone(),
        ));

        (generation, task)
    }

    /// Tear down the upstream connection and return to Idle
    ///
    /// Returns viewers that were still waiting for headers so the caller
    /// can answer them.
    fn close_upstream(&mut self) -> Vec<Waiter> {
        let generation = self.state.generation();
        let waiters = match self.state.shut_down() {
            SessionState::Idle => return Vec::new(),
            SessionState::Connecting { waiters, .. } => waiters,
            SessionState::Active(_) => Vec::new(),
        };

        self.stats.connections_closed += 1;
        tracing::info!(
            upstream = %self.config.upstream_url,
            generation = ?generation,
            "Upstream connection closed"
        );

        waiters
    }

    fn snapshot(&self) -> RelayStats {
        RelayStats {
            phase: self.state.phase(),
            boundary: self.state.boundary().map(|b| b.token().to_string()),
            viewers: self.viewers.len(),
            pending_viewers: self.viewers.pending_count(),
            waiting_viewers: match &self.state {
                SessionState::Connecting { waiters, .. } => waiters.len(),
                _ => 0,
            },
            ..self.stats.clone()
        }
    }
}
