//! Proxy session handle
//!
//! [`ProxySession`] is the cheap, cloneable front of a session actor. Each
//! successful [`ProxySession::attach`] yields an [`Admission`] whose
//! [`ViewerStream`] carries the relayed bytes; dropping the stream is the
//! viewer's disconnect signal.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::Stream;
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::protocol::Boundary;
use crate::registry::frame::ViewerIdGenerator;
use crate::registry::ViewerId;
use crate::stats::RelayStats;

use super::actor::{Command, SessionActor};
use super::config::SessionConfig;
use super::upstream::{HttpUpstream, UpstreamConnector};

/// Handle to the session relaying one upstream source
///
/// # Example
/// ```no_run
/// use futures::StreamExt;
/// use mjpeg_relay::session::{ProxySession, SessionConfig};
///
/// # async fn example() -> mjpeg_relay::error::Result<()> {
/// let config = SessionConfig::parse(Some("http://camera.local/video.mjpg"))?;
/// let session = ProxySession::http(config)?;
///
/// let mut admission = session.attach().await?;
/// println!("Content-Type: {}", admission.boundary().content_type());
/// while let Some(chunk) = admission.stream_mut().next().await {
///     println!("{} bytes", chunk.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProxySession {
    commands: mpsc::UnboundedSender<Command>,
    ids: Arc<ViewerIdGenerator>,
    upstream_url: Arc<Url>,
    viewer_buffer: usize,
}

impl ProxySession {
    /// Spawn a session actor using `connector` to reach the upstream
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<C: UpstreamConnector>(config: SessionConfig, connector: C) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let handle = Self {
            commands,
            ids: Arc::new(ViewerIdGenerator::new()),
            upstream_url: Arc::new(config.upstream_url.clone()),
            viewer_buffer: config.viewer_buffer,
        };

        let actor = SessionActor::new(config, Arc::new(connector), commands_rx);
        tokio::spawn(actor.run());

        handle
    }

    /// Spawn a session that reaches the upstream over HTTP(S)
    pub fn http(config: SessionConfig) -> Result<Self> {
        Ok(Self::new(config, HttpUpstream::new()?))
    }

    /// The upstream source this session relays
    pub fn upstream_url(&self) -> &Url {
        &self.upstream_url
    }

    /// Attach a new viewer
    ///
    /// Opens the upstream connection if none is live, and resolves once the
    /// boundary is known. Dropping the returned future before it resolves
    /// detaches the viewer again.
    pub async fn attach(&self) -> Result<Admission> {
        let id = self.ids.next_id();
        let guard = DetachGuard {
            id,
            commands: self.commands.clone(),
        };

        let (sink, rx) = mpsc::channel(self.viewer_buffer);
        let (reply, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Attach { id, sink, reply })
            .map_err(|_| Error::SessionClosed)?;

        let boundary = reply_rx.await.map_err(|_| Error::SessionClosed)??;

        Ok(Admission {
            id,
            boundary,
            stream: ViewerStream { rx, _guard: guard },
        })
    }

    /// Current session statistics
    pub async fn stats(&self) -> Result<RelayStats> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Stats { reply })
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }
}

/// A viewer admitted to the session
#[derive(Debug)]
pub struct Admission {
    id: ViewerId,
    boundary: Boundary,
    stream: ViewerStream,
}

impl Admission {
    /// Viewer identifier
    pub fn id(&self) -> ViewerId {
        self.id
    }

    /// Boundary to announce in the response `Content-Type`
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Borrow the byte stream
    pub fn stream_mut(&mut self) -> &mut ViewerStream {
        &mut self.stream
    }

    /// Take the byte stream (e.g. to use as a response body)
    pub fn into_stream(self) -> ViewerStream {
        self.stream
    }
}

/// Relayed bytes for one viewer
///
/// The first item starts at a boundary marker. The stream ends when the
/// upstream ends; dropping it detaches the viewer.
#[derive(Debug)]
pub struct ViewerStream {
    rx: mpsc::Receiver<Bytes>,
    _guard: DetachGuard,
}

impl Stream for ViewerStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sends the detach message when the viewer goes away
#[derive(Debug)]
struct DetachGuard {
    id: ViewerId,
    commands: mpsc::UnboundedSender<Command>,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Detach { id: self.id });
    }
}
