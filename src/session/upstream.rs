//! Upstream MJPEG source connection
//!
//! The session talks to its source through [`UpstreamConnector`], so the
//! HTTP client is one implementation among others (tests script their own).
//! A producer task owns the response body and pushes chunks into a bounded
//! channel read by the session actor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::Url;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Response headers and body of an upstream request
pub struct UpstreamResponse {
    /// Raw `Content-Type` header value
    pub content_type: Option<String>,

    /// Body chunks in arrival order
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Opens connections to the upstream source
pub trait UpstreamConnector: Send + Sync + 'static {
    /// Send the request and resolve once response headers are in
    fn connect(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<UpstreamResponse, TransportError>> + Send;
}

/// HTTP(S) upstream using `reqwest`
///
/// Plain or TLS transport is picked from the URL scheme. Certificate
/// validation is disabled: sources are LAN cameras with self-signed certs.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Build the HTTP client
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self { client })
    }
}

impl UpstreamConnector for HttpUpstream {
    async fn connect(&self, url: &Url) -> Result<UpstreamResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let body = response
            .bytes_stream()
            .map_err(|e| TransportError::Body(e.to_string()))
            .boxed();

        Ok(UpstreamResponse { content_type, body })
    }
}

/// Events sent from the producer task to the session actor
///
/// Every event carries the generation of the connection attempt that
/// produced it, so events from an aborted attempt can be discarded.
#[derive(Debug)]
pub(crate) enum UpstreamEvent {
    /// Response headers received
    Connected {
        generation: u64,
        content_type: Option<String>,
    },
    /// One body chunk
    Chunk { generation: u64, data: Bytes },
    /// Connection attempt or stream is over (error is None on clean end)
    Finished {
        generation: u64,
        error: Option<TransportError>,
    },
}

/// Producer task: connect, then forward every body chunk
pub(crate) async fn run_upstream<C: UpstreamConnector>(
    connector: Arc<C>,
    url: Url,
    generation: u64,
    connect_timeout: Duration,
    events: mpsc::Sender<UpstreamEvent>,
) {
    let response = match tokio::time::timeout(connect_timeout, connector.connect(&url)).await {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            let _ = events
                .send(UpstreamEvent::Finished {
                    generation,
                    error: Some(error),
                })
                .await;
            return;
        }
        Err(_) => {
            let _ = events
                .send(UpstreamEvent::Finished {
                    generation,
                    error: Some(TransportError::Timeout),
                })
                .await;
            return;
        }
    };

    let UpstreamResponse { content_type, mut body } = response;

    if events
        .send(UpstreamEvent::Connected {
            generation,
            content_type,
        })
        .await
        .is_err()
    {
        return;
    }

    let mut error = None;
    while let Some(item) = body.next().await {
        match item {
            Ok(data) if data.is_empty() => continue,
            Ok(data) => {
                if events
                    .send(UpstreamEvent::Chunk { generation, data })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    let _ = events
        .send(UpstreamEvent::Finished { generation, error })
        .await;
}
