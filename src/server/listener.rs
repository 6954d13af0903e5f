//! Relay server listener
//!
//! Binds the viewer-facing HTTP socket and routes every request into the
//! shared proxy session.

use std::future::Future;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::server::config::ServerConfig;
use crate::server::handler::proxy_request;
use crate::session::{ProxySession, UpstreamConnector};

/// MJPEG relay server
///
/// Every request path is served the same stream; viewers share a single
/// upstream connection through the [`ProxySession`].
pub struct RelayServer {
    config: ServerConfig,
    session: ProxySession,
}

impl RelayServer {
    /// Create a server that reaches the upstream over HTTP(S)
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let session = ProxySession::http(config.session.clone())?;
        Ok(Self { config, session })
    }

    /// Create a server with a custom upstream connector
    pub fn with_connector<C: UpstreamConnector>(config: ServerConfig, connector: C) -> Self {
        let session = ProxySession::new(config.session.clone(), connector);
        Self { config, session }
    }

    /// The session shared by all viewers
    pub fn session(&self) -> &ProxySession {
        &self.session
    }

    /// HTTP routes
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(proxy_request))
            .with_state(self.session.clone())
    }

    /// Serve viewers on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            upstream = %self.session.upstream_url(),
            "MJPEG relay listening"
        );

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::session::{SessionConfig, SessionPhase, UpstreamResponse};
    use reqwest::Url;

    struct OfflineCamera;

    impl UpstreamConnector for OfflineCamera {
        async fn connect(
            &self,
            _url: &Url,
        ) -> std::result::Result<UpstreamResponse, TransportError> {
            Err(TransportError::Status(503))
        }
    }

    #[tokio::test]
    async fn test_custom_connector_failure_is_bad_gateway() {
        let session = SessionConfig::parse(Some("http://camera.local/video.mjpg")).unwrap();
        let server = std::sync::Arc::new(RelayServer::with_connector(
            ServerConfig::new(session),
            OfflineCamera,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serving = std::sync::Arc::clone(&server);
        tokio::spawn(async move { serving.serve(listener).await });

        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

        // Only the root path is relayed
        let response = reqwest::get(format!("http://{}/other", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let stats = server.session().stats().await.unwrap();
        assert_eq!(stats.phase, SessionPhase::Idle);
        assert_eq!(stats.connections_opened, 1);
        assert_eq!(stats.connections_closed, 1);
    }

    #[tokio::test]
    async fn test_bind_failure_is_io_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap();

        let session = SessionConfig::parse(Some("http://127.0.0.1:9/stream")).unwrap();
        let server = RelayServer::new(ServerConfig::new(session).bind(addr)).unwrap();

        let result = server.run_until(std::future::pending()).await;
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let session = SessionConfig::parse(Some("http://127.0.0.1:9/stream")).unwrap();
        let config = ServerConfig::new(session).bind("127.0.0.1:0".parse().unwrap());
        let server = RelayServer::new(config).unwrap();

        tokio_test::assert_ok!(server.run_until(async {}).await);
    }
}
