//! # mjpeg-relay
//!
//! A relay for multipart MJPEG streams. One upstream connection to an
//! MJPEG source (typically a LAN camera) is shared by any number of HTTP
//! viewers.
//!
//! - The upstream connection is opened when the first viewer arrives and
//!   closed when the last one leaves
//! - Late joiners start at the next part boundary, never mid-image
//! - Encoders that omit the CRLF before a boundary marker are repaired
//!
//! # Example
//!
//! ```no_run
//! use mjpeg_relay::{RelayServer, ServerConfig, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> mjpeg_relay::error::Result<()> {
//!     let session = SessionConfig::parse(Some("http://192.168.1.20/video.mjpg"))?;
//!     let config = ServerConfig::new(session).port(8081);
//!
//!     let server = RelayServer::new(config)?;
//!     server.run().await
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use server::{RelayServer, ServerConfig};
pub use session::{ProxySession, SessionConfig};
pub use stats::RelayStats;
