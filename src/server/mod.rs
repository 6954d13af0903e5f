//! HTTP server implementation
//!
//! Viewers connect here; each request attaches to the shared
//! [`ProxySession`](crate::session::ProxySession) and streams its output.

pub mod config;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;
