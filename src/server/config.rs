//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::protocol::constants::DEFAULT_PORT;
use crate::session::SessionConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address viewers connect to
    pub bind_addr: SocketAddr,

    /// The proxied upstream source
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Listen on all interfaces at the default port
    pub fn new(session: SessionConfig) -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            session,
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set only the port, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionConfig {
        SessionConfig::parse(Some("http://camera.local/video.mjpg")).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::new(session());

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.session.upstream_url.host_str(), Some("camera.local"));
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::new(session()).bind(addr).port(9001);

        assert_eq!(config.bind_addr, "127.0.0.1:9001".parse().unwrap());
    }
}
