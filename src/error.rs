//! Error types
//!
//! Everything inside the relay core is contained and logged where it
//! happens. Only [`ConfigError`] is allowed to stop the process.

use std::fmt;
use std::io;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Invalid startup configuration
    Config(ConfigError),
    /// Upstream framing could not be understood
    Protocol(ProtocolError),
    /// Upstream connection failed
    Transport(TransportError),
    /// The upstream stream ended before the viewer could be admitted
    UpstreamEnded,
    /// The session actor is no longer running
    SessionClosed,
    /// Local I/O error (listener bind, accept)
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::UpstreamEnded => write!(f, "Upstream stream has ended"),
            Error::SessionClosed => write!(f, "Proxy session is closed"),
            Error::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Startup configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No upstream MJPEG URL was given
    MissingUpstreamUrl,
    /// The upstream URL could not be parsed or has an unsupported scheme
    InvalidUpstreamUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingUpstreamUrl => {
                write!(f, "Please provide the MJPEG URL as a command line argument")
            }
            ConfigError::InvalidUpstreamUrl(reason) => {
                write!(f, "Invalid upstream URL: {}", reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Upstream framing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The upstream response carried no `Content-Type`
    MissingContentType,
    /// `boundary=` is absent from the `Content-Type` value
    MissingBoundary(String),
    /// `boundary=` is present but the token is empty
    EmptyBoundary,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingContentType => write!(f, "Upstream sent no Content-Type"),
            ProtocolError::MissingBoundary(ct) => {
                write!(f, "No boundary in Content-Type: {}", ct)
            }
            ProtocolError::EmptyBoundary => write!(f, "Empty boundary token"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Upstream connection errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset, DNS or TLS failure
    Connect(String),
    /// No response headers within the connect timeout
    Timeout,
    /// Upstream answered with a non-success status
    Status(u16),
    /// Reading the body failed mid-stream
    Body(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(reason) => write!(f, "Connection failed: {}", reason),
            TransportError::Timeout => write!(f, "Timed out waiting for response headers"),
            TransportError::Status(code) => write!(f, "Upstream returned status {}", code),
            TransportError::Body(reason) => write!(f, "Body read failed: {}", reason),
        }
    }
}

impl std::error::Error for TransportError {}
