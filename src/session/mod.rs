//! Upstream session management
//!
//! A session owns the single upstream connection for one MJPEG source:
//! it opens the connection when the first viewer arrives, parses the
//! boundary, repairs framing, fans chunks out to every viewer and closes
//! the connection once the last viewer leaves.
//!
//! ```text
//!   viewer attach/detach ──► Command (unbounded) ──┐
//!                                                   ▼
//!   upstream body ─► producer task ─► UpstreamEvent ─► SessionActor ─► ViewerRegistry
//!                    (bounded channel)                  (single writer)
//! ```

mod actor;
pub mod config;
pub mod handle;
pub mod state;
pub mod upstream;

pub use config::SessionConfig;
pub use handle::{Admission, ProxySession, ViewerStream};
pub use state::SessionPhase;
pub use upstream::{HttpUpstream, UpstreamConnector, UpstreamResponse};
