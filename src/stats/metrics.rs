//! Statistics for the relay

use crate::session::SessionPhase;

/// Snapshot of one proxy session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStats {
    /// Current lifecycle phase
    pub phase: SessionPhase,
    /// Boundary token of the live connection
    pub boundary: Option<String>,
    /// Attached viewers
    pub viewers: usize,
    /// Viewers waiting for a boundary-aligned chunk
    pub pending_viewers: usize,
    /// Viewers waiting for upstream headers
    pub waiting_viewers: usize,
    /// Upstream connection attempts started
    pub connections_opened: u64,
    /// Upstream connections torn down
    pub connections_closed: u64,
    /// Chunks received from upstream
    pub chunks_received: u64,
    /// Bytes received from upstream (after CRLF repair)
    pub bytes_received: u64,
    /// Chunks that needed a CRLF inserted
    pub chunks_repaired: u64,
    /// Chunks skipped for stalled viewers
    pub chunks_skipped: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            boundary: None,
            viewers: 0,
            pending_viewers: 0,
            waiting_viewers: 0,
            connections_opened: 0,
            connections_closed: 0,
            chunks_received: 0,
            bytes_received: 0,
            chunks_repaired: 0,
            chunks_skipped: 0,
        }
    }

    /// Whether an upstream connection is currently open or opening
    pub fn upstream_open(&self) -> bool {
        self.connections_opened > self.connections_closed
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_new() {
        let stats = RelayStats::new();
        assert_eq!(stats.phase, SessionPhase::Idle);
        assert_eq!(stats.viewers, 0);
        assert_eq!(stats.connections_opened, 0);
        assert!(stats.boundary.is_none());
        assert!(!stats.upstream_open());
    }

    #[test]
    fn test_upstream_open() {
        let mut stats = RelayStats::new();
        stats.connections_opened = 2;
        stats.connections_closed = 1;
        assert!(stats.upstream_open());

        stats.connections_closed = 2;
        assert!(!stats.upstream_open());
    }
}
