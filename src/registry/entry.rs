//! Per-viewer entry and statistics
//!
//! This module defines the per-viewer state stored in the registry.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

/// Entry for a single attached viewer
#[derive(Debug)]
pub struct ViewerEntry {
    /// Output queue feeding the viewer's response body (None once ended)
    pub(super) sink: Option<mpsc::Sender<Bytes>>,

    /// When the viewer was admitted
    pub admitted_at: Instant,

    /// Bytes handed to the viewer's queue
    pub bytes_sent: u64,

    /// Chunks skipped because the viewer's queue was full
    pub chunks_skipped: u64,
}

impl ViewerEntry {
    pub(super) fn new(sink: mpsc::Sender<Bytes>) -> Self {
        Self {
            sink: Some(sink),
            admitted_at: Instant::now(),
            bytes_sent: 0,
            chunks_skipped: 0,
        }
    }

    /// Whether the viewer's output has been ended
    pub fn is_ended(&self) -> bool {
        self.sink.is_none()
    }

    /// Drop the output queue, ending the viewer's response body
    pub(super) fn end(&mut self) -> bool {
        self.sink.take().is_some()
    }

    /// Time since admission
    pub fn duration(&self) -> Duration {
        self.admitted_at.elapsed()
    }
}

/// Statistics for a viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerStats {
    /// Still waiting for a boundary-aligned chunk
    pub pending_alignment: bool,
    /// Bytes handed to the viewer
    pub bytes_sent: u64,
    /// Chunks skipped while stalled
    pub chunks_skipped: u64,
    /// Output already ended
    pub ended: bool,
}
