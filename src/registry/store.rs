//! Viewer registry implementation
//!
//! Holds the attached viewers and fans chunks out to them.

use std::collections::{BTreeMap, BTreeSet};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::protocol::constants::CRLF;
use crate::protocol::Boundary;

use super::entry::{ViewerEntry, ViewerStats};
use super::error::ViewerWriteError;
use super::frame::ViewerId;

/// Result of one broadcast round
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    /// Viewers that received (part of) the chunk
    pub delivered: usize,
    /// Pending viewers for which the chunk held no boundary marker
    pub waiting: usize,
    /// Viewers whose write failed this round
    pub failed: Vec<(ViewerId, ViewerWriteError)>,
}

impl BroadcastOutcome {
    /// Viewers whose output is gone and must go through the detach path
    pub fn closed(&self) -> impl Iterator<Item = ViewerId> + '_ {
        self.failed
            .iter()
            .filter(|(_, e)| *e == ViewerWriteError::Closed)
            .map(|(id, _)| *id)
    }
}

/// Slice `chunk` from the CRLF in front of the marker at `pos`
///
/// The CRLF is prepended when the chunk does not carry it in full.
fn resume_at(chunk: &Bytes, pos: usize) -> Bytes {
    if pos >= CRLF.len() && &chunk[pos - CRLF.len()..pos] == CRLF {
        return chunk.slice(pos - CRLF.len()..);
    }

    let mut out = BytesMut::with_capacity(CRLF.len() + chunk.len() - pos);
    out.put_slice(CRLF);
    out.put_slice(&chunk[pos..]);
    out.freeze()
}

/// Attached viewers plus the subset still waiting for alignment
///
/// Keyed by [`ViewerId`] in ordered collections so iteration is stable and
/// removal never shifts other entries.
#[derive(Debug, Default)]
pub struct ViewerRegistry {
    viewers: BTreeMap<ViewerId, ViewerEntry>,
    pending: BTreeSet<ViewerId>,
}

impl ViewerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer and mark it pending alignment
    ///
    /// Returns false if the id is already registered.
    pub fn admit(&mut self, id: ViewerId, sink: mpsc::Sender<Bytes>) -> bool {
        if self.viewers.contains_key(&id) {
            return false;
        }

        self.viewers.insert(id, ViewerEntry::new(sink));
        self.pending.insert(id);
        true
    }

    /// Remove a viewer (and its pending mark)
    ///
    /// Returns the entry if it was registered, so callers can tell a first
    /// removal from a repeated one.
    pub fn remove(&mut self, id: ViewerId) -> Option<ViewerEntry> {
        self.pending.remove(&id);
        self.viewers.remove(&id)
    }

    /// Write `chunk` to every viewer
    ///
    /// Pending viewers receive the chunk starting at its first boundary
    /// marker, or nothing if it has none. A viewer whose queue is full skips
    /// the chunk and goes back to pending, so it resumes at the next marker
    /// instead of receiving a part with a hole in it. A resuming viewer has
    /// already been sent bytes, so its resumed output starts with the CRLF
    /// that must precede the marker. Failed viewers are reported, never
    /// removed here.
    pub fn broadcast(&mut self, chunk: &Bytes, boundary: &Boundary) -> BroadcastOutcome {
        let aligned_at = boundary.find_in(chunk);
        let mut outcome = BroadcastOutcome::default();

        for (id, entry) in self.viewers.iter_mut() {
            let Some(sink) = entry.sink.as_ref() else {
                continue;
            };

            let pending = self.pending.contains(id);
            let data = if pending {
                match aligned_at {
                    Some(pos) if entry.bytes_sent == 0 => chunk.slice(pos..),
                    Some(pos) => resume_at(chunk, pos),
                    None => {
                        outcome.waiting += 1;
                        continue;
                    }
                }
            } else {
                chunk.clone()
            };

            let len = data.len() as u64;
            match sink.try_send(data) {
                Ok(()) => {
                    entry.bytes_sent += len;
                    if pending {
                        self.pending.remove(id);
                        tracing::debug!(viewer_id = %id, "Viewer aligned to boundary");
                    }
                    outcome.delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    entry.chunks_skipped += 1;
                    self.pending.insert(*id);
                    outcome.failed.push((*id, ViewerWriteError::Lagging));
                }
                Err(TrySendError::Closed(_)) => {
                    entry.end();
                    outcome.failed.push((*id, ViewerWriteError::Closed));
                }
            }
        }

        outcome
    }

    /// End every viewer's output
    ///
    /// Viewers stay registered; each one leaves through its own detach.
    /// Returns the number of outputs that were still open.
    pub fn end(&mut self) -> usize {
        self.viewers.values_mut().map(|e| e.end()).filter(|&ended| ended).count()
    }

    /// Number of attached viewers
    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    /// Whether no viewer is attached
    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    /// Number of viewers still waiting for alignment
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a viewer is attached
    pub fn contains(&self, id: ViewerId) -> bool {
        self.viewers.contains_key(&id)
    }

    /// Whether a viewer still waits for alignment
    pub fn is_pending(&self, id: ViewerId) -> bool {
        self.pending.contains(&id)
    }

    /// Per-viewer statistics
    pub fn viewer_stats(&self, id: ViewerId) -> Option<ViewerStats> {
        self.viewers.get(&id).map(|entry| ViewerStats {
            pending_alignment: self.pending.contains(&id),
            bytes_sent: entry.bytes_sent,
            chunks_skipped: entry.chunks_skipped,
            ended: entry.is_ended(),
        })
    }
}
