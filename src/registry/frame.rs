//! Viewer identifiers

use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identifier for one attached viewer
///
/// Identifiers are never reused within a process, so a late disconnect
/// signal can never remove a different viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewerId(u64);

impl ViewerId {
    /// Wrap a raw identifier
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of [`ViewerId`]s
#[derive(Debug)]
pub struct ViewerIdGenerator {
    next: AtomicU64,
}

impl ViewerIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next identifier
    pub fn next_id(&self) -> ViewerId {
        ViewerId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ViewerIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
