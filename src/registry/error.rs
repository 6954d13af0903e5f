//! Viewer write errors

/// Why a chunk could not be handed to a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerWriteError {
    /// The viewer's response stream is gone (client disconnected)
    Closed,
    /// The viewer's queue is full; the chunk was skipped
    Lagging,
}

impl std::fmt::Display for ViewerWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerWriteError::Closed => write!(f, "Viewer output closed"),
            ViewerWriteError::Lagging => write!(f, "Viewer output queue full"),
        }
    }
}

impl std::error::Error for ViewerWriteError {}
