//! Viewer registry for chunk fan-out
//!
//! The registry tracks every attached viewer and the subset that still
//! waits for its first boundary-aligned chunk. It is owned by the session
//! actor, so it needs no locking of its own.
//!
//! # Architecture
//!
//! ```text
//!                     session actor (single writer)
//!                   ┌───────────────────────────────┐
//!                   │ ViewerRegistry {              │
//!                   │   viewers: BTreeMap<Id, Tx>,  │
//!                   │   pending: BTreeSet<Id>,      │
//!                   │ }                             │
//!                   └──────────────┬────────────────┘
//!                                  │ broadcast(chunk)
//!          ┌───────────────────────┼───────────────────────┐
//!          ▼                       ▼                       ▼
//!     [Viewer #1]             [Viewer #2]             [Viewer #3]
//!     mpsc::Receiver          mpsc::Receiver          mpsc::Receiver
//!          │                       │                       │
//!          └──────► HTTP response body stream ◄────────────┘
//! ```
//!
//! # Zero-Copy Design
//!
//! Chunks are `bytes::Bytes`. Every viewer receives a reference-counted
//! handle (or a `slice` of it when aligning a late joiner); the payload is
//! never copied per viewer.

pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use entry::{ViewerEntry, ViewerStats};
pub use error::ViewerWriteError;
pub use frame::ViewerId;
pub use store::{BroadcastOutcome, ViewerRegistry};
