//! Multipart MJPEG framing
//!
//! This module provides:
//! - Boundary token parsing from upstream `Content-Type` headers
//! - CRLF repair for encoders that omit it before boundary markers
//! - Response header constants

pub mod boundary;
pub mod constants;
pub mod quirks;

pub use boundary::{extract_boundary, Boundary};
pub use quirks::CrlfRealigner;
