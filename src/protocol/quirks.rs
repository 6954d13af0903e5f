//! Encoder framing quirks
//!
//! Several MJPEG sources emit multipart bodies that are not quite
//! conformant. This module documents the ones the relay repairs.
//!
//! # Known Quirks
//!
//! ## Missing CRLF before the boundary marker
//! - Some camera firmware and streaming servers write `--<token>` directly
//!   after the JPEG payload instead of `\r\n--<token>`
//! - Desktop browsers tolerate it, mobile engines (iOS Safari) stop rendering
//!
//! ## Inconsistent boundary declaration
//! - `--` prefix present or absent in the `Content-Type` token
//! - Quotes and stray whitespace around the parameter
//! - Handled by [`crate::protocol::boundary`]

use bytes::{BufMut, Bytes, BytesMut};

use super::boundary::Boundary;
use super::constants::CRLF;

/// Inserts the CRLF some encoders omit in front of a boundary marker
///
/// Only the first marker in each chunk is checked, matching the
/// one-marker-per-chunk framing most sources use. A marker at the very
/// start of a chunk is checked against the last two bytes of the previous
/// one, so the repair also works when the CRLF would straddle two chunks.
#[derive(Debug, Default)]
pub struct CrlfRealigner {
    /// Last two bytes of the previous output chunk (None before the first byte)
    trailing: Option<[u8; 2]>,

    /// Number of chunks that needed a CRLF inserted
    repaired: u64,
}

impl CrlfRealigner {
    /// Create a realigner for a fresh upstream connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Repair `chunk` if needed and remember its tail for the next call
    pub fn realign(&mut self, chunk: Bytes, boundary: &Boundary) -> Bytes {
        let output = match boundary.find_in(&chunk) {
            Some(pos) if needs_crlf(self.trailing, &chunk[..pos]) => {
                self.repaired += 1;
                tracing::trace!(position = pos, "Inserting missing CRLF before boundary");

                let mut fixed = BytesMut::with_capacity(chunk.len() + CRLF.len());
                fixed.put_slice(&chunk[..pos]);
                fixed.put_slice(CRLF);
                fixed.put_slice(&chunk[pos..]);
                fixed.freeze()
            }
            _ => chunk,
        };

        self.update_trailing(&output);
        output
    }

    /// Last two bytes seen so far
    pub fn trailing(&self) -> Option<[u8; 2]> {
        self.trailing
    }

    /// Number of repaired chunks
    pub fn repaired(&self) -> u64 {
        self.repaired
    }

    fn update_trailing(&mut self, output: &[u8]) {
        match output.len() {
            0 => {}
            1 => {
                // Slide the window: previous last byte becomes the second-to-last
                let prev = self.trailing.map(|t| t[1]).unwrap_or(0);
                self.trailing = Some([prev, output[0]]);
            }
            n => self.trailing = Some([output[n - 2], output[n - 1]]),
        }
    }
}

/// Whether the two bytes in front of a marker are something other than CRLF
///
/// `head` is the part of the current chunk before the marker. Bytes that
/// fall before the chunk start come from `trailing`. A marker at the very
/// start of the stream has nothing in front of it and needs no repair.
fn needs_crlf(trailing: Option<[u8; 2]>, head: &[u8]) -> bool {
    let (before2, before1) = match (head.len(), trailing) {
        (0, None) => return false,
        (0, Some(t)) => (Some(t[0]), t[1]),
        (1, t) => (t.map(|t| t[1]), head[0]),
        (n, _) => (Some(head[n - 2]), head[n - 1]),
    };

    !(before2 == Some(b'\r') && before1 == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> Boundary {
        Boundary::new("frame")
    }

    fn run(chunks: &[&'static [u8]]) -> (Vec<Bytes>, CrlfRealigner) {
        let boundary = boundary();
        let mut realigner = CrlfRealigner::new();
        let out = chunks
            .iter()
            .map(|c| realigner.realign(Bytes::from_static(c), &boundary))
            .collect();
        (out, realigner)
    }

    #[test]
    fn test_well_formed_stream_untouched() {
        let (out, realigner) = run(&[
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nAAAA",
            b"\r\n--frame\r\n\r\nBBBB",
        ]);

        assert_eq!(&out[0][..], b"--frame\r\nContent-Type: image/jpeg\r\n\r\nAAAA");
        assert_eq!(&out[1][..], b"\r\n--frame\r\n\r\nBBBB");
        assert_eq!(realigner.repaired(), 0);
    }

    #[test]
    fn test_missing_crlf_inside_chunk() {
        let (out, realigner) = run(&[b"--frame\r\n\r\nAAAA", b"BBBB--frame\r\n\r\nCCCC"]);

        assert_eq!(&out[1][..], b"BBBB\r\n--frame\r\n\r\nCCCC");
        assert_eq!(realigner.repaired(), 1);
    }

    #[test]
    fn test_missing_crlf_at_chunk_start() {
        let (out, _) = run(&[b"--frame\r\n\r\nAAAA", b"--frame\r\n\r\nBBBB"]);

        assert_eq!(&out[1][..], b"\r\n--frame\r\n\r\nBBBB");
    }

    #[test]
    fn test_crlf_split_across_chunks_not_duplicated() {
        let (out, realigner) = run(&[b"--frame\r\n\r\nAAAA\r\n", b"--frame\r\n\r\nBBBB"]);

        assert_eq!(&out[1][..], b"--frame\r\n\r\nBBBB");
        assert_eq!(realigner.repaired(), 0);
    }

    #[test]
    fn test_crlf_straddling_single_byte_offset() {
        // '\r' ends the previous chunk, '\n' starts this one
        let (out, realigner) = run(&[b"--frame\r\n\r\nAAAA\r", b"\n--frame\r\n\r\nBBBB"]);

        assert_eq!(&out[1][..], b"\n--frame\r\n\r\nBBBB");
        assert_eq!(realigner.repaired(), 0);
    }

    #[test]
    fn test_single_byte_offset_without_crlf() {
        let (out, _) = run(&[b"--frame\r\n\r\nAAAA", b"A--frame\r\n\r\nBBBB"]);

        assert_eq!(&out[1][..], b"A\r\n--frame\r\n\r\nBBBB");
    }

    #[test]
    fn test_stream_start_needs_no_crlf() {
        let (out, realigner) = run(&[b"--frame\r\n\r\nAAAA"]);

        assert_eq!(&out[0][..], b"--frame\r\n\r\nAAAA");
        assert_eq!(realigner.trailing(), Some(*b"AA"));
    }

    #[test]
    fn test_only_first_marker_checked() {
        let (out, _) = run(&[b"--frame\r\n\r\nA", b"B--frame\r\n\r\nC--frame\r\n\r\nD"]);

        assert_eq!(&out[1][..], b"B\r\n--frame\r\n\r\nC--frame\r\n\r\nD");
    }

    #[test]
    fn test_chunk_without_marker_passes_through() {
        let (out, realigner) = run(&[b"--frame\r\n\r\nAAAA", b"BBBBBBBB"]);

        assert_eq!(&out[1][..], b"BBBBBBBB");
        assert_eq!(realigner.trailing(), Some(*b"BB"));
    }

    #[test]
    fn test_trailing_taken_from_repaired_output() {
        let boundary = boundary();
        let mut realigner = CrlfRealigner::new();
        realigner.realign(Bytes::from_static(b"--frame\r\n\r\nAAAA"), &boundary);

        // The whole chunk is just the marker; output grows by the CRLF
        let out = realigner.realign(Bytes::from_static(b"--frame"), &boundary);
        assert_eq!(&out[..], b"\r\n--frame");
        assert_eq!(realigner.trailing(), Some(*b"me"));
    }

    #[test]
    fn test_one_byte_chunks_slide_window() {
        let boundary = boundary();
        let mut realigner = CrlfRealigner::new();
        realigner.realign(Bytes::from_static(b"--frame\r\n\r\nAAAA"), &boundary);
        realigner.realign(Bytes::from_static(b"\r"), &boundary);
        realigner.realign(Bytes::from_static(b"\n"), &boundary);

        assert_eq!(realigner.trailing(), Some(*b"\r\n"));

        let out = realigner.realign(Bytes::from_static(b"--frame\r\n"), &boundary);
        assert_eq!(&out[..], b"--frame\r\n");
    }
}
