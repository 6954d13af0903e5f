//! Multipart boundary parsing
//!
//! MJPEG sources declare their part delimiter in the `Content-Type` header,
//! e.g. `multipart/x-mixed-replace;boundary=--myboundary`. Servers are
//! inconsistent about quoting, whitespace and whether the leading `--` is
//! part of the token, so the parser normalizes all of these.

use bytes::Bytes;

use crate::error::ProtocolError;

/// Parameter name that introduces the boundary token
const BOUNDARY_PARAM: &str = "boundary=";

/// Extract the boundary token from a `Content-Type` header value
///
/// Whitespace is stripped before parsing. The token runs from just after
/// `boundary=` to the next `;`, else to the next `\r`, else to the end of
/// the value. Double quotes and a single leading `--` are removed.
pub fn extract_boundary(content_type: &str) -> Result<String, ProtocolError> {
    let compact: String = content_type.chars().filter(|c| !c.is_whitespace()).collect();

    // Lenient on purpose: MIME parameter names are case-insensitive, so `Boundary=` matches too
    let start = find_ascii_ci(&compact, BOUNDARY_PARAM)
        .ok_or_else(|| ProtocolError::MissingBoundary(content_type.to_string()))?
        + BOUNDARY_PARAM.len();

    let rest = &compact[start..];
    let end = rest
        .find(';')
        .or_else(|| rest.find('\r'))
        .unwrap_or(rest.len());

    let unquoted: String = rest[..end].chars().filter(|&c| c != '"').collect();
    let token = unquoted.strip_prefix("--").unwrap_or(&unquoted);

    if token.is_empty() {
        return Err(ProtocolError::EmptyBoundary);
    }

    Ok(token.to_string())
}

/// Case-insensitive search for an ASCII needle
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Find the first occurrence of `needle` in `haystack`
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A parsed boundary token together with its on-the-wire marker
///
/// The marker (`--<token>`) is what actually appears in the body in front
/// of every part. It is cheap to clone since the marker is a `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: String,
    marker: Bytes,
}

impl Boundary {
    /// Create a boundary from an already-normalized token
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let marker = Bytes::from(format!("--{}", token));
        Self { token, marker }
    }

    /// Parse a boundary from an upstream `Content-Type` header value
    pub fn from_content_type(content_type: &str) -> Result<Self, ProtocolError> {
        extract_boundary(content_type).map(Self::new)
    }

    /// The bare token, without the leading `--`
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The `--<token>` marker as it appears in the body
    pub fn marker(&self) -> &[u8] {
        &self.marker
    }

    /// Position of the first marker in `data`
    pub fn find_in(&self, data: &[u8]) -> Option<usize> {
        find_bytes(data, &self.marker)
    }

    /// `Content-Type` value announced to viewers
    pub fn content_type(&self) -> String {
        format!("multipart/x-mixed-replace;boundary={}", self.token)
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_with_dashes_and_crlf() {
        let token = extract_boundary("multipart/x-mixed-replace;boundary=--abc123\r\n").unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_extract_plain() {
        let token = extract_boundary("multipart/x-mixed-replace;boundary=myboundary").unwrap();
        assert_eq!(token, "myboundary");
    }

    #[test]
    fn test_extract_followed_by_param() {
        let token =
            extract_boundary("multipart/x-mixed-replace; boundary=frame; charset=utf-8").unwrap();
        assert_eq!(token, "frame");
    }

    #[test]
    fn test_extract_quoted() {
        let token = extract_boundary("multipart/x-mixed-replace; boundary=\"--frame\"").unwrap();
        assert_eq!(token, "frame");
    }

    #[test]
    fn test_extract_stray_whitespace() {
        // Some cameras put whitespace inside the parameter
        let token = extract_boundary("multipart/x-mixed-replace ; boundary = -- cam 01 ").unwrap();
        assert_eq!(token, "cam01");
    }

    #[test]
    fn test_extract_bare_carriage_return() {
        let token = extract_boundary("multipart/x-mixed-replace;boundary=abc\r").unwrap();
        assert_eq!(token, "abc");
    }

    #[test]
    fn test_extract_case_insensitive_param() {
        let token = extract_boundary("multipart/x-mixed-replace;Boundary=Frame").unwrap();
        assert_eq!(token, "Frame");
    }

    #[test]
    fn test_only_one_leading_dash_pair_stripped() {
        let token = extract_boundary("multipart/x-mixed-replace;boundary=----abc").unwrap();
        assert_eq!(token, "--abc");
    }

    #[test]
    fn test_extract_is_idempotent() {
        let first = extract_boundary("multipart/x-mixed-replace;boundary=--abc123\r\n").unwrap();
        let canonical = Boundary::new(first.clone()).content_type();
        let second = extract_boundary(&canonical).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_boundary() {
        let result = extract_boundary("image/jpeg");
        assert!(matches!(result, Err(ProtocolError::MissingBoundary(_))));
    }

    #[test]
    fn test_empty_boundary() {
        let result = extract_boundary("multipart/x-mixed-replace;boundary=\"\"");
        assert!(matches!(result, Err(ProtocolError::EmptyBoundary)));

        let result = extract_boundary("multipart/x-mixed-replace;boundary=--");
        assert!(matches!(result, Err(ProtocolError::EmptyBoundary)));
    }

    #[test]
    fn test_boundary_marker() {
        let boundary = Boundary::new("frame");
        assert_eq!(boundary.token(), "frame");
        assert_eq!(boundary.marker(), b"--frame");
        assert_eq!(
            boundary.content_type(),
            "multipart/x-mixed-replace;boundary=frame"
        );
    }

    #[test]
    fn test_find_in() {
        let boundary = Boundary::new("frame");
        assert_eq!(boundary.find_in(b"xx\r\n--frame\r\n"), Some(4));
        assert_eq!(boundary.find_in(b"--fram"), None);
        assert_eq!(boundary.find_in(b""), None);
    }

    #[test]
    fn test_find_bytes_edge_cases() {
        assert_eq!(find_bytes(b"abc", b""), None);
        assert_eq!(find_bytes(b"ab", b"abc"), None);
        assert_eq!(find_bytes(b"abcabc", b"ca"), Some(2));
    }
}
