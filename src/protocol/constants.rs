//! Protocol constants

use std::time::Duration;

/// Line terminator required in front of every boundary marker
pub const CRLF: &[u8] = b"\r\n";

/// Default HTTP port viewers connect to
pub const DEFAULT_PORT: u16 = 8080;

/// `Cache-Control` sent to viewers
pub const CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// `Pragma` sent to viewers
pub const PRAGMA: &str = "no-cache";

/// `Expires` sent to viewers (fixed date in the past)
pub const EXPIRES: &str = "Mon, 01 Jul 1980 00:00:00 GMT";

/// Chunks queued per viewer before it is considered stalled
pub const DEFAULT_VIEWER_BUFFER: usize = 64;

/// Chunks queued between the upstream reader and the broadcast loop
pub const DEFAULT_UPSTREAM_BUFFER: usize = 32;

/// Time allowed for the upstream to answer with response headers
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
