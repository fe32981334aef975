//! Wire-format parsing for the response headers the resolver relies on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fallback when a source does not declare its content type.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

static QUOTED_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bfilename\s*=\s*"([^"]+)""#).expect("valid regex"));

static BARE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bfilename\s*=\s*([^";\s]+)"#).expect("valid regex"));

/// A parsed `Content-Range: bytes start-end/total` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    /// `None` when the server answered `*` for an unknown length.
    pub total: Option<u64>,
}

/// Parse a `Content-Range` response header.
///
/// Returns `None` for anything that is not a satisfied byte range.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.trim().split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    if end < start {
        return None;
    }
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some(ContentRange { start, end, total })
}

/// Media type of a `Content-Type` header with parameters stripped.
pub fn mime_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// File name announced by a `Content-Disposition` header, if any.
pub fn disposition_file_name(value: &str) -> Option<String> {
    QUOTED_FILENAME
        .captures(value)
        .or_else(|| BARE_FILENAME.captures(value))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}
