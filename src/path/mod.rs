//! Path string helpers shared by the matcher.

use std::borrow::Cow;

/// Percent-decodes a captured path segment into its logical value.
///
/// Decodes `%XX` escapes only (`+` is left alone — it is not a space inside
/// a path); invalid UTF-8 after decoding is replaced rather than rejected,
/// since a route capture must always yield a string.
///
/// # Examples
///
/// ```
/// use pathway_router::path::unescape_uri;
///
/// assert_eq!(unescape_uri("caf%C3%A9"), "café");
/// assert_eq!(unescape_uri("a+b"), "a+b");
/// ```
pub fn unescape_uri(segment: &str) -> String {
    match urlencoding::decode_binary(segment.as_bytes()) {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Cow::Owned(bytes) => match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        },
    }
}

/// Ensures a path begins with `/`, as `path_info` must after an unanchored
/// route strips its mount prefix.
pub fn ensure_leading_slash(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}
