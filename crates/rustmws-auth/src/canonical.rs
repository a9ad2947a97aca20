//! Canonical request construction for Signature Version 2.
//!
//! The string to sign is:
//!
//! ```text
//! HTTPRequestMethod\n
//! Host\n
//! CanonicalPath\n
//! CanonicalQueryString
//! ```
//!
//! Keys and values are percent-encoded with the RFC 3986 unreserved set minus
//! `~`: the tilde is emitted as `%7E` and never restored afterwards. The
//! service has always accepted this form, so it is kept for wire
//! compatibility.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters that must be percent-encoded in keys, values, and path segments.
///
/// Everything except `A-Z`, `a-z`, `0-9`, `-`, `_`, `.` is encoded, which
/// includes `~`.
const PARAM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Percent-encode a single key, value, or path segment.
///
/// # Examples
///
/// ```
/// use rustmws_auth::canonical::encode_component;
///
/// assert_eq!(encode_component("2024-01-01T00:00:00Z"), "2024-01-01T00%3A00%3A00Z");
/// assert_eq!(encode_component("a~b c"), "a%7Eb%20c");
/// ```
#[must_use]
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, PARAM_ENCODE_SET).to_string()
}

/// Build the canonical path by encoding each `/`-delimited segment individually.
///
/// Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use rustmws_auth::canonical::build_canonical_path;
///
/// assert_eq!(build_canonical_path("/Orders/2013-09-01"), "/Orders/2013-09-01");
/// assert_eq!(build_canonical_path(""), "/");
/// ```
#[must_use]
pub fn build_canonical_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string from unordered key/value pairs.
///
/// Pairs are sorted by key in byte order (then by value for duplicate keys),
/// each side is encoded with [`encode_component`], and the result is joined
/// as `key=value` pairs separated by `&`.
///
/// # Examples
///
/// ```
/// use rustmws_auth::canonical::build_canonical_query;
///
/// assert_eq!(build_canonical_query([("b", "2"), ("a", "1")]), "a=1&b=2");
/// assert_eq!(build_canonical_query([("Z", "x"), ("a", "y")]), "Z=x&a=y");
/// ```
#[must_use]
pub fn build_canonical_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut params: Vec<(&str, &str)> = params.into_iter().collect();
    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Assemble the string to sign from its already-canonical components.
#[must_use]
pub fn build_string_to_sign(method: &str, host: &str, path: &str, query: &str) -> String {
    let canonical_path = build_canonical_path(path);
    format!("{method}\n{host}\n{canonical_path}\n{query}")
}
