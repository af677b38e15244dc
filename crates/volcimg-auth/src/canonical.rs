//! Canonical request construction.
//!
//! The canonical request is the exact byte string the signature covers:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n      <- every header line is newline-terminated
//! \n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Header values are used verbatim. The query string is taken as the caller
//! built it; [`build_query_string`] exists so the URL and the canonical query
//! come from one function and cannot drift apart.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Headers covered by every signature, lexically sorted.
pub const SIGNED_HEADERS: [&str; 4] = ["content-type", "host", "x-content-sha256", "x-date"];

/// Characters that must be percent-encoded in path segments and query parts.
///
/// Everything except RFC 3986 unreserved characters (A-Z, a-z, 0-9, `-`, `_`,
/// `.`, `~`) is encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from its components.
///
/// # Examples
///
/// ```
/// use volcimg_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "POST",
///     "/",
///     "Action=CVProcess&Version=2022-08-31",
///     &[("host", "visual.volcengineapi.com")],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("POST\n/\nAction=CVProcess&Version=2022-08-31\nhost:"));
/// assert!(canonical.contains("visual.volcengineapi.com\n\nhost\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{uri}\n{query_string}\n{canonical_headers}\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by percent-encoding each path segment.
///
/// Forward slashes are preserved and empty paths become `/`. Segments are
/// decoded first so an already encoded path is not encoded twice.
///
/// # Examples
///
/// ```
/// use volcimg_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/a b"), "/a%20b");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build an encoded, sorted query string from raw parameters.
///
/// Parameters are sorted by key, then by value. Keys and values are
/// percent-encoded with the unreserved set. The result is suitable both for the
/// request URL and as the canonical query string.
///
/// # Examples
///
/// ```
/// use volcimg_auth::canonical::build_query_string;
///
/// assert_eq!(
///     build_query_string(&[("Version", "2022-08-31"), ("Action", "CVProcess")]),
///     "Action=CVProcess&Version=2022-08-31"
/// );
/// ```
#[must_use]
pub fn build_query_string(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block.
///
/// Only headers listed in `signed_headers` are included, in sorted order. Names
/// are lowercased; values are used exactly as given. Each line, including the
/// last, ends with `\n`. Repeated headers are joined with commas.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| (*value).to_owned());
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}\n")))
        .collect()
}

/// Build the signed headers list as sorted, semicolon-separated names.
///
/// # Examples
///
/// ```
/// use volcimg_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&["x-date", "host"]),
///     "host;x-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}
