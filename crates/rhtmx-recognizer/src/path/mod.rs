//! Path normalization and percent-encoding utilities
//!
//! The recognizer never decodes paths on its own. It asks a [`PathNormalizer`]
//! for the working path it walks the automaton with, and uses the helpers here
//! to encode generated segments and decode captured ones.
//!
//! All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// Everything except ASCII alphanumerics and `- _ . ! ~ * ' ( )`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// [`COMPONENT`] minus the sub-delimiters that are legal inside a path segment
const PATH_SEGMENT: &AsciiSet = &COMPONENT
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Escapes of reserved characters that URI-level decoding must keep encoded:
/// `# $ & + , / : ; = ? @`
static RESERVED_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(?:2[346BCFbcf]|3[ABDFabdf]|40)").unwrap());

/// Normalization policy applied to incoming paths and static pattern segments
///
/// Implementations must be deterministic: the same segment is normalized once at
/// registration time (static literals) and again for every recognized path.
pub trait PathNormalizer: Send + Sync {
    /// Normalizes a single slash-free segment
    fn normalize_segment<'a>(&self, segment: &'a str) -> Cow<'a, str>;

    /// Normalizes a whole path, segment by segment
    fn normalize_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        let segments: Vec<Cow<'_, str>> = path
            .split('/')
            .map(|segment| self.normalize_segment(segment))
            .collect();

        let joined = segments.join("/");
        if joined == path {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(joined)
        }
    }
}

/// Default policy: decode percent escapes except those that would change the path structure
///
/// `%` and `/` are re-encoded after decoding, so `a%2Fb` stays one segment and
/// `100%25` keeps its literal percent sign. Every other escape is decoded, and
/// surviving escapes come out in uppercase hex.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::path::{PathNormalizer, PercentNormalizer};
///
/// let normalizer = PercentNormalizer;
/// assert_eq!(normalizer.normalize_segment("caf%C3%A9"), "café");
/// assert_eq!(normalizer.normalize_segment("a%2fb"), "a%2Fb");
/// assert_eq!(normalizer.normalize_path("/foo%20bar/a%2Fb"), "/foo bar/a%2Fb");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentNormalizer;

impl PathNormalizer for PercentNormalizer {
    fn normalize_segment<'a>(&self, segment: &'a str) -> Cow<'a, str> {
        // Fast path: nothing that could be an escape
        if segment.len() < 3 || !segment.contains('%') {
            return Cow::Borrowed(segment);
        }

        if !has_well_formed_escapes(segment) {
            tracing::trace!("Leaving malformed segment undecoded: {}", segment);
            return Cow::Borrowed(segment);
        }

        match urlencoding::decode(segment) {
            Ok(decoded) => Cow::Owned(decoded.replace('%', "%25").replace('/', "%2F")),
            Err(e) => {
                tracing::trace!("Leaving segment undecoded ({}): {}", e, segment);
                Cow::Borrowed(segment)
            }
        }
    }
}

/// Policy that leaves every path untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl PathNormalizer for IdentityNormalizer {
    fn normalize_segment<'a>(&self, segment: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(segment)
    }

    fn normalize_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(path)
    }
}

/// Percent-encodes a URI component
///
/// ASCII alphanumerics and `- _ . ! ~ * ' ( )` pass through, everything else is
/// encoded as UTF-8 escapes. Returns `Cow::Borrowed` when nothing needs encoding.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::path::encode_uri_component;
///
/// assert_eq!(encode_uri_component("hello world"), "hello%20world");
/// assert_eq!(encode_uri_component("a/b?c"), "a%2Fb%3Fc");
/// assert_eq!(encode_uri_component("(ok)!"), "(ok)!");
/// ```
pub fn encode_uri_component(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, COMPONENT).into()
}

/// Percent-encodes a value destined for one path segment
///
/// Same as [`encode_uri_component`] but keeps `$ & + , ; = : @` literal, since
/// they are legal inside a segment.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::path::encode_path_segment;
///
/// assert_eq!(encode_path_segment("a b"), "a%20b");
/// assert_eq!(encode_path_segment("user@host:80"), "user@host:80");
/// assert_eq!(encode_path_segment("a/b"), "a%2Fb");
/// ```
pub fn encode_path_segment(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, PATH_SEGMENT).into()
}

/// Decodes a URI, keeping escapes of reserved characters intact
///
/// Used when segment encoding is disabled: `%20` becomes a space but `%2F`
/// stays encoded so it can never turn into a separator. Input that does not
/// decode to valid UTF-8 is returned unchanged.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::path::decode_uri;
///
/// assert_eq!(decode_uri("/foo%20bar"), "/foo bar");
/// assert_eq!(decode_uri("/a%2Fb%3Fc"), "/a%2Fb%3Fc");
/// ```
pub fn decode_uri(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }

    let mut decoded = String::with_capacity(path.len());
    let mut last = 0;

    for reserved in RESERVED_ESCAPE.find_iter(path) {
        match urlencoding::decode(&path[last..reserved.start()]) {
            Ok(part) => decoded.push_str(&part),
            Err(_) => return Cow::Borrowed(path),
        }
        decoded.push_str(reserved.as_str());
        last = reserved.end();
    }

    match urlencoding::decode(&path[last..]) {
        Ok(part) => decoded.push_str(&part),
        Err(_) => return Cow::Borrowed(path),
    }

    Cow::Owned(decoded)
}

/// Every `%` must start a two-digit hex escape
pub(crate) fn has_well_formed_escapes(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || (i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_segment_short_or_plain_is_borrowed() {
        let normalizer = PercentNormalizer;
        assert!(matches!(normalizer.normalize_segment("ab"), Cow::Borrowed("ab")));
        assert!(matches!(
            normalizer.normalize_segment("plain"),
            Cow::Borrowed("plain")
        ));
    }

    #[test]
    fn test_normalize_segment_keeps_structure() {
        let normalizer = PercentNormalizer;
        assert_eq!(normalizer.normalize_segment("100%25"), "100%25");
        assert_eq!(normalizer.normalize_segment("a%2fb"), "a%2Fb");
        assert_eq!(normalizer.normalize_segment("%7Euser"), "~user");
    }

    #[test]
    fn test_normalize_segment_malformed_is_unchanged() {
        let normalizer = PercentNormalizer;
        assert_eq!(normalizer.normalize_segment("bad%zz"), "bad%zz");
        assert_eq!(normalizer.normalize_segment("tail%2"), "tail%2");
        assert_eq!(normalizer.normalize_segment("%FF%FE"), "%FF%FE");
    }

    #[test]
    fn test_normalize_path_borrowed_when_unchanged() {
        let normalizer = PercentNormalizer;
        let path = normalizer.normalize_path("/users/123");
        assert!(matches!(path, Cow::Borrowed("/users/123")));
    }

    #[test]
    fn test_identity_normalizer() {
        let normalizer = IdentityNormalizer;
        assert_eq!(normalizer.normalize_path("/foo%20bar"), "/foo%20bar");
    }

    #[test]
    fn test_encode_unicode() {
        assert_eq!(encode_uri_component("café"), "caf%C3%A9");
        assert_eq!(encode_path_segment("日本"), "%E6%97%A5%E6%9C%AC");
    }

    #[test]
    fn test_encode_component_vs_segment() {
        assert_eq!(encode_uri_component("a+b=c"), "a%2Bb%3Dc");
        assert_eq!(encode_path_segment("a+b=c"), "a+b=c");
    }

    #[test]
    fn test_encode_sets() {
        assert!(matches!(encode_path_segment("a-b_c.d"), Cow::Borrowed("a-b_c.d")));
        assert_eq!(encode_uri_component("$&+,;=:@"), "%24%26%2B%2C%3B%3D%3A%40");
        assert_eq!(encode_path_segment("$&+,;=:@"), "$&+,;=:@");
        assert_eq!(encode_path_segment("a/b?c#d%"), "a%2Fb%3Fc%23d%25");
    }

    #[test]
    fn test_decode_uri_mixed() {
        assert_eq!(decode_uri("/caf%C3%A9/%23tag%20x"), "/café/%23tag x");
        assert!(matches!(decode_uri("/plain"), Cow::Borrowed("/plain")));
    }
}
