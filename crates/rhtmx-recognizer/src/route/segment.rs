//! Route pattern segments
//!
//! A segment knows three things about itself: how to grow the automaton, which
//! regex fragment extracts it from a path, and how to render itself back into a
//! path during generation.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write;

use crate::automaton::{Automaton, CharSpec, StateId};
use crate::path::{encode_path_segment, has_well_formed_escapes};

/// Extraction fragment for a dynamic segment: one or more non-slash characters
pub const DYNAMIC_FRAGMENT: &str = "([^/]+)";

/// Extraction fragment for a star segment: one or more characters of any kind
pub const STAR_FRAGMENT: &str = "(.+)";

/// One slash-delimited unit of a route pattern
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::route::{classify_segment, Segment};
/// use rhtmx_recognizer::path::PercentNormalizer;
///
/// assert_eq!(classify_segment("posts", &PercentNormalizer), Segment::Static("posts".into()));
/// assert_eq!(classify_segment(":id", &PercentNormalizer), Segment::Dynamic("id".into()));
/// assert_eq!(classify_segment("*path", &PercentNormalizer), Segment::Star("path".into()));
/// assert_eq!(classify_segment("", &PercentNormalizer), Segment::Epsilon);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, already normalized
    Static(String),
    /// `:name` - one non-empty segment without `/`
    Dynamic(String),
    /// `*name` - one or more characters, `/` included
    Star(String),
    /// Empty placeholder from a leading or doubled `/`
    Epsilon,
}

impl Segment {
    /// Parameter name for dynamic and star segments
    pub fn name(&self) -> Option<&str> {
        match self {
            Segment::Dynamic(name) | Segment::Star(name) => Some(name.as_str()),
            Segment::Static(_) | Segment::Epsilon => None,
        }
    }

    /// Whether captured values are percent-decoded on extraction
    ///
    /// Star captures stay raw: they may span `/` and reserved characters.
    pub fn should_decode(&self) -> bool {
        matches!(self, Segment::Dynamic(_))
    }

    /// Digit contributed to the specificity score
    pub fn specificity_digit(&self) -> u8 {
        match self {
            Segment::Star(_) => 1,
            Segment::Epsilon => 2,
            Segment::Dynamic(_) => 3,
            Segment::Static(_) => 4,
        }
    }

    /// Extends the automaton from `state`, returning the state after this segment
    pub(crate) fn extend<H>(&self, automaton: &mut Automaton<H>, state: StateId) -> StateId {
        match self {
            Segment::Static(text) => text.chars().fold(state, |current, ch| {
                automaton.put(current, CharSpec::allow(ch.to_string()))
            }),
            Segment::Dynamic(_) => automaton.put(state, CharSpec::deny("/").repeating()),
            Segment::Star(_) => automaton.put(state, CharSpec::deny("").repeating()),
            Segment::Epsilon => state,
        }
    }

    /// Regex fragment matching this segment (without the leading `/`)
    ///
    /// Static text is stored normalized, so its fragment accepts every character
    /// either literally or percent-encoded (any hex case). That lets extraction
    /// run on the raw path, whatever form the client sent.
    pub fn fragment(&self) -> Cow<'_, str> {
        match self {
            Segment::Static(text) => static_fragment(text).into(),
            Segment::Dynamic(_) => Cow::Borrowed(DYNAMIC_FRAGMENT),
            Segment::Star(_) => Cow::Borrowed(STAR_FRAGMENT),
            Segment::Epsilon => Cow::Borrowed(""),
        }
    }

    /// Renders the segment as output text
    ///
    /// Returns `None` when a named segment has no value in `params`.
    pub fn render<'a>(
        &'a self,
        params: &'a HashMap<String, String>,
        encode: bool,
    ) -> Option<Cow<'a, str>> {
        match self {
            Segment::Static(text) => Some(Cow::Borrowed(text.as_str())),
            Segment::Dynamic(name) => params.get(name).map(|value| {
                if encode {
                    encode_path_segment(value)
                } else {
                    Cow::Borrowed(value.as_str())
                }
            }),
            Segment::Star(name) => params.get(name).map(|value| Cow::Borrowed(value.as_str())),
            Segment::Epsilon => Some(Cow::Borrowed("")),
        }
    }
}

fn static_fragment(text: &str) -> String {
    let mut fragment = String::with_capacity(text.len() * 8);
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        // Escapes the normalizer kept (`%25`, `%2F`) only differ in hex case
        if let Some(escape) = rest
            .get(..3)
            .filter(|escape| escape.starts_with('%') && has_well_formed_escapes(escape))
        {
            let _ = write!(fragment, "(?i:{})", escape);
            rest = &rest[3..];
            continue;
        }

        let mut buf = [0u8; 4];
        let literal = ch.encode_utf8(&mut buf);
        let _ = write!(fragment, "(?:{}|(?i:", regex::escape(literal));
        for byte in literal.bytes() {
            let _ = write!(fragment, "%{:02X}", byte);
        }
        fragment.push_str("))");
        rest = &rest[ch.len_utf8()..];
    }

    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fragments() {
        assert_eq!(Segment::Dynamic("id".into()).fragment(), DYNAMIC_FRAGMENT);
        assert_eq!(Segment::Star("rest".into()).fragment(), STAR_FRAGMENT);
        assert_eq!(Segment::Epsilon.fragment(), "");
    }

    fn static_matches(text: &str, input: &str) -> bool {
        let segment = Segment::Static(text.into());
        let fragment = segment.fragment();
        regex::Regex::new(&format!("^{}$", fragment))
            .unwrap()
            .is_match(input)
    }

    #[rstest]
    #[case("a.b", "a.b", true)]
    #[case("a.b", "axb", false)]
    #[case("a.b", "a%2Eb", true)]
    #[case("a.b", "%61%2e%62", true)]
    #[case("café", "café", true)]
    #[case("café", "caf%C3%A9", true)]
    #[case("café", "caf%c3%a9", true)]
    #[case("café", "cafe", false)]
    #[case("a%2Fb", "a%2Fb", true)]
    #[case("a%2Fb", "a%2fb", true)]
    #[case("a%2Fb", "a/b", false)]
    #[case("100%25", "100%25", true)]
    #[case("bad%zz", "bad%zz", true)]
    fn test_static_fragment_accepts_raw_forms(
        #[case] text: &str,
        #[case] input: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(static_matches(text, input), expected);
    }

    #[test]
    fn test_render_dynamic_encodes_when_enabled() {
        let values = params(&[("id", "a b/c")]);
        let segment = Segment::Dynamic("id".into());
        assert_eq!(segment.render(&values, true).unwrap(), "a%20b%2Fc");
        assert_eq!(segment.render(&values, false).unwrap(), "a b/c");
    }

    #[test]
    fn test_render_star_is_raw() {
        let values = params(&[("path", "a b/c")]);
        let segment = Segment::Star("path".into());
        assert_eq!(segment.render(&values, true).unwrap(), "a b/c");
    }

    #[test]
    fn test_render_missing_param() {
        let segment = Segment::Dynamic("id".into());
        assert!(segment.render(&HashMap::new(), true).is_none());
    }

    #[test]
    fn test_extend_static_adds_one_state_per_char() {
        let mut automaton: Automaton<()> = Automaton::new();
        let end = Segment::Static("abc".into()).extend(&mut automaton, crate::automaton::ROOT);
        assert_eq!(automaton.len(), 4);
        assert_eq!(end, 3);
    }

    #[test]
    fn test_extend_epsilon_is_noop() {
        let mut automaton: Automaton<()> = Automaton::new();
        let end = Segment::Epsilon.extend(&mut automaton, crate::automaton::ROOT);
        assert_eq!(end, crate::automaton::ROOT);
        assert_eq!(automaton.len(), 1);
    }
}
