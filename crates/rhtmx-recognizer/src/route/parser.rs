//! Pattern parsing and specificity scoring
//!
//! Pure functional parsers that turn one route pattern into its segment sequence.
//! All functions are **pure**: same input → same output, no side effects.

use std::cmp::Ordering;
use std::fmt;

use crate::path::PathNormalizer;

use super::segment::Segment;

/// How literal a pattern is, used to rank competing matches
///
/// Each segment contributes one digit (star 1, epsilon 2, dynamic 3, static 4);
/// the digits are concatenated left to right and read as a number. Earlier
/// segments therefore dominate, like place values. Patterns of different length
/// are compared as plain numbers without padding, so a longer pattern outranks a
/// shorter one regardless of its digits (`/:x/:y/:z` scores 333, `/a/b` scores 44).
///
/// The digits are kept as a sequence, so arbitrarily long patterns compare
/// exactly.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::route::parse_route;
/// use rhtmx_recognizer::path::PercentNormalizer;
///
/// let fixed = parse_route("/posts/new", &PercentNormalizer);
/// let dynamic = parse_route("/posts/:id", &PercentNormalizer);
/// assert_eq!(fixed.specificity.to_string(), "44");
/// assert_eq!(dynamic.specificity.to_string(), "43");
/// assert!(fixed.specificity > dynamic.specificity);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Specificity(Vec<u8>);

impl Specificity {
    pub fn from_segments(segments: &[Segment]) -> Self {
        Self(segments.iter().map(Segment::specificity_digit).collect())
    }

    /// Digits from most to least significant
    pub fn digits(&self) -> &[u8] {
        &self.0
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        // Digits are never 0, so the longer number is the larger one
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.0 {
            write!(f, "{}", digit)?;
        }
        Ok(())
    }
}

/// A parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    /// Segments in pattern order, epsilons included
    pub segments: Vec<Segment>,
    /// Parameter names of dynamic and star segments, in order
    pub names: Vec<String>,
    /// One flag per name: whether its capture is percent-decoded
    pub should_decodes: Vec<bool>,
    pub specificity: Specificity,
}

/// Internal state accumulator for fold-based parsing
#[derive(Default)]
struct ParseState {
    segments: Vec<Segment>,
    names: Vec<String>,
    should_decodes: Vec<bool>,
}

impl ParseState {
    fn with_segment(mut self, segment: Segment) -> Self {
        if let Some(name) = segment.name() {
            self.names.push(name.to_string());
            self.should_decodes.push(segment.should_decode());
        }
        self.segments.push(segment);
        self
    }

    fn finish(self) -> ParsedRoute {
        let specificity = Specificity::from_segments(&self.segments);
        ParsedRoute {
            segments: self.segments,
            names: self.names,
            should_decodes: self.should_decodes,
            specificity,
        }
    }
}

/// Classifies one piece of a pattern
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Epsilon**: the empty string
/// 2. **Dynamic**: `:name` with a non-empty name
/// 3. **Star**: `*name` with a non-empty name
/// 4. **Static**: anything else, passed through the normalizer
pub fn classify_segment(piece: &str, normalizer: &dyn PathNormalizer) -> Segment {
    if piece.is_empty() {
        return Segment::Epsilon;
    }

    match (piece.strip_prefix(':'), piece.strip_prefix('*')) {
        (Some(name), _) if !name.is_empty() => Segment::Dynamic(name.to_string()),
        (_, Some(name)) if !name.is_empty() => Segment::Star(name.to_string()),
        _ => Segment::Static(normalizer.normalize_segment(piece).into_owned()),
    }
}

/// Parses a route pattern into segments, parameter names and specificity
///
/// One leading `/` is stripped before splitting, so `/posts` and `posts` parse
/// identically while `//posts` keeps a leading epsilon.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::route::{parse_route, Segment};
/// use rhtmx_recognizer::path::PercentNormalizer;
///
/// let parsed = parse_route("/files/:dir/*path", &PercentNormalizer);
/// assert_eq!(parsed.names, vec!["dir", "path"]);
/// assert_eq!(parsed.should_decodes, vec![true, false]);
/// assert_eq!(parsed.segments[0], Segment::Static("files".into()));
/// assert_eq!(parsed.specificity.to_string(), "431");
/// ```
pub fn parse_route(pattern: &str, normalizer: &dyn PathNormalizer) -> ParsedRoute {
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);

    pattern
        .split('/')
        .map(|piece| classify_segment(piece, normalizer))
        .fold(ParseState::default(), ParseState::with_segment)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{IdentityNormalizer, PercentNormalizer};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("/", "2")]
    #[case("", "2")]
    #[case("/posts", "4")]
    #[case("/posts/new", "44")]
    #[case("/posts/:id", "43")]
    #[case("/posts/:id/edit", "434")]
    #[case("/files/*path", "41")]
    #[case("/:a/:b/:c", "333")]
    #[case("//posts", "24")]
    #[case("/posts/", "42")]
    fn test_specificity(#[case] pattern: &str, #[case] expected: &str) {
        let parsed = parse_route(pattern, &PercentNormalizer);
        assert_eq!(parsed.specificity.to_string(), expected);
    }

    #[test]
    fn test_specificity_compares_across_lengths_without_padding() {
        let short = parse_route("/a/b", &PercentNormalizer).specificity;
        let long = parse_route("/:x/:y/:z", &PercentNormalizer).specificity;
        assert!(long > short);
    }

    #[test]
    fn test_specificity_long_patterns_compare_exactly() {
        let fixed = parse_route(&"/a".repeat(40), &PercentNormalizer).specificity;
        let dynamic = parse_route(&"/:x".repeat(40), &PercentNormalizer).specificity;
        assert_eq!(fixed.digits().len(), 40);
        assert!(fixed > dynamic);

        // Only the last digit differs
        let mut almost = "/a".repeat(39);
        almost.push_str("/:x");
        let almost = parse_route(&almost, &PercentNormalizer).specificity;
        assert!(fixed > almost);
        assert!(almost > dynamic);
    }

    #[test]
    fn test_parse_segments_in_order() {
        let parsed = parse_route("/posts/:id//*rest", &PercentNormalizer);
        assert_eq!(
            parsed.segments,
            vec![
                Segment::Static("posts".into()),
                Segment::Dynamic("id".into()),
                Segment::Epsilon,
                Segment::Star("rest".into()),
            ]
        );
        assert_eq!(parsed.names, vec!["id", "rest"]);
        assert_eq!(parsed.should_decodes, vec![true, false]);
    }

    #[test]
    fn test_bare_sigils_are_static() {
        assert_eq!(
            classify_segment(":", &PercentNormalizer),
            Segment::Static(":".into())
        );
        assert_eq!(
            classify_segment("*", &PercentNormalizer),
            Segment::Static("*".into())
        );
    }

    #[test]
    fn test_static_segments_are_normalized() {
        assert_eq!(
            classify_segment("foo%20bar", &PercentNormalizer),
            Segment::Static("foo bar".into())
        );
        assert_eq!(
            classify_segment("foo%20bar", &IdentityNormalizer),
            Segment::Static("foo%20bar".into())
        );
    }

    #[test]
    fn test_root_is_single_epsilon() {
        let parsed = parse_route("/", &PercentNormalizer);
        assert_eq!(parsed.segments, vec![Segment::Epsilon]);
        assert!(parsed.names.is_empty());
    }
}
