//! Recognition results and the resolution steps behind `Recognizer::recognize`
//!
//! The automaton only answers "which accepting states does this path reach".
//! This module picks the most specific of them and pulls parameter values out
//! of the path with the winner's extraction pattern.

use std::collections::HashMap;
use std::ops::Deref;

use crate::automaton::{Accepting, Automaton, StateId};
use crate::query::QueryParams;
use crate::route::STAR_FRAGMENT;

/// One handler matched by a recognized path
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a, H> {
    pub handler: &'a H,
    /// Parameters declared by this handler's own pattern
    pub params: HashMap<String, String>,
    /// Whether the handler's pattern declares any parameter
    pub is_dynamic: bool,
}

impl<'a, H> Match<'a, H> {
    /// Gets a parameter value by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Result of recognizing a path
///
/// Holds one [`Match`] per handler stacked on the matched state, in registration
/// order, plus the query parameters parsed from the path. Derefs to the slice of
/// matches.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizeResults<'a, H> {
    matches: Vec<Match<'a, H>>,
    query_params: QueryParams,
}

impl<'a, H> RecognizeResults<'a, H> {
    pub(crate) fn new(matches: Vec<Match<'a, H>>, query_params: QueryParams) -> Self {
        Self {
            matches,
            query_params,
        }
    }

    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    pub fn into_parts(self) -> (Vec<Match<'a, H>>, QueryParams) {
        (self.matches, self.query_params)
    }
}

impl<'a, H> Deref for RecognizeResults<'a, H> {
    type Target = [Match<'a, H>];

    fn deref(&self) -> &Self::Target {
        &self.matches
    }
}

impl<'a, H> IntoIterator for RecognizeResults<'a, H> {
    type Item = Match<'a, H>;
    type IntoIter = std::vec::IntoIter<Match<'a, H>>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

/// Splits `#fragment` and `?query` off a path
pub(crate) fn split_path(input: &str) -> (&str, Option<&str>) {
    let input = input.split_once('#').map_or(input, |(path, _)| path);
    match input.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (input, None),
    }
}

/// Picks the most specific accepting state in the frontier
///
/// The sort is stable, so equally specific states keep frontier order; no other
/// tie-break is applied.
pub(crate) fn most_specific<'a, H>(
    automaton: &'a Automaton<H>,
    frontier: &[StateId],
) -> Option<&'a Accepting<H>> {
    let mut solutions: Vec<&Accepting<H>> = frontier
        .iter()
        .filter_map(|&id| automaton.state(id).accepting())
        .collect();

    solutions.sort_by(|a, b| b.specificity.cmp(&a.specificity));
    solutions.into_iter().next()
}

/// Whether the accepting pattern's last capture is a star segment
pub(crate) fn ends_with_star<H>(accepting: &Accepting<H>) -> bool {
    accepting
        .pattern
        .as_str()
        .strip_suffix('$')
        .is_some_and(|pattern| pattern.ends_with(STAR_FRAGMENT))
}

/// Extracts parameters for every handler on `accepting`
///
/// `path` is the path as received, so star captures come back exactly as sent.
/// `None` when the extraction pattern does not match it in full. Captures are
/// handed out to handlers in registration order, each taking as many as it
/// declares names.
pub(crate) fn extract<'a, H>(
    accepting: &'a Accepting<H>,
    path: &str,
    decode: bool,
) -> Option<Vec<Match<'a, H>>> {
    let captures = accepting.pattern.captures(path)?;

    let mut values = captures
        .iter()
        .skip(1)
        .map(|group| group.map_or("", |m| m.as_str()));

    let matches = accepting
        .handlers
        .iter()
        .map(|handler| {
            let params = handler
                .names()
                .iter()
                .zip(handler.should_decodes())
                .map(|(name, &should_decode)| {
                    let raw = values.next().unwrap_or_default();
                    let value = if decode && should_decode {
                        decode_capture(raw)
                    } else {
                        raw.to_string()
                    };
                    (name.clone(), value)
                })
                .collect();

            Match {
                handler: handler.handler(),
                params,
                is_dynamic: !handler.names().is_empty(),
            }
        })
        .collect();

    Some(matches)
}

fn decode_capture(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!("Keeping undecodable capture as-is ({}): {}", e, raw);
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/posts", "/posts", None)]
    #[case("/posts?page=2", "/posts", Some("page=2"))]
    #[case("/posts#top", "/posts", None)]
    #[case("/posts?page=2#top", "/posts", Some("page=2"))]
    #[case("/posts#top?page=2", "/posts", None)]
    #[case("/posts?", "/posts", Some(""))]
    fn test_split_path(
        #[case] input: &str,
        #[case] path: &str,
        #[case] query: Option<&str>,
    ) {
        assert_eq!(split_path(input), (path, query));
    }

    #[test]
    fn test_decode_capture_invalid_utf8_is_kept() {
        assert_eq!(decode_capture("%FF"), "%FF");
        assert_eq!(decode_capture("a%20b"), "a b");
    }
}
