//! Query-string codec
//!
//! Parses the `?query` portion of a recognized path into [`QueryParams`] and
//! renders parameter maps back into a canonical, key-sorted query string.
//! Works independently of the automaton.

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::path::{encode_uri_component, has_well_formed_escapes};

/// Value of a single query parameter
///
/// Keys written as `key[]` collect every occurrence into [`QueryValue::Multiple`];
/// all other keys hold one [`QueryValue::Single`] value (last occurrence wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// Returns the scalar value, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::Multiple(_) => None,
        }
    }

    /// Returns the collected values, if this is a list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            QueryValue::Single(_) => None,
            QueryValue::Multiple(values) => Some(values),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Multiple(values)
    }
}

/// Parsed query parameters, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, QueryValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a scalar parameter by key
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_recognizer::parse_query_string;
    ///
    /// let params = parse_query_string("page=2&draft");
    /// assert_eq!(params.get_str("page"), Some("2"));
    /// assert_eq!(params.get_str("draft"), Some("true"));
    /// assert_eq!(params.get_str("missing"), None);
    /// ```
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(QueryValue::as_str)
    }

    /// Inserts a parameter, replacing any previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Renders these parameters as a query string (see [`generate_query_string`])
    pub fn to_query_string(&self) -> String {
        generate_query_string(self.0.iter().map(|(key, value)| (key.as_str(), Some(value))))
    }

    pub fn into_inner(self) -> BTreeMap<String, QueryValue> {
        self.0
    }
}

impl Deref for QueryParams {
    type Target = BTreeMap<String, QueryValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Parses a query string (without the leading `?`)
///
/// - Pairs are separated by `&` and split on the first `=`
/// - A key without `=` is a flag with the value `"true"`
/// - `key[]=value` pairs accumulate into a list under `key`, in order
/// - Keys and values are form-decoded (`+` is a space); undecodable parts become `""`
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::{parse_query_string, QueryValue};
///
/// let params = parse_query_string("a[]=1&a[]=2&q=hello+world");
/// assert_eq!(
///     params.get("a"),
///     Some(&QueryValue::Multiple(vec!["1".to_string(), "2".to_string()]))
/// );
/// assert_eq!(params.get_str("q"), Some("hello world"));
/// ```
pub fn parse_query_string(query: &str) -> QueryParams {
    let mut params: BTreeMap<String, QueryValue> = BTreeMap::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let Some((raw_key, raw_value)) = pair.split_once('=') else {
            params.insert(decode_query_part(pair), QueryValue::Single("true".to_string()));
            continue;
        };

        let key = decode_query_part(raw_key);
        let value = decode_query_part(raw_value);

        match key.strip_suffix("[]") {
            Some(name) if !name.is_empty() => {
                let entry = params
                    .entry(name.to_string())
                    .or_insert_with(|| QueryValue::Multiple(Vec::new()));

                // A scalar seen earlier under the bare name becomes the first list item
                if let QueryValue::Single(existing) = entry {
                    let first = std::mem::take(existing);
                    *entry = QueryValue::Multiple(vec![first]);
                }
                if let QueryValue::Multiple(values) = entry {
                    values.push(value);
                }
            }
            _ => {
                params.insert(key, QueryValue::Single(value));
            }
        }
    }

    QueryParams(params)
}

/// Generates a canonical query string
///
/// Keys are sorted, absent values skipped, lists expanded into repeated
/// `key[]=value` pairs and everything percent-encoded. Returns `""` when there is
/// nothing to emit, otherwise the pairs joined by `&` behind a leading `?`.
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::{generate_query_string, QueryValue};
///
/// let b = QueryValue::from("2");
/// let a = QueryValue::from("1");
/// assert_eq!(
///     generate_query_string([("b", Some(&b)), ("a", Some(&a)), ("skip", None)]),
///     "?a=1&b=2"
/// );
/// assert_eq!(generate_query_string(Vec::<(&str, Option<&QueryValue>)>::new()), "");
/// ```
pub fn generate_query_string<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a QueryValue>)>,
{
    let mut entries: Vec<(&str, Option<&QueryValue>)> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let pairs: Vec<String> = entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .flat_map(|(key, value)| {
            let key = encode_uri_component(key);
            match value {
                QueryValue::Single(value) => {
                    vec![format!("{}={}", key, encode_uri_component(value))]
                }
                QueryValue::Multiple(values) => values
                    .iter()
                    .map(|value| format!("{}[]={}", key, encode_uri_component(value)))
                    .collect(),
            }
        })
        .collect();

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

fn decode_query_part(part: &str) -> String {
    let part = part.replace('+', "%20");
    if !has_well_formed_escapes(&part) {
        tracing::debug!("Malformed query component: {}", part);
        return String::new();
    }
    match urlencoding::decode(&part) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!("Undecodable query component ({}): {}", e, part);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn single(value: &str) -> QueryValue {
        QueryValue::Single(value.to_string())
    }

    fn list(values: &[&str]) -> QueryValue {
        QueryValue::Multiple(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_parse_scalars() {
        let params = parse_query_string("a=1&b=2");
        let expected: QueryParams = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(params, expected);
    }

    #[test]
    fn test_parse_arrays() {
        let params = parse_query_string("a[]=1&a[]=2");
        assert_eq!(params.get("a"), Some(&list(&["1", "2"])));
        assert_eq!(params.len(), 1);
    }

    #[rstest]
    #[case("flag", "flag", "true")]
    #[case("empty=", "empty", "")]
    #[case("q=a+b", "q", "a b")]
    #[case("q=a%2Bb", "q", "a+b")]
    #[case("k%20ey=v", "k ey", "v")]
    #[case("eq=a=b", "eq", "a=b")]
    #[case("bad=%E0%A4%A", "bad", "")]
    #[case("bad=%zz", "bad", "")]
    #[case("bytes=%FF", "bytes", "")]
    fn test_parse_single_pair(#[case] query: &str, #[case] key: &str, #[case] value: &str) {
        let params = parse_query_string(query);
        assert_eq!(params.get(key), Some(&single(value)));
    }

    #[test]
    fn test_parse_last_scalar_wins() {
        let params = parse_query_string("a=1&a=2");
        assert_eq!(params.get_str("a"), Some("2"));
    }

    #[test]
    fn test_parse_bare_brackets_key_is_scalar() {
        let params = parse_query_string("[]=x");
        assert_eq!(params.get_str("[]"), Some("x"));
    }

    #[test]
    fn test_parse_scalar_then_array_merges() {
        let params = parse_query_string("a=0&a[]=1");
        assert_eq!(params.get("a"), Some(&list(&["0", "1"])));
    }

    #[test]
    fn test_parse_skips_empty_pairs() {
        assert!(parse_query_string("").is_empty());
        let params = parse_query_string("a=1&&b=2&");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_generate_sorted() {
        let params: QueryParams = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(params.to_query_string(), "?a=1&b=2");
    }

    #[test]
    fn test_generate_lists_and_encoding() {
        let tags = list(&["x y", "z"]);
        let q = single("a&b");
        let out = generate_query_string([("tags", Some(&tags)), ("q", Some(&q))]);
        assert_eq!(out, "?q=a%26b&tags[]=x%20y&tags[]=z");
    }

    #[test]
    fn test_generate_skips_absent_and_empty() {
        let empty = QueryValue::Multiple(Vec::new());
        assert_eq!(generate_query_string([("a", None), ("b", Some(&empty))]), "");
        assert_eq!(QueryParams::new().to_query_string(), "");
    }

    #[test]
    fn test_generate_parse_inverse() {
        let mut params = QueryParams::new();
        params.insert("name", "Jane Doe");
        params.insert("ids", vec!["1".to_string(), "2".to_string()]);
        let query = params.to_query_string();
        let reparsed = parse_query_string(query.trim_start_matches('?'));
        assert_eq!(reparsed, params);
    }

    #[test]
    fn test_query_value_serializes_untagged() {
        let params = parse_query_string("a[]=1&a[]=2&b=3");
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"a":["1","2"],"b":"3"}"#);
    }
}
