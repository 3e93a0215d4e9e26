//! # RHTMX Recognizer
//!
//! An automaton-based route recognizer with support for:
//! - Static segments (`/about`)
//! - Dynamic parameters (`/users/:id`)
//! - Greedy wildcards that may span slashes (`/files/*path`)
//! - Handler stacking for nested routes (several handlers on one path)
//! - Named routes with reverse path generation
//! - Query-string parsing and canonical generation
//!
//! ## How matching works
//!
//! Every registered pattern is compiled into a character-level state graph.
//! Common prefixes share states; dynamic and wildcard segments are single states
//! that loop on themselves. Recognizing a path walks the graph one character at a
//! time, keeping every reachable state, and picks the most specific accepting
//! state at the end. Parameters are then extracted with that state's anchored
//! extraction pattern.
//!
//! Specificity is a number built by concatenating one digit per segment (static 4,
//! dynamic 3, epsilon 2, star 1), so `/posts/new` (44) beats `/posts/:id` (43).
//!
//! ## Thread safety
//!
//! Registration needs `&mut self`. Once registration is done the recognizer is
//! read-only and can be shared across threads (`Recognizer<H>: Sync` when `H: Send + Sync`).
//!
//! ## Example
//!
//! ```
//! use rhtmx_recognizer::{AddOptions, GenerateParams, Recognizer, RouteEntry};
//!
//! let mut recognizer = Recognizer::new();
//! recognizer
//!     .add_with(
//!         [RouteEntry::new("/posts/:id", "show_post")],
//!         AddOptions::named("post"),
//!     )
//!     .unwrap();
//! recognizer.add([RouteEntry::new("/posts/new", "new_post")]).unwrap();
//!
//! let results = recognizer.recognize("/posts/new").unwrap();
//! assert_eq!(*results[0].handler, "new_post");
//!
//! let results = recognizer.recognize("/posts/42?draft").unwrap();
//! assert_eq!(results[0].param("id"), Some("42"));
//! assert_eq!(results.query_params().get_str("draft"), Some("true"));
//!
//! let path = recognizer
//!     .generate("post", &GenerateParams::new().with_param("id", "42"))
//!     .unwrap();
//! assert_eq!(path, "/posts/42");
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use regex::RegexBuilder;

// ============================================================================
// Module Declarations
// ============================================================================

mod automaton;
mod config;
mod error;
pub mod path;
mod query;
mod recognize;
mod registry;
pub mod route;

pub use config::RecognizerConfig;
pub use error::RecognizerError;
pub use path::{IdentityNormalizer, PathNormalizer, PercentNormalizer};
pub use query::{generate_query_string, parse_query_string, QueryParams, QueryValue};
pub use recognize::{Match, RecognizeResults};
pub use registry::NamedRoute;
pub use route::{Segment, Specificity};

use automaton::{Accepting, Automaton, CharSpec, ROOT};
use path::decode_uri;
use registry::NamedRoutes;
use route::parse_route;

// ============================================================================
// Core Types
// ============================================================================

/// A handler attached to an accepting state, with the parameters its pattern declares
#[derive(Debug, Clone, PartialEq)]
pub struct Handler<H> {
    handler: H,
    names: Vec<String>,
    should_decodes: Vec<bool>,
}

impl<H> Handler<H> {
    /// The opaque value supplied at registration
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Parameter names in pattern order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// One flag per name: whether the captured value is percent-decoded
    pub fn should_decodes(&self) -> &[bool] {
        &self.should_decodes
    }
}

/// One `{pattern, handler}` pair of a registration batch
#[derive(Debug, Clone)]
pub struct RouteEntry<H> {
    /// Route pattern like `/users/:id` or `/files/*path`
    pub path: String,
    pub handler: H,
}

impl<H> RouteEntry<H> {
    pub fn new(path: impl Into<String>, handler: H) -> Self {
        Self {
            path: path.into(),
            handler,
        }
    }
}

/// Options for a registration batch
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Registers the batch under this name for [`Recognizer::generate`]
    pub name: Option<String>,
}

impl AddOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Values used to generate a path from a named route
///
/// # Examples
///
/// ```
/// use rhtmx_recognizer::GenerateParams;
///
/// let params = GenerateParams::new()
///     .with_param("id", "1")
///     .with_query("sort", "desc")
///     .with_query("tags", vec!["a".to_string(), "b".to_string()]);
///
/// assert_eq!(params.param("id"), Some("1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    params: HashMap<String, String>,
    query_params: Option<BTreeMap<String, Option<QueryValue>>>,
}

impl GenerateParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a path parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets a query parameter
    pub fn with_query(self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.with_query_value(key, Some(value.into()))
    }

    /// Sets a query parameter that may be absent; absent values are skipped
    /// during generation
    pub fn with_query_value(mut self, key: impl Into<String>, value: Option<QueryValue>) -> Self {
        self.query_params
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    /// Sets every parameter of an already parsed query
    pub fn with_query_params(mut self, query: QueryParams) -> Self {
        let entries = self.query_params.get_or_insert_with(BTreeMap::new);
        for (key, value) in query.into_inner() {
            entries.insert(key, Some(value));
        }
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

impl<K, V> FromIterator<(K, V)> for GenerateParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |params, (name, value)| params.with_param(name, value))
    }
}

// ============================================================================
// Recognizer
// ============================================================================

/// Route recognizer: registration, recognition and reverse generation
///
/// The recognizer owns the state graph and the named-route table. Both are
/// only mutated by [`add`](Self::add) / [`add_with`](Self::add_with).
pub struct Recognizer<H> {
    automaton: Automaton<H>,
    names: NamedRoutes<H>,
    config: RecognizerConfig,
    normalizer: Arc<dyn PathNormalizer>,
}

impl<H> Recognizer<H> {
    /// Creates a recognizer with the default configuration and normalizer
    pub fn new() -> Self {
        Self::with_config(RecognizerConfig::default())
    }

    /// Creates a recognizer with an explicit configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_recognizer::{Recognizer, RecognizerConfig};
    ///
    /// let recognizer: Recognizer<()> = Recognizer::with_config(RecognizerConfig::with_encoding(false));
    /// assert!(!recognizer.config().encode_and_decode_path_segments);
    /// ```
    pub fn with_config(config: RecognizerConfig) -> Self {
        Self {
            automaton: Automaton::new(),
            names: NamedRoutes::new(),
            config,
            normalizer: Arc::new(PercentNormalizer),
        }
    }

    /// Replaces the path normalization policy (functional builder)
    ///
    /// Static segments are normalized at registration time, so the policy should
    /// be chosen before any route is added.
    pub fn with_normalizer(mut self, normalizer: impl PathNormalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Number of states in the automaton, root included
    pub fn state_count(&self) -> usize {
        self.automaton.len()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a batch of routes sharing one terminal state
    ///
    /// See [`add_with`](Self::add_with).
    pub fn add<I>(&mut self, routes: I) -> Result<(), RecognizerError>
    where
        I: IntoIterator<Item = RouteEntry<H>>,
    {
        self.add_with(routes, AddOptions::default())
    }

    /// Registers a batch of routes sharing one terminal state
    ///
    /// Routes in a batch are chained: each pattern continues where the previous
    /// one ended, and every route's handler is stacked on the final state. This is
    /// how nested routes attach several handlers to one concrete path.
    ///
    /// The batch's specificity is taken from the last route parsed. An empty
    /// batch registers nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_recognizer::{Recognizer, RouteEntry};
    ///
    /// let mut recognizer = Recognizer::new();
    /// recognizer
    ///     .add([RouteEntry::new("/posts", "posts"), RouteEntry::new("/:id", "post")])
    ///     .unwrap();
    ///
    /// let results = recognizer.recognize("/posts/7").unwrap();
    /// assert_eq!(results.len(), 2);
    /// assert!(!results[0].is_dynamic);
    /// assert_eq!(results[1].param("id"), Some("7"));
    /// ```
    pub fn add_with<I>(&mut self, routes: I, options: AddOptions) -> Result<(), RecognizerError>
    where
        I: IntoIterator<Item = RouteEntry<H>>,
    {
        let parsed: Vec<_> = routes
            .into_iter()
            .map(|route| (parse_route(&route.path, self.normalizer.as_ref()), route.handler))
            .collect();

        let Some((last, _)) = parsed.last() else {
            tracing::debug!("Ignoring empty route batch");
            return Ok(());
        };
        let specificity = last.specificity.clone();

        // Compile the extraction pattern before touching the graph so a failed
        // batch leaves no trace
        let mut source = String::from("^");
        for segment in parsed
            .iter()
            .flat_map(|(route, _)| &route.segments)
            .filter(|segment| **segment != Segment::Epsilon)
        {
            source.push('/');
            source.push_str(&segment.fragment());
        }
        let is_root = source.len() == 1;
        if is_root {
            source.push('/');
        }
        source.push('$');

        let pattern = RegexBuilder::new(&source)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source_err| RecognizerError::InvalidPattern {
                pattern: source.clone(),
                source: source_err,
            })?;

        let mut state = ROOT;
        let mut segments = Vec::new();
        let mut handlers = Vec::with_capacity(parsed.len());

        for (route, handler) in parsed {
            for segment in route.segments.iter().filter(|s| **s != Segment::Epsilon) {
                state = self.automaton.put(state, CharSpec::allow("/"));
                state = segment.extend(&mut self.automaton, state);
            }
            segments.extend(route.segments);
            handlers.push(Handler {
                handler,
                names: route.names,
                should_decodes: route.should_decodes,
            });
        }

        if is_root {
            state = self.automaton.put(state, CharSpec::allow("/"));
        }

        tracing::debug!(
            "Registered {} handler(s) at state {} with pattern {} (specificity {})",
            handlers.len(),
            state,
            source,
            specificity
        );

        let handlers: Arc<[Handler<H>]> = Arc::from(handlers);
        self.automaton.set_accepting(
            state,
            Accepting {
                pattern,
                handlers: Arc::clone(&handlers),
                specificity,
            },
        );

        if let Some(name) = options.name {
            self.names.insert(name, NamedRoute::new(segments, handlers));
        }

        Ok(())
    }

    // ========================================================================
    // Recognition
    // ========================================================================

    /// Resolves a path to the most specific registered route
    ///
    /// The `#fragment` is ignored and the `?query` parsed into the results. A
    /// trailing slash is ignored for matching, but a trailing star capture keeps
    /// it. Returns `None` when no registered pattern matches the whole path.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_recognizer::{Recognizer, RouteEntry};
    ///
    /// let mut recognizer = Recognizer::new();
    /// recognizer.add([RouteEntry::new("/files/*path", "files")]).unwrap();
    ///
    /// let results = recognizer.recognize("/files/a/b/").unwrap();
    /// assert_eq!(results[0].param("path"), Some("a/b/"));
    /// assert!(recognizer.recognize("/other").is_none());
    /// ```
    pub fn recognize(&self, path: &str) -> Option<RecognizeResults<'_, H>> {
        let (path, query) = recognize::split_path(path);
        let query_params = query.map(parse_query_string).unwrap_or_default();

        let path: Cow<'_, str> = if path.starts_with('/') {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("/{}", path))
        };

        let encode = self.config.encode_and_decode_path_segments;
        let (working, original) = if encode {
            (self.normalizer.normalize_path(&path), Cow::Borrowed(&path[..]))
        } else {
            let decoded = decode_uri(&path);
            (decoded.clone(), decoded)
        };

        let (working, original, slash_dropped) = if working.len() > 1 && working.ends_with('/') {
            (
                &working[..working.len() - 1],
                original.strip_suffix('/').unwrap_or(&original),
                true,
            )
        } else {
            (&working[..], &original[..], false)
        };

        let frontier = self.automaton.walk(working);
        let Some(accepting) = recognize::most_specific(&self.automaton, &frontier) else {
            tracing::trace!("No route recognized for {}", working);
            return None;
        };

        let extraction: Cow<'_, str> = if slash_dropped && recognize::ends_with_star(accepting) {
            Cow::Owned(format!("{}/", original))
        } else {
            Cow::Borrowed(original)
        };

        let Some(matches) = recognize::extract(accepting, &extraction, encode) else {
            tracing::debug!(
                "Pattern {} rejected {} after the automaton accepted it",
                accepting.pattern.as_str(),
                extraction
            );
            return None;
        };

        Some(RecognizeResults::new(matches, query_params))
    }

    // ========================================================================
    // Named Routes
    // ========================================================================

    /// Generates a path for a named route
    ///
    /// Dynamic values are percent-encoded as path segments when encoding is
    /// enabled; star values are emitted raw. Query parameters, when supplied, are
    /// appended in canonical order.
    ///
    /// # Errors
    ///
    /// `NoSuchRoute` for an unknown name, `MissingParameter` when a dynamic or star
    /// segment has no value.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_recognizer::{AddOptions, GenerateParams, Recognizer, RouteEntry};
    ///
    /// let mut recognizer = Recognizer::new();
    /// recognizer
    ///     .add_with([RouteEntry::new("/search/:term", ())], AddOptions::named("search"))
    ///     .unwrap();
    ///
    /// let params = GenerateParams::new()
    ///     .with_param("term", "rust lang")
    ///     .with_query("page", "2");
    /// assert_eq!(
    ///     recognizer.generate("search", &params).unwrap(),
    ///     "/search/rust%20lang?page=2"
    /// );
    /// ```
    pub fn generate(&self, name: &str, params: &GenerateParams) -> Result<String, RecognizerError> {
        let route = self.names.get(name)?;
        let mut output = route.generate_path(
            name,
            &params.params,
            self.config.encode_and_decode_path_segments,
        )?;

        if let Some(query) = &params.query_params {
            output.push_str(&generate_query_string(
                query.iter().map(|(key, value)| (key.as_str(), value.as_ref())),
            ));
        }

        Ok(output)
    }

    /// Handlers registered under a name, in registration order
    pub fn handlers_for(&self, name: &str) -> Result<&[Handler<H>], RecognizerError> {
        self.names.get(name).map(NamedRoute::handlers)
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Gets a named route (segments and handlers)
    pub fn named_route(&self, name: &str) -> Result<&NamedRoute<H>, RecognizerError> {
        self.names.get(name)
    }

    /// Names of all registered named routes, in no particular order
    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.names.names()
    }
}

impl<H> Default for Recognizer<H> {
    fn default() -> Self {
        Self::new()
    }
}
