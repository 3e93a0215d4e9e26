//! Named routes and reverse path generation

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RecognizerError;
use crate::route::Segment;
use crate::Handler;

/// A batch registered under a name: everything needed to rebuild its path
#[derive(Debug)]
pub struct NamedRoute<H> {
    segments: Vec<Segment>,
    handlers: Arc<[Handler<H>]>,
}

impl<H> NamedRoute<H> {
    pub(crate) fn new(segments: Vec<Segment>, handlers: Arc<[Handler<H>]>) -> Self {
        Self { segments, handlers }
    }

    /// Segments of every route in the batch, concatenated in registration order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn handlers(&self) -> &[Handler<H>] {
        &self.handlers
    }

    /// Replays the segments with `params`, producing a path that starts with `/`
    ///
    /// Dynamic values are percent-encoded when `encode` is set; star values are
    /// always emitted raw.
    pub(crate) fn generate_path(
        &self,
        route: &str,
        params: &HashMap<String, String>,
        encode: bool,
    ) -> Result<String, RecognizerError> {
        let mut output = String::new();

        for segment in self.segments.iter().filter(|s| **s != Segment::Epsilon) {
            let rendered =
                segment
                    .render(params, encode)
                    .ok_or_else(|| RecognizerError::MissingParameter {
                        route: route.to_string(),
                        param: segment.name().unwrap_or_default().to_string(),
                    })?;
            output.push('/');
            output.push_str(&rendered);
        }

        if !output.starts_with('/') {
            output.insert(0, '/');
        }
        Ok(output)
    }
}

/// Name → route lookup table
#[derive(Debug)]
pub(crate) struct NamedRoutes<H> {
    routes: HashMap<String, NamedRoute<H>>,
}

impl<H> NamedRoutes<H> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: String, route: NamedRoute<H>) {
        if self.routes.contains_key(&name) {
            tracing::debug!("Route name '{}' registered again, replacing", name);
        }
        self.routes.insert(name, route);
    }

    pub fn get(&self, name: &str) -> Result<&NamedRoute<H>, RecognizerError> {
        self.routes
            .get(name)
            .ok_or_else(|| RecognizerError::no_such_route(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PercentNormalizer;
    use crate::route::parse_route;

    fn named(patterns: &[&str]) -> NamedRoute<()> {
        let segments = patterns
            .iter()
            .flat_map(|p| parse_route(p, &PercentNormalizer).segments)
            .collect();
        NamedRoute::new(segments, Arc::from(Vec::new()))
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_generate_root() {
        let route = named(&["/"]);
        assert_eq!(route.generate_path("root", &HashMap::new(), true).unwrap(), "/");
    }

    #[test]
    fn test_generate_concatenates_batch_segments() {
        let route = named(&["/posts", "/:id", "/comments"]);
        let path = route
            .generate_path("comments", &params(&[("id", "7")]), true)
            .unwrap();
        assert_eq!(path, "/posts/7/comments");
    }

    #[test]
    fn test_generate_skips_epsilons() {
        let route = named(&["//posts//:id"]);
        let path = route
            .generate_path("post", &params(&[("id", "1")]), true)
            .unwrap();
        assert_eq!(path, "/posts/1");
    }

    #[test]
    fn test_generate_missing_param() {
        let route = named(&["/posts/:id"]);
        let err = route
            .generate_path("post", &HashMap::new(), true)
            .unwrap_err();
        assert!(matches!(
            err,
            RecognizerError::MissingParameter { ref route, ref param } if route == "post" && param == "id"
        ));
    }

    #[test]
    fn test_lookup_unknown_name() {
        let routes: NamedRoutes<()> = NamedRoutes::new();
        let err = routes.get("nope").unwrap_err();
        assert!(matches!(err, RecognizerError::NoSuchRoute { ref name } if name == "nope"));
        assert!(!routes.contains("nope"));
    }
}
