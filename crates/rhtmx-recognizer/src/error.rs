use thiserror::Error;

/// Errors returned by registration and reverse lookup
#[derive(Error, Debug)]
pub enum RecognizerError {
    /// No route was registered under the requested name
    #[error("There is no route named {name}")]
    NoSuchRoute { name: String },

    /// A named route was asked to generate a path without one of its parameters
    #[error("Route '{route}' requires a value for parameter '{param}'")]
    MissingParameter { route: String, param: String },

    /// The extraction pattern assembled for a batch failed to compile
    #[error("Invalid extraction pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl RecognizerError {
    pub(crate) fn no_such_route(name: &str) -> Self {
        Self::NoSuchRoute {
            name: name.to_string(),
        }
    }
}
