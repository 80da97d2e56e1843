//! Errors produced while registering routes and dispatching requests.

use thiserror::Error;

/// The error type returned by handlers and middleware.
///
/// Anything convertible into a boxed error can be returned with `?`, including
/// [`Error`] itself.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong inside the router.
///
/// Pattern errors (`DuplicateParam`, `MalformedPattern`, `InvalidConstraint`)
/// are returned at registration time. The rest surface at dispatch time and are
/// handed to the error handler.
#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate parameter `{name}` in route `{path}`")]
    DuplicateParam { name: String, path: String },

    #[error("malformed placeholder in route `{path}` at byte {offset}")]
    MalformedPattern { path: String, offset: usize },

    #[error("invalid constraint for parameter `{name}` in route `{path}`: {source}")]
    InvalidConstraint {
        name: String,
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("Method {action} not found in controller {controller}")]
    MissingAction {
        action: String,
        controller: &'static str,
    },

    #[error("invalid request method `{0}`")]
    InvalidMethod(String),

    #[error("invalid request target `{target}`: {source}")]
    InvalidUri {
        target: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },

    #[error("failed to encode response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("handler panicked: {0}")]
    Panic(String),

    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    /// Returns `true` for errors caused by how routes were registered rather
    /// than by what a request contained.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::DuplicateParam { .. }
                | Error::MalformedPattern { .. }
                | Error::InvalidConstraint { .. }
                | Error::MissingAction { .. }
        )
    }
}

impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        // unwrap errors that were boxed on their way out of a handler
        match err.downcast::<Error>() {
            Ok(err) => *err,
            Err(err) => Error::Handler(err),
        }
    }
}
