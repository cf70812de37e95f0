//! Request pipeline error types.

use thiserror::Error;

/// Failure of a single image request.
///
/// `Cancelled` is a control signal rather than a failure: it stops the
/// pipeline but never reaches a delivered result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("request has no data to load")]
    DataMissing,

    #[error("no {component} supports {subject}")]
    Unsupported {
        component: &'static str,
        subject: String,
    },

    #[error("fetch failed: {message}")]
    Fetch { message: String },

    #[error("decode failed: {message}")]
    Decode { message: String },

    #[error("transformation {key} failed: {message}")]
    Transform { key: String, message: String },

    #[error("request was cancelled")]
    Cancelled,
}

impl LoadError {
    /// Creates an unsupported-fetcher error.
    #[must_use]
    pub fn no_fetcher(subject: impl Into<String>) -> Self {
        Self::Unsupported {
            component: "fetcher",
            subject: subject.into(),
        }
    }

    /// Creates an unsupported-decoder error.
    #[must_use]
    pub fn no_decoder(subject: impl Into<String>) -> Self {
        Self::Unsupported {
            component: "decoder",
            subject: subject.into(),
        }
    }

    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a transformation error.
    #[must_use]
    pub fn transform(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true for the cancellation signal.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Returned by the await-style entry point when a request produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("image request was cancelled")]
pub struct Cancelled;

impl From<Cancelled> for LoadError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Errors raised while constructing a loader.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum LoaderError {
    #[error("no tokio runtime available to run requests on")]
    NoRuntime,

    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),
}
