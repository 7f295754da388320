//! Error types
//!
//! [`ApiError`] is what a single provider call can fail with. The retry
//! wrapper only ever looks at [`ApiError::is_throttled`]; everything else is
//! fatal for the scope that produced it. [`CollectError`] is the one error a
//! collection run reports, tagged with the scope that failed.

use thiserror::Error;

/// Failure of a single provider API call
#[derive(Error, Debug)]
pub enum ApiError {
    /// The provider asked us to slow down (HTTP 429 or a rate-limit reason)
    #[error("rate limit exceeded ({status}): {message}")]
    Throttled { status: u16, message: String },

    /// Any other non-success HTTP status
    #[error("API request failed: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Throttling outlasted the configured retry budget
    #[error("gave up retrying after throttling budget was spent: {0}")]
    DeadlineExceeded(Box<ApiError>),
}

impl ApiError {
    /// Transient errors are retried by the backoff wrapper, never surfaced
    pub fn is_throttled(&self) -> bool {
        matches!(self, ApiError::Throttled { .. })
    }

    /// HTTP status code, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Throttled { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::DeadlineExceeded(inner) => inner.status(),
            _ => None,
        }
    }

    /// Short user-facing hint for common failure statuses
    pub fn hint(&self) -> Option<&'static str> {
        if matches!(self, ApiError::Auth(_)) {
            return Some("Check your provider credentials.");
        }
        match self.status()? {
            401 => Some("Authentication failed. Refresh your credentials."),
            403 => Some("Permission denied. Check the IAM/RBAC role of the caller."),
            404 => Some("Resource not found. Is the API enabled for this scope?"),
            400 => Some("Invalid request. Check your parameters."),
            429 => Some("Rate limit exceeded. Try a lower --concurrency."),
            500 | 502 | 503 => Some("Provider service temporarily unavailable. Please try again."),
            _ => None,
        }
    }
}

/// The single error a collection run returns
#[derive(Error, Debug)]
pub enum CollectError {
    /// A scope's fetch failed with a fatal provider error
    #[error("error while gathering {scope}: {source}")]
    Scope {
        scope: String,
        #[source]
        source: ApiError,
    },

    /// A batch task panicked or was cancelled before it produced a result
    #[error("task for {scope} did not complete: {message}")]
    Task { scope: String, message: String },

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
}

impl CollectError {
    /// Scope that produced the error, if any
    pub fn scope(&self) -> Option<&str> {
        match self {
            CollectError::Scope { scope, .. } | CollectError::Task { scope, .. } => Some(scope),
            CollectError::UnknownKind(_) => None,
        }
    }

    /// Underlying provider error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            CollectError::Scope { source, .. } => Some(source),
            _ => None,
        }
    }
}
