/// Error type returned by this crate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// A single attempt exceeded its time budget.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    /// Transport failure before a response arrived (DNS, refused, offline).
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// 2xx response whose body carried an `error` field.
    #[error("application error: {message}")]
    Application { message: String },
    /// Superseded by a newer call on the same client, or cancelled explicitly.
    #[error("request was cancelled")]
    Cancelled,
    /// Response body was not valid JSON or did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// The request was rejected before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Field-less classification of [`FetchError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    Network,
    HttpStatus,
    Application,
    Cancelled,
    MalformedResponse,
    InvalidRequest,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network(_) => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Application { .. } => ErrorKind::Application,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Default retry classification, before client-specific terminal rules.
    ///
    /// Cancellation and rejected requests are never retried; every other
    /// kind is a transient failure unless the client options say otherwise.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::InvalidRequest(_))
    }

    /// Fixed, end-user facing description of the failure.
    ///
    /// Never includes transport or server text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => {
                "Request timed out. Please check your internet connection and try again."
            }
            Self::Network(_) => {
                "Unable to connect to the service. Please check your internet connection."
            }
            Self::HttpStatus { status: 401, .. } => "You are not authorized to view this data.",
            Self::HttpStatus { status: 404, .. } => {
                "The service is temporarily unavailable. Please try again later."
            }
            Self::HttpStatus { status, .. } if *status >= 500 => {
                "Server error occurred. Please try again in a few moments."
            }
            Self::HttpStatus { .. } => "The request could not be completed. Please try again.",
            Self::Application { .. } => "The service reported an error. Please try again.",
            Self::Cancelled => "Request was cancelled.",
            Self::MalformedResponse(_) => "Received an unexpected response. Please try again.",
            Self::InvalidRequest(_) => "The request was invalid.",
        }
    }
}
