//! API error types.

use crate::classification::FailureClassification;
use crate::envelope::UNAUTHORIZED_CODE;
use crate::validation::ValidationErrors;
use desk_storage::StorageError;
use thiserror::Error;

/// Error type for every call made through the request pipeline.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No HTTP status was obtained (connection refused, DNS, timeout).
    #[error("Network error: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} ({classification}): {body_summary}")]
    Status {
        status: u16,
        classification: FailureClassification,
        body_summary: String,
    },

    /// HTTP success, but the envelope carried a non-200 business code.
    #[error("Request rejected with code {code}: {message}")]
    Business { code: i64, message: String },

    /// HTTP success, but the payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Credential store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Base URL or request path could not be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Client-side validation failed; no request was sent
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error taxonomy used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransientNetwork,
    Unauthorized,
    Forbidden,
    BadRequest,
    /// Envelope code 401 carried over HTTP 200.
    BusinessUnauthorized,
    /// Any other non-200 envelope code.
    BusinessOther,
    MalformedResponse,
    /// Non-success HTTP status outside 400/401/403.
    HttpOther,
    Validation,
    /// Local failure (storage, configuration).
    Local,
}

impl ApiError {
    /// Failure classification for transport and HTTP-status errors.
    pub fn classification(&self) -> Option<FailureClassification> {
        match self {
            ApiError::Transport { .. } => Some(FailureClassification::TransientNetwork),
            ApiError::Status { classification, .. } => Some(*classification),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport { .. } => ErrorKind::TransientNetwork,
            ApiError::Status { classification, .. } => match classification {
                FailureClassification::TransientNetwork => ErrorKind::TransientNetwork,
                FailureClassification::Unauthorized => ErrorKind::Unauthorized,
                FailureClassification::Forbidden => ErrorKind::Forbidden,
                FailureClassification::BadRequest => ErrorKind::BadRequest,
                FailureClassification::Other => ErrorKind::HttpOther,
            },
            ApiError::Business { code, .. } if *code == UNAUTHORIZED_CODE => {
                ErrorKind::BusinessUnauthorized
            }
            ApiError::Business { .. } => ErrorKind::BusinessOther,
            ApiError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Storage(_) | ApiError::InvalidUrl(_) => ErrorKind::Local,
        }
    }

    /// Returns true if repeating the same call may succeed.
    ///
    /// Retryable errors include transport failures and 5xx statuses. The
    /// pipeline itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Message suitable for showing to the person who triggered the call.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::TransientNetwork => {
                "Network error, please check your connection and try again".to_string()
            }
            ErrorKind::Unauthorized | ErrorKind::BusinessUnauthorized => {
                "Session expired, please log in again".to_string()
            }
            ErrorKind::Forbidden => "You do not have permission to perform this action".to_string(),
            ErrorKind::BadRequest => "The server rejected the request".to_string(),
            ErrorKind::BusinessOther => match self {
                ApiError::Business { message, .. } if !message.trim().is_empty() => message.clone(),
                _ => "Operation failed".to_string(),
            },
            ErrorKind::HttpOther if self.is_retryable() => {
                "Server error, please try again later".to_string()
            }
            ErrorKind::HttpOther => "Request failed".to_string(),
            ErrorKind::MalformedResponse => "Unexpected response from server".to_string(),
            ErrorKind::Validation | ErrorKind::Local => self.to_string(),
        }
    }
}
