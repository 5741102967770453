//! Session error types.

use desk_api::ApiError;
use desk_storage::StorageError;
use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// API call failed
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Credential store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Server refused the login; carries the message to show
    #[error("{0}")]
    LoginRejected(String),

    /// Login succeeded but the token could not be extracted
    #[error("invalid token format")]
    InvalidTokenFormat,

    /// Username or password was blank
    #[error("Username and password are required")]
    MissingCredentials,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),
}

impl SessionError {
    /// Message suitable for showing inline on the login screen.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
