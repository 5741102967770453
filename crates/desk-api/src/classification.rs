//! Failure classification for transport and HTTP-status errors.

use std::fmt;

/// Closed set of failure classes produced by the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClassification {
    /// No HTTP status obtainable (connection refused, DNS failure, timeout).
    TransientNetwork,
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// Any other non-success status.
    Other,
}

impl FailureClassification {
    /// Classify a non-success HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient-network",
            Self::BadRequest => "bad-request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(FailureClassification::from_status(400), FailureClassification::BadRequest);
        assert_eq!(FailureClassification::from_status(401), FailureClassification::Unauthorized);
        assert_eq!(FailureClassification::from_status(403), FailureClassification::Forbidden);
        assert_eq!(FailureClassification::from_status(404), FailureClassification::Other);
        assert_eq!(FailureClassification::from_status(500), FailureClassification::Other);
    }

    #[test]
    fn test_display_uses_kebab_case() {
        assert_eq!(FailureClassification::TransientNetwork.to_string(), "transient-network");
        assert_eq!(FailureClassification::BadRequest.to_string(), "bad-request");
    }
}
