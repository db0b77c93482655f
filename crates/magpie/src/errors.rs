use thiserror::Error;

/// Client-side failure taxonomy for talking to the agent runtime.
///
/// Classification is best-effort pattern matching over whatever the
/// transport surfaces, not a contract with the remote service.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("{0}")]
    Unknown(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Status-code specialization of the taxonomy, used to decide retryability
/// and user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Auth,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    ServerFault,
    Service,
    Unknown,
}

impl AgentError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        AgentError::Service {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Network(_) => ErrorKind::Network,
            AgentError::Timeout(_) => ErrorKind::Timeout,
            AgentError::Service { status, .. } => match status {
                401 => ErrorKind::Auth,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                422 => ErrorKind::Validation,
                429 => ErrorKind::RateLimited,
                s if *s >= 500 => ErrorKind::ServerFault,
                _ => ErrorKind::Service,
            },
            AgentError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Whether a one-shot retry of the failed operation is worth offering.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Network
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
                | ErrorKind::ServerFault
                | ErrorKind::Unknown
        )
    }

    /// Classify an error by its message text alone. Used when the transport
    /// gives us nothing more structured to go on.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("timeout") || lowered.contains("timed out") {
            AgentError::Timeout(message)
        } else if lowered.contains("unauthorized") || lowered.contains("authentication") {
            AgentError::service(401, message)
        } else if lowered.contains("forbidden") {
            AgentError::service(403, message)
        } else if lowered.contains("not found") {
            AgentError::service(404, message)
        } else {
            AgentError::Unknown(message)
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            AgentError::service(status.as_u16(), err.to_string())
        } else if err.is_connect() || err.is_request() {
            AgentError::Network(err.to_string())
        } else {
            AgentError::from_message(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_specialization() {
        assert_eq!(AgentError::service(401, "x").kind(), ErrorKind::Auth);
        assert_eq!(AgentError::service(403, "x").kind(), ErrorKind::Forbidden);
        assert_eq!(AgentError::service(404, "x").kind(), ErrorKind::NotFound);
        assert_eq!(AgentError::service(422, "x").kind(), ErrorKind::Validation);
        assert_eq!(AgentError::service(429, "x").kind(), ErrorKind::RateLimited);
        assert_eq!(AgentError::service(500, "x").kind(), ErrorKind::ServerFault);
        assert_eq!(AgentError::service(503, "x").kind(), ErrorKind::ServerFault);
        assert_eq!(AgentError::service(400, "x").kind(), ErrorKind::Service);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AgentError::Network("connection refused".into()).is_retryable());
        assert!(AgentError::Timeout("deadline".into()).is_retryable());
        assert!(AgentError::service(429, "slow down").is_retryable());
        assert!(AgentError::service(500, "boom").is_retryable());
        assert!(AgentError::Unknown("???".into()).is_retryable());

        assert!(!AgentError::service(401, "no key").is_retryable());
        assert!(!AgentError::service(403, "denied").is_retryable());
        assert!(!AgentError::service(404, "missing").is_retryable());
        assert!(!AgentError::service(422, "bad input").is_retryable());
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(
            AgentError::from_message("request timed out").kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            AgentError::from_message("401 Unauthorized").kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            AgentError::from_message("resource not found").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AgentError::from_message("something odd").kind(),
            ErrorKind::Unknown
        );
    }
}
