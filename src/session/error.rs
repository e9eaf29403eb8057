use super::SessionId;

/// Failures of the session codec, store and lifecycle.
///
/// Callers that authenticate best-effort should treat everything except
/// [`SessionError::StoreUnavailable`] as "no session".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("failed to generate session id: {0}")]
    Generation(String),
    #[error("session id is malformed")]
    InvalidFormat,
    #[error("session id signature is invalid")]
    InvalidSignature,
    #[error("no session id found in Authorization header or auth query parameter")]
    NoSessionId,
    #[error("authorization scheme not supported")]
    InvalidScheme,
    /// No live entry: never existed, expired or terminated.
    #[error("no session state found")]
    StateNotFound,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("failed to encode session state: {0}")]
    Serialization(String),
    #[error("failed to terminate session {session_id}: {source}")]
    Termination {
        session_id: SessionId,
        source: Box<SessionError>,
    },
}

impl SessionError {
    /// True for failures of the backing store itself rather than of the
    /// credential presented.
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::Termination { source, .. } => source.is_store_unavailable(),
            _ => false,
        }
    }

    /// Short stable code used in log lines and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Generation(_) => "SESSION_GENERATION_FAILED",
            Self::InvalidFormat => "TOKEN_FORMAT",
            Self::InvalidSignature => "TOKEN_SIGNATURE",
            Self::NoSessionId => "NO_SESSION",
            Self::InvalidScheme => "INVALID_SCHEME",
            Self::StateNotFound => "SESSION_NOT_FOUND",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Serialization(_) => "SESSION_ENCODING",
            Self::Termination { .. } => "SESSION_TERMINATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_detection() {
        assert!(SessionError::StoreUnavailable("timeout".to_owned()).is_store_unavailable());
        assert!(!SessionError::StateNotFound.is_store_unavailable());
        assert!(!SessionError::InvalidSignature.is_store_unavailable());
    }

    #[test]
    fn test_display_does_not_leak_store_detail_into_code() {
        let err = SessionError::StoreUnavailable("connection refused 10.0.0.7:6379".to_owned());
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
        assert!(err.to_string().contains("connection refused"));
    }
}
