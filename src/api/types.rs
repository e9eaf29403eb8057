use serde::Serialize;

use crate::AuthError;
use crate::session::SessionError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    /// Body for 5xx responses: no detail about what failed inside.
    pub fn internal() -> Self {
        Self {
            error: "Internal server error".to_owned(),
            code: "INTERNAL_ERROR".to_owned(),
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::UserAlreadyExists => "USER_ALREADY_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Validation(e) => e.code(),
            AuthError::PasswordHashError => "PASSWORD_HASH_ERROR",
            AuthError::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            AuthError::MalformedBody(_) => "MALFORMED_BODY",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::DatabaseError(_) => "DATABASE_ERROR",
            AuthError::Session(e) => e.code(),
        };

        // every credential problem reads the same to the client
        let error = match &err {
            AuthError::Session(e) if !matches!(e, SessionError::Termination { .. }) => {
                "Unauthorized".to_owned()
            }
            _ => err.to_string(),
        };

        ErrorResponse {
            error,
            code: code.to_owned(),
        }
    }
}
