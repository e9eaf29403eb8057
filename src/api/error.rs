use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::ErrorResponse;
use crate::session::SessionError;
use crate::{AuthError, ProxyError};

/// Converts `AuthError` into an HTTP response.
#[derive(Debug)]
pub struct AppError(pub AuthError);

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self(AuthError::Session(err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AuthError::Validation(_) | AuthError::UserAlreadyExists | AuthError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AuthError::Session(e) => match e {
                SessionError::InvalidFormat
                | SessionError::InvalidSignature
                | SessionError::NoSessionId
                | SessionError::InvalidScheme
                | SessionError::StateNotFound => StatusCode::UNAUTHORIZED,
                SessionError::Generation(_)
                | SessionError::StoreUnavailable(_)
                | SessionError::Serialization(_)
                | SessionError::Termination { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AuthError::DatabaseError(_) | AuthError::PasswordHashError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!(target: "spectrum_gateway::api", "msg=\"request failed\" status={} error=\"{}\"", status.as_u16(), self.0);
            return (status, Json(ErrorResponse::internal())).into_response();
        }

        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidUpstream(_) | ProxyError::Principal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        log::warn!(target: "spectrum_gateway::api", "msg=\"proxy failed\" status={} error=\"{self}\"", status.as_u16());

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Proxy error")
                .to_owned(),
            code: "PROXY_ERROR".to_owned(),
        };
        (status, Json(body)).into_response()
    }
}
