//! HTTP handlers for the gateway endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;

use super::AppError;
use super::routes::AppState;
use crate::actions::{LoginAction, LogoutAction, SignedIn, SignupAction};
use crate::session::SessionError;
use crate::{AuthError, Credentials, NewUser, ProxyError, UserRepository};

/// Create an account and sign it in.
///
/// POST /v1/users
pub async fn create_user<U>(
    State(state): State<AppState<U>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
{
    let input: NewUser = json_body(&headers, &body)?;

    let action = SignupAction::new(state.user_repo, state.sessions).with_hasher(state.hasher);
    let signed_in = action.execute(&input).await?;

    created(signed_in)
}

/// Sign in with email and password.
///
/// POST /v1/sessions
pub async fn create_session<U>(
    State(state): State<AppState<U>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
{
    let credentials: Credentials = json_body(&headers, &body)?;

    let action = LoginAction::new(
        state.user_repo,
        state.sessions,
        state.config.login_failure_delay,
    )
    .with_hasher(state.hasher);
    let signed_in = action.execute(&credentials).await?;

    created(signed_in)
}

/// Sign out the caller's own session. Any segment other than the
/// configured one (`mine`) is forbidden.
///
/// DELETE /v1/sessions/{segment}
pub async fn end_session<U>(
    State(state): State<AppState<U>>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError>
where
    U: Clone + Send + Sync + 'static,
{
    if segment != state.config.session_termination_segment {
        return Err(AppError(AuthError::Forbidden));
    }

    LogoutAction::new(state.sessions)
        .execute(&headers, &uri)
        .await?;

    Ok((StatusCode::OK, "signed out").into_response())
}

/// Relay a request to the upstream service with the caller's identity.
///
/// ANY on each forwarded route
pub async fn proxy<U>(State(state): State<AppState<U>>, req: Request) -> Result<Response, ProxyError>
where
    U: Clone + Send + Sync + 'static,
{
    state.proxy.forward(req).await
}

fn json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> Result<T, AppError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return Err(AppError(AuthError::UnsupportedMediaType));
    }

    serde_json::from_slice(body).map_err(|e| AppError(AuthError::MalformedBody(e.to_string())))
}

fn created(signed_in: SignedIn) -> Result<Response, AppError> {
    let authorization = HeaderValue::from_str(&signed_in.authorization)
        .map_err(|e| SessionError::Generation(e.to_string()))?;

    let mut response = (StatusCode::CREATED, Json(signed_in.user)).into_response();
    response.headers_mut().insert(AUTHORIZATION, authorization);
    Ok(response)
}
