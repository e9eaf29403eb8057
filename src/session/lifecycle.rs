//! Begin / get / end semantics over the signed id codec and a [`SessionStore`].

use std::future::Future;
use std::sync::Arc;

use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{SessionConfig, SessionError, SessionId, SessionStore};

/// Authorization scheme used on requests and on the session-start response.
pub const SCHEME_BEARER: &str = "Bearer ";

/// The only entry point handlers use to create, read or destroy sessions.
///
/// Holds the immutable session configuration (including the signing key)
/// and a shared handle to the store. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<SessionConfig>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("ttl", &self.store.ttl())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Mints an id, persists `state` under it and returns the id together
    /// with the `Authorization` header value to send back.
    ///
    /// The state is committed before this returns, so a client can use the
    /// token immediately. On any failure nothing is returned to put in a
    /// response header.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_begin", skip_all, err)
    )]
    pub async fn begin<T>(&self, state: &T) -> Result<(SessionId, String), SessionError>
    where
        T: Serialize + Sync,
    {
        let sid = SessionId::new(&self.config.signing_key)?;
        let encoded =
            serde_json::to_string(state).map_err(|e| SessionError::Serialization(e.to_string()))?;

        self.bounded(self.store.save(&sid, &encoded)).await?;

        log::debug!(target: "spectrum_gateway::session", "msg=\"session started\" sid={sid:?}");
        let header = authorization_value(&sid);
        Ok((sid, header))
    }

    /// Finds and validates the caller's session id.
    ///
    /// Looks at `Authorization: Bearer <token>` first and falls back to the
    /// `auth` query parameter for clients that cannot set headers. The query
    /// value may be the bare token or carry the `Bearer ` prefix. An empty
    /// `Authorization` header counts as absent.
    pub fn extract_id(&self, headers: &HeaderMap, uri: &Uri) -> Result<SessionId, SessionError> {
        let token = match headers.get(AUTHORIZATION).filter(|value| !value.is_empty()) {
            Some(value) => {
                let value = value.to_str().map_err(|_| SessionError::InvalidScheme)?;
                value
                    .strip_prefix(SCHEME_BEARER)
                    .ok_or(SessionError::InvalidScheme)?
                    .trim()
                    .to_owned()
            }
            None => {
                let token = self
                    .query_token(uri)
                    .ok_or(SessionError::NoSessionId)?;
                match token.strip_prefix(SCHEME_BEARER) {
                    Some(stripped) => stripped.trim().to_owned(),
                    None => token,
                }
            }
        };

        if token.is_empty() {
            return Err(SessionError::NoSessionId);
        }
        SessionId::validate(&token, &self.config.signing_key)
    }

    /// Loads the state of the caller's session, refreshing its expiry.
    ///
    /// Every credential or lookup failure comes back as
    /// [`SessionError::StateNotFound`]. A store outage is passed through as
    /// [`SessionError::StoreUnavailable`] so it can be alerted on; callers
    /// authenticating best-effort may still treat it as anonymous.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_get_state", skip_all, err)
    )]
    pub async fn get_state<T>(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> Result<(SessionId, T), SessionError>
    where
        T: DeserializeOwned,
    {
        let sid = self.extract_id(headers, uri).map_err(|e| {
            log::debug!(target: "spectrum_gateway::session", "msg=\"no valid session id\" reason={}", e.code());
            SessionError::StateNotFound
        })?;

        let encoded = match self.bounded(self.store.get(&sid)).await {
            Ok(encoded) => encoded,
            Err(e) if e.is_store_unavailable() => {
                log::warn!(target: "spectrum_gateway::session", "msg=\"session store unavailable\" sid={sid:?} error=\"{e}\"");
                return Err(e);
            }
            Err(_) => return Err(SessionError::StateNotFound),
        };

        let state = serde_json::from_str(&encoded).map_err(|e| {
            log::warn!(target: "spectrum_gateway::session", "msg=\"undecodable session state\" sid={sid:?} error=\"{e}\"");
            SessionError::StateNotFound
        })?;

        Ok((sid, state))
    }

    /// Deletes the caller's session and returns its id.
    ///
    /// If the id was found but deletion failed, the error is
    /// [`SessionError::Termination`] carrying the id, so it can be logged.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_end", skip_all, err)
    )]
    pub async fn end(&self, headers: &HeaderMap, uri: &Uri) -> Result<SessionId, SessionError> {
        let sid = self.extract_id(headers, uri)?;

        if let Err(e) = self.bounded(self.store.delete(&sid)).await {
            log::warn!(target: "spectrum_gateway::session", "msg=\"failed to end session\" sid={sid:?} error=\"{e}\"");
            return Err(SessionError::Termination {
                session_id: sid,
                source: Box::new(e),
            });
        }

        log::debug!(target: "spectrum_gateway::session", "msg=\"session ended\" sid={sid:?}");
        Ok(sid)
    }

    fn query_token(&self, uri: &Uri) -> Option<String> {
        let Query(mut params) =
            Query::<std::collections::HashMap<String, String>>::try_from_uri(uri).ok()?;
        params.remove(&self.config.query_param)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        tokio::time::timeout(self.config.store_timeout, op)
            .await
            .map_err(|_| {
                SessionError::StoreUnavailable(format!(
                    "store operation exceeded {}ms",
                    self.config.store_timeout.as_millis()
                ))
            })?
    }
}

/// `Bearer <token>`, as sent in the `Authorization` response header.
pub fn authorization_value(sid: &SessionId) -> String {
    format!("{SCHEME_BEARER}{sid}")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use chrono::Utc;

    use super::*;
    use crate::session::{InMemorySessionStore, SessionState};
    use crate::{SecretString, User};

    const KEY: &str = "test-secret-key-that-is-long-enough";

    fn manager() -> (SessionManager, InMemorySessionStore) {
        let store = InMemorySessionStore::new(Duration::from_secs(150));
        let manager = SessionManager::new(SessionConfig::new(KEY), Arc::new(store.clone()));
        (manager, store)
    }

    fn alice() -> SessionState {
        SessionState {
            start_time: Utc::now(),
            user: User::mock_from_email("alice@example.com"),
        }
    }

    fn bearer(header: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(header).unwrap());
        headers
    }

    fn root() -> Uri {
        Uri::from_static("/v1/news")
    }

    /// Store that never answers, to exercise the timeout path.
    struct StalledStore;

    #[async_trait]
    impl SessionStore for StalledStore {
        async fn save(&self, _: &SessionId, _: &str) -> Result<(), SessionError> {
            std::future::pending().await
        }
        async fn get(&self, _: &SessionId) -> Result<String, SessionError> {
            std::future::pending().await
        }
        async fn delete(&self, _: &SessionId) -> Result<(), SessionError> {
            std::future::pending().await
        }
        fn ttl(&self) -> Duration {
            Duration::from_secs(150)
        }
    }

    /// Store whose backend is down.
    struct DownStore;

    #[async_trait]
    impl SessionStore for DownStore {
        async fn save(&self, _: &SessionId, _: &str) -> Result<(), SessionError> {
            Err(SessionError::StoreUnavailable("connection refused".to_owned()))
        }
        async fn get(&self, _: &SessionId) -> Result<String, SessionError> {
            Err(SessionError::StoreUnavailable("connection refused".to_owned()))
        }
        async fn delete(&self, _: &SessionId) -> Result<(), SessionError> {
            Err(SessionError::StoreUnavailable("connection refused".to_owned()))
        }
        fn ttl(&self) -> Duration {
            Duration::from_secs(150)
        }
    }

    #[tokio::test]
    async fn test_begin_then_get_state() {
        let (manager, _) = manager();
        let state = alice();

        let (sid, header) = manager.begin(&state).await.unwrap();
        assert_eq!(header, format!("Bearer {sid}"));

        let (found_sid, found): (SessionId, SessionState) =
            manager.get_state(&bearer(&header), &root()).await.unwrap();
        assert_eq!(found_sid, sid);
        assert_eq!(found.user.email, state.user.email);
    }

    #[tokio::test]
    async fn test_garbage_token_is_not_found() {
        let (manager, _) = manager();

        let result = manager
            .get_state::<SessionState>(&bearer("Bearer garbage"), &root())
            .await;
        assert_eq!(result.unwrap_err(), SessionError::StateNotFound);
    }

    #[tokio::test]
    async fn test_begin_end_then_get_state_fails() {
        let (manager, store) = manager();
        let (sid, header) = manager.begin(&alice()).await.unwrap();

        let ended = manager.end(&bearer(&header), &root()).await.unwrap();
        assert_eq!(ended, sid);
        assert!(store.is_empty());

        // signature is still valid, but the session is gone for good
        assert!(manager.extract_id(&bearer(&header), &root()).is_ok());
        let result = manager
            .get_state::<SessionState>(&bearer(&header), &root())
            .await;
        assert_eq!(result.unwrap_err(), SessionError::StateNotFound);
    }

    #[tokio::test]
    async fn test_token_from_other_key_is_rejected() {
        let (manager, _) = manager();
        let foreign = SessionId::new(&SecretString::new("some-other-gateway-signing-key-123")).unwrap();

        let result = manager.extract_id(&bearer(&authorization_value(&foreign)), &root());
        assert_eq!(result.unwrap_err(), SessionError::InvalidSignature);
    }

    #[test]
    fn test_extract_id_errors() {
        let (manager, _) = manager();

        assert_eq!(
            manager.extract_id(&HeaderMap::new(), &root()).unwrap_err(),
            SessionError::NoSessionId
        );
        assert_eq!(
            manager.extract_id(&bearer("Basic dXNlcjpwYXNz"), &root()).unwrap_err(),
            SessionError::InvalidScheme
        );
        assert_eq!(
            manager.extract_id(&bearer("Bearer "), &root()).unwrap_err(),
            SessionError::NoSessionId
        );
        assert_eq!(
            manager.extract_id(&bearer("Bearer !!!"), &root()).unwrap_err(),
            SessionError::InvalidFormat
        );
    }

    #[tokio::test]
    async fn test_extract_id_from_query_param() {
        let (manager, _) = manager();
        let (sid, _) = manager.begin(&alice()).await.unwrap();

        let bare: Uri = format!("/v1/news?page=2&auth={sid}").parse().unwrap();
        assert_eq!(manager.extract_id(&HeaderMap::new(), &bare).unwrap(), sid);

        let prefixed: Uri = format!("/v1/news?auth=Bearer%20{sid}").parse().unwrap();
        assert_eq!(manager.extract_id(&HeaderMap::new(), &prefixed).unwrap(), sid);
    }

    #[tokio::test]
    async fn test_empty_header_falls_back_to_query() {
        let (manager, _) = manager();
        let (sid, _) = manager.begin(&alice()).await.unwrap();

        let uri: Uri = format!("/v1/news?auth={sid}").parse().unwrap();
        assert_eq!(manager.extract_id(&bearer(""), &uri).unwrap(), sid);
        assert_eq!(
            manager.extract_id(&bearer(""), &root()).unwrap_err(),
            SessionError::NoSessionId
        );
    }

    #[tokio::test]
    async fn test_header_takes_precedence_over_query() {
        let (manager, _) = manager();
        let (sid, header) = manager.begin(&alice()).await.unwrap();

        let uri: Uri = "/v1/news?auth=garbage".parse().unwrap();
        assert_eq!(manager.extract_id(&bearer(&header), &uri).unwrap(), sid);
    }

    #[tokio::test]
    async fn test_store_outage_is_distinguishable() {
        let manager = SessionManager::new(SessionConfig::new(KEY), Arc::new(DownStore));
        let sid = SessionId::new(&SecretString::new(KEY)).unwrap();

        let result = manager
            .get_state::<SessionState>(&bearer(&authorization_value(&sid)), &root())
            .await;
        assert!(result.unwrap_err().is_store_unavailable());

        assert!(manager.begin(&alice()).await.unwrap_err().is_store_unavailable());
    }

    #[tokio::test]
    async fn test_end_reports_id_on_delete_failure() {
        let manager = SessionManager::new(SessionConfig::new(KEY), Arc::new(DownStore));
        let sid = SessionId::new(&SecretString::new(KEY)).unwrap();

        let err = manager
            .end(&bearer(&authorization_value(&sid)), &root())
            .await
            .unwrap_err();
        match err {
            SessionError::Termination { session_id, source } => {
                assert_eq!(session_id, sid);
                assert!(source.is_store_unavailable());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_is_store_unavailable() {
        let config = SessionConfig {
            store_timeout: Duration::from_millis(50),
            ..SessionConfig::new(KEY)
        };
        let manager = SessionManager::new(config, Arc::new(StalledStore));
        let sid = SessionId::new(&SecretString::new(KEY)).unwrap();

        let result = manager
            .get_state::<SessionState>(&bearer(&authorization_value(&sid)), &root())
            .await;
        assert!(matches!(result, Err(SessionError::StoreUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_expiry_through_manager() {
        let (manager, _) = manager();
        let (_, header) = manager.begin(&alice()).await.unwrap();
        let headers = bearer(&header);

        tokio::time::advance(Duration::from_secs(149)).await;
        assert!(manager.get_state::<SessionState>(&headers, &root()).await.is_ok());

        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(manager.get_state::<SessionState>(&headers, &root()).await.is_ok());

        tokio::time::advance(Duration::from_secs(151)).await;
        assert_eq!(
            manager
                .get_state::<SessionState>(&headers, &root())
                .await
                .unwrap_err(),
            SessionError::StateNotFound
        );
    }
}
