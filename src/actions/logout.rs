use axum::http::{HeaderMap, Uri};

use crate::{AuthError, SessionId, SessionManager};

pub struct LogoutAction {
    sessions: SessionManager,
}

impl LogoutAction {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Ends the session presented with the request and returns its id.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "logout", skip_all, err)
    )]
    pub async fn execute(&self, headers: &HeaderMap, uri: &Uri) -> Result<SessionId, AuthError> {
        let session_id = self.sessions.end(headers, uri).await?;

        log::info!(target: "spectrum_gateway::auth", "msg=\"logout success\" sid={session_id:?}");
        Ok(session_id)
    }
}
