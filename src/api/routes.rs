use std::sync::Arc;

use axum::Router;
use axum::routing::{any, delete, post};

use super::{cors, handlers};
use crate::crypto::Argon2Hasher;
use crate::{GatewayConfig, IdentityProxy, SessionManager, UserRepository};

#[derive(Clone)]
pub struct AppState<U> {
    pub user_repo: U,
    pub sessions: SessionManager,
    pub proxy: IdentityProxy,
    pub config: Arc<GatewayConfig>,
    pub hasher: Argon2Hasher,
}

impl<U> AppState<U> {
    pub fn new(
        user_repo: U,
        sessions: SessionManager,
        proxy: IdentityProxy,
        config: GatewayConfig,
    ) -> Self {
        Self {
            user_repo,
            sessions,
            proxy,
            config: Arc::new(config),
            hasher: Argon2Hasher::default(),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Argon2Hasher) -> Self {
        self.hasher = hasher;
        self
    }
}

/// Account and session endpoints plus the forwarded routes.
///
/// Each entry of `forwarded_routes` is proxied along with everything below
/// it. Routes must not overlap the `/v1/users` and `/v1/sessions` endpoints.
pub fn gateway_routes<U>(forwarded_routes: &[String]) -> Router<AppState<U>>
where
    U: UserRepository + Clone + Send + Sync + 'static,
{
    let mut router = Router::new()
        .route("/v1/users", post(handlers::create_user::<U>))
        .route("/v1/sessions", post(handlers::create_session::<U>))
        .route("/v1/sessions/{segment}", delete(handlers::end_session::<U>));

    for route in forwarded_routes {
        let base = route.trim_end_matches('/');
        if !base.is_empty() {
            router = router.route(base, any(handlers::proxy::<U>));
        }
        router = router.route(&format!("{base}/{{*rest}}"), any(handlers::proxy::<U>));
    }

    router
}

/// The complete gateway application with CORS applied.
pub fn gateway<U>(state: AppState<U>) -> Router
where
    U: UserRepository + Clone + Send + Sync + 'static,
{
    gateway_routes(&state.config.forwarded_routes)
        .layer(cors::gateway())
        .with_state(state)
}
