//! Spectrum edge gateway.
//!
//! # Usage
//!
//! ```bash
//! ADDR=0.0.0.0:8080 \
//! NEWSADDR=news:4000 \
//! SESSIONKEY=a-long-random-signing-key-of-32-bytes-or-more \
//! REDISADDR=redis:6379 \
//! spectrum-gateway
//! ```
//!
//! Serves plain HTTP; terminate TLS in front of it.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use clap::Parser;
use spectrum_gateway::api::{AppState, gateway};
use spectrum_gateway::crypto::Argon2Hasher;
use spectrum_gateway::session::RedisSessionStore;
use spectrum_gateway::{
    GatewayConfig, IdentityProxy, InMemoryUserRepository, ProxyError, SessionConfig,
    SessionError, SessionManager, Upstream,
};

/// Edge gateway: accounts, sessions and an identity-propagating proxy.
#[derive(Parser)]
#[command(name = "spectrum-gateway", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "ADDR", default_value = "0.0.0.0:8080")]
    addr: String,

    /// Address of the news service behind the proxy (`host:port` or URL).
    #[arg(long, env = "NEWSADDR")]
    news_addr: String,

    /// Key used to sign session ids. At least 32 bytes.
    #[arg(long, env = "SESSIONKEY", hide_env_values = true)]
    session_key: String,

    /// Redis address (`host:port` or `redis://` URL).
    #[arg(long, env = "REDISADDR", default_value = "127.0.0.1:6379")]
    redis_addr: String,

    /// Sliding session lifetime in seconds.
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 150)]
    session_ttl_secs: u64,

    /// Header carrying the authenticated user to upstream services.
    #[arg(long, env = "IDENTITY_HEADER", default_value = "X-User")]
    identity_header: String,

    /// Timeout for a proxied upstream request, in seconds.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    upstream_timeout_secs: u64,
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error("session store: {0}")]
    Store(#[from] SessionError),
    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!(target: "spectrum_gateway", "msg=\"gateway stopped\" error=\"{e}\"");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spectrum_gateway=info,tower_http=info".into()),
        )
        .init();
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = GatewayConfig {
        upstream: cli.news_addr,
        identity_header: cli.identity_header,
        session: SessionConfig {
            session_ttl: Duration::from_secs(cli.session_ttl_secs),
            ..SessionConfig::new(cli.session_key)
        },
        ..GatewayConfig::default()
    };
    config.validate().map_err(StartupError::Config)?;

    let upstream = Upstream::parse(&config.upstream)?;
    let identity_header = HeaderName::from_bytes(config.identity_header.as_bytes())
        .map_err(|_| StartupError::Config("identity_header is not a valid header name"))?;

    let redis_url = if cli.redis_addr.contains("://") {
        cli.redis_addr
    } else {
        format!("redis://{}", cli.redis_addr)
    };
    let store = RedisSessionStore::connect(&redis_url, config.session.session_ttl)
        .await?
        .with_key_prefix(config.session.key_prefix.clone());

    let sessions = SessionManager::new(config.session.clone(), Arc::new(store));
    let proxy = IdentityProxy::new(sessions.clone(), upstream, identity_header)?
        .with_timeout(Duration::from_secs(cli.upstream_timeout_secs))?;

    let state = AppState::new(InMemoryUserRepository::new(), sessions, proxy, config)
        .with_hasher(Argon2Hasher::production());
    let app = gateway(state);

    let listener = tokio::net::TcpListener::bind(&cli.addr).await?;
    log::info!(target: "spectrum_gateway", "msg=\"gateway listening\" addr={}", cli.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!(target: "spectrum_gateway", "msg=\"gateway shut down\"");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!(target: "spectrum_gateway", "msg=\"failed to listen for shutdown signal\" error=\"{e}\"");
        std::future::pending::<()>().await;
    }
}
