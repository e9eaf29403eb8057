//! HTTP surface of the gateway, built on axum.

mod cors;
mod error;
mod handlers;
mod routes;
mod types;

pub use cors::gateway as gateway_cors;
pub use error::AppError;
pub use routes::{AppState, gateway, gateway_routes};
pub use types::*;
