//! API module
//!
//! HTTP routes and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;

/// Shared application state: the connection pool plus the resolved
/// configuration (notification routing, token lifetime).
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

pub use routes::{create_public_router, create_router};
