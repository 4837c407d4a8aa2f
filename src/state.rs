use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::error::AppError;
use crate::store::{with_deadline, Store};

/// Tunables that bound how long and how wide a request may fan out.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub bcrypt_cost: u32,
    pub store_timeout: Duration,
    pub import_concurrency: usize,
    pub import_timeout: Duration,
    /// Largest accepted `/tasks/import` body, in bytes.
    pub import_body_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            store_timeout: Duration::from_secs(5),
            import_concurrency: 8,
            import_timeout: Duration::from_secs(30),
            import_body_limit: 4 * 1024 * 1024,
        }
    }
}

impl From<&Config> for Limits {
    fn from(config: &Config) -> Self {
        Self {
            bcrypt_cost: config.bcrypt_cost,
            store_timeout: config.store_timeout,
            import_concurrency: config.import_concurrency,
            import_timeout: config.import_timeout,
            import_body_limit: config.import_body_limit,
        }
    }
}

/// Everything handlers share. Registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub limits: Limits,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, limits: Limits) -> Self {
        Self {
            store,
            tokens,
            limits,
        }
    }

    pub fn from_config(store: Arc<dyn Store>, config: &Config) -> Self {
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.token_ttl_hours),
        );
        Self::new(store, tokens, Limits::from(config))
    }

    /// Runs a store operation under the configured store timeout.
    pub async fn timed<T, F>(&self, operation: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        with_deadline(self.limits.store_timeout, operation).await
    }
}
