//! Application state management

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::ai::AiService;
use crate::auth::TokenService;
use crate::config::Config;
use crate::storage::ObjectStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    store: Arc<dyn ObjectStore>,
    tokens: TokenService,
    ai: AiService,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, db: SqlitePool, store: Arc<dyn ObjectStore>, ai: AiService) -> Self {
        let tokens = TokenService::new(&config.auth);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                store,
                tokens,
                ai,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the object store
    pub fn store(&self) -> &dyn ObjectStore {
        self.inner.store.as_ref()
    }

    /// Get the token service
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get the AI service
    pub fn ai(&self) -> &AiService {
        &self.inner.ai
    }

    /// Lifetime of signed download URLs
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.inner.config.uploads.signed_url_ttl_secs)
    }
}
