//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::AuthContext;
use crate::config::Config;
use crate::storage::S3Client;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    s3_client: S3Client,
    db: SqlitePool,
    auth: AuthContext,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, s3_client: S3Client, db: SqlitePool, auth: AuthContext) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                s3_client,
                db,
                auth,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the S3 client
    pub fn s3_client(&self) -> &S3Client {
        &self.inner.s3_client
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the auth context
    pub fn auth(&self) -> &AuthContext {
        &self.inner.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKeys;
    use crate::db::create_pool;

    #[tokio::test]
    async fn test_state_shares_one_inner() {
        let config = Config::default();
        let s3_client = S3Client::new(&config.storage);
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let auth = AuthContext::new(TokenKeys::new("secret", 1));

        let state = AppState::new(config, s3_client, pool, auth);
        let clone = state.clone();

        // Clones read the same configuration through the accessor
        assert_eq!(clone.config().server.port, state.config().server.port);
        assert_eq!(state.config().storage.bucket, "marginalia");
        assert_eq!(state.s3_client().bucket(), "marginalia");
    }
}
