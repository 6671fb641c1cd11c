use crate::auth::tokens::TokenStore;
use crate::config::AppConfig;
use crate::db::{PgStore, Store};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connect to PostgreSQL, apply migrations and build the state.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;

        let store = Arc::new(PgStore::new(pool)) as Arc<dyn Store>;
        Ok(Self::from_parts(store, Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        let tokens = TokenStore::new(store.clone(), config.token.ttl_secs);
        Self {
            store,
            tokens,
            config,
        }
    }
}
