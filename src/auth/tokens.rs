//! Opaque session tokens.
//!
//! A token is a random v4 UUID stored next to the user it was issued for and
//! its creation time. It stays valid while `now - creation_time <= ttl`.
//! There is no revocation: expiry is the only way a token stops working.

use std::sync::Arc;

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::db::{Store, StoreError, Token, User};

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token not found")]
    NotFound,

    #[error("token expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn Store>,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(store: Arc<dyn Store>, ttl_secs: i64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Create and persist a fresh token for `user_id`, stamped with `now`.
    pub async fn issue(&self, user_id: i64, now: OffsetDateTime) -> Result<Token, StoreError> {
        let token = self
            .store
            .insert_token(user_id, Uuid::new_v4(), now)
            .await?;
        debug!(user_id, token_id = token.id, "token issued");
        Ok(token)
    }

    /// Resolve a presented token to its user as of `now`.
    pub async fn resolve(&self, token: Uuid, now: OffsetDateTime) -> Result<User, TokenError> {
        let record = self
            .store
            .token_by_value(token)
            .await?
            .ok_or(TokenError::NotFound)?;

        if now - record.creation_time > self.ttl {
            debug!(token_id = record.id, user_id = record.user_id, "token expired");
            return Err(TokenError::Expired);
        }

        match self.store.user_by_id(record.user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound(_)) => Err(TokenError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
