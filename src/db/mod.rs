//! Persistence boundary: record types and the [`Store`] trait.
//!
//! Handlers never talk to sqlx directly. They go through an `Arc<dyn Store>`
//! held by the application state, so the same request pipeline runs against
//! PostgreSQL in production and against [`memory::MemoryStore`] in tests.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// User record.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // PHC string, never serialized
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Session token bound to one user.
#[derive(Debug, Clone, FromRow)]
pub struct Token {
    pub id: i64,
    pub token: Uuid,
    pub user_id: i64,
    pub creation_time: OffsetDateTime,
}

/// Advertisement joined with its owner's name.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Advertisement {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    pub owner_id: i64,
    pub owner: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial user update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AdvertisementChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// Search over advertisements. Text fields match case-insensitive substrings,
/// the rest match exactly.
#[derive(Debug, Clone)]
pub struct AdvertisementFilter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub owner: Option<String>,
    pub owner_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AdvertisementFilter {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            price: None,
            owner: None,
            owner_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user_by_id(&self, id: i64) -> StoreResult<User>;
    async fn user_by_name(&self, name: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User>;
    /// Removes the user together with its tokens and advertisements.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;

    async fn insert_token(
        &self,
        user_id: i64,
        token: Uuid,
        creation_time: OffsetDateTime,
    ) -> StoreResult<Token>;
    async fn token_by_value(&self, token: Uuid) -> StoreResult<Option<Token>>;

    async fn insert_advertisement(&self, ad: NewAdvertisement) -> StoreResult<Advertisement>;
    async fn advertisement_by_id(&self, id: i64) -> StoreResult<Advertisement>;
    async fn update_advertisement(
        &self,
        id: i64,
        changes: AdvertisementChanges,
    ) -> StoreResult<Advertisement>;
    async fn delete_advertisement(&self, id: i64) -> StoreResult<()>;
    async fn search_advertisements(
        &self,
        filter: &AdvertisementFilter,
    ) -> StoreResult<Vec<Advertisement>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_and_prints_lowercase() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn user_serialization_skips_password_hash() {
        let user = User {
            id: 7,
            name: "alice".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::User,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("argon2"));
    }
}
