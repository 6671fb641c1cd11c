//! Creates an administrator account. Roles cannot be granted through the
//! HTTP API, so this is the only way to obtain an admin.
//!
//! Reads `ADMIN_NAME` (default `admin`) and `ADMIN_PASSWORD` along with the
//! regular server configuration.

use anyhow::Context;
use classifieds::{
    auth::{
        password::hash_async,
        services::{validate_name, validate_password},
    },
    config::AppConfig,
    db::{NewUser, Role, StoreError},
    state::AppState,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "admin".into());
    let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;

    let name = validate_name(&name)?;
    validate_password(&password)?;

    let state = AppState::init(AppConfig::from_env()?).await?;
    let password_hash = hash_async(password).await?;

    let user = match state
        .store
        .insert_user(NewUser {
            name: name.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await
    {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => anyhow::bail!("user `{name}` already exists"),
        Err(e) => return Err(e).context("create administrator"),
    };

    tracing::info!(user_id = user.id, name = %user.name, "administrator created");
    Ok(())
}
