use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::tokens::TokenError;
use crate::{db::User, error::AppError, state::AppState};

pub const TOKEN_HEADER: &str = "x-token";

/// The user behind the presented token, loaded fresh from the store.
pub struct AuthUser(pub User);

/// Pull the raw token out of `X-Token`, falling back to `Authorization: Bearer`.
fn presented_token(parts: &Parts) -> Option<&str> {
    if let Some(value) = parts.headers.get(TOKEN_HEADER) {
        return value.to_str().ok().map(str::trim);
    }
    let auth = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = presented_token(parts).ok_or_else(|| {
            debug!("no token presented");
            AppError::Unauthenticated
        })?;

        let token = Uuid::parse_str(raw).map_err(|_| {
            debug!("malformed token presented");
            AppError::Unauthenticated
        })?;

        match state.tokens.resolve(token, OffsetDateTime::now_utc()).await {
            Ok(user) => Ok(AuthUser(user)),
            Err(TokenError::NotFound) => {
                debug!("unknown token presented");
                Err(AppError::Unauthenticated)
            }
            Err(TokenError::Expired) => {
                debug!("expired token presented");
                Err(AppError::Unauthenticated)
            }
            Err(TokenError::Store(e)) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: &str, value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn token_is_read_from_x_token_header() {
        let parts = parts_with("X-Token", "abc");
        assert_eq!(presented_token(&parts), Some("abc"));
    }

    #[test]
    fn token_falls_back_to_bearer_authorization() {
        let parts = parts_with("Authorization", "Bearer abc");
        assert_eq!(presented_token(&parts), Some("abc"));
        let parts = parts_with("Authorization", "Basic abc");
        assert_eq!(presented_token(&parts), None);
    }

    #[test]
    fn missing_headers_yield_nothing() {
        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(presented_token(&parts), None);
    }
}
