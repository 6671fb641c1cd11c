use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::password::{hash_password, verify_async};
use crate::{db::Token, error::AppError, state::AppState};

pub const MIN_PASSWORD_LEN: usize = 1;
pub const MAX_PASSWORD_LEN: usize = 128;

pub(crate) fn is_valid_name(name: &str) -> bool {
    lazy_static! {
        static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap();
    }
    NAME_RE.is_match(name)
}

lazy_static! {
    /// Verified against when the name is unknown, so that path costs a full
    /// argon2 run too.
    static ref DUMMY_HASH: String = hash_password("dummy-password").unwrap_or_default();
}

pub(crate) fn dummy_hash() -> &'static str {
    DUMMY_HASH.as_str()
}

/// Normalize and check a user name.
pub fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim().to_string();
    if !is_valid_name(&name) {
        return Err(AppError::InvalidInput(
            "name must be 1-64 letters, digits, '_', '.' or '-'".into(),
        ));
    }
    Ok(name)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput("password must not be empty".into()));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::InvalidInput("password too long".into()));
    }
    Ok(())
}

/// Check credentials and issue a new token. Unknown names and wrong
/// passwords are indistinguishable to the caller.
pub async fn login(state: &AppState, name: &str, password: String) -> Result<Token, AppError> {
    let name = name.trim();
    let Some(user) = state.store.user_by_name(name).await? else {
        verify_async(password, dummy_hash().to_string()).await?;
        debug!("login unknown name");
        return Err(AppError::Unauthenticated);
    };

    if !verify_async(password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthenticated);
    }

    let token = state
        .tokens
        .issue(user.id, OffsetDateTime::now_utc())
        .await?;
    info!(user_id = user.id, name = %user.name, "user logged in");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::PasswordHash;
    use std::time::{Duration, Instant};
    use crate::db::{NewUser, Role};
    use crate::state::test_support::memory_state;

    #[test]
    fn name_validation() {
        assert!(is_valid_name("alice"));
        assert!(is_valid_name("bob.smith-2_x"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("with space"));
        assert!(!is_valid_name(&"a".repeat(65)));
        assert_eq!(validate_name("  alice ").unwrap(), "alice");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn password_bounds() {
        assert!(validate_password("").is_err());
        assert!(validate_password("pw1").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn login_checks_credentials() {
        let state = memory_state(60);
        let alice = state
            .store
            .insert_user(NewUser {
                name: "alice".into(),
                password_hash: hash_password("pw1").unwrap(),
                role: Role::User,
            })
            .await
            .unwrap();

        let token = login(&state, "alice", "pw1".into()).await.unwrap();
        assert_eq!(token.user_id, alice.id);
        let resolved = state
            .tokens
            .resolve(token.token, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(resolved.id, alice.id);

        assert!(matches!(
            login(&state, "alice", "wrong".into()).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            login(&state, "nobody", "pw1".into()).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let parsed = PasswordHash::new(dummy_hash()).expect("dummy hash should parse");
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert!(!crate::auth::password::verify_password("pw1", dummy_hash()));
    }

    #[tokio::test]
    async fn unknown_name_costs_as_much_as_wrong_password() {
        let state = memory_state(60);
        state
            .store
            .insert_user(NewUser {
                name: "alice".into(),
                password_hash: hash_password("pw1").unwrap(),
                role: Role::User,
            })
            .await
            .unwrap();
        // warm the lazily built dummy hash
        let _ = login(&state, "nobody", "x".into()).await;

        let mut unknown = Duration::ZERO;
        let mut known = Duration::ZERO;
        for _ in 0..5 {
            let started = Instant::now();
            assert!(login(&state, "nobody", "x".into()).await.is_err());
            unknown += started.elapsed();

            let started = Instant::now();
            assert!(login(&state, "alice", "x".into()).await.is_err());
            known += started.elapsed();
        }
        assert!(
            unknown * 10 > known,
            "unknown name took {unknown:?}, wrong password took {known:?}"
        );
    }
}
