use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    Advertisement, AdvertisementChanges, AdvertisementFilter, NewAdvertisement, NewUser, Role,
    Store, StoreError, StoreResult, Token, User, UserChanges,
};

const SELECT_ADVERTISEMENT: &str = r#"
    SELECT a.id, a.title, a.description, a.price, a.date_created, a.owner_id, u.name AS owner
      FROM advertisements a
      JOIN users u ON u.id = a.owner_id
"#;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    password: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        Ok(User {
            id: row.id,
            name: row.name,
            password_hash: row.password,
            role,
        })
    }
}

/// Translate driver errors into store errors for the record kind `what`.
fn classify(e: sqlx::Error, what: &'static str) -> StoreError {
    if matches!(e, sqlx::Error::RowNotFound) {
        return StoreError::NotFound(what);
    }
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::Conflict(what);
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound("user");
        }
    }
    StoreError::Database(e)
}

/// Escape LIKE metacharacters and wrap the needle for substring matching.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, password, role
            "#,
        )
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "user"))?;
        row.try_into()
    }

    async fn user_by_id(&self, id: i64) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, password, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "user"))?;
        row.try_into()
    }

    async fn user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, password, role
            FROM users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   password = COALESCE($3, password)
             WHERE id = $1
            RETURNING id, name, password, role
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "user"))?;
        row.try_into()
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn insert_token(
        &self,
        user_id: i64,
        token: Uuid,
        creation_time: OffsetDateTime,
    ) -> StoreResult<Token> {
        sqlx::query_as::<_, Token>(
            r#"
            INSERT INTO tokens (token, user_id, creation_time)
            VALUES ($1, $2, $3)
            RETURNING id, token, user_id, creation_time
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(creation_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "token"))
    }

    async fn token_by_value(&self, token: Uuid) -> StoreResult<Option<Token>> {
        let row = sqlx::query_as::<_, Token>(
            r#"
            SELECT id, token, user_id, creation_time
            FROM tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_advertisement(&self, ad: NewAdvertisement) -> StoreResult<Advertisement> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            WITH inserted AS (
                INSERT INTO advertisements (title, description, price, owner_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, description, price, date_created, owner_id
            )
            SELECT a.id, a.title, a.description, a.price, a.date_created, a.owner_id, u.name AS owner
              FROM inserted a
              JOIN users u ON u.id = a.owner_id
            "#,
        )
        .bind(&ad.title)
        .bind(&ad.description)
        .bind(ad.price)
        .bind(ad.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "advertisement"))
    }

    async fn advertisement_by_id(&self, id: i64) -> StoreResult<Advertisement> {
        let sql = format!("{SELECT_ADVERTISEMENT} WHERE a.id = $1");
        sqlx::query_as::<_, Advertisement>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "advertisement"))
    }

    async fn update_advertisement(
        &self,
        id: i64,
        changes: AdvertisementChanges,
    ) -> StoreResult<Advertisement> {
        sqlx::query_as::<_, Advertisement>(
            r#"
            WITH updated AS (
                UPDATE advertisements
                   SET title = COALESCE($2, title),
                       description = COALESCE($3, description),
                       price = COALESCE($4, price)
                 WHERE id = $1
                RETURNING id, title, description, price, date_created, owner_id
            )
            SELECT a.id, a.title, a.description, a.price, a.date_created, a.owner_id, u.name AS owner
              FROM updated a
              JOIN users u ON u.id = a.owner_id
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "advertisement"))
    }

    async fn delete_advertisement(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("advertisement"));
        }
        Ok(())
    }

    async fn search_advertisements(
        &self,
        filter: &AdvertisementFilter,
    ) -> StoreResult<Vec<Advertisement>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_ADVERTISEMENT);
        qb.push(" WHERE TRUE");
        if let Some(title) = &filter.title {
            qb.push(" AND a.title ILIKE ").push_bind(contains_pattern(title));
        }
        if let Some(description) = &filter.description {
            qb.push(" AND a.description ILIKE ")
                .push_bind(contains_pattern(description));
        }
        if let Some(price) = filter.price {
            qb.push(" AND a.price = ").push_bind(price);
        }
        if let Some(owner) = &filter.owner {
            qb.push(" AND u.name = ").push_bind(owner.clone());
        }
        if let Some(owner_id) = filter.owner_id {
            qb.push(" AND a.owner_id = ").push_bind(owner_id);
        }
        qb.push(" ORDER BY a.id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = qb
            .build_query_as::<Advertisement>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_like_metacharacters() {
        assert_eq!(contains_pattern("bike"), "%bike%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn unknown_role_fails_conversion() {
        let row = UserRow {
            id: 1,
            name: "mallory".into(),
            password: "x".into(),
            role: "superuser".into(),
        };
        assert!(matches!(
            User::try_from(row),
            Err(StoreError::Database(sqlx::Error::Decode(_)))
        ));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound, "advertisement"),
            StoreError::NotFound("advertisement")
        ));
    }
}
