use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Advertisement, AdvertisementChanges, AdvertisementFilter, NewAdvertisement, NewUser, Store,
    StoreError, StoreResult, Token, User, UserChanges,
};

#[derive(Debug, Clone)]
struct AdvertisementRow {
    id: i64,
    title: String,
    description: String,
    price: f64,
    date_created: OffsetDateTime,
    owner_id: i64,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    tokens: HashMap<Uuid, Token>,
    advertisements: BTreeMap<i64, AdvertisementRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn joined(&self, row: &AdvertisementRow) -> StoreResult<Advertisement> {
        let owner = self
            .users
            .get(&row.owner_id)
            .ok_or(StoreError::NotFound("user"))?;
        Ok(Advertisement {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            price: row.price,
            date_created: row.date_created,
            owner_id: row.owner_id,
            owner: owner.name.clone(),
        })
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.name == name && Some(u.id) != except)
    }
}

/// In-process store with the same uniqueness and cascade rules as the
/// PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.name_taken(&user.name, None) {
            return Err(StoreError::Conflict("user"));
        }
        let id = t.next_id();
        let user = User {
            id,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> StoreResult<User> {
        let t = self.tables.read().await;
        t.users.get(&id).cloned().ok_or(StoreError::NotFound("user"))
    }

    async fn user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.name == name).cloned())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&id) {
            return Err(StoreError::NotFound("user"));
        }
        if let Some(name) = &changes.name {
            if t.name_taken(name, Some(id)) {
                return Err(StoreError::Conflict("user"));
            }
        }
        let user = t.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() {
            return Err(StoreError::NotFound("user"));
        }
        t.tokens.retain(|_, token| token.user_id != id);
        t.advertisements.retain(|_, ad| ad.owner_id != id);
        Ok(())
    }

    async fn insert_token(
        &self,
        user_id: i64,
        token: Uuid,
        creation_time: OffsetDateTime,
    ) -> StoreResult<Token> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }
        if t.tokens.contains_key(&token) {
            return Err(StoreError::Conflict("token"));
        }
        let record = Token {
            id: t.next_id(),
            token,
            user_id,
            creation_time,
        };
        t.tokens.insert(token, record.clone());
        Ok(record)
    }

    async fn token_by_value(&self, token: Uuid) -> StoreResult<Option<Token>> {
        let t = self.tables.read().await;
        Ok(t.tokens.get(&token).cloned())
    }

    async fn insert_advertisement(&self, ad: NewAdvertisement) -> StoreResult<Advertisement> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&ad.owner_id) {
            return Err(StoreError::NotFound("user"));
        }
        let row = AdvertisementRow {
            id: t.next_id(),
            title: ad.title,
            description: ad.description,
            price: ad.price,
            date_created: OffsetDateTime::now_utc(),
            owner_id: ad.owner_id,
        };
        let joined = t.joined(&row)?;
        t.advertisements.insert(row.id, row);
        Ok(joined)
    }

    async fn advertisement_by_id(&self, id: i64) -> StoreResult<Advertisement> {
        let t = self.tables.read().await;
        let row = t
            .advertisements
            .get(&id)
            .ok_or(StoreError::NotFound("advertisement"))?;
        t.joined(row)
    }

    async fn update_advertisement(
        &self,
        id: i64,
        changes: AdvertisementChanges,
    ) -> StoreResult<Advertisement> {
        let mut t = self.tables.write().await;
        let row = t
            .advertisements
            .get_mut(&id)
            .ok_or(StoreError::NotFound("advertisement"))?;
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(price) = changes.price {
            row.price = price;
        }
        let row = row.clone();
        t.joined(&row)
    }

    async fn delete_advertisement(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.advertisements
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("advertisement"))
    }

    async fn search_advertisements(
        &self,
        filter: &AdvertisementFilter,
    ) -> StoreResult<Vec<Advertisement>> {
        let t = self.tables.read().await;
        let mut out = Vec::new();
        for row in t.advertisements.values() {
            let ad = t.joined(row)?;
            let keep = filter
                .title
                .as_deref()
                .map_or(true, |needle| contains_ignore_case(&ad.title, needle))
                && filter
                    .description
                    .as_deref()
                    .map_or(true, |needle| contains_ignore_case(&ad.description, needle))
                && filter.price.map_or(true, |p| ad.price == p)
                && filter.owner.as_deref().map_or(true, |o| ad.owner == o)
                && filter.owner_id.map_or(true, |id| ad.owner_id == id);
            if keep {
                out.push(ad);
            }
        }
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }
}
