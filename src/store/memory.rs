//! In-memory store
//!
//! Same semantics as the Postgres store. Used by tests and local runs
//! without a database.

use super::{Store, StoreError, StoreResult, UniqueField};
use crate::models::{NewUser, ResetTokenRecord, SearchField, User, UserSummary};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, User>,
    reset_tokens: Vec<ResetTokenRecord>,
}

/// In-memory [`Store`] backed by a single lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reset tokens currently stored for an email
    pub async fn reset_token_count(&self, email: &str) -> usize {
        let tables = self.tables.read().await;
        tables
            .reset_tokens
            .iter()
            .filter(|r| r.email.eq_ignore_ascii_case(email))
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::UniqueViolation(UniqueField::Email));
        }
        if tables.users.values().any(|u| u.nick == user.nick) {
            return Err(StoreError::UniqueViolation(UniqueField::Nick));
        }

        tables.next_id += 1;
        let id = tables.next_id;
        tables.users.insert(
            id,
            User {
                id,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
                nick: user.nick,
                password_hash: user.password_hash,
                avatar: user.avatar,
            },
        );

        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn search_users(&self, field: SearchField, value: &str) -> StoreResult<Vec<UserSummary>> {
        let needle = value.to_lowercase();
        let tables = self.tables.read().await;

        let mut found: Vec<UserSummary> = tables
            .users
            .values()
            .filter(|u| {
                let haystack = match field {
                    SearchField::Email => u.email.to_lowercase(),
                    SearchField::Nick => u.nick.to_lowercase(),
                    SearchField::Id => u.id.to_string(),
                };
                haystack.contains(&needle)
            })
            .map(|u| UserSummary {
                id: u.id,
                nick: u.nick.clone(),
            })
            .collect();
        found.sort_by_key(|u| u.id);

        Ok(found)
    }

    async fn insert_reset_token(&self, record: ResetTokenRecord) -> StoreResult<()> {
        self.tables.write().await.reset_tokens.push(record);
        Ok(())
    }

    async fn delete_reset_tokens_by_email(&self, email: &str) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.reset_tokens.len();
        tables
            .reset_tokens
            .retain(|r| !r.email.eq_ignore_ascii_case(email));
        Ok((before - tables.reset_tokens.len()) as u64)
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<ResetTokenRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .iter()
            .find(|r| r.token == token)
            .cloned())
    }

    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<ResetTokenRecord>> {
        let mut tables = self.tables.write().await;
        let found = tables.reset_tokens.iter().position(|r| r.token == token);
        Ok(found.map(|i| tables.reset_tokens.remove(i)))
    }

    async fn mark_reset_token_used(&self, email: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for record in tables
            .reset_tokens
            .iter_mut()
            .filter(|r| r.email.eq_ignore_ascii_case(email))
        {
            record.used = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn new_user(email: &str, nick: &str) -> NewUser {
        NewUser {
            first_name: "ada".into(),
            last_name: "lovelace".into(),
            email: email.into(),
            nick: nick.into(),
            password_hash: "hash".into(),
            avatar: None,
        }
    }

    fn record(email: &str, token: &str) -> ResetTokenRecord {
        ResetTokenRecord {
            email: email.into(),
            token: token.into(),
            expires_at: Utc::now() + Duration::hours(1),
            used: false,
        }
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@b.com", "abc123")).await.unwrap();

        let err = store
            .insert_user(new_user("A@B.COM", "other1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(UniqueField::Email)));

        let err = store
            .insert_user(new_user("c@d.com", "abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(UniqueField::Nick)));
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_findable() {
        let store = MemoryStore::new();
        let first = store.insert_user(new_user("a@b.com", "abc123")).await.unwrap();
        let second = store.insert_user(new_user("c@d.com", "def456")).await.unwrap();

        assert_eq!(second, first + 1);
        assert_eq!(
            store.find_user_by_id(second).await.unwrap().unwrap().nick,
            "def456"
        );
        assert!(store.find_user_by_email("C@D.com").await.unwrap().is_some());
        assert!(store.find_user_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_users_by_substring() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@b.com", "wordsmith")).await.unwrap();
        store.insert_user(new_user("c@d.com", "smithy")).await.unwrap();
        store.insert_user(new_user("e@f.com", "other")).await.unwrap();

        let found = store.search_users(SearchField::Nick, "smith").await.unwrap();
        let nicks: Vec<_> = found.iter().map(|u| u.nick.as_str()).collect();
        assert_eq!(nicks, vec!["wordsmith", "smithy"]);
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let store = MemoryStore::new();
        store.insert_reset_token(record("a@b.com", "t1")).await.unwrap();
        store.insert_reset_token(record("a@b.com", "t2")).await.unwrap();
        store.insert_reset_token(record("c@d.com", "t3")).await.unwrap();

        store.mark_reset_token_used("a@b.com").await.unwrap();
        assert!(store.find_reset_token("t1").await.unwrap().unwrap().used);
        assert!(!store.find_reset_token("t3").await.unwrap().unwrap().used);

        let removed = store.delete_reset_tokens_by_email("a@b.com").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.find_reset_token("t2").await.unwrap().is_none());
        assert_eq!(store.reset_token_count("c@d.com").await, 1);

        let taken = store.take_reset_token("t3").await.unwrap().unwrap();
        assert_eq!(taken.email, "c@d.com");
        assert!(store.take_reset_token("t3").await.unwrap().is_none());
        assert_eq!(store.reset_token_count("c@d.com").await, 0);
    }
}
