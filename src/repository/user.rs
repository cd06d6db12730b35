//! User store: `USER#<email>` / `DETAILS`.
//!
//! The same row carries the `venue_ids` list maintained by the venue store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::keys;
use crate::model::{Role, User};
use crate::storage::{from_item, to_item, Condition, TableStore};

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    pk: String,
    sk: String,
    user_id: String,
    #[serde(default)]
    username: String,
    email: String,
    #[serde(default)]
    phone_number: String,
    #[serde(default)]
    credential: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    is_blocked: bool,
    #[serde(default)]
    venue_ids: Vec<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            phone_number: row.phone_number,
            credential: row.credential,
            role: row.role,
            is_blocked: row.is_blocked,
        }
    }
}

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn TableStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Register a user. Fails with `AlreadyExists` if the email is taken.
    pub async fn create(&self, user: &User) -> Result<()> {
        let key = keys::user_key(&user.email)?;
        let row = UserRow {
            pk: key.pk,
            sk: key.sk,
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            credential: user.credential.clone(),
            role: user.role,
            is_blocked: user.is_blocked,
            venue_ids: Vec::new(),
        };

        self.store
            .put(to_item(&row)?, Condition::NotExists)
            .await
            .map_err(|e| {
                if e.is_condition_failure() {
                    Error::AlreadyExists {
                        entity: "user",
                        id: user.email.clone(),
                    }
                } else {
                    e.into()
                }
            })?;

        info!(email = %user.email, role = %user.role, "Created user");
        Ok(())
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User> {
        let item = self
            .store
            .get(&keys::user_key(email)?)
            .await?
            .ok_or_else(|| Error::not_found("user", email))?;
        Ok(from_item::<UserRow>(item)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTableStore;

    fn user(email: &str, role: Role) -> User {
        User {
            user_id: format!("id-{email}"),
            username: "moody".to_string(),
            email: email.to_string(),
            phone_number: "555-0100".to_string(),
            credential: "opaque".to_string(),
            role,
            is_blocked: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = UserRepository::new(Arc::new(MemoryTableStore::new()));
        let host = user("host@example.com", Role::Host);
        repo.create(&host).await.unwrap();

        assert_eq!(repo.get_by_email("host@example.com").await.unwrap(), host);
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let repo = UserRepository::new(Arc::new(MemoryTableStore::new()));
        let host = user("host@example.com", Role::Host);
        repo.create(&host).await.unwrap();

        let result = repo.create(&host).await;
        assert!(matches!(result, Err(Error::AlreadyExists { entity: "user", .. })));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let repo = UserRepository::new(Arc::new(MemoryTableStore::new()));
        assert!(repo.get_by_email("nobody@example.com").await.unwrap_err().is_not_found());
    }
}
