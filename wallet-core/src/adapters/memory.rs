//! In-memory repository implementation
//!
//! Backs the test suites and local demo runs with the full `Repository`
//! contract, including version-guarded commits. Nothing here is a stub:
//! every operation behaves like the durable adapter, minus durability.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{User, Wallet};
use crate::ports::Repository;

/// In-memory repository implementation
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<String, User>>,
    wallets: RwLock<HashMap<Uuid, Wallet>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, user: &User, wallet: &Wallet) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| Error::database("users lock poisoned"))?;
        if users.contains_key(&user.username) {
            return Err(Error::conflict(format!(
                "username {} already exists",
                user.username
            )));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(Error::conflict(format!(
                "email {} already exists",
                user.email
            )));
        }

        let mut wallets = self
            .wallets
            .write()
            .map_err(|_| Error::database("wallets lock poisoned"))?;
        wallets.insert(wallet.id, wallet.clone());
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| Error::database("users lock poisoned"))?;
        Ok(users.get(username).cloned())
    }

    async fn get_wallet(&self, wallet_id: Uuid) -> Result<Option<Wallet>> {
        let wallets = self
            .wallets
            .read()
            .map_err(|_| Error::database("wallets lock poisoned"))?;
        Ok(wallets.get(&wallet_id).cloned())
    }

    async fn get_wallet_by_username(&self, username: &str) -> Result<Option<Wallet>> {
        let wallet_id = {
            let users = self
                .users
                .read()
                .map_err(|_| Error::database("users lock poisoned"))?;
            match users.get(username) {
                Some(user) => user.wallet_id,
                None => return Ok(None),
            }
        };
        self.get_wallet(wallet_id).await
    }

    async fn commit_wallet(&self, wallet: &Wallet) -> Result<()> {
        let mut wallets = self
            .wallets
            .write()
            .map_err(|_| Error::database("wallets lock poisoned"))?;
        let stored = wallets
            .get_mut(&wallet.id)
            .ok_or_else(|| Error::not_found(format!("wallet {}", wallet.id)))?;

        if stored.version != wallet.version {
            return Err(Error::conflict(format!(
                "wallet {} changed concurrently (version {})",
                wallet.id, wallet.version
            )));
        }

        let mut next = wallet.clone();
        next.version += 1;
        *stored = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;
    use rust_decimal::Decimal;

    fn seed() -> (User, Wallet) {
        let wallet = Wallet::new(Uuid::new_v4());
        let user = User::new("alice", "alice@example.com", "$argon2id$stub", wallet.id);
        (user, wallet)
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_username() {
        let repo = MemoryRepository::new();
        let (user, wallet) = seed();
        repo.create_user(&user, &wallet).await.unwrap();

        let other_wallet = Wallet::new(Uuid::new_v4());
        let other = User::new("alice", "other@example.com", "$argon2id$stub", other_wallet.id);
        let err = repo.create_user(&other, &other_wallet).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_commit_detects_version_race() {
        let repo = MemoryRepository::new();
        let (user, wallet) = seed();
        repo.create_user(&user, &wallet).await.unwrap();

        let loaded = repo.get_wallet(wallet.id).await.unwrap().unwrap();
        let first = loaded
            .deposit(Currency::Usd, Decimal::new(1000, 2))
            .unwrap();
        let second = loaded
            .deposit(Currency::Usd, Decimal::new(2000, 2))
            .unwrap();

        repo.commit_wallet(&first).await.unwrap();
        // Second writer still holds the old version
        let err = repo.commit_wallet(&second).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
