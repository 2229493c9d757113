//! Account registration and login
//!
//! Passwords are hashed with Argon2id and never stored or logged in the
//! clear. Login failures for unknown users and wrong passwords are
//! indistinguishable to the caller.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use tracing::info;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Registration, User, Wallet};
use crate::ports::Repository;
use crate::services::auth::TokenIssuer;

/// Handles registration and login
pub struct AccountService {
    repository: Arc<dyn Repository>,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn Repository>, tokens: Arc<TokenIssuer>) -> Self {
        Self { repository, tokens }
    }

    /// Register a new user with an empty wallet
    ///
    /// The user row and wallet row are created atomically; a duplicate
    /// username or email surfaces as `Conflict`.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        registration.validate()?;

        let password_hash = hash_password(&registration.password)?;
        let wallet = Wallet::new(Uuid::new_v4());
        let user = User::new(
            &registration.username,
            &registration.email,
            &password_hash,
            wallet.id,
        );

        self.repository.create_user(&user, &wallet).await?;
        info!(username = %user.username, user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Authenticate a user and issue a session token
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let user = self
            .repository
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| Error::unauthenticated("invalid username or password"))?;

        verify_password(password, &user.password_hash)?;

        let token = self.tokens.issue(&user.username)?;
        info!(username = %user.username, "login succeeded");
        Ok(token)
    }

    /// Resolve a bearer token to the username it was issued for
    pub fn authenticate(&self, token: &str) -> Result<String> {
        Ok(self.tokens.verify(token)?.sub)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Other(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::database(format!("stored password hash is corrupt: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| Error::unauthenticated("invalid username or password"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryRepository;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(TokenIssuer::new("test-secret", 3600).unwrap()),
        )
    }

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "hunter22hunter22".to_string(),
            email: format!("{username}@example.com"),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let user = service.register(&registration("alice")).await.unwrap();
        assert_eq!(user.username, "alice");

        let token = service.login("alice", "hunter22hunter22").await.unwrap();
        assert_eq!(service.authenticate(&token).unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthenticated() {
        let service = service();
        service.register(&registration("alice")).await.unwrap();

        let err = service.login("alice", "wrong-password").await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_unauthenticated() {
        let service = service();
        let err = service.login("nobody", "whatever123").await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let service = service();
        service.register(&registration("alice")).await.unwrap();

        let mut dup = registration("alice");
        dup.email = "alice2@example.com".to_string();
        let err = service.register(&dup).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let service = service();
        let mut reg = registration("bob");
        reg.password = "short".to_string();
        assert!(service.register(&reg).await.is_err());
    }

    #[test]
    fn test_password_hash_is_argon2id_and_salted() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        verify_password("correct horse", &a).unwrap();
        assert!(verify_password("wrong", &a).is_err());
    }
}
