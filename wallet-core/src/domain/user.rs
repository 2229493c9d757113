//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};

/// A registered account holder.
///
/// `password_hash` is a PHC-format Argon2id string; plaintext credentials
/// never leave the account service. Each user owns exactly one wallet,
/// created together with the user at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub wallet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        wallet_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            wallet_id,
            created_at: Utc::now(),
        }
    }
}

/// Registration input, validated before any hashing or storage work.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Registration {
    /// Reject obviously malformed registrations at the boundary.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::validation("username must not be empty"));
        }
        if self.username.len() > 64 {
            return Err(Error::validation("username must be at most 64 characters"));
        }
        if self.password.len() < 8 {
            return Err(Error::validation("password must be at least 8 characters"));
        }
        if !self.email.contains('@') || self.email.trim().is_empty() {
            return Err(Error::validation("email address is malformed"));
        }
        Ok(())
    }
}
