//! Token issuance and verification
//!
//! HS256 JWTs carrying the username as subject. The issuer is constructed
//! once from configuration and shared; there is no global signing state.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// JWT claims for an authenticated session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

/// Issues and verifies session tokens
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer from a shared secret and token lifetime in seconds
    pub fn new(secret: &str, ttl_secs: i64) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("token secret must not be empty".to_string()));
        }
        if ttl_secs <= 0 {
            return Err(Error::Config(format!(
                "token ttl must be positive, got {ttl_secs}"
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    /// Issue a token for `username`
    pub fn issue(&self, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Other(format!("failed to sign token: {e}")))
    }

    /// Verify a token and return its claims
    ///
    /// Expired, tampered, or otherwise invalid tokens all map to
    /// `Unauthenticated`; the caller never learns which.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| Error::unauthenticated("invalid or expired token"))
    }
}
