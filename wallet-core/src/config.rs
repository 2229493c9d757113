//! Configuration management
//!
//! Settings come from a `settings.json` next to the data directory,
//! with `WALLET_*` environment variables taking precedence:
//! ```json
//! {
//!   "database": { "file": "wallet.db" },
//!   "rates": { "url": "http://localhost:8081", "ttlSecs": 300 },
//!   "auth": { "tokenSecret": "...", "tokenTtlSecs": 3600 },
//!   "server": { "bind": "127.0.0.1:8080" }
//! }
//! ```
//! The token secret has no default: it must be present in the file or
//! in `WALLET_TOKEN_SECRET`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

const DEFAULT_DB_FILE: &str = "wallet.db";
const DEFAULT_RATES_URL: &str = "http://localhost:8081";
const DEFAULT_RATE_TTL_SECS: u64 = 300;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(default)]
    rates: RateSettings,
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    server: ServerSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default)]
    file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateSettings {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default)]
    token_secret: Option<String>,
    #[serde(default)]
    token_ttl_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    #[serde(default)]
    bind: Option<String>,
}

/// Resolved wallet configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub rates_url: String,
    pub rate_ttl: Duration,
    pub token_secret: String,
    pub token_ttl_secs: i64,
    pub bind: String,
}

impl Config {
    /// Load config from the wallet directory
    ///
    /// Precedence per field: `WALLET_*` environment variable, then
    /// settings.json, then the built-in default.
    pub fn load(wallet_dir: &Path) -> Result<Self> {
        let settings_path = wallet_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("invalid settings.json: {e}")))?
        } else {
            SettingsFile::default()
        };

        let db_file = env_var("WALLET_DB_FILE")
            .or(raw.database.file)
            .unwrap_or_else(|| DEFAULT_DB_FILE.to_string());

        let rates_url = env_var("WALLET_RATES_URL")
            .or(raw.rates.url)
            .unwrap_or_else(|| DEFAULT_RATES_URL.to_string());

        let rate_ttl_secs = match env_var("WALLET_RATE_TTL_SECS") {
            Some(value) => value
                .parse()
                .map_err(|_| Error::Config(format!("WALLET_RATE_TTL_SECS is not a number: {value}")))?,
            None => raw.rates.ttl_secs.unwrap_or(DEFAULT_RATE_TTL_SECS),
        };

        let token_secret = env_var("WALLET_TOKEN_SECRET")
            .or(raw.auth.token_secret)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "token secret missing: set WALLET_TOKEN_SECRET or auth.tokenSecret in settings.json"
                        .to_string(),
                )
            })?;

        let token_ttl_secs = match env_var("WALLET_TOKEN_TTL_SECS") {
            Some(value) => value
                .parse()
                .map_err(|_| Error::Config(format!("WALLET_TOKEN_TTL_SECS is not a number: {value}")))?,
            None => raw.auth.token_ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        };

        let bind = env_var("WALLET_BIND")
            .or(raw.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        Ok(Self {
            database_path: wallet_dir.join(db_file),
            rates_url,
            rate_ttl: Duration::from_secs(rate_ttl_secs),
            token_secret,
            token_ttl_secs,
            bind,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
