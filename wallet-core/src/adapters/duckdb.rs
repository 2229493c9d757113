//! DuckDB repository implementation
//!
//! Durable storage for users and wallets in a single database file. Wallet
//! commits are full-snapshot overwrites guarded by the version column, so
//! concurrent mutators of the same wallet are detected at write time.
//!
//! Balances travel through their string form in both directions (CAST on
//! write, CAST on read) - a balance never passes through a binary float.

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Balances, User, Wallet};
use crate::ports::Repository;
use crate::services::MigrationService;

/// Maximum number of retries when the database file is locked
const MAX_OPEN_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue worth retrying
fn is_retryable_open_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Map a driver error onto the domain error type, folding unique-constraint
/// violations into `Conflict` so registration races surface as 409s.
fn db_err(e: duckdb::Error) -> Error {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("unique") || lower.contains("duplicate") {
        Error::conflict(msg)
    } else {
        Error::database(msg)
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) the wallet database file.
    ///
    /// Includes retry with exponential backoff for file locking errors,
    /// which can occur when another process still holds the file during
    /// startup.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_OPEN_RETRIES {
            match Connection::open(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_open_error(&err_msg) && attempt < MAX_OPEN_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            path = %db_path.display(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "database busy, retrying open: {err_msg}"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(db_err(e));
                }
            }
        }

        Err(last_error.map(db_err).unwrap_or_else(|| {
            Error::database(format!(
                "failed to open database after {MAX_OPEN_RETRIES} retries"
            ))
        }))
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("database connection mutex poisoned"))
    }
}

/// Raw wallet columns as selected; parsed into `Wallet` by `parse_wallet_row`.
type WalletRow = (String, String, String, String, i64, String, String);

const WALLET_COLUMNS: &str = "w.wallet_id, \
     CAST(w.balance_usd AS VARCHAR), CAST(w.balance_eur AS VARCHAR), \
     CAST(w.balance_rub AS VARCHAR), w.version, w.created_at, w.updated_at";

fn read_wallet_row(row: &duckdb::Row) -> duckdb::Result<WalletRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn parse_wallet_row(row: WalletRow) -> Result<Wallet> {
    let (id, usd, eur, rub, version, created_at, updated_at) = row;
    Ok(Wallet {
        id: parse_uuid(&id)?,
        balances: Balances {
            usd: parse_decimal(&usd)?,
            eur: parse_decimal(&eur)?,
            rub: parse_decimal(&rub)?,
        },
        version,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("corrupt id {s:?}: {e}")))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse()
        .map_err(|e| Error::database(format!("corrupt balance {s:?}: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("corrupt timestamp {s:?}: {e}")))
}

#[async_trait]
impl Repository for DuckDbRepository {
    async fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let result = MigrationService::new(&conn).run_pending()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "database migrations applied");
        }
        Ok(())
    }

    async fn create_user(&self, user: &User, wallet: &Wallet) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute(
            "INSERT INTO wallets \
             (wallet_id, balance_usd, balance_eur, balance_rub, version, created_at, updated_at) \
             VALUES (?, CAST(? AS DECIMAL(18,2)), CAST(? AS DECIMAL(18,2)), \
                     CAST(? AS DECIMAL(18,2)), ?, ?, ?)",
            params![
                wallet.id.to_string(),
                wallet.balances.usd.to_string(),
                wallet.balances.eur.to_string(),
                wallet.balances.rub.to_string(),
                wallet.version,
                wallet.created_at.to_rfc3339(),
                wallet.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        tx.execute(
            "INSERT INTO users (user_id, username, email, password_hash, wallet_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.wallet_id.to_string(),
                user.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, username, email, password_hash, wallet_id, created_at \
                 FROM users WHERE username = ?",
            )
            .map_err(db_err)?;

        let row: std::result::Result<(String, String, String, String, String, String), _> = stmt
            .query_row([username], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            });

        match row {
            Ok((id, username, email, password_hash, wallet_id, created_at)) => Ok(Some(User {
                id: parse_uuid(&id)?,
                username,
                email,
                password_hash,
                wallet_id: parse_uuid(&wallet_id)?,
                created_at: parse_timestamp(&created_at)?,
            })),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get_wallet(&self, wallet_id: Uuid) -> Result<Option<Wallet>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {WALLET_COLUMNS} FROM wallets w WHERE w.wallet_id = ?"
            ))
            .map_err(db_err)?;

        match stmt.query_row([wallet_id.to_string()], read_wallet_row) {
            Ok(row) => Ok(Some(parse_wallet_row(row)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get_wallet_by_username(&self, username: &str) -> Result<Option<Wallet>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {WALLET_COLUMNS} FROM wallets w \
                 JOIN users u ON w.wallet_id = u.wallet_id \
                 WHERE u.username = ?"
            ))
            .map_err(db_err)?;

        match stmt.query_row([username], read_wallet_row) {
            Ok(row) => Ok(Some(parse_wallet_row(row)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn commit_wallet(&self, wallet: &Wallet) -> Result<()> {
        let conn = self.lock_conn()?;
        let changed = conn
            .execute(
                "UPDATE wallets SET \
                 balance_usd = CAST(? AS DECIMAL(18,2)), \
                 balance_eur = CAST(? AS DECIMAL(18,2)), \
                 balance_rub = CAST(? AS DECIMAL(18,2)), \
                 version = version + 1, updated_at = ? \
                 WHERE wallet_id = ? AND version = ?",
                params![
                    wallet.balances.usd.to_string(),
                    wallet.balances.eur.to_string(),
                    wallet.balances.rub.to_string(),
                    wallet.updated_at.to_rfc3339(),
                    wallet.id.to_string(),
                    wallet.version,
                ],
            )
            .map_err(db_err)?;

        if changed > 0 {
            return Ok(());
        }

        // Distinguish a vanished wallet from a lost version race.
        let exists: std::result::Result<i64, _> = conn.query_row(
            "SELECT COUNT(*) FROM wallets WHERE wallet_id = ?",
            [wallet.id.to_string()],
            |row| row.get(0),
        );
        match exists {
            Ok(0) => Err(Error::not_found(format!("wallet {}", wallet.id))),
            Ok(_) => Err(Error::conflict(format!(
                "wallet {} changed concurrently (version {})",
                wallet.id, wallet.version
            ))),
            Err(e) => Err(db_err(e)),
        }
    }
}
