//! Repository port - database abstraction

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{User, Wallet};

/// Database repository abstraction
///
/// This trait defines all storage operations. Implementations (adapters)
/// provide the actual database access logic; the service layer depends
/// only on this contract.
///
/// The read-modify-write cycle for a single wallet is
/// `get_wallet*` -> pure ledger op -> [`Repository::commit_wallet`]. Commit
/// is guarded by the wallet's version: a concurrent commit in the window
/// yields `Error::Conflict` and the caller reloads and retries.
#[async_trait]
pub trait Repository: Send + Sync {
    // === Schema ===

    /// Ensure the schema exists and run any pending migrations.
    async fn ensure_schema(&self) -> Result<()>;

    // === Users ===

    /// Insert a user together with their zero-balance wallet, atomically.
    ///
    /// Fails with `Error::Conflict` when the username or email is taken.
    async fn create_user(&self, user: &User, wallet: &Wallet) -> Result<()>;

    /// Look up a user by username.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // === Wallets ===

    /// Load a wallet snapshot by its identity.
    async fn get_wallet(&self, wallet_id: Uuid) -> Result<Option<Wallet>>;

    /// Load the wallet owned by `username`.
    async fn get_wallet_by_username(&self, username: &str) -> Result<Option<Wallet>>;

    /// Overwrite a wallet's balances with the snapshot's, bumping its version.
    ///
    /// The snapshot carries the version it was loaded at; if the stored row
    /// has moved on, nothing is written and `Error::Conflict` is returned.
    async fn commit_wallet(&self, wallet: &Wallet) -> Result<()>;
}
