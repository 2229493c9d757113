//! Wallet Core - Business logic for the currency wallet service
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Wallet, Balances, Currency, User)
//! - **ports**: Trait definitions for external dependencies (Repository, RateProvider)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, exchanger HTTP client, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::{DuckDbRepository, ExchangerClient};
use config::Config;
use ports::{RateProvider, Repository};
use services::{AccountService, LedgerService, RateService, TokenIssuer};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Balances, Currency, ExchangeQuote, RateTable, Registration, User, Wallet};

/// Main context for wallet operations
///
/// This is the primary entry point for all business logic. It holds the
/// repository, rate gateway, and all services.
pub struct WalletContext {
    pub repository: Arc<dyn Repository>,
    pub accounts: AccountService,
    pub ledger: LedgerService,
    pub rates: Arc<RateService>,
}

impl WalletContext {
    /// Create a context backed by the DuckDB repository and the HTTP
    /// rate client, as configured
    pub async fn new(wallet_dir: &Path) -> Result<Self> {
        let config = Config::load(wallet_dir)?;
        Self::with_config(&config).await
    }

    /// Create a context from an already-resolved configuration
    pub async fn with_config(config: &Config) -> Result<Self> {
        let repository: Arc<dyn Repository> =
            Arc::new(DuckDbRepository::new(&config.database_path)?);
        let provider: Arc<dyn RateProvider> = Arc::new(ExchangerClient::new(&config.rates_url)?);
        Self::assemble(config, repository, provider).await
    }

    /// Create a context over caller-supplied adapters
    ///
    /// Used by tests and embedders that bring their own repository or
    /// rate source.
    pub async fn with_adapters(
        config: &Config,
        repository: Arc<dyn Repository>,
        provider: Arc<dyn RateProvider>,
    ) -> Result<Self> {
        Self::assemble(config, repository, provider).await
    }

    async fn assemble(
        config: &Config,
        repository: Arc<dyn Repository>,
        provider: Arc<dyn RateProvider>,
    ) -> Result<Self> {
        repository.ensure_schema().await?;

        let tokens = Arc::new(TokenIssuer::new(&config.token_secret, config.token_ttl_secs)?);
        let rates = Arc::new(RateService::new(provider, config.rate_ttl));
        let accounts = AccountService::new(Arc::clone(&repository), tokens);
        let ledger = LedgerService::new(Arc::clone(&repository), Arc::clone(&rates));

        Ok(Self {
            repository,
            accounts,
            ledger,
            rates,
        })
    }
}
