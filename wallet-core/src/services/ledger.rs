//! Wallet ledger operations
//!
//! Deposits, withdrawals, and exchanges all follow the same shape: load
//! the wallet, apply the pure domain operation, commit the new snapshot
//! under its version guard. A commit that loses the version race is
//! retried against a fresh snapshot a bounded number of times.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::result::{Error, Result};
use crate::domain::{Balances, Currency, ExchangeQuote, Wallet};
use crate::ports::Repository;
use crate::services::rates::RateService;

/// Attempts per operation before a version race is reported as `Conflict`
const COMMIT_RETRIES: usize = 5;

/// Outcome of a completed exchange
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub quote: ExchangeQuote,
    /// Amount removed from the source currency
    pub debited: Decimal,
    /// Amount added to the target currency after rounding
    pub credited: Decimal,
    pub balances: Balances,
}

/// Executes balance-changing operations against the repository
pub struct LedgerService {
    repository: Arc<dyn Repository>,
    rates: Arc<RateService>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn Repository>, rates: Arc<RateService>) -> Self {
        Self { repository, rates }
    }

    /// Current balances for `username`
    pub async fn balances(&self, username: &str) -> Result<Balances> {
        let wallet = self.load_wallet(username).await?;
        Ok(wallet.balances)
    }

    /// Credit `amount` of `currency` to the user's wallet
    pub async fn deposit(
        &self,
        username: &str,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Balances> {
        let wallet = self
            .commit_with_retry(username, |wallet| wallet.deposit(currency, amount))
            .await?;
        info!(username, %currency, %amount, "deposit committed");
        Ok(wallet.balances)
    }

    /// Remove `amount` of `currency` from the user's wallet
    pub async fn withdraw(
        &self,
        username: &str,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Balances> {
        let wallet = self
            .commit_with_retry(username, |wallet| wallet.withdraw(currency, amount))
            .await?;
        info!(username, %currency, %amount, "withdrawal committed");
        Ok(wallet.balances)
    }

    /// Convert `amount` of `from` into `to` at the current rate
    ///
    /// The quote is taken once and pinned for the duration of the
    /// operation, including commit retries.
    pub async fn exchange(
        &self,
        username: &str,
        from: Currency,
        to: Currency,
        amount: Decimal,
    ) -> Result<ExchangeOutcome> {
        let quote = self.rates.get_quote(from, to).await?;

        let mut credited = Decimal::ZERO;
        let wallet = self
            .commit_with_retry(username, |wallet| {
                let (updated, converted) = wallet.exchange(&quote, amount)?;
                credited = converted;
                Ok(updated)
            })
            .await?;

        info!(username, %from, %to, %amount, %credited, "exchange committed");
        Ok(ExchangeOutcome {
            quote,
            debited: amount,
            credited,
            balances: wallet.balances,
        })
    }

    async fn load_wallet(&self, username: &str) -> Result<Wallet> {
        self.repository
            .get_wallet_by_username(username)
            .await?
            .ok_or_else(|| Error::not_found(format!("wallet for user {username}")))
    }

    async fn commit_with_retry<F>(&self, username: &str, mut apply: F) -> Result<Wallet>
    where
        F: FnMut(&Wallet) -> Result<Wallet>,
    {
        let mut last_err = Error::conflict("wallet changed concurrently");
        for attempt in 0..COMMIT_RETRIES {
            let wallet = self.load_wallet(username).await?;
            let updated = apply(&wallet)?;
            match self.repository.commit_wallet(&updated).await {
                Ok(()) => return Ok(updated),
                Err(err) if err.is_retryable() => {
                    debug!(username, attempt, "commit lost version race, retrying");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}
