//! Wallet domain model and the pure ledger transitions
//!
//! A [`Wallet`] is a snapshot: every ledger operation takes `&self` and
//! returns a fresh snapshot (or a typed error) without touching storage.
//! Persistence and per-wallet serialization live in the service layer;
//! the invariants (no negative balance, atomic exchange) are enforced here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::rates::ExchangeQuote;
use crate::domain::result::{Error, Result};
use crate::domain::Currency;

/// Monetary amounts carry at most this many decimal places.
pub const AMOUNT_SCALE: u32 = 2;

/// Per-currency balances, always fully populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Balances {
    pub usd: Decimal,
    pub eur: Decimal,
    pub rub: Decimal,
}

impl Balances {
    /// Zero balance in every currency.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Usd => self.usd,
            Currency::Eur => self.eur,
            Currency::Rub => self.rub,
        }
    }

    fn set(&mut self, currency: Currency, amount: Decimal) {
        match currency {
            Currency::Usd => self.usd = amount,
            Currency::Eur => self.eur = amount,
            Currency::Rub => self.rub = amount,
        }
    }

    /// True if every balance is >= 0. The ledger ops uphold this; it is
    /// re-checked when loading snapshots from storage.
    pub fn is_non_negative(&self) -> bool {
        Currency::ALL.iter().all(|c| self.get(*c) >= Decimal::ZERO)
    }
}

/// A user's wallet: one balance per supported currency plus an optimistic
/// concurrency version bumped on every committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub balances: Balances,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a fresh zero-balance wallet (registration path).
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            balances: Balances::zero(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Credit `amount` of `currency`, returning the updated snapshot.
    pub fn deposit(&self, currency: Currency, amount: Decimal) -> Result<Wallet> {
        validate_amount(amount)?;
        let balance = self
            .balances
            .get(currency)
            .checked_add(amount)
            .ok_or_else(|| {
                Error::InvalidAmount(format!("deposit of {amount} overflows the {currency} balance"))
            })?;
        let mut next = self.clone();
        next.balances.set(currency, balance);
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Debit `amount` of `currency`, returning the updated snapshot.
    ///
    /// Fails with `InsufficientFunds` when the balance cannot cover the
    /// debit; the receiver is left untouched in that case.
    pub fn withdraw(&self, currency: Currency, amount: Decimal) -> Result<Wallet> {
        validate_amount(amount)?;
        let available = self.balances.get(currency);
        if available < amount {
            return Err(Error::InsufficientFunds {
                currency,
                requested: amount,
                available,
            });
        }
        let mut next = self.clone();
        next.balances.set(currency, available - amount);
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Exchange `amount` of the quote's source currency into its target
    /// currency. Returns the updated snapshot and the credited amount.
    ///
    /// The debit and credit are a single transition: either both appear in
    /// the returned snapshot or the error leaves the wallet untouched. The
    /// converted amount is rounded to [`AMOUNT_SCALE`] decimal places.
    pub fn exchange(&self, quote: &ExchangeQuote, amount: Decimal) -> Result<(Wallet, Decimal)> {
        validate_amount(amount)?;
        if quote.from == quote.to {
            return Err(Error::validation(
                "exchange requires two distinct currencies",
            ));
        }
        if quote.rate <= Decimal::ZERO {
            return Err(Error::InvalidRate(format!(
                "rate {} for {}->{} is not positive",
                quote.rate, quote.from, quote.to
            )));
        }

        let converted = amount
            .checked_mul(quote.rate)
            .map(|raw| raw.round_dp(AMOUNT_SCALE))
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "amount {amount} at rate {} overflows the {} balance",
                    quote.rate, quote.to
                ))
            })?;

        let debited = self.withdraw(quote.from, amount)?;
        let credited = debited
            .balances
            .get(quote.to)
            .checked_add(converted)
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "converted amount {converted} overflows the {} balance",
                    quote.to
                ))
            })?;
        let mut next = debited;
        next.balances.set(quote.to, credited);
        Ok((next, converted))
    }
}

/// Amounts must be strictly positive and carry at most two decimal places.
fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(Error::InvalidAmount(format!(
            "amount {amount} has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    Ok(())
}
