//! Exchange rate domain models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Currency;

/// A single exchange rate, valid for one operation.
///
/// `rate` is the amount of `to` received per unit of `from`. Quotes are
/// fetched fresh (or from the short-lived rate cache) for every exchange
/// and never reused across operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

/// A full rate table as served to clients.
///
/// `stale` is true when the external rate service was unreachable and the
/// table is the last-known-good copy rather than a fresh fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub rates: HashMap<Currency, Decimal>,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

impl RateTable {
    pub fn fresh(rates: HashMap<Currency, Decimal>) -> Self {
        Self {
            rates,
            fetched_at: Utc::now(),
            stale: false,
        }
    }

    /// The same table, flagged as a stale fallback copy.
    pub fn as_stale(&self) -> Self {
        Self {
            rates: self.rates.clone(),
            fetched_at: self.fetched_at,
            stale: true,
        }
    }

    pub fn get(&self, currency: Currency) -> Option<Decimal> {
        self.rates.get(&currency).copied()
    }
}
