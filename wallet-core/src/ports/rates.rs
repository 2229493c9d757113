//! Rate provider port - external exchange-rate service abstraction

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::Currency;

/// External exchange-rate capability.
///
/// The remote service is consumed as an opaque boundary: a full table
/// fetch plus a direct pair lookup. Implementations must apply a bounded
/// request timeout so callers never block indefinitely; availability
/// fallback (cached last-known-good rates) is layered on top by
/// `RateService`, not here.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch the current rate for every supported currency.
    async fn fetch_rates(&self) -> Result<HashMap<Currency, Decimal>>;

    /// Fetch the direct rate for one currency pair.
    async fn fetch_rate(&self, from: Currency, to: Currency) -> Result<Decimal>;
}
