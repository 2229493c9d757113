//! Rate caching and quoting
//!
//! Sits between the ledger and the external rate provider. Fetched rates
//! are cached for a configurable TTL; when the provider is down, the last
//! known table is served with `stale: true` rather than failing the
//! request. A process that has never seen a rate has nothing to fall back
//! on and surfaces the provider error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Currency, ExchangeQuote, RateTable};
use crate::ports::RateProvider;

/// Default time a fetched rate stays fresh
pub const DEFAULT_RATE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CachedPair {
    rate: Decimal,
    fetched_at: DateTime<Utc>,
}

/// Caching layer over the external rate provider
pub struct RateService {
    provider: Arc<dyn RateProvider>,
    ttl: Duration,
    table: RwLock<Option<RateTable>>,
    pairs: RwLock<HashMap<(Currency, Currency), CachedPair>>,
}

impl RateService {
    pub fn new(provider: Arc<dyn RateProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            table: RwLock::new(None),
            pairs: RwLock::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        let age = Utc::now().signed_duration_since(fetched_at);
        age.to_std().map(|age| age < self.ttl).unwrap_or(true)
    }

    /// Get the full rate table, from cache when fresh
    pub async fn get_rates(&self) -> Result<RateTable> {
        {
            let cached = self.table.read().await;
            if let Some(table) = cached.as_ref() {
                if self.is_fresh(table.fetched_at) {
                    debug!("serving cached rate table");
                    return Ok(table.clone());
                }
            }
        }

        match self.provider.fetch_rates().await {
            Ok(rates) => {
                let table = RateTable::fresh(rates);
                let mut cached = self.table.write().await;
                *cached = Some(table.clone());
                Ok(table)
            }
            Err(err) => {
                let cached = self.table.read().await;
                match cached.as_ref() {
                    Some(table) => {
                        warn!(error = %err, "rate provider failed, serving stale table");
                        Ok(table.as_stale())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Get a quote for converting `from` into `to`
    ///
    /// Exchanging a currency for itself is rejected before any network
    /// traffic happens.
    pub async fn get_quote(&self, from: Currency, to: Currency) -> Result<ExchangeQuote> {
        if from == to {
            return Err(Error::validation(format!(
                "cannot exchange {from} for itself"
            )));
        }

        let key = (from, to);
        {
            let pairs = self.pairs.read().await;
            if let Some(cached) = pairs.get(&key) {
                if self.is_fresh(cached.fetched_at) {
                    return Ok(ExchangeQuote {
                        from,
                        to,
                        rate: cached.rate,
                    });
                }
            }
        }

        match self.provider.fetch_rate(from, to).await {
            Ok(rate) => {
                let mut pairs = self.pairs.write().await;
                pairs.insert(
                    key,
                    CachedPair {
                        rate,
                        fetched_at: Utc::now(),
                    },
                );
                Ok(ExchangeQuote { from, to, rate })
            }
            Err(err) => {
                let pairs = self.pairs.read().await;
                match pairs.get(&key) {
                    Some(cached) => {
                        warn!(%from, %to, error = %err, "rate provider failed, quoting stale rate");
                        Ok(ExchangeQuote {
                            from,
                            to,
                            rate: cached.rate,
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        calls: AtomicUsize,
        fail_after: usize,
    }

    impl ScriptedProvider {
        fn new(fail_after: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_after,
            }
        }

        fn tick(&self) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_after {
                return Err(Error::RateServiceUnavailable("scripted outage".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RateProvider for ScriptedProvider {
        async fn fetch_rates(&self) -> Result<HashMap<Currency, Decimal>> {
            self.tick()?;
            let mut rates = HashMap::new();
            rates.insert(Currency::Usd, Decimal::ONE);
            rates.insert(Currency::Eur, "1.08".parse().unwrap());
            rates.insert(Currency::Rub, "0.011".parse().unwrap());
            Ok(rates)
        }

        async fn fetch_rate(&self, _from: Currency, _to: Currency) -> Result<Decimal> {
            self.tick()?;
            Ok("0.93".parse().unwrap())
        }
    }

    fn service(fail_after: usize, ttl: Duration) -> (Arc<ScriptedProvider>, RateService) {
        let provider = Arc::new(ScriptedProvider::new(fail_after));
        let service = RateService::new(provider.clone(), ttl);
        (provider, service)
    }

    #[tokio::test]
    async fn test_fresh_table_served_from_cache() {
        let (provider, service) = service(usize::MAX, DEFAULT_RATE_TTL);
        let first = service.get_rates().await.unwrap();
        let second = service.get_rates().await.unwrap();
        assert!(!first.stale);
        assert_eq!(first.get(Currency::Eur), second.get(Currency::Eur));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_table_on_provider_outage() {
        let (_, service) = service(1, Duration::ZERO);
        let first = service.get_rates().await.unwrap();
        assert!(!first.stale);

        let second = service.get_rates().await.unwrap();
        assert!(second.stale);
        assert_eq!(second.get(Currency::Rub), first.get(Currency::Rub));
    }

    #[tokio::test]
    async fn test_outage_with_empty_cache_propagates() {
        let (_, service) = service(0, DEFAULT_RATE_TTL);
        let err = service.get_rates().await.unwrap_err();
        assert!(matches!(err, Error::RateServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_quote_same_currency_rejected() {
        let (provider, service) = service(usize::MAX, DEFAULT_RATE_TTL);
        let err = service
            .get_quote(Currency::Usd, Currency::Usd)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_quote_cached_per_pair() {
        let (provider, service) = service(usize::MAX, DEFAULT_RATE_TTL);
        let a = service.get_quote(Currency::Usd, Currency::Eur).await.unwrap();
        let b = service.get_quote(Currency::Usd, Currency::Eur).await.unwrap();
        assert_eq!(a.rate, b.rate);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        service.get_quote(Currency::Eur, Currency::Usd).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_quote_stale_fallback() {
        let (_, service) = service(1, Duration::ZERO);
        let fresh = service.get_quote(Currency::Usd, Currency::Eur).await.unwrap();
        let stale = service.get_quote(Currency::Usd, Currency::Eur).await.unwrap();
        assert_eq!(fresh.rate, stale.rate);

        // A pair never quoted has no fallback
        let err = service
            .get_quote(Currency::Eur, Currency::Rub)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateServiceUnavailable(_)));
    }
}
