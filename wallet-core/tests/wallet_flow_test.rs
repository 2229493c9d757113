//! End-to-end wallet flows through the assembled context
//!
//! Drives registration, login, deposits, withdrawals, and exchanges the
//! way the HTTP layer does, over the in-memory repository and a scripted
//! rate source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use wallet_core::adapters::MemoryRepository;
use wallet_core::config::Config;
use wallet_core::ports::RateProvider;
use wallet_core::{Currency, Error, Registration, Result, WalletContext};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

struct FixedRates;

#[async_trait]
impl RateProvider for FixedRates {
    async fn fetch_rates(&self) -> Result<HashMap<Currency, Decimal>> {
        let mut rates = HashMap::new();
        rates.insert(Currency::Usd, Decimal::ONE);
        rates.insert(Currency::Eur, dec("1.08"));
        rates.insert(Currency::Rub, dec("0.011"));
        Ok(rates)
    }

    async fn fetch_rate(&self, from: Currency, to: Currency) -> Result<Decimal> {
        Ok(match (from, to) {
            (Currency::Usd, Currency::Eur) => dec("0.93"),
            (Currency::Eur, Currency::Usd) => dec("1.08"),
            (Currency::Usd, Currency::Rub) => dec("90.50"),
            (Currency::Rub, Currency::Usd) => dec("0.011"),
            _ => dec("1"),
        })
    }
}

fn test_config() -> Config {
    Config {
        database_path: "unused.db".into(),
        rates_url: "http://localhost:8081".to_string(),
        rate_ttl: Duration::from_secs(300),
        token_secret: "integration-test-secret".to_string(),
        token_ttl_secs: 3600,
        bind: "127.0.0.1:0".to_string(),
    }
}

async fn context() -> WalletContext {
    WalletContext::with_adapters(
        &test_config(),
        Arc::new(MemoryRepository::new()),
        Arc::new(FixedRates),
    )
    .await
    .unwrap()
}

fn registration(username: &str) -> Registration {
    Registration {
        username: username.to_string(),
        password: "correct-horse-battery".to_string(),
        email: format!("{username}@example.com"),
    }
}

#[tokio::test]
async fn test_register_login_deposit_withdraw() {
    let ctx = context().await;
    ctx.accounts.register(&registration("alice")).await.unwrap();

    let token = ctx
        .accounts
        .login("alice", "correct-horse-battery")
        .await
        .unwrap();
    let username = ctx.accounts.authenticate(&token).unwrap();
    assert_eq!(username, "alice");

    let balances = ctx
        .ledger
        .deposit(&username, Currency::Usd, dec("250.00"))
        .await
        .unwrap();
    assert_eq!(balances.get(Currency::Usd), dec("250.00"));

    let balances = ctx
        .ledger
        .withdraw(&username, Currency::Usd, dec("99.99"))
        .await
        .unwrap();
    assert_eq!(balances.get(Currency::Usd), dec("150.01"));
}

#[tokio::test]
async fn test_exchange_flow_with_rounding() {
    let ctx = context().await;
    ctx.accounts.register(&registration("bob")).await.unwrap();

    ctx.ledger
        .deposit("bob", Currency::Usd, dec("10.00"))
        .await
        .unwrap();

    // 3.33 USD * 90.50 = 301.365, rounds to 301.36 (banker's)
    let outcome = ctx
        .ledger
        .exchange("bob", Currency::Usd, Currency::Rub, dec("3.33"))
        .await
        .unwrap();
    assert_eq!(outcome.credited, dec("301.36"));
    assert_eq!(outcome.balances.get(Currency::Usd), dec("6.67"));
    assert_eq!(outcome.balances.get(Currency::Rub), dec("301.36"));
}

#[tokio::test]
async fn test_exchange_without_funds_rejected() {
    let ctx = context().await;
    ctx.accounts.register(&registration("carol")).await.unwrap();

    let err = ctx
        .ledger
        .exchange("carol", Currency::Eur, Currency::Usd, dec("1.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
}

#[tokio::test]
async fn test_rates_endpoint_data() {
    let ctx = context().await;
    let table = ctx.rates.get_rates().await.unwrap();
    assert!(!table.stale);
    assert_eq!(table.get(Currency::Eur), Some(dec("1.08")));
    assert_eq!(table.get(Currency::Usd), Some(Decimal::ONE));
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let ctx = context().await;
    ctx.accounts.register(&registration("dave")).await.unwrap();

    let mut other_config = test_config();
    other_config.token_secret = "a-different-secret".to_string();
    let other = WalletContext::with_adapters(
        &other_config,
        Arc::new(MemoryRepository::new()),
        Arc::new(FixedRates),
    )
    .await
    .unwrap();

    let token = other.accounts.login("dave", "irrelevant").await;
    assert!(token.is_err());

    let foreign = ctx
        .accounts
        .login("dave", "correct-horse-battery")
        .await
        .unwrap();
    assert!(matches!(
        other.accounts.authenticate(&foreign).unwrap_err(),
        Error::Unauthenticated(_)
    ));
}
