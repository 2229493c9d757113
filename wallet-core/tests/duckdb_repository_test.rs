//! DuckDB repository integration tests
//!
//! Exercise the full `Repository` contract against a real database file,
//! including persistence across reopen and version-guarded commits.
//!
//! Run with: cargo test --test duckdb_repository_test

use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use wallet_core::adapters::DuckDbRepository;
use wallet_core::domain::{Currency, User, Wallet};
use wallet_core::ports::Repository;
use wallet_core::Error;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn seed_pair(username: &str) -> (User, Wallet) {
    let wallet = Wallet::new(Uuid::new_v4());
    let user = User::new(
        username,
        &format!("{username}@example.com"),
        "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
        wallet.id,
    );
    (user, wallet)
}

async fn open(dir: &TempDir) -> DuckDbRepository {
    let repo = DuckDbRepository::new(&dir.path().join("wallet.db")).unwrap();
    repo.ensure_schema().await.unwrap();
    repo
}

#[tokio::test]
async fn test_create_and_load_user_with_wallet() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    let (user, wallet) = seed_pair("alice");
    repo.create_user(&user, &wallet).await.unwrap();

    let loaded = repo.get_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(loaded.id, user.id);
    assert_eq!(loaded.email, user.email);
    assert_eq!(loaded.password_hash, user.password_hash);
    assert_eq!(loaded.wallet_id, wallet.id);

    let loaded_wallet = repo.get_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(loaded_wallet.id, wallet.id);
    assert_eq!(loaded_wallet.version, 0);
    assert_eq!(loaded_wallet.balances.get(Currency::Usd), Decimal::ZERO);
}

#[tokio::test]
async fn test_unknown_lookups_return_none() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    assert!(repo.get_user_by_username("ghost").await.unwrap().is_none());
    assert!(repo.get_wallet(Uuid::new_v4()).await.unwrap().is_none());
    assert!(repo
        .get_wallet_by_username("ghost")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    let (user, wallet) = seed_pair("alice");
    repo.create_user(&user, &wallet).await.unwrap();

    let (mut dup, dup_wallet) = seed_pair("alice");
    dup.email = "alice2@example.com".to_string();
    let err = repo.create_user(&dup, &dup_wallet).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {err:?}");

    // Failed registration must not leave an orphan wallet behind
    assert!(repo.get_wallet(dup_wallet.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_commit_roundtrips_exact_decimals() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    let (user, wallet) = seed_pair("alice");
    repo.create_user(&user, &wallet).await.unwrap();

    let updated = wallet.deposit(Currency::Usd, dec("0.10")).unwrap();
    let updated = updated.deposit(Currency::Usd, dec("0.20")).unwrap();
    let updated = updated.deposit(Currency::Rub, dec("12345678.99")).unwrap();
    repo.commit_wallet(&updated).await.unwrap();

    let loaded = repo
        .get_wallet_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.balances.get(Currency::Usd), dec("0.30"));
    assert_eq!(loaded.balances.get(Currency::Rub), dec("12345678.99"));
    assert_eq!(loaded.version, 1);
}

#[tokio::test]
async fn test_commit_with_stale_version_conflicts() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    let (user, wallet) = seed_pair("alice");
    repo.create_user(&user, &wallet).await.unwrap();

    let loaded = repo.get_wallet(wallet.id).await.unwrap().unwrap();
    let first = loaded.deposit(Currency::Eur, dec("5.00")).unwrap();
    let second = loaded.deposit(Currency::Eur, dec("7.00")).unwrap();

    repo.commit_wallet(&first).await.unwrap();
    let err = repo.commit_wallet(&second).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {err:?}");

    // The winning write is intact
    let current = repo.get_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(current.balances.get(Currency::Eur), dec("5.00"));
}

#[tokio::test]
async fn test_commit_unknown_wallet_is_not_found() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    let orphan = Wallet::new(Uuid::new_v4());
    let err = repo.commit_wallet(&orphan).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let wallet_id;
    {
        let repo = open(&dir).await;
        let (user, wallet) = seed_pair("alice");
        wallet_id = wallet.id;
        repo.create_user(&user, &wallet).await.unwrap();
        let updated = wallet.deposit(Currency::Usd, dec("42.00")).unwrap();
        repo.commit_wallet(&updated).await.unwrap();
    }

    let repo = open(&dir).await;
    let loaded = repo.get_wallet(wallet_id).await.unwrap().unwrap();
    assert_eq!(loaded.balances.get(Currency::Usd), dec("42.00"));
    assert_eq!(loaded.version, 1);

    let user = repo.get_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(user.wallet_id, wallet_id);
}
