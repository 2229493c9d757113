//! Service layer orchestrating domain operations over the ports

pub mod account;
pub mod auth;
pub mod ledger;
pub mod migration;
pub mod rates;

pub use account::AccountService;
pub use auth::{Claims, TokenIssuer};
pub use ledger::{ExchangeOutcome, LedgerService};
pub use migration::{MigrationResult, MigrationService};
pub use rates::{RateService, DEFAULT_RATE_TTL};
