//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies. The ledger
//! transitions on [`Wallet`] are the heart of the crate: every balance
//! mutation anywhere in the system goes through them.

mod currency;
mod rates;
mod user;
mod wallet;
pub mod result;

pub use currency::Currency;
pub use rates::{ExchangeQuote, RateTable};
pub use user::{Registration, User};
pub use wallet::{Balances, Wallet, AMOUNT_SCALE};
