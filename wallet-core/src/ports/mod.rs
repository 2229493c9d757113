//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod rates;
mod repository;

pub use rates::RateProvider;
pub use repository::Repository;
