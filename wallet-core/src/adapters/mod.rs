//! Adapter implementations for external systems

pub mod duckdb;
pub mod exchanger;
pub mod memory;

pub use duckdb::DuckDbRepository;
pub use exchanger::ExchangerClient;
pub use memory::MemoryRepository;
