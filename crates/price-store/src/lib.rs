//! `PriceStore` adapters: an in-memory store for tests and demos, and a
//! read-only store over the `daily_prices` and `companies` SQLite tables.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryPriceStore;
pub use sqlite::SqlitePriceStore;
