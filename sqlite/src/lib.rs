//! SQLite store for tessel
//!
//! A [`Store`](tessel_core::Store) over `rusqlite`, value conversions between
//! `serde_json` and SQLite storage classes, transaction behaviour and table
//! creation from registered metadata.

pub mod connection;
pub mod schema;
#[cfg(feature = "rusqlite")]
pub mod store;
pub mod values;

pub use connection::SQLiteTransactionType;
#[cfg(feature = "rusqlite")]
pub use schema::create_tables;
pub use schema::create_table_sql;
#[cfg(feature = "rusqlite")]
pub use store::SqliteStore;
pub use values::SQLiteValue;
