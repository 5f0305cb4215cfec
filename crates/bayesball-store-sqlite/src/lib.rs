//! SQLite backend for the Bayesball record store.
//!
//! One SQLite file holds the league and season tables. Queries run on the
//! [`tokio_rusqlite`] connection thread; season writes are single
//! `IMMEDIATE` transactions, so several job processes may share the file.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
