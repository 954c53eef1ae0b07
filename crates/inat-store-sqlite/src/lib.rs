//! SQLite backend for normalized iNaturalist observations.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Tables are created from the
//! [`inat_core::table`] catalogue on first write and widened as new fields
//! appear.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
