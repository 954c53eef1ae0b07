//! Core types and trait definitions for iNaturalist observation imports.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the typed view of raw API records, the relational table catalogue, the
//! [`ObservationStore`](store::ObservationStore) abstraction, and the
//! normalizer that decomposes one observation into ordered row upserts.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod normalize;
pub mod record;
pub mod store;
pub mod table;

pub use error::{Error, Result};
pub use normalize::{WritePlan, normalize_and_store, plan_observation};
pub use table::{Key, Row, Table};
