//! Client for the iNaturalist observations listing.
//!
//! [`ApiClient`] performs the HTTP requests; [`Paginator`] walks any
//! [`PageSource`] backwards by id until the listing is exhausted.

#![allow(async_fn_in_trait)]

mod client;
mod paginate;

pub mod error;

pub use client::{ApiClient, ApiConfig};
pub use error::{Error, Result};
pub use paginate::{ObservationPage, PAGE_SIZE, PageQuery, PageSource, Paginator};
