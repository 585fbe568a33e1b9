//! Clients for the three services a restaurant is composed from.
//!
//! Each service is reached through a trait (`RecordsApi`, `ImagesApi`,
//! `RatingsApi`) so callers can substitute in-memory fakes. The HTTP
//! implementations perform exactly one round trip per call, never retry, and
//! give up when the caller's deadline passes.

pub mod errors;
pub mod images;
pub mod ratings;
pub mod records;
pub mod types;

mod http;
#[cfg(test)]
mod testutils;

pub use errors::UpstreamError;
pub use images::{ImagesApi, ImagesClient};
pub use ratings::{RatingsApi, RatingsClient};
pub use records::{RecordsApi, RecordsClient};
