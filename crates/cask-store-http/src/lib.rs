//! Hosted-backend implementation of the Cask catalog store.
//!
//! Speaks a PostgREST-style JSON REST surface for one-shot reads and
//! upserts, and a chunked NDJSON endpoint for per-table change feeds. The
//! feed task owns the reconnect / catch-up state machine; consumers only
//! ever see ordered [`cask_core::feed::FeedEvent`]s.

mod feed;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{HttpConfig, HttpStore};

#[cfg(test)]
mod tests;
