//! Core types and trait definitions for the Cask beer catalog client.
//!
//! This crate is deliberately free of HTTP dependencies. All other crates
//! depend on it; it depends on nothing transport-specific.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod beer;
pub mod error;
pub mod feed;
pub mod memory;
pub mod rating;
pub mod session;
pub mod store;
pub mod view;

pub use error::{Error, Result};
