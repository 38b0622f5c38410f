//! Error types for `cask-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid score: {0} is not a half-star step in (0, 5]")]
  InvalidScore(f64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
