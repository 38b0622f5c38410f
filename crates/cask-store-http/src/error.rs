//! Error type for `cask-store-http`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cask_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("unexpected status {status} from {url}")]
  Status {
    status: reqwest::StatusCode,
    url:    String,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
