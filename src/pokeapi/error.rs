//! Remote fetch error types.

use thiserror::Error;

/// Failure fetching a page from the remote API.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Transport failure, timeout, or non-success HTTP status
  #[error("network error fetching {url}: {message}")]
  Network { url: String, message: String },

  /// Response body did not have the expected shape
  #[error("unexpected response from {url}: {message}")]
  Parse { url: String, message: String },
}

impl FetchError {
  /// Creates network error.
  #[must_use]
  pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Network {
      url: url.into(),
      message: message.into(),
    }
  }

  /// Creates parse error.
  #[must_use]
  pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Parse {
      url: url.into(),
      message: message.into(),
    }
  }
}
