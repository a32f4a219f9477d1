//! Source fetching: materialize a repository at a branch.
//!
//! The provider is selected by inspecting the URL; GitHub is the only one
//! defined. `fetch` is idempotent: two calls with unchanged remote state
//! leave the destination identical, with no leftovers from prior runs.

mod github;

pub use github::GithubSource;

use thiserror::Error;

use crate::fetch::FetchError;
use crate::providers::{ProviderError, SharedTokenProvider};

/// Errors from resolving or fetching a source repository.
#[derive(Debug, Error)]
pub enum SourceError {
  /// The credential could not be obtained in time.
  #[error("auth token retrieval failed")]
  Auth(#[source] ProviderError),

  /// The URL does not resolve to an owner/repo pair.
  #[error("invalid repository URL: {0}")]
  RepoInvalid(String),

  /// The archive endpoint could not be reached or answered badly.
  #[error("failed to fetch repository archive")]
  Fetch(#[source] FetchError),

  /// The archive was malformed or tried to escape the destination.
  #[error("failed to unpack repository")]
  Unpack(#[source] FetchError),

  /// No provider recognizes this URL.
  #[error("unsupported provider: {0}")]
  UnsupportedProvider(String),
}

/// Select a source for `repo_url`.
///
/// An empty `branch` falls back to the default branch.
pub fn for_url(
  repo_url: &str,
  branch: &str,
  tokens: SharedTokenProvider,
) -> Result<GithubSource, SourceError> {
  if repo_url.contains("github.com") {
    Ok(GithubSource::new(repo_url, branch, tokens))
  } else {
    Err(SourceError::UnsupportedProvider(repo_url.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::providers::StaticToken;
  use std::sync::Arc;

  #[test]
  fn github_urls_are_recognized() {
    let tokens = Arc::new(StaticToken("t".into()));
    assert!(for_url("https://github.com/acme/api", "main", tokens).is_ok());
  }

  #[test]
  fn other_hosts_are_unsupported() {
    let tokens = Arc::new(StaticToken("t".into()));
    let err = for_url("https://gitlab.com/acme/api", "main", tokens).unwrap_err();
    assert!(matches!(err, SourceError::UnsupportedProvider(_)));
  }
}
