//! GitHub archive fetching.
//!
//! The archive strategy: download the tarball the archive endpoint serves
//! for `ref=<branch>`, strip the single top-level directory GitHub prepends,
//! and swap the unpacked tree into the destination. The swap (unpack into
//! `<dest>.tmp`, then rename) is what makes `fetch` idempotent and keeps a
//! half-written checkout from ever being visible at `dest`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use super::SourceError;
use crate::defs::DEFAULT_BRANCH;
use crate::fetch::{self, FetchError, ScratchDir};
use crate::providers::SharedTokenProvider;

/// Deadline for one credential-provider call.
const TOKEN_DEADLINE: Duration = Duration::from_secs(5);

/// Fetches one repository at one branch through the GitHub archive endpoint.
pub struct GithubSource {
  repo_url: String,
  branch: String,
  tokens: SharedTokenProvider,
  http: reqwest::Client,
}

impl std::fmt::Debug for GithubSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GithubSource")
      .field("repo_url", &self.repo_url)
      .field("branch", &self.branch)
      .field("http", &self.http)
      .finish_non_exhaustive()
  }
}

impl GithubSource {
  pub fn new(repo_url: &str, branch: &str, tokens: SharedTokenProvider) -> Self {
    let branch = if branch.is_empty() { DEFAULT_BRANCH } else { branch };
    Self {
      repo_url: repo_url.to_string(),
      branch: branch.to_string(),
      tokens,
      http: reqwest::Client::new(),
    }
  }

  pub fn branch(&self) -> &str {
    &self.branch
  }

  /// Materialize the repository tree at the configured branch into `dest`.
  pub async fn fetch(&self, dest: &Path) -> Result<(), SourceError> {
    let (owner, repo) = parse_repo_url(&self.repo_url)?;

    let token = tokio::time::timeout(TOKEN_DEADLINE, self.tokens.token())
      .await
      .map_err(|elapsed| SourceError::Auth(Box::new(elapsed)))?
      .map_err(SourceError::Auth)?;

    let url = format!("https://api.github.com/repos/{owner}/{repo}/tarball/{}", self.branch);
    info!(owner = %owner, repo = %repo, branch = %self.branch, "downloading repository archive");

    let scratch = ScratchDir::create(tmp_path(dest)).map_err(|e| SourceError::Unpack(e.into()))?;
    let tarball = scratch.path().join(".archive.tar.gz");

    let request = self
      .http
      .get(&url)
      .header(reqwest::header::USER_AGENT, "vanguard")
      .bearer_auth(&token);
    fetch::download(request, &tarball).await.map_err(SourceError::Fetch)?;

    // Symlinks are created with their recorded targets; any that cannot be
    // is an unpack failure, never a silently incomplete checkout.
    let unpack_tarball = tarball.clone();
    let unpack_dest = scratch.path().to_path_buf();
    tokio::task::spawn_blocking(move || fetch::unpack_tar_gz(&unpack_tarball, &unpack_dest, true, false))
      .await
      .map_err(|join| SourceError::Unpack(FetchError::Io(io::Error::other(join))))??;
    tokio::fs::remove_file(&tarball)
      .await
      .map_err(|e| SourceError::Unpack(e.into()))?;

    // Swap the fresh tree into place; a previous checkout (and any untracked
    // files it accumulated) goes away with it.
    if dest.exists() {
      tokio::fs::remove_dir_all(dest)
        .await
        .map_err(|e| SourceError::Unpack(e.into()))?;
    }
    tokio::fs::rename(scratch.path(), dest)
      .await
      .map_err(|e| SourceError::Unpack(e.into()))?;
    scratch.disarm();

    debug!(dest = %dest.display(), "repository checkout ready");
    Ok(())
  }
}

impl From<FetchError> for SourceError {
  fn from(err: FetchError) -> Self {
    SourceError::Unpack(err)
  }
}

fn tmp_path(dest: &Path) -> PathBuf {
  PathBuf::from(format!("{}.tmp", dest.display()))
}

/// Extract `(owner, repo)` from a GitHub repository URL.
fn parse_repo_url(url: &str) -> Result<(String, String), SourceError> {
  let trimmed = url.strip_prefix("https://").unwrap_or(url);
  let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
  let parts: Vec<&str> = trimmed.split('/').collect();
  for (i, part) in parts.iter().enumerate() {
    if *part == "github.com" && i + 2 < parts.len() {
      return Ok((parts[i + 1].to_string(), parts[i + 2].to_string()));
    }
  }
  Err(SourceError::RepoInvalid(url.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::providers::StaticToken;
  use std::sync::Arc;

  fn source(url: &str, branch: &str) -> GithubSource {
    GithubSource::new(url, branch, Arc::new(StaticToken("t".into())))
  }

  #[test]
  fn parses_owner_and_repo() {
    let (owner, repo) = parse_repo_url("https://github.com/acme/api").unwrap();
    assert_eq!(owner, "acme");
    assert_eq!(repo, "api");
  }

  #[test]
  fn parses_with_git_suffix() {
    let (owner, repo) = parse_repo_url("https://github.com/acme/api.git").unwrap();
    assert_eq!(owner, "acme");
    assert_eq!(repo, "api");
  }

  #[test]
  fn rejects_url_without_repo() {
    assert!(matches!(
      parse_repo_url("https://github.com/acme"),
      Err(SourceError::RepoInvalid(_))
    ));
    assert!(matches!(
      parse_repo_url("https://example.com/acme/api"),
      Err(SourceError::RepoInvalid(_))
    ));
  }

  #[test]
  fn empty_branch_defaults_to_main() {
    assert_eq!(source("https://github.com/acme/api", "").branch(), "main");
    assert_eq!(source("https://github.com/acme/api", "develop").branch(), "develop");
  }

  #[tokio::test]
  async fn invalid_url_fails_before_any_network_io() {
    let src = source("https://github.com/just-an-owner", "main");
    let temp = tempfile::TempDir::new().unwrap();
    let err = src.fetch(&temp.path().join("checkout")).await.unwrap_err();
    assert!(matches!(err, SourceError::RepoInvalid(_)));
  }
}
