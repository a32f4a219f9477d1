//! Provider wiring for local deployments.
//!
//! The real control-plane and secrets clients are injected by the hosting
//! environment; these are the stand-ins the bare CLI runs with.

use async_trait::async_trait;

use vanguard_lib::providers::{ProviderError, SecretProvider, TokenProvider};

/// Reads the GitHub token from `GITHUB_TOKEN` on every call, so a token
/// rotated mid-run is picked up by the next fetch. An unset variable yields
/// an empty token; public repositories still fetch.
pub struct EnvToken {
  var: &'static str,
}

impl EnvToken {
  pub fn github() -> Self {
    Self { var: "GITHUB_TOKEN" }
  }
}

#[async_trait]
impl TokenProvider for EnvToken {
  async fn token(&self) -> Result<String, ProviderError> {
    Ok(std::env::var(self.var).unwrap_or_default())
  }
}

/// Stand-in for deployments without a secrets backend: any `aws/secrets/`
/// reference fails the load with a pointed message instead of a mystery.
pub struct UnconfiguredSecrets;

#[async_trait]
impl SecretProvider for UnconfiguredSecrets {
  async fn fetch(&self, secret_id: &str) -> Result<String, ProviderError> {
    Err(format!("no secrets backend configured (variable references {secret_id})").into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[tokio::test]
  #[serial]
  async fn env_token_reads_the_current_value() {
    std::env::set_var("GITHUB_TOKEN", "tok-abc");
    let token = EnvToken::github().token().await.unwrap();
    std::env::remove_var("GITHUB_TOKEN");
    assert_eq!(token, "tok-abc");
  }

  #[tokio::test]
  #[serial]
  async fn unset_token_is_empty_not_an_error() {
    std::env::remove_var("GITHUB_TOKEN");
    let token = EnvToken::github().token().await.unwrap();
    assert!(token.is_empty());
  }

  #[tokio::test]
  async fn unconfigured_secrets_always_fail() {
    let err = UnconfiguredSecrets.fetch("db-prod").await.unwrap_err();
    assert!(err.to_string().contains("db-prod"));
  }
}
