//! Capabilities vanguard consumes from external collaborators.
//!
//! The orchestrator never talks to a control plane or a secrets backend
//! directly. It is handed one implementation of each trait at construction
//! and treats them as opaque. Test and local-mode implementations live with
//! their callers.

use async_trait::async_trait;
use std::sync::Arc;

/// Error type for provider calls. Providers are external; their failures are
/// carried verbatim and wrapped by the calling subsystem's error.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies the credential used to fetch repositories.
///
/// The returned token is used as an HTTP bearer credential; it may be
/// short-lived, so it is requested immediately before each fetch.
#[async_trait]
pub trait TokenProvider: Send + Sync {
  async fn token(&self) -> Result<String, ProviderError>;
}

/// Resolves a secret reference to its body, verbatim.
///
/// Whether the body is a JSON object (and fans out into multiple variables)
/// is the caller's business.
#[async_trait]
pub trait SecretProvider: Send + Sync {
  async fn fetch(&self, secret_id: &str) -> Result<String, ProviderError>;
}

/// A fixed token, for local development and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
  async fn token(&self) -> Result<String, ProviderError> {
    Ok(self.0.clone())
  }
}

/// Shared handle types used throughout the crate.
pub type SharedTokenProvider = Arc<dyn TokenProvider>;
pub type SharedSecretProvider = Arc<dyn SecretProvider>;
