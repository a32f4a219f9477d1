//! The environment manager: boot pipeline and supervision registry.
//!
//! Boot runs in strict phases: materialize the definitions, load the store,
//! provision every required toolchain, then deploy services one by one in
//! name order. A failing service is logged and skipped so the rest of the
//! environment still comes up; definition and provisioning failures abort
//! the boot.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use vanguard_platform::WorkspacePaths;

use crate::defs::{RuntimeSpec, Service, Store, StoreError, DEFAULT_BRANCH};
use crate::providers::{SharedSecretProvider, SharedTokenProvider};
use crate::source::{self, SourceError};
use crate::toolchain::{Provisioner, ToolchainError};
use crate::deployment::Deployment;

/// Errors that abort a boot.
#[derive(Debug, Error)]
pub enum ManagerError {
  #[error("boot failed: could not fetch definitions")]
  FetchDefinitions(#[source] SourceError),

  #[error("boot failed: could not load definitions from {path}")]
  LoadDefinitions {
    path: PathBuf,
    #[source]
    source: StoreError,
  },

  #[error("no source for definitions")]
  NoSource,

  #[error("provisioning failed: {key}")]
  Provisioning {
    key: String,
    #[source]
    source: ToolchainError,
  },

  #[error("service deployment failed: {service}: {context}")]
  Deploy {
    service: String,
    context: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("service deployment failed: {service}: no git url")]
  MissingGitUrl { service: String },
}

/// Owns the definition store, the provisioner, and the live deployments.
pub struct Manager {
  workspace: WorkspacePaths,
  store: Store,
  provisioner: Provisioner,
  active: BTreeMap<String, Deployment>,
  tokens: SharedTokenProvider,
}

impl Manager {
  pub fn new(
    workspace_dir: impl Into<PathBuf>,
    tokens: SharedTokenProvider,
    secrets: SharedSecretProvider,
  ) -> Self {
    let workspace = WorkspacePaths::new(workspace_dir);
    Self {
      store: Store::new(secrets),
      provisioner: Provisioner::new(workspace.clone()),
      active: BTreeMap::new(),
      tokens,
      workspace,
    }
  }

  /// Bring the environment up.
  ///
  /// With a git URL the definitions repository is fetched into the
  /// workspace and `env_defs_dir` names the directory inside it; without
  /// one, `env_defs_dir` is used as a local path.
  pub async fn boot(
    &mut self,
    env_defs_git_url: Option<&str>,
    env_defs_dir: Option<&str>,
  ) -> Result<(), ManagerError> {
    let env_path = match (env_defs_git_url, env_defs_dir) {
      (Some(url), Some(dir)) => {
        let definitions_dir = self.workspace.definitions_dir();
        let src = source::for_url(url, DEFAULT_BRANCH, self.tokens.clone())
          .map_err(ManagerError::FetchDefinitions)?;
        src.fetch(&definitions_dir).await.map_err(ManagerError::FetchDefinitions)?;
        definitions_dir.join(dir)
      }
      (None, Some(dir)) => {
        info!(path = %dir, "using local environment definitions");
        PathBuf::from(dir)
      }
      _ => return Err(ManagerError::NoSource),
    };

    self
      .store
      .load(&env_path)
      .await
      .map_err(|source| ManagerError::LoadDefinitions {
        path: env_path.clone(),
        source,
      })?;

    let bin_dirs = self.provision_all().await?;

    let services: Vec<Service> = self.store.services().values().cloned().collect();
    for svc in services {
      let bin_dir = bin_dirs.get(&svc.runtime.key()).cloned().unwrap_or_default();
      match self.deploy_service(&svc, &bin_dir).await {
        Ok(deployment) => {
          self.active.insert(svc.name.clone(), deployment);
        }
        Err(err) => {
          error!(service = %svc.name, error = %err, "deployment failed");
        }
      }
    }

    info!(services = self.store.services().len(), active = self.active.len(), "boot complete");
    Ok(())
  }

  /// Materialize every distinct `(engine, version)` the services require.
  pub async fn provision_all(&self) -> Result<HashMap<String, PathBuf>, ManagerError> {
    let mut required: BTreeMap<String, RuntimeSpec> = BTreeMap::new();
    for svc in self.store.services().values() {
      required.insert(svc.runtime.key(), svc.runtime.clone());
    }
    info!(count = required.len(), "resolving runtimes");

    let mut bin_dirs = HashMap::new();
    for (key, spec) in required {
      let bin_dir = self
        .provisioner
        .provision(&spec.engine, &spec.version)
        .await
        .map_err(|source| ManagerError::Provisioning {
          key: key.clone(),
          source,
        })?;
      bin_dirs.insert(key, bin_dir);
    }
    Ok(bin_dirs)
  }

  /// The resolved service set, for the proxy front-end. Read-only.
  pub fn services(&self) -> &BTreeMap<String, Service> {
    self.store.services()
  }

  /// Names of the deployments that started successfully, in name order.
  pub fn active_services(&self) -> Vec<String> {
    self.active.keys().cloned().collect()
  }

  /// Stop every active deployment. Does not wait for the children to exit.
  pub fn shutdown(&mut self) {
    for (name, mut deployment) in std::mem::take(&mut self.active) {
      info!(service = %name, "stopping service");
      if let Err(err) = deployment.stop() {
        error!(service = %name, error = %err, "shutdown error");
      }
    }
  }

  async fn deploy_service(&self, svc: &Service, bin_dir: &Path) -> Result<Deployment, ManagerError> {
    if svc.git_url.is_empty() {
      return Err(ManagerError::MissingGitUrl {
        service: svc.name.clone(),
      });
    }

    let repo_path = self.workspace.service_dir(&svc.name);
    let src = source::for_url(&svc.git_url, &svc.branch, self.tokens.clone())
      .map_err(|e| deploy_err(svc, "source init", e))?;
    src.fetch(&repo_path).await.map_err(|e| deploy_err(svc, "fetch", e))?;

    let mut deployment =
      Deployment::new(svc, &repo_path, bin_dir).map_err(|e| deploy_err(svc, "driver init", e))?;
    deployment.install().await.map_err(|e| deploy_err(svc, "install", e))?;
    deployment.start().await.map_err(|e| deploy_err(svc, "start", e))?;
    Ok(deployment)
  }
}

fn deploy_err(
  svc: &Service,
  context: &'static str,
  source: impl std::error::Error + Send + Sync + 'static,
) -> ManagerError {
  ManagerError::Deploy {
    service: svc.name.clone(),
    context,
    source: Box::new(source),
  }
}
