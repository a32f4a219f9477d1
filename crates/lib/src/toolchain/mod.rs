//! Toolchain provisioning: versioned language runtimes on disk.
//!
//! One cache entry per `(engine, version)` under
//! `<workspace>/toolchains/<engine>/<version>/`. A marker file inside the
//! install directory means "provisioned" and short-circuits without any
//! network traffic. A miss streams the distribution archive, extracts into
//! `<installDir>.tmp`, and renames into place; the rename is the commit
//! point, so readers never observe a half-extracted toolchain.

mod node;
mod openjdk;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use vanguard_platform::WorkspacePaths;

use crate::defs::Engine;
use crate::fetch::{self, FetchError, ScratchDir};

/// Errors from provisioning a toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("unsupported runtime engine: {0:?}")]
  UnsupportedEngine(String),

  #[error("provisioning failed for {key}")]
  Provision {
    key: String,
    #[source]
    source: FetchError,
  },
}

/// Downloads and caches runtimes for every engine.
///
/// Concurrent calls for the same `(engine, version)` serialize through a
/// per-key lock so the second caller observes the first one's cache entry
/// instead of downloading again. Distinct keys proceed in parallel.
pub struct Provisioner {
  workspace: WorkspacePaths,
  http: reqwest::Client,
  locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Provisioner {
  pub fn new(workspace: WorkspacePaths) -> Self {
    Self {
      workspace,
      http: reqwest::Client::new(),
      locks: Mutex::new(HashMap::new()),
    }
  }

  /// Ensure `engine:version` is materialized; returns its bin directory.
  ///
  /// An empty version selects the engine's default.
  pub async fn provision(&self, engine: &str, version: &str) -> Result<PathBuf, ToolchainError> {
    let parsed =
      Engine::parse(engine).ok_or_else(|| ToolchainError::UnsupportedEngine(engine.to_string()))?;
    let version = if version.is_empty() {
      default_version(parsed)
    } else {
      version
    };
    let install_dir = self.workspace.toolchain_dir(parsed.as_str(), version);
    let key = format!("{}:{}", parsed, version);

    if let Some(bin_dir) = provisioned_bin_dir(parsed, &install_dir) {
      debug!(toolchain = %key, "toolchain cache hit");
      return Ok(bin_dir);
    }

    let lock = self.lock_for(&key).await;
    let _guard = lock.lock().await;

    // Re-check: another caller may have finished while we waited.
    if let Some(bin_dir) = provisioned_bin_dir(parsed, &install_dir) {
      debug!(toolchain = %key, "toolchain cache hit");
      return Ok(bin_dir);
    }

    info!(toolchain = %key, "provisioning toolchain");
    self.download_and_extract(parsed, version, &install_dir, &key).await?;

    provisioned_bin_dir(parsed, &install_dir).ok_or_else(|| ToolchainError::Provision {
      key,
      source: FetchError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} executable not found in {}", parsed, install_dir.display()),
      )),
    })
  }

  async fn download_and_extract(
    &self,
    engine: Engine,
    version: &str,
    install_dir: &Path,
    key: &str,
  ) -> Result<(), ToolchainError> {
    let provision_err = |source: FetchError| ToolchainError::Provision {
      key: key.to_string(),
      source,
    };

    let url = match engine {
      Engine::Node => node::dist_url(version),
      Engine::OpenJdk => openjdk::dist_url(version),
    };
    debug!(url = %url, "fetching distribution archive");

    let scratch =
      ScratchDir::create(tmp_path(install_dir)).map_err(|e| provision_err(e.into()))?;
    let tarball = scratch.path().join(".archive.tar.gz");
    fetch::download(self.http.get(&url), &tarball).await.map_err(provision_err)?;

    // Node tarballs wrap everything in one versioned directory; strip it.
    // Adoptium archives keep their own layout and are searched afterwards.
    // Unsatisfiable symlinks are skipped, not fatal, for both engines.
    let strip_root = matches!(engine, Engine::Node);
    let unpack_tarball = tarball.clone();
    let unpack_dest = scratch.path().to_path_buf();
    tokio::task::spawn_blocking(move || fetch::unpack_tar_gz(&unpack_tarball, &unpack_dest, strip_root, true))
      .await
      .map_err(|join| provision_err(FetchError::Io(io::Error::other(join))))?
      .map_err(provision_err)?;
    tokio::fs::remove_file(&tarball).await.map_err(|e| provision_err(e.into()))?;

    if install_dir.exists() {
      tokio::fs::remove_dir_all(install_dir)
        .await
        .map_err(|e| provision_err(e.into()))?;
    }
    tokio::fs::rename(scratch.path(), install_dir)
      .await
      .map_err(|e| provision_err(e.into()))?;
    scratch.disarm();

    info!(toolchain = %key, dir = %install_dir.display(), "toolchain installed");
    Ok(())
  }

  async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
    let mut locks = self.locks.lock().await;
    locks.entry(key.to_string()).or_default().clone()
  }
}

/// Returns the bin directory when the engine's marker says the install is
/// complete; `None` means "not provisioned yet".
fn provisioned_bin_dir(engine: Engine, install_dir: &Path) -> Option<PathBuf> {
  match engine {
    Engine::Node => {
      let bin_dir = node::bin_dir(install_dir);
      node::marker(install_dir).exists().then_some(bin_dir)
    }
    Engine::OpenJdk => {
      if !openjdk::marker_present(install_dir) {
        return None;
      }
      openjdk::find_bin_dir(install_dir)
    }
  }
}

fn default_version(engine: Engine) -> &'static str {
  match engine {
    Engine::Node => node::DEFAULT_VERSION,
    Engine::OpenJdk => openjdk::DEFAULT_VERSION,
  }
}

fn tmp_path(install_dir: &Path) -> PathBuf {
  PathBuf::from(format!("{}.tmp", install_dir.display()))
}
