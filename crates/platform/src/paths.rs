//! Workspace directory layout
//!
//! Everything vanguard materializes on disk lives under a single workspace
//! root:
//!
//! ```text
//! <workspace>/
//! ├── definitions/                      # manifests checkout
//! ├── services/<name>/                  # per-service code checkouts
//! └── toolchains/<engine>/<version>/    # runtime caches
//! ```

use std::path::{Path, PathBuf};

/// Default workspace root when no `WORKSPACE_DIR` is configured.
pub const DEFAULT_WORKSPACE: &str = "/tmp";

/// Resolves the on-disk locations vanguard writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
  root: PathBuf,
}

impl WorkspacePaths {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Checkout directory for the environment definitions repository.
  pub fn definitions_dir(&self) -> PathBuf {
    self.root.join("definitions")
  }

  /// Root of the per-service code checkouts.
  pub fn services_dir(&self) -> PathBuf {
    self.root.join("services")
  }

  /// Code checkout directory for one service.
  pub fn service_dir(&self, name: &str) -> PathBuf {
    self.services_dir().join(name)
  }

  /// Root of the toolchain caches.
  pub fn toolchains_dir(&self) -> PathBuf {
    self.root.join("toolchains")
  }

  /// Install directory for one `(engine, version)` toolchain.
  pub fn toolchain_dir(&self, engine: &str, version: &str) -> PathBuf {
    self.toolchains_dir().join(engine).join(version)
  }
}

impl Default for WorkspacePaths {
  fn default() -> Self {
    Self::new(DEFAULT_WORKSPACE)
  }
}
