//! The definition store: loads a manifest tree and resolves it.
//!
//! `load` is the single mutation window. It walks the tree, decodes
//! manifests, expands the environment's imports, assigns ports, resolves
//! secret references, and applies overrides, in that order. Afterwards the
//! service map is read-only for the life of the process.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{
  decode, map_environment_v1, map_service_v1, DecodeError, Decoded, Environment, Format, Service,
  Variable,
};
use crate::providers::{ProviderError, SecretProvider, SharedSecretProvider};

/// Reference prefix that routes a variable through the secret provider.
pub const AWS_SECRET_PREFIX: &str = "aws/secrets/";

/// First port handed out during assignment.
pub const PORT_BASE: u16 = 3000;

/// Errors from loading a definitions tree.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("load failed: walk error under {path}")]
  Load {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("read failed: {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("missing environment: checked {0}")]
  NoEnvironment(PathBuf),

  #[error("duplicate environment: {second} (already defined by {first})")]
  DuplicateEnvironment { first: PathBuf, second: PathBuf },

  #[error("import failed: {path} does not exist")]
  Import { path: PathBuf },

  #[error("resolve variable failed: {name}")]
  ResolveVariable {
    name: String,
    #[source]
    source: ProviderError,
  },
}

/// Holds exactly one environment and the resolved services, keyed by name.
pub struct Store {
  environment: Option<Environment>,
  environment_path: Option<PathBuf>,
  services: BTreeMap<String, Service>,
  secrets: SharedSecretProvider,
}

impl Store {
  pub fn new(secrets: SharedSecretProvider) -> Self {
    Self {
      environment: None,
      environment_path: None,
      services: BTreeMap::new(),
      secrets,
    }
  }

  /// Load and resolve the definitions tree rooted at `root`.
  ///
  /// Secret expansion is strict: a provider failure aborts the load.
  pub async fn load(&mut self, root: &Path) -> Result<(), StoreError> {
    self.load_tree(root)?;
    if self.environment.is_none() {
      return Err(StoreError::NoEnvironment(root.to_path_buf()));
    }
    self.process_environment(root).await
  }

  /// The resolved services, in name order. Read-only after `load`.
  pub fn services(&self) -> &BTreeMap<String, Service> {
    &self.services
  }

  pub fn environment(&self) -> Option<&Environment> {
    self.environment.as_ref()
  }

  fn load_tree(&mut self, root: &Path) -> Result<(), StoreError> {
    for entry in WalkDir::new(root).sort_by_file_name() {
      let entry = entry.map_err(|source| StoreError::Load {
        path: root.to_path_buf(),
        source,
      })?;
      if !entry.file_type().is_file() {
        continue;
      }
      let Some(format) = Format::from_path(entry.path()) else {
        continue;
      };
      self.load_file(entry.path(), format)?;
    }
    Ok(())
  }

  fn load_file(&mut self, path: &Path, format: Format) -> Result<(), StoreError> {
    let data = fs::read(path).map_err(|source| StoreError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    // A definitions tree may hold unrelated files (package.json, lockfiles);
    // anything that does not decode as a manifest is skipped, not fatal.
    let decoded = match decode(&data, format) {
      Ok(decoded) => decoded,
      Err(DecodeError::Parse(err)) => {
        debug!(path = %path.display(), error = %err, "skipping file: not a manifest");
        return Ok(());
      }
      Err(err) => {
        warn!(path = %path.display(), error = %err, "skipping manifest");
        return Ok(());
      }
    };

    match decoded {
      Decoded::Service(svc) => {
        let svc = map_service_v1(svc);
        if self.services.contains_key(&svc.name) {
          warn!(service = %svc.name, path = %path.display(), "replacing previously defined service");
        }
        self.services.insert(svc.name.clone(), svc);
      }
      Decoded::Environment(env) => {
        if let Some(first) = &self.environment_path {
          return Err(StoreError::DuplicateEnvironment {
            first: first.clone(),
            second: path.to_path_buf(),
          });
        }
        self.environment = Some(map_environment_v1(env));
        self.environment_path = Some(path.to_path_buf());
      }
    }
    Ok(())
  }

  async fn process_environment(&mut self, root: &Path) -> Result<(), StoreError> {
    let environment = self.environment.clone().unwrap_or_default();

    // Imports first, so imported services take part in port assignment.
    for import in &environment.imports {
      let import_path = root.join(import);
      if !import_path.exists() {
        return Err(StoreError::Import { path: import_path });
      }
      self.load_tree(&import_path)?;
    }

    // Deterministic port assignment: ascending name order (the map is a
    // BTreeMap), so unchanged inputs produce unchanged ports across boots.
    for (i, svc) in self.services.values_mut().enumerate() {
      svc.port = PORT_BASE + i as u16;
    }

    // Expand every declared variable; one ref may fan out into several
    // concrete variables.
    let names: Vec<String> = self.services.keys().cloned().collect();
    for name in &names {
      let Some(svc) = self.services.get_mut(name) else {
        continue;
      };
      let declared = std::mem::take(&mut svc.variables);
      let mut resolved = Vec::with_capacity(declared.len());
      for var in declared {
        resolved.extend(resolve_variable(&*self.secrets, var).await?);
      }
      if let Some(svc) = self.services.get_mut(name) {
        svc.variables = resolved;
      }
    }

    // Overrides last: branch, port, ingress host, then variables. Override
    // variables go through the same expansion as declared ones.
    for (name, patch) in &environment.overrides {
      if !self.services.contains_key(name) {
        warn!(service = %name, "skipping override: service not found");
        continue;
      }
      let mut expanded = Vec::new();
      for var in &patch.variables {
        expanded.extend(resolve_variable(&*self.secrets, var.clone()).await?);
      }
      let Some(svc) = self.services.get_mut(name) else {
        continue;
      };
      if let Some(branch) = &patch.branch {
        svc.branch = branch.clone();
      }
      if let Some(port) = patch.port {
        svc.port = port;
      }
      if let Some(host) = &patch.ingress_host {
        svc.ingress_host = Some(host.clone());
      }
      for var in expanded {
        update_or_append(&mut svc.variables, var);
      }
    }

    Ok(())
  }
}

/// Expand one variable into its concrete form(s).
///
/// Variables with a literal value, no reference, or a reference outside the
/// `aws/secrets/` scheme pass through untouched. A JSON-object secret fans
/// out into one variable per key (`NAME_KEY`); anything else becomes the
/// single variable's verbatim value.
async fn resolve_variable(
  secrets: &dyn SecretProvider,
  var: Variable,
) -> Result<Vec<Variable>, StoreError> {
  if var.value.is_some() {
    return Ok(vec![var]);
  }
  let Some(reference) = var.reference.as_deref() else {
    return Ok(vec![var]);
  };
  let Some(secret_id) = reference.strip_prefix(AWS_SECRET_PREFIX) else {
    return Ok(vec![var]);
  };

  let secret = secrets
    .fetch(secret_id)
    .await
    .map_err(|source| StoreError::ResolveVariable {
      name: var.name.clone(),
      source,
    })?;

  if let Ok(serde_json::Value::Object(entries)) = serde_json::from_str(&secret) {
    let prefix = var.name.to_uppercase();
    let expanded = entries
      .into_iter()
      .map(|(key, value)| Variable {
        name: format!("{}_{}", prefix, key.to_uppercase()),
        value: Some(scalar_string(value)),
        reference: None,
      })
      .collect();
    return Ok(expanded);
  }

  Ok(vec![Variable {
    name: var.name,
    value: Some(secret),
    reference: None,
  }])
}

/// String form of a JSON value: strings verbatim, everything else via its
/// JSON rendering (numbers and booleans print as expected).
fn scalar_string(value: serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s,
    other => other.to_string(),
  }
}

/// Replace a same-named variable or append a new one.
fn update_or_append(variables: &mut Vec<Variable>, new: Variable) {
  if let Some(existing) = variables.iter_mut().find(|v| v.name == new.name) {
    *existing = new;
  } else {
    variables.push(new);
  }
}
