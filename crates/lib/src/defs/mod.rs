//! Service and environment definitions.
//!
//! A definitions repository is a directory tree of `Service` and
//! `Environment` manifests. `decode` turns one document into a typed v1
//! record; `Store` walks a tree, resolves imports, assigns ports, expands
//! secret references, and applies overrides, leaving a read-only map of
//! resolved services for the rest of the boot.

pub mod decode;
pub mod store;
pub mod v1;

pub use decode::{decode, Decoded, DecodeError, Format};
pub use store::{Store, StoreError};

/// The language runtimes vanguard can provision and drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
  Node,
  OpenJdk,
}

impl Engine {
  /// Parse an engine name case-insensitively. An empty string means Node,
  /// so services that omit the runtime block still deploy.
  pub fn parse(raw: &str) -> Option<Engine> {
    match raw.to_ascii_lowercase().as_str() {
      "" | "node" => Some(Engine::Node),
      "openjdk" => Some(Engine::OpenJdk),
      _ => None,
    }
  }

  pub const fn as_str(&self) -> &'static str {
    match self {
      Engine::Node => "node",
      Engine::OpenJdk => "openjdk",
    }
  }
}

impl std::fmt::Display for Engine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Runtime requirement of one service: which engine, at which version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RuntimeSpec {
  pub engine: String,
  pub version: String,
}

impl RuntimeSpec {
  /// Cache key for toolchain provisioning, `engine:version`.
  pub fn key(&self) -> String {
    format!("{}:{}", self.engine, self.version)
  }
}

/// A resolved environment variable. After `Store::load` returns, every
/// variable of every service has a concrete `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
  pub name: String,
  pub value: Option<String>,
  pub reference: Option<String>,
}

/// A resolved service: manifest content plus the assigned port, a never
/// empty branch, and fully expanded variables.
#[derive(Debug, Clone, Default)]
pub struct Service {
  pub name: String,
  pub runtime: RuntimeSpec,
  pub git_url: String,
  pub branch: String,
  pub path: String,
  pub port: u16,
  pub run_script: String,
  pub ingress_host: Option<String>,
  pub variables: Vec<Variable>,
}

/// The single environment record of a definitions tree.
#[derive(Debug, Clone, Default)]
pub struct Environment {
  pub name: String,
  pub imports: Vec<String>,
  pub overrides: std::collections::BTreeMap<String, ServiceOverride>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceOverride {
  pub branch: Option<String>,
  pub port: Option<u16>,
  pub ingress_host: Option<String>,
  pub variables: Vec<Variable>,
}

/// Fallback branch when a service manifest does not declare one.
pub const DEFAULT_BRANCH: &str = "main";

pub(crate) fn map_service_v1(svc: v1::Service) -> Service {
  let engine = if svc.runtime.engine.is_empty() {
    Engine::Node.as_str().to_string()
  } else {
    svc.runtime.engine
  };
  Service {
    name: svc.name,
    runtime: RuntimeSpec {
      engine,
      version: svc.runtime.version,
    },
    git_url: svc.git_url,
    branch: svc.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
    path: svc.path.unwrap_or_default(),
    // The declared port, if any, is discarded: assignment happens during
    // environment processing and overrides are the only way to pin one.
    port: 0,
    run_script: svc.run_script,
    ingress_host: svc.ingress_host,
    variables: svc.variables.into_iter().map(map_variable_v1).collect(),
  }
}

pub(crate) fn map_environment_v1(env: v1::Environment) -> Environment {
  Environment {
    name: env.name,
    imports: env.imports,
    overrides: env
      .overrides
      .into_iter()
      .map(|(name, o)| {
        (
          name,
          ServiceOverride {
            branch: o.branch,
            port: o.port,
            ingress_host: o.ingress_host,
            variables: o.variables.into_iter().map(map_variable_v1).collect(),
          },
        )
      })
      .collect(),
  }
}

fn map_variable_v1(v: v1::Variable) -> Variable {
  Variable {
    name: v.name,
    value: v.value,
    reference: v.reference,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn engine_parse_is_case_insensitive_and_defaults_to_node() {
    assert_eq!(Engine::parse("node"), Some(Engine::Node));
    assert_eq!(Engine::parse("OpenJDK"), Some(Engine::OpenJdk));
    assert_eq!(Engine::parse(""), Some(Engine::Node));
    assert_eq!(Engine::parse("ruby"), None);
  }

  #[test]
  fn mapping_applies_branch_and_engine_defaults() {
    let svc = map_service_v1(v1::Service {
      name: "api".into(),
      git_url: "https://github.com/acme/api".into(),
      ..Default::default()
    });

    assert_eq!(svc.branch, "main");
    assert_eq!(svc.runtime.engine, "node");
    assert_eq!(svc.port, 0);
  }

  #[test]
  fn mapping_keeps_declared_fields() {
    let svc = map_service_v1(v1::Service {
      name: "svc".into(),
      runtime: v1::RuntimeSpec {
        engine: "openjdk".into(),
        version: "21".into(),
      },
      branch: Some("develop".into()),
      path: Some("backend".into()),
      ingress_host: Some("svc.example.com".into()),
      ..Default::default()
    });

    assert_eq!(svc.branch, "develop");
    assert_eq!(svc.path, "backend");
    assert_eq!(svc.runtime.key(), "openjdk:21");
    assert_eq!(svc.ingress_host.as_deref(), Some("svc.example.com"));
  }
}
