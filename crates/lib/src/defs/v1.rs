//! Version 1 manifest wire types.
//!
//! These mirror the JSON/YAML documents in a definitions repository. Every
//! optional field stays `Option` here; defaults are applied when mapping
//! into the resolved model (`super::Service`). Unknown keys are ignored.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The shallow envelope every manifest carries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeMeta {
  #[serde(default)]
  pub kind: String,
  #[serde(default, rename = "defVersion")]
  pub def_version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSpec {
  #[serde(default)]
  pub engine: String,
  #[serde(default)]
  pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Service {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub runtime: RuntimeSpec,
  #[serde(default, rename = "gitURL")]
  pub git_url: String,
  pub branch: Option<String>,
  pub path: Option<String>,
  pub port: Option<u16>,
  #[serde(default, rename = "runScript")]
  pub run_script: String,
  #[serde(rename = "ingressHost")]
  pub ingress_host: Option<String>,
  #[serde(default)]
  pub variables: Vec<Variable>,
}

/// Exactly one of `value` / `ref` is expected to be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Variable {
  #[serde(default)]
  pub name: String,
  pub value: Option<String>,
  #[serde(rename = "ref")]
  pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Environment {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub imports: Vec<String>,
  #[serde(default)]
  pub overrides: BTreeMap<String, ServiceOverride>,
}

/// A partial service applied atop a loaded one, by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceOverride {
  pub branch: Option<String>,
  pub port: Option<u16>,
  #[serde(rename = "ingressHost")]
  pub ingress_host: Option<String>,
  #[serde(default)]
  pub variables: Vec<Variable>,
}
