//! Manifest decoding: format normalization and envelope dispatch.
//!
//! YAML documents are normalized to a JSON value first (JSON manifests parse
//! directly), then a shallow `{kind, defVersion}` envelope decides which
//! typed record the body becomes. A definitions tree legitimately contains
//! unrelated JSON like `package.json`, and directory scans downgrade these
//! errors, so the variants distinguish "not a manifest at all" from "a
//! manifest we do not understand".

use std::path::Path;

use thiserror::Error;

use super::v1;

/// Errors from decoding a single manifest document.
#[derive(Debug, Error)]
pub enum DecodeError {
  /// The bytes did not parse as JSON/YAML, or the body did not match the
  /// dispatched record shape.
  #[error("decode failed: {0}")]
  Parse(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The envelope parsed but named a `defVersion` this build does not know.
  #[error("unsupported defVersion {0:?}")]
  UnsupportedVersion(String),

  /// The envelope parsed but named a `kind` this build does not know.
  #[error("unknown kind {0:?}")]
  UnknownKind(String),
}

/// A successfully decoded manifest.
#[derive(Debug, Clone)]
pub enum Decoded {
  Service(v1::Service),
  Environment(v1::Environment),
}

/// On-disk serialization format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Json,
  Yaml,
}

impl Format {
  /// Returns the format for a manifest path, or `None` when the extension
  /// marks the file as not a manifest.
  pub fn from_path(path: &Path) -> Option<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => Some(Format::Json),
      Some("yaml") | Some("yml") => Some(Format::Yaml),
      _ => None,
    }
  }
}

/// Decode one manifest document.
pub fn decode(data: &[u8], format: Format) -> Result<Decoded, DecodeError> {
  let value: serde_json::Value = match format {
    Format::Json => serde_json::from_slice(data).map_err(|e| DecodeError::Parse(Box::new(e)))?,
    Format::Yaml => serde_yaml::from_slice(data).map_err(|e| DecodeError::Parse(Box::new(e)))?,
  };

  let meta: v1::TypeMeta =
    serde_json::from_value(value.clone()).map_err(|e| DecodeError::Parse(Box::new(e)))?;

  match meta.def_version.as_str() {
    "v1" | "" => decode_v1(&meta.kind, value),
    other => Err(DecodeError::UnsupportedVersion(other.to_string())),
  }
}

fn decode_v1(kind: &str, value: serde_json::Value) -> Result<Decoded, DecodeError> {
  match kind {
    "Service" => {
      let svc: v1::Service =
        serde_json::from_value(value).map_err(|e| DecodeError::Parse(Box::new(e)))?;
      Ok(Decoded::Service(svc))
    }
    "Environment" => {
      let env: v1::Environment =
        serde_json::from_value(value).map_err(|e| DecodeError::Parse(Box::new(e)))?;
      Ok(Decoded::Environment(env))
    }
    other => Err(DecodeError::UnknownKind(other.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_a_service_manifest() {
    let doc = br#"{
      "kind": "Service",
      "defVersion": "v1",
      "name": "api",
      "runtime": {"engine": "node", "version": "20.11.0"},
      "gitURL": "https://github.com/acme/api",
      "runScript": "node server.js"
    }"#;

    let Decoded::Service(svc) = decode(doc, Format::Json).unwrap() else {
      panic!("expected a service");
    };
    assert_eq!(svc.name, "api");
    assert_eq!(svc.runtime.engine, "node");
    assert_eq!(svc.git_url, "https://github.com/acme/api");
    assert_eq!(svc.run_script, "node server.js");
    assert!(svc.branch.is_none());
  }

  #[test]
  fn decodes_an_environment_manifest_from_yaml() {
    let doc = b"kind: Environment\nname: staging\nimports:\n  - ./services\noverrides:\n  web:\n    port: 4000\n";

    let Decoded::Environment(env) = decode(doc, Format::Yaml).unwrap() else {
      panic!("expected an environment");
    };
    assert_eq!(env.name, "staging");
    assert_eq!(env.imports, vec!["./services".to_string()]);
    assert_eq!(env.overrides["web"].port, Some(4000));
  }

  #[test]
  fn empty_def_version_is_treated_as_v1() {
    let doc = br#"{"kind": "Service", "name": "api"}"#;
    assert!(matches!(decode(doc, Format::Json).unwrap(), Decoded::Service(_)));
  }

  #[test]
  fn unknown_version_is_an_error() {
    let doc = br#"{"kind": "Service", "defVersion": "v9", "name": "api"}"#;
    let err = decode(doc, Format::Json).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedVersion(v) if v == "v9"));
  }

  #[test]
  fn unknown_kind_is_an_error() {
    // A package.json has no kind; the caller downgrades this when scanning.
    let doc = br#"{"name": "some-npm-package", "dependencies": {}}"#;
    let err = decode(doc, Format::Json).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownKind(k) if k.is_empty()));
  }

  #[test]
  fn unknown_keys_are_ignored() {
    let doc = br#"{"kind": "Service", "name": "api", "replicas": 3, "labels": {"a": "b"}}"#;
    assert!(matches!(decode(doc, Format::Json).unwrap(), Decoded::Service(_)));
  }

  #[test]
  fn garbage_is_a_parse_error() {
    let err = decode(b"{not json", Format::Json).unwrap_err();
    assert!(matches!(err, DecodeError::Parse(_)));
  }

  #[test]
  fn format_follows_extension() {
    assert_eq!(Format::from_path(Path::new("env.json")), Some(Format::Json));
    assert_eq!(Format::from_path(Path::new("env.yaml")), Some(Format::Yaml));
    assert_eq!(Format::from_path(Path::new("env.yml")), Some(Format::Yaml));
    assert_eq!(Format::from_path(Path::new("README.md")), None);
    assert_eq!(Format::from_path(Path::new("Makefile")), None);
  }
}
