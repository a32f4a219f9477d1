//! Environment-driven configuration.
//!
//! Everything is read from environment variables so the same binary runs
//! under systemd, a container entrypoint, or a developer shell without
//! flag plumbing: `MODE`, `WORKSPACE_DIR`, `ENV_DEFS_GIT_URL`,
//! `ENV_DEFS_DIR`.

use std::path::PathBuf;

use thiserror::Error;

use vanguard_platform::paths::DEFAULT_WORKSPACE;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("MODE must be 'local' or 'server', got {0:?}")]
  InvalidMode(String),

  #[error("environment definitions incomplete: set ENV_DEFS_GIT_URL or ENV_DEFS_DIR")]
  MissingEnvDefs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Developer machine: plain HTTP, token from the environment.
  Local,
  /// Production: definitions must come from a repository.
  Server,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub mode: Mode,
  pub workspace_dir: PathBuf,
  pub env_defs_git_url: Option<String>,
  pub env_defs_dir: Option<String>,
}

impl Config {
  pub fn from_env() -> Result<Config, ConfigError> {
    let mode = match std::env::var("MODE").unwrap_or_else(|_| "local".to_string()).as_str() {
      "local" => Mode::Local,
      "server" => Mode::Server,
      other => return Err(ConfigError::InvalidMode(other.to_string())),
    };

    let config = Config {
      mode,
      workspace_dir: std::env::var("WORKSPACE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORKSPACE)),
      env_defs_git_url: non_empty(std::env::var("ENV_DEFS_GIT_URL").ok()),
      env_defs_dir: non_empty(std::env::var("ENV_DEFS_DIR").ok()),
    };
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    match self.mode {
      Mode::Local => {
        if self.env_defs_git_url.is_none() && self.env_defs_dir.is_none() {
          return Err(ConfigError::MissingEnvDefs);
        }
      }
      Mode::Server => {
        if self.env_defs_git_url.is_none() {
          return Err(ConfigError::MissingEnvDefs);
        }
      }
    }
    Ok(())
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const ALL_VARS: [&str; 4] = ["MODE", "WORKSPACE_DIR", "ENV_DEFS_GIT_URL", "ENV_DEFS_DIR"];

  fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let pairs: Vec<(String, Option<String>)> = ALL_VARS
      .iter()
      .map(|name| {
        let value = vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.to_string());
        (name.to_string(), value)
      })
      .collect();
    temp_env::with_vars(pairs, f);
  }

  #[test]
  #[serial]
  fn defaults_to_local_mode_and_tmp_workspace() {
    with_env(&[("ENV_DEFS_DIR", "./defs")], || {
      let config = Config::from_env().unwrap();
      assert_eq!(config.mode, Mode::Local);
      assert_eq!(config.workspace_dir, PathBuf::from("/tmp"));
      assert_eq!(config.env_defs_dir.as_deref(), Some("./defs"));
    });
  }

  #[test]
  #[serial]
  fn local_mode_requires_some_definitions_source() {
    with_env(&[], || {
      assert!(matches!(Config::from_env(), Err(ConfigError::MissingEnvDefs)));
    });
  }

  #[test]
  #[serial]
  fn server_mode_requires_a_git_url() {
    with_env(&[("MODE", "server"), ("ENV_DEFS_DIR", "./defs")], || {
      assert!(matches!(Config::from_env(), Err(ConfigError::MissingEnvDefs)));
    });
    with_env(
      &[
        ("MODE", "server"),
        ("ENV_DEFS_GIT_URL", "https://github.com/acme/defs"),
        ("ENV_DEFS_DIR", "envs/prod"),
      ],
      || {
        let config = Config::from_env().unwrap();
        assert_eq!(config.mode, Mode::Server);
      },
    );
  }

  #[test]
  #[serial]
  fn unknown_mode_is_rejected() {
    with_env(&[("MODE", "cluster"), ("ENV_DEFS_DIR", "./defs")], || {
      assert!(matches!(Config::from_env(), Err(ConfigError::InvalidMode(m)) if m == "cluster"));
    });
  }

  #[test]
  #[serial]
  fn empty_strings_count_as_unset() {
    with_env(&[("ENV_DEFS_GIT_URL", ""), ("ENV_DEFS_DIR", "")], || {
      assert!(matches!(Config::from_env(), Err(ConfigError::MissingEnvDefs)));
    });
  }

  #[test]
  #[serial]
  fn workspace_dir_is_configurable() {
    with_env(&[("WORKSPACE_DIR", "/var/lib/vanguard"), ("ENV_DEFS_DIR", "./defs")], || {
      let config = Config::from_env().unwrap();
      assert_eq!(config.workspace_dir, PathBuf::from("/var/lib/vanguard"));
    });
  }
}
