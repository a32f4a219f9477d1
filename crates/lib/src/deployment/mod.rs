//! Deployment drivers: install, start, and stop one service's process.
//!
//! One driver per engine, selected by the service's runtime. Both engines
//! share the mechanics here (environment construction, piped stdout/stderr
//! draining into the log stream, interrupt-based stop) and differ only in
//! how dependencies are installed and how the run script's program is
//! resolved.

mod node;
mod openjdk;

pub use node::NodeDeployment;
pub use openjdk::OpenJdkDeployment;

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{error, info};

use crate::defs::{Engine, Service};

/// Errors from installing or running a service.
#[derive(Debug, Error)]
pub enum DeploymentError {
  #[error("invalid service configuration: {0}")]
  InvalidConfig(String),

  #[error("unsupported runtime engine: {0:?}")]
  UnsupportedEngine(String),

  #[error("install command could not run: {tool}")]
  InstallSpawn {
    tool: String,
    #[source]
    source: io::Error,
  },

  #[error("install failed with exit code {code:?}: {tool}")]
  InstallFailed { tool: String, code: Option<i32> },

  #[error("failed to start process: {program}")]
  StartFailed {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("pipe setup failed")]
  PipeFailed,

  #[error("failed to signal process")]
  Stop(#[source] io::Error),
}

/// Lifecycle of one deployment. Install or start failures land in `Exited`;
/// there are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentState {
  New,
  Installing,
  Installed,
  Starting,
  Running,
  Stopping,
  Exited,
}

/// A deployment driver, dispatched on the service's engine.
#[derive(Debug)]
pub enum Deployment {
  Node(NodeDeployment),
  OpenJdk(OpenJdkDeployment),
}

impl Deployment {
  /// Build the driver for `svc`, whose code lives at `repo_path` and whose
  /// toolchain executables live in `bin_dir`.
  pub fn new(svc: &Service, repo_path: &Path, bin_dir: &Path) -> Result<Self, DeploymentError> {
    if svc.name.is_empty() {
      return Err(DeploymentError::InvalidConfig("service has no name".to_string()));
    }
    match Engine::parse(&svc.runtime.engine) {
      Some(Engine::Node) => Ok(Deployment::Node(NodeDeployment::new(svc, repo_path, bin_dir))),
      Some(Engine::OpenJdk) => {
        Ok(Deployment::OpenJdk(OpenJdkDeployment::new(svc, repo_path, bin_dir)))
      }
      None => Err(DeploymentError::UnsupportedEngine(svc.runtime.engine.clone())),
    }
  }

  /// Install dependencies / build the artifact. Synchronous: returns once
  /// the package manager exits.
  pub async fn install(&mut self) -> Result<(), DeploymentError> {
    match self {
      Deployment::Node(d) => d.install().await,
      Deployment::OpenJdk(d) => d.install().await,
    }
  }

  /// Launch the service process asynchronously.
  pub async fn start(&mut self) -> Result<(), DeploymentError> {
    match self {
      Deployment::Node(d) => d.start().await,
      Deployment::OpenJdk(d) => d.start().await,
    }
  }

  /// Ask the process to shut down. Does not wait.
  pub fn stop(&mut self) -> Result<(), DeploymentError> {
    match self {
      Deployment::Node(d) => d.stop(),
      Deployment::OpenJdk(d) => d.stop(),
    }
  }

  pub fn state(&self) -> DeploymentState {
    match self {
      Deployment::Node(d) => d.state(),
      Deployment::OpenJdk(d) => d.state(),
    }
  }
}

/// Prepare the child environment: the parent's environment, the toolchain
/// bin directory prefixed onto `PATH`, one entry per resolved variable, and
/// `JAVA_HOME` for engines that want it.
pub(crate) fn apply_env(cmd: &mut Command, svc: &Service, bin_dir: &Path, java_home: bool) {
  if !bin_dir.as_os_str().is_empty() {
    let inherited = std::env::var("PATH").unwrap_or_default();
    cmd.env("PATH", format!("{}:{}", bin_dir.display(), inherited));
    if java_home {
      if let Some(home) = bin_dir.parent() {
        cmd.env("JAVA_HOME", home);
      }
    }
  }
  for var in &svc.variables {
    if let Some(value) = &var.value {
      cmd.env(&var.name, value);
    }
  }
}

/// Run an install/build command to completion, draining its output into the
/// log stream.
pub(crate) async fn run_to_completion(
  service: &str,
  tool: &str,
  mut cmd: Command,
) -> Result<ExitStatus, DeploymentError> {
  cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
  let mut child = cmd.spawn().map_err(|source| DeploymentError::InstallSpawn {
    tool: tool.to_string(),
    source,
  })?;
  drain_pipes(service, &mut child)?;
  child.wait().await.map_err(|source| DeploymentError::InstallSpawn {
    tool: tool.to_string(),
    source,
  })
}

/// Spawn a long-running service process with its output supervised.
pub(crate) fn spawn_supervised(
  service: &str,
  program: &str,
  mut cmd: Command,
) -> Result<Child, DeploymentError> {
  cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
  let mut child = cmd.spawn().map_err(|source| DeploymentError::StartFailed {
    program: program.to_string(),
    source,
  })?;
  drain_pipes(service, &mut child)?;
  Ok(child)
}

fn drain_pipes(service: &str, child: &mut Child) -> Result<(), DeploymentError> {
  let stdout = child.stdout.take().ok_or(DeploymentError::PipeFailed)?;
  let stderr = child.stderr.take().ok_or(DeploymentError::PipeFailed)?;
  spawn_log_drain(service.to_string(), stdout, false);
  spawn_log_drain(service.to_string(), stderr, true);
  Ok(())
}

/// One task per pipe: forward each line as a log record tagged with the
/// service name. The task ends when the pipe closes.
fn spawn_log_drain<R>(service: String, stream: R, is_stderr: bool)
where
  R: AsyncRead + Unpin + Send + 'static,
{
  tokio::spawn(async move {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
      if is_stderr {
        error!(service = %service, "{}", line);
      } else {
        info!(service = %service, "{}", line);
      }
    }
  });
}

/// Send SIGINT so the service can shut down gracefully.
#[cfg(unix)]
pub(crate) fn interrupt(child: &mut Child) -> Result<(), DeploymentError> {
  let Some(pid) = child.id() else {
    return Ok(());
  };
  let rc = unsafe { libc::kill(pid as i32, libc::SIGINT) };
  if rc != 0 {
    return Err(DeploymentError::Stop(io::Error::last_os_error()));
  }
  Ok(())
}

#[cfg(not(unix))]
pub(crate) fn interrupt(child: &mut Child) -> Result<(), DeploymentError> {
  child.start_kill().map_err(DeploymentError::Stop)
}
