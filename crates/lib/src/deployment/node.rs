//! Node.js deployment driver.

use std::path::{Path, PathBuf};

use tokio::process::{Child, Command};
use tracing::{info, warn};

use super::{
  apply_env, interrupt, run_to_completion, spawn_supervised, DeploymentError, DeploymentState,
};
use crate::defs::Service;

#[derive(Debug)]
pub struct NodeDeployment {
  svc: Service,
  exec_path: PathBuf,
  bin_dir: PathBuf,
  child: Option<Child>,
  state: DeploymentState,
}

impl NodeDeployment {
  pub(crate) fn new(svc: &Service, repo_path: &Path, bin_dir: &Path) -> Self {
    let exec_path = if svc.path.is_empty() {
      repo_path.to_path_buf()
    } else {
      repo_path.join(&svc.path)
    };
    Self {
      svc: svc.clone(),
      exec_path,
      bin_dir: bin_dir.to_path_buf(),
      child: None,
      state: DeploymentState::New,
    }
  }

  /// `<manager> install`, where the manager is chosen by the lockfile
  /// present in the execution directory.
  pub(crate) async fn install(&mut self) -> Result<(), DeploymentError> {
    self.state = DeploymentState::Installing;
    let manager = self.detect_manager();
    info!(service = %self.svc.name, manager, "installing dependencies");

    let mut cmd = Command::new(manager);
    cmd.arg("install").current_dir(&self.exec_path);
    apply_env(&mut cmd, &self.svc, &self.bin_dir, false);

    match run_to_completion(&self.svc.name, manager, cmd).await {
      Ok(status) if status.success() => {
        self.state = DeploymentState::Installed;
        Ok(())
      }
      Ok(status) => {
        self.state = DeploymentState::Exited;
        Err(DeploymentError::InstallFailed {
          tool: manager.to_string(),
          code: status.code(),
        })
      }
      Err(err) => {
        self.state = DeploymentState::Exited;
        Err(err)
      }
    }
  }

  pub(crate) async fn start(&mut self) -> Result<(), DeploymentError> {
    let argv: Vec<&str> = self.svc.run_script.split_whitespace().collect();
    let Some((&program, args)) = argv.split_first() else {
      warn!(service = %self.svc.name, "no runScript provided, nothing to start");
      return Ok(());
    };
    self.state = DeploymentState::Starting;

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&self.exec_path);
    apply_env(&mut cmd, &self.svc, &self.bin_dir, false);

    match spawn_supervised(&self.svc.name, program, cmd) {
      Ok(child) => {
        info!(service = %self.svc.name, pid = child.id(), "process started");
        self.child = Some(child);
        self.state = DeploymentState::Running;
        Ok(())
      }
      Err(err) => {
        self.state = DeploymentState::Exited;
        Err(err)
      }
    }
  }

  pub(crate) fn stop(&mut self) -> Result<(), DeploymentError> {
    if let Some(child) = &mut self.child {
      self.state = DeploymentState::Stopping;
      return interrupt(child);
    }
    Ok(())
  }

  pub(crate) fn state(&self) -> DeploymentState {
    self.state
  }

  fn detect_manager(&self) -> &'static str {
    if self.exec_path.join("pnpm-lock.yaml").exists() {
      "pnpm"
    } else if self.exec_path.join("yarn.lock").exists() {
      "yarn"
    } else {
      "npm"
    }
  }
}
