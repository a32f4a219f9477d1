//! OpenJDK deployment driver.
//!
//! Installs by building the artifact (wrapper script if the repo ships one,
//! otherwise maven/gradle from PATH) and resolves a leading `java` in the
//! run script against the provisioned toolchain.

use std::path::{Path, PathBuf};

use tokio::process::{Child, Command};
use tracing::{info, warn};

use super::{
  apply_env, interrupt, run_to_completion, spawn_supervised, DeploymentError, DeploymentState,
};
use crate::defs::Service;

#[derive(Debug)]
pub struct OpenJdkDeployment {
  svc: Service,
  exec_path: PathBuf,
  bin_dir: PathBuf,
  child: Option<Child>,
  state: DeploymentState,
}

impl OpenJdkDeployment {
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

  pub(crate) async fn install(&mut self) -> Result<(), DeploymentError> {
    self.state = DeploymentState::Installing;
    let (tool, args) = self.detect_build_tool();
    info!(service = %self.svc.name, tool = %tool, "building artifact");

    let mut cmd = Command::new(&tool);
    cmd.args(args).current_dir(&self.exec_path);
    apply_env(&mut cmd, &self.svc, &self.bin_dir, true);

    match run_to_completion(&self.svc.name, &tool, cmd).await {
      Ok(status) if status.success() => {
        self.state = DeploymentState::Installed;
        Ok(())
      }
      Ok(status) => {
        self.state = DeploymentState::Exited;
        Err(DeploymentError::InstallFailed {
          tool,
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
    let Some((&first, args)) = argv.split_first() else {
      warn!(service = %self.svc.name, "no runScript provided, nothing to start");
      return Ok(());
    };
    self.state = DeploymentState::Starting;

    let program = self.resolve_program(first);
    let mut cmd = Command::new(&program);
    cmd.args(args).current_dir(&self.exec_path);
    apply_env(&mut cmd, &self.svc, &self.bin_dir, true);

    match spawn_supervised(&self.svc.name, &program, cmd) {
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

  /// A bare `java` in the run script uses the provisioned toolchain rather
  /// than whatever is on the inherited PATH.
  fn resolve_program(&self, first: &str) -> String {
    if !self.bin_dir.as_os_str().is_empty() && (first == "java" || first == "java.exe") {
      return self.bin_dir.join(first).display().to_string();
    }
    first.to_string()
  }

  fn detect_build_tool(&self) -> (String, Vec<&'static str>) {
    let mvnw = self.exec_path.join("mvnw");
    if mvnw.exists() {
      return (mvnw.display().to_string(), vec!["clean", "package", "-DskipTests"]);
    }
    let gradlew = self.exec_path.join("gradlew");
    if gradlew.exists() {
      return (gradlew.display().to_string(), vec!["build", "-x", "test"]);
    }
    if self.exec_path.join("pom.xml").exists() {
      return ("mvn".to_string(), vec!["clean", "package", "-DskipTests"]);
    }
    ("./gradlew".to_string(), vec!["build", "-x", "test"])
  }
}
