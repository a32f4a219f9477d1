//! `vanguard serve`: boot the environment and supervise it.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use tracing::{error, info};

use vanguard_lib::defs::Service;
use vanguard_lib::environment::Manager;

use crate::config::Config;
use crate::providers::{EnvToken, UnconfiguredSecrets};

pub async fn run() -> Result<()> {
  let config = Config::from_env()?;
  info!(
    mode = ?config.mode,
    workspace = %config.workspace_dir.display(),
    "starting vanguard"
  );

  let mut manager = Manager::new(
    &config.workspace_dir,
    Arc::new(EnvToken::github()),
    Arc::new(UnconfiguredSecrets),
  );

  if let Err(err) = manager
    .boot(config.env_defs_git_url.as_deref(), config.env_defs_dir.as_deref())
    .await
  {
    // One structured record with the whole cause chain, then a non-zero exit.
    error!(error = %format_chain(&err), "boot failed");
    std::process::exit(1);
  }

  print_service_table(manager.services());

  wait_for_shutdown().await;
  info!("shutdown signal received");
  manager.shutdown();
  info!("vanguard exiting");
  Ok(())
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_shutdown() {
  #[cfg(unix)]
  {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
      _ = tokio::signal::ctrl_c() => {}
      _ = term.recv() => {}
    }
  }
  #[cfg(not(unix))]
  {
    let _ = tokio::signal::ctrl_c().await;
  }
}

fn print_service_table(services: &BTreeMap<String, Service>) {
  println!();
  println!("{}", style("Services:").bold());
  for svc in services.values() {
    println!(
      "  {} {:<20} {}:{:<10} port {:<5} {}",
      style("+").green(),
      svc.name,
      svc.runtime.engine,
      svc.runtime.version,
      svc.port,
      svc.ingress_host.as_deref().unwrap_or("-"),
    );
  }
  println!();
}

fn format_chain(err: &dyn std::error::Error) -> String {
  let mut out = err.to_string();
  let mut cause = err.source();
  while let Some(err) = cause {
    out.push_str(": ");
    out.push_str(&err.to_string());
    cause = err.source();
  }
  out
}
