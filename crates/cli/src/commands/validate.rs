//! `vanguard validate`: resolve a definitions directory and print the result.
//!
//! Runs the same load path as `serve` (imports, port assignment, overrides)
//! without fetching code or provisioning toolchains, so a definitions change
//! can be checked before it ships.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use console::style;

use vanguard_lib::defs::Store;

use crate::providers::UnconfiguredSecrets;

pub async fn run(path: &Path) -> Result<()> {
  if !path.is_dir() {
    return Err(anyhow!("not a directory: {}", path.display()));
  }
  println!("{} {}", style("Validating").blue().bold(), path.display());

  let mut store = Store::new(Arc::new(UnconfiguredSecrets));
  store.load(path).await?;

  println!();
  if let Some(env) = store.environment() {
    println!("{} {}", style("Environment:").bold(), env.name);
    println!();
  }
  for svc in store.services().values() {
    println!(
      "  {} {:<20} {}:{:<10} {:<12} port {:<5} {}",
      style("+").green(),
      svc.name,
      svc.runtime.engine,
      svc.runtime.version,
      svc.branch,
      svc.port,
      svc.ingress_host.as_deref().unwrap_or("-"),
    );
  }
  println!();
  println!(
    "{}",
    style(format!("{} services resolved.", store.services().len())).green()
  );

  Ok(())
}
