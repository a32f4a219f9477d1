//! `vanguard info`: show platform and workspace layout.

use anyhow::Result;
use console::style;

use vanguard_platform::paths::DEFAULT_WORKSPACE;
use vanguard_platform::{Platform, WorkspacePaths};

pub fn run() -> Result<()> {
  let platform = Platform::current();
  let workspace = std::env::var("WORKSPACE_DIR").unwrap_or_else(|_| DEFAULT_WORKSPACE.to_string());
  let paths = WorkspacePaths::new(&workspace);

  println!("{}", style("Platform").bold());
  println!();
  println!("  Platform:     {}", platform);
  println!("  OS:           {}", platform.os);
  println!("  Arch:         {}", platform.arch);
  println!();
  println!("{}", style("Workspace").bold());
  println!();
  println!("  Root:         {}", paths.root().display());
  println!("  Definitions:  {}", paths.definitions_dir().display());
  println!("  Services:     {}", paths.services_dir().display());
  println!("  Toolchains:   {}", paths.toolchains_dir().display());

  Ok(())
}
