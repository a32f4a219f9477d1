//! Node.js distribution specifics.

use std::path::{Path, PathBuf};

use vanguard_platform::Platform;

/// Fallback when a service declares the engine without a version.
pub(super) const DEFAULT_VERSION: &str = "20.11.0";

/// Tarball URL on the nodejs.org dist endpoint.
pub(super) fn dist_url(version: &str) -> String {
  let platform = Platform::current();
  format!(
    "https://nodejs.org/dist/v{version}/node-v{version}-{}-{}.tar.gz",
    platform.os.as_str(),
    platform.arch.node_name(),
  )
}

/// Executable directory inside an install: `bin/` on unix, the install root
/// on windows.
pub(super) fn bin_dir(install_dir: &Path) -> PathBuf {
  if cfg!(windows) {
    install_dir.to_path_buf()
  } else {
    install_dir.join("bin")
  }
}

/// Marker whose presence means the install is complete.
pub(super) fn marker(install_dir: &Path) -> PathBuf {
  let exe = if cfg!(windows) { "node.exe" } else { "node" };
  bin_dir(install_dir).join(exe)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dist_url_embeds_version_twice() {
    let url = dist_url("20.11.0");
    assert!(url.starts_with("https://nodejs.org/dist/v20.11.0/node-v20.11.0-"));
    assert!(url.ends_with(".tar.gz"));
  }

  #[test]
  #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
  fn dist_url_maps_the_architecture() {
    assert_eq!(
      dist_url("20.11.0"),
      "https://nodejs.org/dist/v20.11.0/node-v20.11.0-linux-x64.tar.gz"
    );
  }

  #[test]
  #[cfg(unix)]
  fn marker_lives_under_bin() {
    assert_eq!(marker(Path::new("/cache/node/20.11.0")), PathBuf::from("/cache/node/20.11.0/bin/node"));
  }
}
