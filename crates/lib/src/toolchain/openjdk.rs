//! OpenJDK (Adoptium) distribution specifics.

use std::fs;
use std::path::{Path, PathBuf};

use vanguard_platform::Platform;

pub(super) const DEFAULT_VERSION: &str = "25";

/// Latest-GA binary URL on the Adoptium v3 API.
///
/// Adoptium is addressed by feature version, so `21.0.2` selects the `21`
/// release line.
pub(super) fn dist_url(version: &str) -> String {
  let feature = version.split('.').next().unwrap_or(version);
  let platform = Platform::current();
  format!(
    "https://api.adoptium.net/v3/binary/latest/{feature}/ga/{}/{}/jdk/hotspot/normal/eclipse",
    platform.os.as_str(),
    platform.arch.adoptium_name(),
  )
}

/// True when a `release` file marks the install as complete.
///
/// Archives keep their own layout, so the marker is probed in the same
/// spots as the `java` executable: the install root, a macOS
/// `Contents/Home`, and both again under each immediate subdirectory.
pub(super) fn marker_present(install_dir: &Path) -> bool {
  if install_dir.join("release").exists() || install_dir.join("Contents/Home/release").exists() {
    return true;
  }
  if let Ok(entries) = fs::read_dir(install_dir) {
    for entry in entries.flatten() {
      let dir = entry.path();
      if dir.join("release").exists() || dir.join("Contents/Home/release").exists() {
        return true;
      }
    }
  }
  false
}

/// Locate the directory holding the `java` executable.
///
/// Archives differ by vendor and platform: the binaries may sit at the root,
/// under a macOS `Contents/Home`, or inside a single versioned directory.
/// Probe the known spots and take the first that contains `java[.exe]`.
pub(super) fn find_bin_dir(install_dir: &Path) -> Option<PathBuf> {
  let mut candidates = vec![
    install_dir.join("bin"),
    install_dir.join("Contents/Home/bin"),
  ];
  if let Ok(entries) = fs::read_dir(install_dir) {
    for entry in entries.flatten() {
      if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
        candidates.push(entry.path().join("bin"));
        candidates.push(entry.path().join("Contents/Home/bin"));
      }
    }
  }
  candidates
    .into_iter()
    .find(|dir| dir.join("java").exists() || dir.join("java.exe").exists())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn dist_url_uses_the_feature_version() {
    let url = dist_url("21.0.2");
    assert!(url.starts_with("https://api.adoptium.net/v3/binary/latest/21/ga/"));
    assert!(url.ends_with("/jdk/hotspot/normal/eclipse"));
  }

  #[test]
  fn dist_url_keeps_plain_feature_versions() {
    assert!(dist_url("25").contains("/latest/25/ga/"));
  }

  #[test]
  fn finds_java_at_the_install_root() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("java"), "").unwrap();

    assert_eq!(find_bin_dir(temp.path()), Some(bin));
  }

  #[test]
  fn finds_java_in_a_versioned_subdirectory() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("jdk-21.0.2+13/bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("java"), "").unwrap();

    assert_eq!(find_bin_dir(temp.path()), Some(bin));
  }

  #[test]
  fn finds_java_under_contents_home() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("jdk-21.jdk/Contents/Home/bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("java"), "").unwrap();

    assert_eq!(find_bin_dir(temp.path()), Some(bin));
  }

  #[test]
  fn marker_is_found_in_a_nested_layout() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("jdk-21.0.2+13");
    fs::create_dir_all(&home).unwrap();
    fs::write(home.join("release"), "JAVA_VERSION=21").unwrap();

    assert!(marker_present(temp.path()));
    assert!(!marker_present(&temp.path().join("elsewhere")));
  }

  #[test]
  fn marker_probe_matches_every_bin_candidate() {
    // Each layout find_bin_dir can resolve must also satisfy the marker,
    // or a provisioned install would be re-downloaded on the next boot.
    let layouts = ["", "Contents/Home", "jdk-21.jdk", "jdk-21.jdk/Contents/Home"];
    for home in layouts {
      let temp = TempDir::new().unwrap();
      let root = temp.path().join(home);
      fs::create_dir_all(root.join("bin")).unwrap();
      fs::write(root.join("release"), "JAVA_VERSION=21").unwrap();
      fs::write(root.join("bin/java"), "").unwrap();

      assert!(marker_present(temp.path()), "marker missed layout {home:?}");
      assert_eq!(find_bin_dir(temp.path()), Some(root.join("bin")), "bin missed layout {home:?}");
    }
  }

  #[test]
  fn missing_java_yields_none() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("bin")).unwrap();
    assert_eq!(find_bin_dir(temp.path()), None);
  }
}
