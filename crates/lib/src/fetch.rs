//! HTTP downloads and tarball extraction.
//!
//! Both the source fetcher and the toolchain provisioner move gzipped
//! tarballs from an upstream endpoint onto disk. The download half streams
//! the response body to a file; the extraction half unpacks with the safety
//! rules every caller needs (path-traversal rejection, mode preservation)
//! and lets each caller decide whether a failed symlink is fatal.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use futures_util::StreamExt;
use tar::{Archive, EntryType};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Errors from downloading or unpacking an archive.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The HTTP request itself failed.
  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The endpoint answered with a non-success status.
  #[error("unexpected status {status}")]
  Status { status: reqwest::StatusCode },

  /// Disk I/O failed.
  #[error("io error: {0}")]
  Io(#[from] io::Error),

  /// An archive member would escape the destination directory.
  #[error("archive entry escapes destination: {0}")]
  Traversal(PathBuf),
}

/// Stream the response to `request` into the file at `dest`.
///
/// Parent directories are created as needed. Cancellation drops the stream
/// mid-flight; the partially written file is the caller's to clean up (see
/// [`ScratchDir`]).
pub async fn download(request: reqwest::RequestBuilder, dest: &Path) -> Result<(), FetchError> {
  let response = request.send().await?;
  let status = response.status();
  if !status.is_success() {
    return Err(FetchError::Status { status });
  }

  if let Some(parent) = dest.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }

  let mut file = tokio::fs::File::create(dest).await?;
  let mut stream = response.bytes_stream();
  while let Some(chunk) = stream.next().await {
    file.write_all(&chunk?).await?;
  }
  file.flush().await?;

  debug!(path = %dest.display(), "download complete");
  Ok(())
}

/// Unpack a gzipped tarball into `dest`.
///
/// With `strip_root` set, the single top-level directory the archive wraps
/// its content in (GitHub tarballs, Node dist tarballs) is detected from the
/// first entry and stripped; entries outside that prefix keep their full
/// name. Every resulting path is checked against `dest` before anything is
/// written, so a member named `../x` fails with [`FetchError::Traversal`].
///
/// File modes come from the tar headers; pax/global headers are ignored.
/// With `skip_failed_symlinks` set, a symlink that cannot be created is
/// logged and skipped (toolchain archives carry links the cache can live
/// without); otherwise the failure is fatal and a repository checkout never
/// silently drops an entry.
pub fn unpack_tar_gz(
  tarball: &Path,
  dest: &Path,
  strip_root: bool,
  skip_failed_symlinks: bool,
) -> Result<(), FetchError> {
  let file = File::open(tarball)?;
  let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
  fs::create_dir_all(dest)?;

  let mut root_prefix: Option<PathBuf> = None;
  for entry in archive.entries()? {
    let mut entry = entry?;
    let kind = entry.header().entry_type();
    if !matches!(kind, EntryType::Directory | EntryType::Regular | EntryType::Symlink) {
      continue;
    }

    let path = entry.path()?.into_owned();
    let rel = if strip_root {
      strip_archive_root(&mut root_prefix, &path)
    } else {
      path.clone()
    };
    if rel.as_os_str().is_empty() {
      continue;
    }
    ensure_within_dest(&rel).map_err(|_| FetchError::Traversal(path.clone()))?;

    let target = dest.join(&rel);
    match kind {
      EntryType::Directory => {
        fs::create_dir_all(&target)?;
      }
      EntryType::Regular => {
        if let Some(parent) = target.parent() {
          fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
      }
      EntryType::Symlink => {
        if let Some(parent) = target.parent() {
          fs::create_dir_all(parent)?;
        }
        let _ = fs::remove_file(&target);
        match entry.unpack(&target) {
          Ok(_) => {}
          Err(err) if skip_failed_symlinks => {
            debug!(target = %target.display(), error = %err, "skipping symlink");
          }
          Err(err) => return Err(err.into()),
        }
      }
      _ => {}
    }
  }

  Ok(())
}

/// Strip the archive's top-level directory from `path`.
///
/// The first entry with a normal leading component defines the prefix;
/// entries that do not share it keep their full name and are left for the
/// traversal check.
fn strip_archive_root(root_prefix: &mut Option<PathBuf>, path: &Path) -> PathBuf {
  if root_prefix.is_none() {
    if let Some(Component::Normal(first)) = path.components().next() {
      *root_prefix = Some(PathBuf::from(first));
    }
  }
  match root_prefix {
    Some(root) => match path.strip_prefix(&*root) {
      Ok(rest) => rest.to_path_buf(),
      Err(_) => path.to_path_buf(),
    },
    None => path.to_path_buf(),
  }
}

/// Reject relative paths that would resolve outside the destination.
fn ensure_within_dest(rel: &Path) -> Result<(), ()> {
  for component in rel.components() {
    match component {
      Component::Normal(_) | Component::CurDir => {}
      Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Err(()),
    }
  }
  Ok(())
}

/// A directory that is deleted on drop unless the caller disarms it.
///
/// Used for the `<installDir>.tmp` extraction trees: any failure (or
/// cancellation) between creation and the final rename unwinds the partial
/// state instead of leaving it for the next run to trip over.
pub(crate) struct ScratchDir {
  path: PathBuf,
  armed: bool,
}

impl ScratchDir {
  /// Create the directory, replacing any stale tree at the same path.
  pub(crate) fn create(path: PathBuf) -> io::Result<Self> {
    if path.exists() {
      fs::remove_dir_all(&path)?;
    }
    fs::create_dir_all(&path)?;
    Ok(Self { path, armed: true })
  }

  pub(crate) fn path(&self) -> &Path {
    &self.path
  }

  /// Keep the directory (it has been renamed away or promoted).
  pub(crate) fn disarm(mut self) {
    self.armed = false;
  }
}

impl Drop for ScratchDir {
  fn drop(&mut self) {
    if self.armed {
      let _ = fs::remove_dir_all(&self.path);
    }
  }
}
