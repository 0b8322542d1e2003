//! Removing the build root.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::info;

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Delete the build root and everything under it.
///
/// Returns `false` when there was nothing to remove.
pub async fn clean(build_root: &Path) -> Result<bool, CleanError> {
  match fs::remove_dir_all(build_root).await {
    Ok(()) => {
      info!(path = %build_root.display(), "removed build directory");
      Ok(true)
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      info!(path = %build_root.display(), "build directory already gone");
      Ok(false)
    }
    Err(source) => Err(CleanError::Remove {
      path: build_root.to_path_buf(),
      source,
    }),
  }
}
