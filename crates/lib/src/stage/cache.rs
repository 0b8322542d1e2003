//! Reconfiguration detection.
//!
//! A stage reuses its generated build plan when the CMake cache already
//! mentions the compiler being used. The check is a plain substring match on
//! the cache contents: a different compiler path invalidates the plan, other
//! flag changes do not.

use std::path::{Path, PathBuf};

use tracing::debug;

pub const CACHE_FILE: &str = "CMakeCache.txt";

pub fn cache_path(build_dir: &Path) -> PathBuf {
  build_dir.join(CACHE_FILE)
}

/// Decide whether the generator has to run again for `build_dir`.
pub async fn needs_reconfigure(build_dir: &Path, compiler: &Path, force: bool) -> bool {
  if force {
    debug!(build_dir = %build_dir.display(), "reconfiguration forced");
    return true;
  }

  let cache = cache_path(build_dir);
  let contents = match tokio::fs::read_to_string(&cache).await {
    Ok(contents) => contents,
    Err(e) => {
      debug!(cache = %cache.display(), error = %e, "no usable cmake cache");
      return true;
    }
  };

  let compiler = compiler.to_string_lossy();
  let stale = !contents.contains(compiler.as_ref());
  if stale {
    debug!(cache = %cache.display(), compiler = %compiler, "cmake cache was generated for another compiler");
  }
  stale
}
