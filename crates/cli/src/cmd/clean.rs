use std::path::Path;

use anyhow::{Context, Result};

use pmboot_lib::clean::clean;
use pmboot_lib::config;

use crate::output::{print_info, print_success};

/// Remove the build root. Needs no toolchain.
pub fn cmd_clean(package_path: &Path, build_path: Option<&Path>) -> Result<()> {
  let package_dir = config::package_dir(package_path)?;
  let build_root = config::build_root(&package_dir, build_path)?;

  let rt = super::runtime()?;
  let removed = rt.block_on(clean(&build_root)).context("Clean failed")?;

  let shown = dunce::simplified(&build_root).display().to_string();
  if removed {
    print_success(&format!("Removed {}", shown));
  } else {
    print_info(&format!("Nothing to clean at {}", shown));
  }
  Ok(())
}
