//! Installing the self-hosted products into one or more prefixes.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::bootstrap::{self, BootstrapRequest};
use crate::config::BuildConfiguration;
use crate::consts::{DEFAULT_PREFIX, PACKAGE_MANAGER_TOOLS};
use crate::exec::ProcessRunner;
use crate::pipeline::{self, PipelineError, StageResults};
use crate::stage::Stage;

#[derive(Debug, Error)]
pub enum InstallError {
  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error("expected build product is missing: {0}")]
  InstallProductMissing(PathBuf),

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to traverse directory {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },
}

/// Files written by an install, in copy order.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
  pub files: Vec<PathBuf>,
}

/// Build everything with the install action, then copy the products.
pub async fn install<R: ProcessRunner>(config: &BuildConfiguration, runner: &R) -> Result<InstallReport, InstallError> {
  let results = pipeline::build_native_stages(config, runner).await?;
  bootstrap::bootstrap(config, &results, &BootstrapRequest::install(&config.package_dir), runner)
    .await
    .map_err(PipelineError::from)?;

  install_products(config, &results).await
}

/// Copy tools, manifest libraries and dependency libraries into every prefix.
pub async fn install_products(config: &BuildConfiguration, results: &StageResults) -> Result<InstallReport, InstallError> {
  let default_prefix = [PathBuf::from(DEFAULT_PREFIX)];
  let prefixes = if config.prefixes.is_empty() {
    &default_prefix[..]
  } else {
    &config.prefixes[..]
  };

  let mut report = InstallReport::default();
  for prefix in prefixes {
    info!(prefix = %prefix.display(), "installing");
    install_tools(config, prefix, &mut report).await?;
    copy_tree(&config.manifest_libs_dir(), &prefix.join("lib").join("swift").join("pm"), &mut report).await?;

    let lib_dir = config.lib_install_dir.clone().unwrap_or_else(|| prefix.join("lib"));
    install_dependency_libraries(config, results, &lib_dir, &mut report).await?;
  }

  Ok(report)
}

async fn install_tools(config: &BuildConfiguration, prefix: &Path, report: &mut InstallReport) -> Result<(), InstallError> {
  let products = config.products_dir();
  let bin_dir = prefix.join("bin");
  create_dir(&bin_dir).await?;

  for tool in PACKAGE_MANAGER_TOOLS {
    let name = config.host.exe_name(tool);
    let from = products.join(&name);
    if !from.is_file() {
      return Err(InstallError::InstallProductMissing(from));
    }
    copy_file(&from, &bin_dir.join(&name), report).await?;
  }
  Ok(())
}

async fn install_dependency_libraries(
  config: &BuildConfiguration,
  results: &StageResults,
  lib_dir: &Path,
  report: &mut InstallReport,
) -> Result<(), InstallError> {
  create_dir(lib_dir).await?;

  for stage in Stage::DEPENDENCIES {
    let Some(result) = results.get(stage) else {
      continue;
    };
    if !result.lib_dir.is_dir() {
      debug!(stage = %stage, "no libraries to install");
      continue;
    }
    for entry in WalkDir::new(&result.lib_dir).min_depth(1).max_depth(1).sort_by_file_name() {
      let entry = entry.map_err(|source| InstallError::Walk {
        path: result.lib_dir.clone(),
        source,
      })?;
      let name = entry.file_name().to_string_lossy();
      if entry.file_type().is_file() && config.host.is_dylib(&name) {
        copy_file(entry.path(), &lib_dir.join(entry.file_name()), report).await?;
      }
    }
  }
  Ok(())
}

/// Recursively copy `from` into `to`, creating directories as needed.
async fn copy_tree(from: &Path, to: &Path, report: &mut InstallReport) -> Result<(), InstallError> {
  if !from.is_dir() {
    return Err(InstallError::InstallProductMissing(from.to_path_buf()));
  }

  for entry in WalkDir::new(from).sort_by_file_name() {
    let entry = entry.map_err(|source| InstallError::Walk {
      path: from.to_path_buf(),
      source,
    })?;
    let Ok(relative) = entry.path().strip_prefix(from) else {
      continue;
    };
    let dest = to.join(relative);
    if entry.file_type().is_dir() {
      create_dir(&dest).await?;
    } else {
      copy_file(entry.path(), &dest, report).await?;
    }
  }
  Ok(())
}

async fn copy_file(from: &Path, to: &Path, report: &mut InstallReport) -> Result<(), InstallError> {
  fs::copy(from, to).await.map_err(|source| InstallError::Copy {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  })?;
  debug!(from = %from.display(), to = %to.display(), "installed");
  report.files.push(to.to_path_buf());
  Ok(())
}

async fn create_dir(path: &Path) -> Result<(), InstallError> {
  fs::create_dir_all(path).await.map_err(|source| InstallError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}
