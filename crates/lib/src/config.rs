//! Build configuration.
//!
//! [`BuildOptions`] is what the user asked for; [`BuildConfiguration`] is the
//! resolved, immutable record every stage reads. Resolution checks that all
//! required paths exist so later stages never discover a missing input
//! half-way through the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DEFAULT_BUILD_DIR;
use crate::exec::ProcessRunner;
use crate::platform::Host;
use crate::stage::Stage;
use crate::toolchain::{self, TargetInfo, ToolOverrides, Toolchain, ToolchainError};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  /// A sibling source checkout required by a stage is absent.
  #[error("{name} checkout not found (looked for {searched})\n  {hint}")]
  MissingDependencySource { name: String, searched: String, hint: String },

  #[error("package directory {0} does not exist")]
  MissingPackage(PathBuf),

  #[error("{what} {path} does not exist")]
  MissingBuildDir { what: &'static str, path: PathBuf },

  #[error("failed to resolve {path}: {source}")]
  Path {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Unresolved options, usually straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
  pub package_dir: PathBuf,
  pub build_root: Option<PathBuf>,
  pub verbose: bool,
  pub reconfigure: bool,
  pub release: bool,
  pub tools: ToolOverrides,
  pub llbuild_build_dir: Option<PathBuf>,
  pub foundation_build_dir: Option<PathBuf>,
  pub dispatch_build_dir: Option<PathBuf>,
  pub llbuild_link_framework: bool,
  pub lib_install_dir: Option<PathBuf>,
  pub prefixes: Vec<PathBuf>,
}

/// Resolved configuration, constructed once per command.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
  pub host: Host,
  pub package_dir: PathBuf,
  pub build_root: PathBuf,
  /// `<build-root>/<triple>`
  pub target_dir: PathBuf,
  /// `<target-dir>/bootstrap`, where the package manager is built with CMake.
  pub bootstrap_dir: PathBuf,
  pub release: bool,
  pub verbose: bool,
  pub reconfigure: bool,
  pub toolchain: Toolchain,
  pub target: TargetInfo,
  pub sysroot: Option<PathBuf>,
  /// Source checkouts of the dependency stages that get built.
  pub sources: BTreeMap<Stage, PathBuf>,
  pub llbuild_build_dir: Option<PathBuf>,
  pub foundation_build_dir: Option<PathBuf>,
  pub dispatch_build_dir: Option<PathBuf>,
  pub llbuild_link_framework: bool,
  pub lib_install_dir: Option<PathBuf>,
  pub prefixes: Vec<PathBuf>,
}

impl BuildConfiguration {
  /// Resolve options into a configuration.
  ///
  /// Dependency checkouts are checked before any tool is run.
  pub async fn resolve<R: ProcessRunner>(options: &BuildOptions, host: Host, runner: &R) -> Result<Self, ConfigError> {
    let package_dir = package_dir(&options.package_dir)?;
    let build_root = build_root(&package_dir, options.build_root.as_deref())?;

    let llbuild_build_dir = existing_dir("llbuild build directory", options.llbuild_build_dir.as_deref())?;
    let foundation_build_dir = existing_dir("Foundation build directory", options.foundation_build_dir.as_deref())?;
    let dispatch_build_dir = existing_dir("Dispatch build directory", options.dispatch_build_dir.as_deref())?;

    let mut sources = BTreeMap::new();
    for stage in Stage::DEPENDENCIES {
      if stage == Stage::Llbuild && llbuild_build_dir.is_some() {
        continue;
      }
      sources.insert(stage, locate_checkout(stage, &package_dir)?);
    }

    let toolchain = Toolchain::resolve(&options.tools, &host, runner).await?;
    let target = toolchain::host_target(&toolchain.swiftc, &host, runner).await?;
    let sysroot = toolchain::sdk_root(&host, runner).await;

    let target_dir = build_root.join(target.triple());
    let bootstrap_dir = target_dir.join(Stage::PackageManager.build_dir_name());

    info!(
      host = %host,
      triple = target.triple(),
      build_root = %build_root.display(),
      "resolved build configuration"
    );

    Ok(Self {
      host,
      package_dir,
      build_root,
      target_dir,
      bootstrap_dir,
      release: options.release,
      verbose: options.verbose,
      reconfigure: options.reconfigure,
      toolchain,
      target,
      sysroot,
      sources,
      llbuild_build_dir,
      foundation_build_dir,
      dispatch_build_dir,
      llbuild_link_framework: options.llbuild_link_framework,
      lib_install_dir: absolute_opt(options.lib_install_dir.as_deref())?,
      prefixes: options
        .prefixes
        .iter()
        .map(|p| absolute(p))
        .collect::<Result<Vec<_>, _>>()?,
    })
  }

  /// Build directory of a stage.
  pub fn stage_build_dir(&self, stage: Stage) -> PathBuf {
    match (stage, &self.llbuild_build_dir) {
      (Stage::Llbuild, Some(prebuilt)) => prebuilt.clone(),
      (Stage::PackageManager, _) => self.bootstrap_dir.clone(),
      _ => self.target_dir.join(stage.build_dir_name()),
    }
  }

  /// Source directory of a stage, if it is built from source in this run.
  pub fn source_dir(&self, stage: Stage) -> Option<&Path> {
    match stage {
      Stage::PackageManager => Some(&self.package_dir),
      _ => self.sources.get(&stage).map(PathBuf::as_path),
    }
  }

  /// CMake build type.
  pub fn build_type(&self) -> &'static str {
    if self.release { "Release" } else { "Debug" }
  }

  /// Where the self-hosted build puts its products.
  pub fn products_dir(&self) -> PathBuf {
    self.target_dir.join(if self.release { "release" } else { "debug" })
  }

  /// Runtime libraries for package manifests, produced by the CMake build.
  pub fn manifest_libs_dir(&self) -> PathBuf {
    self.bootstrap_dir.join("pm")
  }
}

/// Build root for a package: the explicit path made absolute, or `<package>/.build`.
pub fn build_root(package_dir: &Path, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
  match explicit {
    Some(path) => absolute(path),
    None => Ok(package_dir.join(DEFAULT_BUILD_DIR)),
  }
}

/// Canonical package directory; it must exist.
pub fn package_dir(path: &Path) -> Result<PathBuf, ConfigError> {
  if !path.is_dir() {
    return Err(ConfigError::MissingPackage(path.to_path_buf()));
  }
  dunce::canonicalize(path).map_err(|source| ConfigError::Path {
    path: path.to_path_buf(),
    source,
  })
}

/// Find a stage's checkout next to the package directory.
fn locate_checkout(stage: Stage, package_dir: &Path) -> Result<PathBuf, ConfigError> {
  let parent = package_dir.parent().unwrap_or(package_dir);
  let candidates: Vec<PathBuf> = stage.checkout_names().iter().map(|name| parent.join(name)).collect();

  if let Some(found) = candidates.iter().find(|c| c.is_dir()) {
    debug!(stage = %stage, path = %found.display(), "found dependency checkout");
    return Ok(found.clone());
  }

  let searched = candidates
    .iter()
    .map(|c| c.display().to_string())
    .collect::<Vec<_>>()
    .join(", ");
  let hint = match stage.repository() {
    Some(url) if stage == Stage::Llbuild => format!(
      "clone it with `git clone {} {}` or pass --llbuild-build-dir with an existing build",
      url,
      candidates[0].display()
    ),
    Some(url) => format!("clone it with `git clone {} {}`", url, candidates[0].display()),
    None => String::new(),
  };

  Err(ConfigError::MissingDependencySource {
    name: stage.to_string(),
    searched,
    hint,
  })
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
  std::path::absolute(path).map_err(|source| ConfigError::Path {
    path: path.to_path_buf(),
    source,
  })
}

fn absolute_opt(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
  path.map(absolute).transpose()
}

fn existing_dir(what: &'static str, path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
  let Some(path) = absolute_opt(path)? else {
    return Ok(None);
  };
  if !path.is_dir() {
    return Err(ConfigError::MissingBuildDir { what, path });
  }
  Ok(Some(path))
}
