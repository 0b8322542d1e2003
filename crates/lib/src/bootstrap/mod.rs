//! Self-hosted bootstrap runner.
//!
//! Once the native stages are done, the CMake-built package manager rebuilds
//! (or tests, or installs) itself. Each pass gets a [`RuntimeEnvironment`]
//! and [`InvocationFlags`] that point it at the libraries of the earlier
//! stages.

pub mod env;
pub mod flags;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::BuildConfiguration;
use crate::exec::{ExecError, Invocation, ProcessRunner};
use crate::pipeline::StageResults;
use crate::stage::Stage;

pub use env::RuntimeEnvironment;
pub use flags::InvocationFlags;

/// Selects the integrated compiler driver inside the self-hosted tool.
pub const INTEGRATED_DRIVER_FLAG: &str = "--use-integrated-swift-driver";

#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error("no runtime library path of the form lib/swift/<platform> among: {paths}")]
  RuntimePathNotFound { paths: String },

  #[error("{0} has not been built yet")]
  StageMissing(Stage),

  #[error("self-hosted tool not found at {0}")]
  MissingBinary(PathBuf),

  #[error("self-hosted {action} failed: {source}")]
  SelfHostedFailed {
    action: SelfHostedAction,
    #[source]
    source: ExecError,
  },
}

/// What the self-hosted pass does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfHostedAction {
  Build,
  Test { parallel: bool, filters: Vec<String> },
  Install,
}

impl SelfHostedAction {
  /// Executable that performs the action.
  pub fn tool(&self) -> &'static str {
    match self {
      SelfHostedAction::Build | SelfHostedAction::Install => "swift-build",
      SelfHostedAction::Test { .. } => "swift-test",
    }
  }
}

impl std::fmt::Display for SelfHostedAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      SelfHostedAction::Build => "build",
      SelfHostedAction::Test { .. } => "test",
      SelfHostedAction::Install => "install",
    };
    write!(f, "{}", name)
  }
}

/// One self-hosted pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
  pub action: SelfHostedAction,
  /// Working directory: the package itself or another source tree.
  pub package_dir: PathBuf,
  pub integrated_driver: bool,
}

impl BootstrapRequest {
  pub fn build(package_dir: &Path) -> Self {
    Self::new(SelfHostedAction::Build, package_dir)
  }

  pub fn test(package_dir: &Path, parallel: bool, filters: Vec<String>) -> Self {
    Self::new(SelfHostedAction::Test { parallel, filters }, package_dir)
  }

  pub fn install(package_dir: &Path) -> Self {
    Self::new(SelfHostedAction::Install, package_dir)
  }

  fn new(action: SelfHostedAction, package_dir: &Path) -> Self {
    Self {
      action,
      package_dir: package_dir.to_path_buf(),
      integrated_driver: false,
    }
  }

  pub fn with_integrated_driver(mut self, integrated_driver: bool) -> Self {
    self.integrated_driver = integrated_driver;
    self
  }
}

/// Run the package-manager binary produced by the last native stage.
pub async fn bootstrap<R: ProcessRunner>(
  config: &BuildConfiguration,
  results: &StageResults,
  request: &BootstrapRequest,
  runner: &R,
) -> Result<(), BootstrapError> {
  let flags = InvocationFlags::assemble(config, results, request)?;
  let env = RuntimeEnvironment::assemble(config, results);

  let bin_dir = results
    .get(Stage::PackageManager)
    .map(|r| r.bin_dir.clone())
    .ok_or(BootstrapError::StageMissing(Stage::PackageManager))?;
  let program = bin_dir.join(config.host.exe_name(request.action.tool()));
  if !program.exists() {
    return Err(BootstrapError::MissingBinary(program));
  }

  info!(
    action = %request.action,
    integrated_driver = request.integrated_driver,
    package = %request.package_dir.display(),
    "running self-hosted package manager"
  );

  let invocation = Invocation::new(&program)
    .args(flags.into_vec())
    .current_dir(&request.package_dir)
    .envs(env.into_vars())
    .inherit_output();

  runner
    .run(&invocation)
    .await
    .map_err(|source| BootstrapError::SelfHostedFailed {
      action: request.action.clone(),
      source,
    })?;

  Ok(())
}
