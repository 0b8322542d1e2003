//! Dependency graph driver.
//!
//! Runs the native stages in their fixed order, feeding each stage the
//! results of every stage before it, and then hands over to the self-hosted
//! runner. The first failure ends the run; build directories of completed
//! stages stay on disk and are reused by the next run.

pub mod flags;

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::bootstrap::{self, BootstrapError, BootstrapRequest};
use crate::config::BuildConfiguration;
use crate::exec::{ExecError, Invocation, ProcessRunner};
use crate::stage::{NativeStageBuilder, Stage, StageError, StageResult};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Stage(#[from] StageError),

  #[error(transparent)]
  Bootstrap(#[from] BootstrapError),

  /// A stage asked for the output of a stage that has not run.
  #[error("{0} has not been built yet")]
  StageNotBuilt(Stage),

  #[error("no source checkout configured for {0}")]
  NoSource(Stage),

  #[error("failed to add rpath {rpath} to {binary}: {source}")]
  RpathPatchFailed {
    binary: PathBuf,
    rpath: PathBuf,
    #[source]
    source: ExecError,
  },
}

/// Completed stages, in the order they finished. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct StageResults {
  entries: Vec<(Stage, StageResult)>,
}

impl StageResults {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, stage: Stage, result: StageResult) {
    self.entries.push((stage, result));
  }

  pub fn get(&self, stage: Stage) -> Option<&StageResult> {
    self.entries.iter().find(|(s, _)| *s == stage).map(|(_, r)| r)
  }

  pub fn require(&self, stage: Stage) -> Result<&StageResult, PipelineError> {
    self.get(stage).ok_or(PipelineError::StageNotBuilt(stage))
  }

  pub fn stages(&self) -> Vec<Stage> {
    self.entries.iter().map(|(s, _)| *s).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = &(Stage, StageResult)> {
    self.entries.iter()
  }

  /// Library directories of all stages, earliest stage first.
  pub fn library_dirs(&self) -> Vec<PathBuf> {
    self.entries.iter().map(|(_, r)| r.lib_dir.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Options for the `test` command.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
  pub parallel: bool,
  pub filters: Vec<String>,
  /// Test a different source tree than the package itself.
  pub package_dir: Option<PathBuf>,
}

/// Build every native stage, in order.
pub async fn build_native_stages<R: ProcessRunner>(
  config: &BuildConfiguration,
  runner: &R,
) -> Result<StageResults, PipelineError> {
  let builder = NativeStageBuilder::new(config, runner);
  let mut results = StageResults::new();

  for stage in Stage::ALL {
    let start = Instant::now();
    let result = build_stage(stage, config, &builder, &results).await?;
    info!(
      stage = %stage,
      reconfigured = result.reconfigured,
      elapsed_ms = start.elapsed().as_millis() as u64,
      "stage complete"
    );
    results.push(stage, result);
  }

  if config.host.is_darwin() {
    add_dependency_rpaths(config, &results, runner).await?;
  }

  Ok(results)
}

async fn build_stage<R: ProcessRunner>(
  stage: Stage,
  config: &BuildConfiguration,
  builder: &NativeStageBuilder<'_, R>,
  prior: &StageResults,
) -> Result<StageResult, PipelineError> {
  if let (Stage::Llbuild, Some(prebuilt)) = (stage, &config.llbuild_build_dir) {
    info!(stage = %stage, build_dir = %prebuilt.display(), "using prebuilt stage");
    return Ok(StageResult::prebuilt(prebuilt));
  }

  let extra_flags = flags::stage_flags(stage, config, prior)?;
  let source_dir = config.source_dir(stage).ok_or(PipelineError::NoSource(stage))?;
  let build_dir = config.stage_build_dir(stage);

  Ok(builder.build(stage, source_dir, &build_dir, &extra_flags).await?)
}

/// Let the CMake-built `swift-build` find the dependency libraries (Darwin).
async fn add_dependency_rpaths<R: ProcessRunner>(
  config: &BuildConfiguration,
  results: &StageResults,
  runner: &R,
) -> Result<(), PipelineError> {
  let Some(install_name_tool) = &config.toolchain.install_name_tool else {
    return Ok(());
  };
  let binary = results
    .require(Stage::PackageManager)?
    .bin_dir
    .join(config.host.exe_name("swift-build"));

  for stage in [Stage::Llbuild, Stage::Yams, Stage::Driver] {
    let rpath = results.require(stage)?.lib_dir.clone();
    let invocation = Invocation::new(install_name_tool).args([
      "-add_rpath".to_string(),
      rpath.display().to_string(),
      binary.display().to_string(),
    ]);

    match runner.run(&invocation).await {
      Ok(_) => debug!(rpath = %rpath.display(), "added rpath"),
      Err(e) if e.stderr().contains("would duplicate path") => {
        debug!(rpath = %rpath.display(), "rpath already present")
      }
      Err(source) => return Err(PipelineError::RpathPatchFailed { binary, rpath, source }),
    }
  }

  Ok(())
}

/// Native stages followed by the self-hosted build.
pub async fn build<R: ProcessRunner>(config: &BuildConfiguration, runner: &R) -> Result<StageResults, PipelineError> {
  let results = build_native_stages(config, runner).await?;
  bootstrap::bootstrap(config, &results, &BootstrapRequest::build(&config.package_dir), runner).await?;
  Ok(results)
}

/// Run the whole self-hosted cycle twice, once on the default driver path and
/// once with the integrated driver: build the package manager with itself,
/// then run the test suite with the tools it just built.
pub async fn test<R: ProcessRunner>(
  config: &BuildConfiguration,
  options: &TestOptions,
  runner: &R,
) -> Result<StageResults, PipelineError> {
  let results = build_native_stages(config, runner).await?;
  let package_dir = options.package_dir.as_deref().unwrap_or(&config.package_dir);

  for integrated_driver in [false, true] {
    let build = BootstrapRequest::build(&config.package_dir).with_integrated_driver(integrated_driver);
    bootstrap::bootstrap(config, &results, &build, runner).await?;

    let test = BootstrapRequest::test(package_dir, options.parallel, options.filters.clone())
      .with_integrated_driver(integrated_driver);
    bootstrap::bootstrap(config, &results, &test, runner).await?;
  }

  Ok(results)
}
