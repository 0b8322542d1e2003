//! Native stage builder.
//!
//! Every native stage (the dependencies and the first package manager build)
//! goes through [`NativeStageBuilder::build`]: configure with CMake unless the
//! existing plan can be reused, then build with Ninja.

pub mod cache;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::BuildConfiguration;
use crate::exec::{ExecError, Invocation, ProcessRunner};

/// The stages of the bootstrap, in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
  /// The build execution engine.
  Llbuild,
  /// Cross-platform support library.
  ToolsSupportCore,
  /// YAML parser.
  Yams,
  /// Compiler driver library.
  Driver,
  /// The package manager, built with CMake.
  PackageManager,
}

impl Stage {
  pub const ALL: [Stage; 5] = [
    Stage::Llbuild,
    Stage::ToolsSupportCore,
    Stage::Yams,
    Stage::Driver,
    Stage::PackageManager,
  ];

  /// Stages built from sibling checkouts rather than the package itself.
  pub const DEPENDENCIES: [Stage; 4] = [Stage::Llbuild, Stage::ToolsSupportCore, Stage::Yams, Stage::Driver];

  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Llbuild => "llbuild",
      Stage::ToolsSupportCore => "swift-tools-support-core",
      Stage::Yams => "yams",
      Stage::Driver => "swift-driver",
      Stage::PackageManager => "swiftpm",
    }
  }

  /// Directory name under the target directory.
  pub fn build_dir_name(&self) -> &'static str {
    match self {
      Stage::Llbuild => "llbuild",
      Stage::ToolsSupportCore => "tsc",
      Stage::Yams => "yams",
      Stage::Driver => "swift-driver",
      Stage::PackageManager => "bootstrap",
    }
  }

  /// Sibling directory names accepted for the source checkout.
  pub fn checkout_names(&self) -> &'static [&'static str] {
    match self {
      Stage::Llbuild => &["llbuild", "swift-llbuild"],
      Stage::ToolsSupportCore => &["swift-tools-support-core"],
      Stage::Yams => &["yams", "Yams"],
      Stage::Driver => &["swift-driver"],
      Stage::PackageManager => &[],
    }
  }

  pub fn repository(&self) -> Option<&'static str> {
    match self {
      Stage::Llbuild => Some("https://github.com/swiftlang/swift-llbuild.git"),
      Stage::ToolsSupportCore => Some("https://github.com/swiftlang/swift-tools-support-core.git"),
      Stage::Yams => Some("https://github.com/jpsim/Yams.git"),
      Stage::Driver => Some("https://github.com/swiftlang/swift-driver.git"),
      Stage::PackageManager => None,
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Output of one completed stage. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
  pub build_dir: PathBuf,
  pub lib_dir: PathBuf,
  /// CMake package config directory (`<Name>_DIR` for later stages).
  pub modules_dir: PathBuf,
  pub bin_dir: PathBuf,
  /// Whether the generator ran for this stage in this run.
  pub reconfigured: bool,
}

impl StageResult {
  pub fn new(build_dir: &Path, reconfigured: bool) -> Self {
    Self {
      build_dir: build_dir.to_path_buf(),
      lib_dir: build_dir.join("lib"),
      modules_dir: build_dir.join("cmake").join("modules"),
      bin_dir: build_dir.join("bin"),
      reconfigured,
    }
  }

  /// A stage built outside this run (e.g. `--llbuild-build-dir`).
  pub fn prebuilt(build_dir: &Path) -> Self {
    Self::new(build_dir, false)
  }
}

#[derive(Debug, Error)]
pub enum StageError {
  /// The build generator exited unsuccessfully.
  #[error("configuring {stage} failed: {source}")]
  StageConfigureFailed {
    stage: Stage,
    #[source]
    source: ExecError,
  },

  /// The build executor exited unsuccessfully.
  #[error("building {stage} failed: {source}")]
  StageBuildFailed {
    stage: Stage,
    #[source]
    source: ExecError,
  },

  #[error("failed to create build directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// CMake + Ninja driver shared by all native stages.
pub struct NativeStageBuilder<'a, R> {
  config: &'a BuildConfiguration,
  runner: &'a R,
}

impl<'a, R: ProcessRunner> NativeStageBuilder<'a, R> {
  pub fn new(config: &'a BuildConfiguration, runner: &'a R) -> Self {
    Self { config, runner }
  }

  /// Configure (if needed) and build one stage.
  pub async fn build(
    &self,
    stage: Stage,
    source_dir: &Path,
    build_dir: &Path,
    extra_flags: &[String],
  ) -> Result<StageResult, StageError> {
    let compiler = &self.config.toolchain.swiftc;
    let reconfigure = cache::needs_reconfigure(build_dir, compiler, self.config.reconfigure).await;

    if reconfigure {
      let flags = self.configure_flags(source_dir, extra_flags);
      tokio::fs::create_dir_all(build_dir)
        .await
        .map_err(|source| StageError::CreateDir {
          path: build_dir.to_path_buf(),
          source,
        })?;

      info!(stage = %stage, build_dir = %build_dir.display(), "configuring");
      let invocation = self.tool_invocation(&self.config.toolchain.cmake, build_dir).args(flags);
      self
        .runner
        .run(&invocation)
        .await
        .map_err(|source| StageError::StageConfigureFailed { stage, source })?;
    } else {
      debug!(stage = %stage, build_dir = %build_dir.display(), "reusing configured build");
    }

    info!(stage = %stage, "building");
    let mut invocation = self.tool_invocation(&self.config.toolchain.ninja, build_dir);
    if self.config.verbose {
      invocation = invocation.arg("-v");
    }
    self
      .runner
      .run(&invocation)
      .await
      .map_err(|source| StageError::StageBuildFailed { stage, source })?;

    Ok(StageResult::new(build_dir, reconfigure))
  }

  /// Generator flags: the common toolchain selection, then `extra_flags`,
  /// then the source directory.
  pub fn configure_flags(&self, source_dir: &Path, extra_flags: &[String]) -> Vec<String> {
    let toolchain = &self.config.toolchain;
    let swift_flags = match &self.config.sysroot {
      Some(sysroot) => format!("-sdk {}", sysroot.display()),
      None => String::new(),
    };

    let mut flags = vec![
      "-G".to_string(),
      "Ninja".to_string(),
      format!("-DCMAKE_MAKE_PROGRAM={}", toolchain.ninja.display()),
      format!("-DCMAKE_BUILD_TYPE:={}", self.config.build_type()),
      format!("-DCMAKE_Swift_FLAGS={}", swift_flags),
      format!("-DCMAKE_Swift_COMPILER:={}", toolchain.swiftc.display()),
      format!("-DCMAKE_C_COMPILER:={}", toolchain.clang.display()),
    ];
    flags.extend(extra_flags.iter().cloned());
    flags.push(source_dir.display().to_string());
    flags
  }

  /// Build tools always run inside the build directory and stream their output.
  fn tool_invocation(&self, program: &Path, build_dir: &Path) -> Invocation {
    Invocation::new(program).current_dir(build_dir).inherit_output()
  }
}
