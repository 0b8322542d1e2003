//! Command-line flags for self-hosted invocations.

use crate::config::BuildConfiguration;
use crate::pipeline::StageResults;
use crate::stage::Stage;

use super::{BootstrapError, BootstrapRequest, INTEGRATED_DRIVER_FLAG, SelfHostedAction};

/// Ordered flag list passed to `swift-build` / `swift-test`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationFlags {
  flags: Vec<String>,
}

impl InvocationFlags {
  pub fn assemble(
    config: &BuildConfiguration,
    results: &StageResults,
    request: &BootstrapRequest,
  ) -> Result<Self, BootstrapError> {
    let host = &config.host;
    let mut flags = Self::default();

    flags.push(["--build-path".to_string(), config.build_root.display().to_string()]);
    if config.release {
      flags.push(["--configuration", "release"]);
    }
    if config.verbose {
      flags.push(["--verbose"]);
    }

    if config.llbuild_link_framework {
      let llbuild = results
        .get(Stage::Llbuild)
        .map(|r| r.build_dir.display().to_string())
        .ok_or(BootstrapError::StageMissing(Stage::Llbuild))?;
      flags.push(["-Xswiftc", "-F", "-Xswiftc", llbuild.as_str()]);
      flags.push(["-Xlinker", "-F", "-Xlinker", llbuild.as_str()]);
      // Xcode layout.
      flags.push_rpath("@executable_path/../../../../../SharedFrameworks");
      // Command line tools layout.
      flags.push_rpath("@executable_path/../lib/swift/pm/llbuild");
    }

    // Windows has no rpath: the loader only searches PATH, so there is no
    // runtime rpath to add and no runtime library path to require.
    if !host.rpath_origin.is_empty() {
      let platform = config
        .target
        .runtime_platform()
        .ok_or_else(|| BootstrapError::RuntimePathNotFound {
          paths: config
            .target
            .runtime_library_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        })?;
      flags.push_rpath(&format!("{}/../lib/swift/{}", host.rpath_origin, platform));
    }

    if host.android {
      flags.push(["-Xswiftc", "-Xcc", "-Xswiftc", "-U_GNU_SOURCE"]);
    }

    if matches!(request.action, SelfHostedAction::Install) && !host.is_darwin() {
      flags.push(["--disable-local-rpath"]);
    }

    if let SelfHostedAction::Test { parallel, filters } = &request.action {
      if *parallel {
        flags.push(["--parallel"]);
      }
      for filter in filters {
        flags.push(["--filter", filter.as_str()]);
      }
    }

    if request.integrated_driver {
      flags.push([INTEGRATED_DRIVER_FLAG]);
    }

    Ok(flags)
  }

  fn push<I, S>(&mut self, flags: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.flags.extend(flags.into_iter().map(Into::into));
  }

  fn push_rpath(&mut self, rpath: &str) {
    self.push(["-Xlinker", "-rpath", "-Xlinker", rpath]);
  }

  pub fn as_slice(&self) -> &[String] {
    &self.flags
  }

  pub fn contains(&self, flag: &str) -> bool {
    self.flags.iter().any(|f| f == flag)
  }

  /// Value following `flag`, if present.
  pub fn value_of(&self, flag: &str) -> Option<&str> {
    self
      .flags
      .windows(2)
      .find(|pair| pair[0] == flag)
      .map(|pair| pair[1].as_str())
  }

  pub fn into_vec(self) -> Vec<String> {
    self.flags
  }
}
