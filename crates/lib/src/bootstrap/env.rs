//! Environment for self-hosted invocations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::BuildConfiguration;
use crate::exec::join_paths;
use crate::pipeline::StageResults;
use crate::platform::os::Os;
use crate::toolchain::target::MACOS_DEPLOYMENT_TARGET;

pub const SWIFT_EXEC: &str = "SWIFT_EXEC";
pub const SWIFT_DRIVER_SWIFT_EXEC: &str = "SWIFT_DRIVER_SWIFT_EXEC";
pub const SWIFTPM_PD_LIBS: &str = "SWIFTPM_PD_LIBS";
pub const SWIFTPM_LLBUILD_FWK: &str = "SWIFTPM_LLBUILD_FWK";
pub const SWIFTCI_USE_LOCAL_DEPS: &str = "SWIFTCI_USE_LOCAL_DEPS";
pub const SWIFTPM_MACOS_DEPLOYMENT_TARGET: &str = "SWIFTPM_MACOS_DEPLOYMENT_TARGET";

/// Variables layered on top of the inherited environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnvironment {
  vars: BTreeMap<String, String>,
}

impl RuntimeEnvironment {
  /// Assemble the environment from the configuration and completed stages.
  pub fn assemble(config: &BuildConfiguration, results: &StageResults) -> Self {
    let host = &config.host;
    let swiftc = config.toolchain.swiftc.display().to_string();
    let mut env = Self::default();

    let mut library_path = join_paths(&library_search_path(config, results), host.path_list_separator);
    // On Windows this is also the executable search path.
    if host.os == Os::Windows
      && let Some(inherited) = std::env::var_os(host.library_path_var)
    {
      library_path.push(host.path_list_separator);
      library_path.push_str(&inherited.to_string_lossy());
    }
    env.set(host.library_path_var, library_path);
    env.set(SWIFT_EXEC, swiftc.clone());
    env.set(SWIFT_DRIVER_SWIFT_EXEC, swiftc);
    env.set(SWIFTPM_PD_LIBS, config.manifest_libs_dir().display().to_string());
    env.set(SWIFTCI_USE_LOCAL_DEPS, "1");
    if config.llbuild_link_framework {
      env.set(SWIFTPM_LLBUILD_FWK, "1");
    }
    if host.is_darwin() {
      env.set(SWIFTPM_MACOS_DEPLOYMENT_TARGET, MACOS_DEPLOYMENT_TARGET);
    }

    env
  }

  fn set(&mut self, name: &str, value: impl Into<String>) {
    self.vars.insert(name.to_string(), value.into());
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.vars.get(name).map(String::as_str)
  }

  pub fn into_vars(self) -> BTreeMap<String, String> {
    self.vars
  }
}

/// Library directories of every completed stage (earliest first), then the
/// externally built Foundation and Dispatch.
pub fn library_search_path(config: &BuildConfiguration, results: &StageResults) -> Vec<PathBuf> {
  let mut dirs = results.library_dirs();
  for external in [&config.foundation_build_dir, &config.dispatch_build_dir].into_iter().flatten() {
    dirs.push(external.join("lib"));
  }
  dirs
}
