//! Per-stage generator flags.
//!
//! Later stages find earlier ones through CMake package config directories
//! (`-D<Package>_DIR=<build>/cmake/modules`).

use std::path::Path;

use crate::config::BuildConfiguration;
use crate::stage::Stage;
use crate::toolchain::target::MACOS_DEPLOYMENT_TARGET;

use super::{PipelineError, StageResults};

/// Extra generator flags for `stage`, given everything built before it.
pub fn stage_flags(stage: Stage, config: &BuildConfiguration, prior: &StageResults) -> Result<Vec<String>, PipelineError> {
  let mut flags = Vec::new();

  match stage {
    Stage::Llbuild => {
      flags.push("-DLLBUILD_SUPPORT_BINDINGS:=Swift".to_string());
      if config.host.is_darwin() {
        let target = darwin_target(config);
        flags.push(format!("-DCMAKE_C_FLAGS={}", target));
        flags.push(format!("-DCMAKE_CXX_FLAGS={}", target));
        flags.push(format!("-DCMAKE_OSX_DEPLOYMENT_TARGET={}", MACOS_DEPLOYMENT_TARGET));
      }
      if let Some(sysroot) = &config.sysroot {
        flags.push(format!("-DSQLite3_INCLUDE_DIR={}", sysroot.join("usr").join("include").display()));
      }
    }
    Stage::ToolsSupportCore => {}
    Stage::Yams => {
      if config.host.is_darwin() {
        flags.push(format!("-DCMAKE_C_FLAGS={}", darwin_target(config)));
      } else {
        if let Some(foundation) = &config.foundation_build_dir {
          flags.push(package_dir_flag("Foundation", foundation));
        }
        if let Some(dispatch) = &config.dispatch_build_dir {
          flags.push(package_dir_flag("dispatch", dispatch));
        }
      }
    }
    Stage::Driver => {
      flags.push(dependency_flag("LLBuild", prior, Stage::Llbuild)?);
      flags.push(dependency_flag("TSC", prior, Stage::ToolsSupportCore)?);
    }
    Stage::PackageManager => {
      flags.push(dependency_flag("LLBuild", prior, Stage::Llbuild)?);
      flags.push(dependency_flag("TSC", prior, Stage::ToolsSupportCore)?);
      flags.push(dependency_flag("Yams", prior, Stage::Yams)?);
      flags.push(dependency_flag("SwiftDriver", prior, Stage::Driver)?);
      flags.push("-DUSE_CMAKE_INSTALL:BOOL=FALSE".to_string());
      flags.push("-DFIND_PM_DEPS:BOOL=YES".to_string());
    }
  }

  Ok(flags)
}

fn darwin_target(config: &BuildConfiguration) -> String {
  format!("-target {}{}", config.target.triple(), MACOS_DEPLOYMENT_TARGET)
}

fn dependency_flag(package: &str, prior: &StageResults, stage: Stage) -> Result<String, PipelineError> {
  Ok(format!("-D{}_DIR={}", package, prior.require(stage)?.modules_dir.display()))
}

fn package_dir_flag(package: &str, build_dir: &Path) -> String {
  format!("-D{}_DIR={}", package, build_dir.join("cmake").join("modules").display())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  use crate::config::tests::linux_config;
  use crate::platform::{Host, arch::Arch, os::Os};
  use crate::stage::StageResult;
  use crate::toolchain::TargetInfo;
  use tempfile::TempDir;

  fn all_dependencies(config: &BuildConfiguration) -> StageResults {
    let mut prior = StageResults::new();
    for stage in Stage::DEPENDENCIES {
      prior.push(stage, StageResult::new(&config.stage_build_dir(stage), true));
    }
    prior
  }

  fn darwin(config: &mut BuildConfiguration) {
    config.host = Host::for_os(Os::MacOs, Some(Arch::Aarch64), false);
    config.target = TargetInfo::new("arm64-apple-macosx", vec![PathBuf::from("/tc/usr/lib/swift/macosx")]);
    config.sysroot = Some(PathBuf::from("/SDKs/MacOSX.sdk"));
  }

  #[test]
  fn llbuild_on_linux_only_selects_swift_bindings() {
    let temp = TempDir::new().unwrap();
    let config = linux_config(temp.path());

    let flags = stage_flags(Stage::Llbuild, &config, &StageResults::new()).unwrap();
    assert_eq!(flags, vec!["-DLLBUILD_SUPPORT_BINDINGS:=Swift"]);
  }

  #[test]
  fn llbuild_on_darwin_targets_deployment_version_and_sdk_sqlite() {
    let temp = TempDir::new().unwrap();
    let mut config = linux_config(temp.path());
    darwin(&mut config);

    let flags = stage_flags(Stage::Llbuild, &config, &StageResults::new()).unwrap();
    assert!(flags.contains(&"-DCMAKE_C_FLAGS=-target arm64-apple-macosx10.15".to_string()));
    assert!(flags.contains(&"-DCMAKE_CXX_FLAGS=-target arm64-apple-macosx10.15".to_string()));
    assert!(flags.contains(&"-DSQLite3_INCLUDE_DIR=/SDKs/MacOSX.sdk/usr/include".to_string()));
  }

  #[test]
  fn yams_on_linux_uses_supplied_runtime_builds() {
    let temp = TempDir::new().unwrap();
    let mut config = linux_config(temp.path());
    config.foundation_build_dir = Some(PathBuf::from("/b/foundation"));
    config.dispatch_build_dir = Some(PathBuf::from("/b/dispatch"));

    let flags = stage_flags(Stage::Yams, &config, &StageResults::new()).unwrap();
    assert_eq!(
      flags,
      vec![
        "-DFoundation_DIR=/b/foundation/cmake/modules",
        "-Ddispatch_DIR=/b/dispatch/cmake/modules",
      ]
    );
  }

  #[test]
  fn yams_on_linux_without_runtime_builds_has_no_flags() {
    let temp = TempDir::new().unwrap();
    let config = linux_config(temp.path());

    assert!(stage_flags(Stage::Yams, &config, &StageResults::new()).unwrap().is_empty());
  }

  #[test]
  fn yams_on_darwin_ignores_runtime_builds() {
    let temp = TempDir::new().unwrap();
    let mut config = linux_config(temp.path());
    darwin(&mut config);
    config.foundation_build_dir = Some(PathBuf::from("/b/foundation"));

    let flags = stage_flags(Stage::Yams, &config, &StageResults::new()).unwrap();
    assert_eq!(flags, vec!["-DCMAKE_C_FLAGS=-target arm64-apple-macosx10.15"]);
  }

  #[test]
  fn driver_points_at_llbuild_and_tsc() {
    let temp = TempDir::new().unwrap();
    let config = linux_config(temp.path());
    let prior = all_dependencies(&config);

    let flags = stage_flags(Stage::Driver, &config, &prior).unwrap();
    let llbuild = config.target_dir.join("llbuild").join("cmake").join("modules");
    assert_eq!(flags[0], format!("-DLLBuild_DIR={}", llbuild.display()));
    assert!(flags[1].starts_with("-DTSC_DIR="));
    assert!(flags[1].ends_with("tsc/cmake/modules"));
  }

  #[test]
  fn package_manager_points_at_every_dependency() {
    let temp = TempDir::new().unwrap();
    let config = linux_config(temp.path());
    let prior = all_dependencies(&config);

    let flags = stage_flags(Stage::PackageManager, &config, &prior).unwrap();
    let names: Vec<&str> = flags.iter().filter_map(|f| f.split('=').next()).collect();
    assert_eq!(
      names,
      vec![
        "-DLLBuild_DIR",
        "-DTSC_DIR",
        "-DYams_DIR",
        "-DSwiftDriver_DIR",
        "-DUSE_CMAKE_INSTALL:BOOL",
        "-DFIND_PM_DEPS:BOOL",
      ]
    );
  }

  #[test]
  fn later_stage_without_prior_output_is_an_error() {
    let temp = TempDir::new().unwrap();
    let config = linux_config(temp.path());

    let err = stage_flags(Stage::Driver, &config, &StageResults::new()).unwrap_err();
    assert!(matches!(err, PipelineError::StageNotBuilt(Stage::Llbuild)));
  }
}
