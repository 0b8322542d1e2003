//! Target information reported by `swiftc -print-target-info`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::platform::Host;

/// Matches the `lib/swift/<platform>` tail of a runtime library path.
static RUNTIME_PLATFORM_DIR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:^|/)lib/swift/([^/]+)/?$").expect("runtime platform pattern is valid"));

/// Deployment target used for Darwin builds.
pub const MACOS_DEPLOYMENT_TARGET: &str = "10.15";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
  pub target: Target,
  #[serde(default)]
  pub paths: TargetPaths,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
  pub unversioned_triple: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPaths {
  #[serde(default)]
  pub runtime_library_paths: Vec<PathBuf>,
}

impl TargetInfo {
  pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  pub fn new(triple: impl Into<String>, runtime_library_paths: Vec<PathBuf>) -> Self {
    Self {
      target: Target {
        unversioned_triple: triple.into(),
      },
      paths: TargetPaths { runtime_library_paths },
    }
  }

  /// Unversioned triple, e.g. `x86_64-unknown-linux-gnu`.
  pub fn triple(&self) -> &str {
    &self.target.unversioned_triple
  }

  pub fn runtime_library_paths(&self) -> &[PathBuf] {
    &self.paths.runtime_library_paths
  }

  /// Target info assumed on Darwin when the compiler cannot be queried.
  ///
  /// The runtime lives next to the compiler in every toolchain layout:
  /// `<toolchain>/usr/bin/swiftc` → `<toolchain>/usr/lib/swift/macosx`.
  pub fn darwin_fallback(host: &Host, swiftc: &Path) -> Self {
    let arch = host.arch.map(|a| a.apple_name()).unwrap_or("x86_64");
    let runtime = swiftc
      .parent()
      .and_then(Path::parent)
      .map(|usr| usr.join("lib").join("swift").join("macosx"))
      .into_iter()
      .collect();
    Self::new(format!("{}-apple-macosx", arch), runtime)
  }

  /// Platform component of the first runtime library path ending in
  /// `lib/swift/<platform>`.
  pub fn runtime_platform(&self) -> Option<String> {
    self.runtime_library_paths().iter().find_map(|path| {
      let normalized = path.to_string_lossy().replace('\\', "/");
      RUNTIME_PLATFORM_DIR
        .captures(&normalized)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    })
  }
}
