//! Toolchain location.
//!
//! Resolves the external executables the bootstrap needs and asks the
//! compiler which target it produces code for.
//!
//! Resolution order for every tool:
//! 1. an explicit path from the command line, made absolute
//! 2. a tool-specific environment variable (`SWIFT_EXEC`, `CC`); a bare command
//!    name there is looked up on the search path
//! 3. discovery: `xcrun --find` on Darwin, the executable search path elsewhere
//!
//! The result must exist on disk; anything else is [`ToolchainError::ToolNotFound`].

pub mod target;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::exec::{Invocation, ProcessRunner};
use crate::platform::{Host, ToolDiscovery};

pub use target::TargetInfo;

#[derive(Debug, Error)]
pub enum ToolchainError {
  /// A required executable could not be located.
  #[error("unable to find {tool} at {location}")]
  ToolNotFound { tool: String, location: String },

  /// `swiftc -print-target-info` failed or printed something unparsable.
  #[error("failed to query target info from {compiler}: {reason}")]
  ToolchainQueryFailed { compiler: PathBuf, reason: String },

  #[error("failed to make {path} absolute: {source}")]
  Absolute {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// How to find one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
  pub name: &'static str,
  pub env_var: Option<&'static str>,
}

pub const SWIFTC: ToolSpec = ToolSpec {
  name: "swiftc",
  env_var: Some("SWIFT_EXEC"),
};

pub const CLANG: ToolSpec = ToolSpec {
  name: "clang",
  env_var: Some("CC"),
};

pub const CMAKE: ToolSpec = ToolSpec {
  name: "cmake",
  env_var: None,
};

pub const NINJA: ToolSpec = ToolSpec {
  name: "ninja",
  env_var: None,
};

pub const INSTALL_NAME_TOOL: ToolSpec = ToolSpec {
  name: "install_name_tool",
  env_var: None,
};

/// Explicit tool paths from the command line.
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
  pub swiftc: Option<PathBuf>,
  pub clang: Option<PathBuf>,
  pub cmake: Option<PathBuf>,
  pub ninja: Option<PathBuf>,
}

/// Resolved, existence-checked tool paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  pub swiftc: PathBuf,
  pub clang: PathBuf,
  pub cmake: PathBuf,
  pub ninja: PathBuf,
  /// Only resolved on Darwin, where built binaries get extra rpaths.
  pub install_name_tool: Option<PathBuf>,
}

impl Toolchain {
  pub async fn resolve<R: ProcessRunner>(overrides: &ToolOverrides, host: &Host, runner: &R) -> Result<Self, ToolchainError> {
    let swiftc = resolve_tool(&SWIFTC, overrides.swiftc.as_deref(), host, runner).await?;
    let clang = resolve_tool(&CLANG, overrides.clang.as_deref(), host, runner).await?;
    let cmake = resolve_tool(&CMAKE, overrides.cmake.as_deref(), host, runner).await?;
    let ninja = resolve_tool(&NINJA, overrides.ninja.as_deref(), host, runner).await?;
    let install_name_tool = if host.is_darwin() {
      Some(resolve_tool(&INSTALL_NAME_TOOL, None, host, runner).await?)
    } else {
      None
    };

    info!(
      swiftc = %swiftc.display(),
      clang = %clang.display(),
      cmake = %cmake.display(),
      ninja = %ninja.display(),
      "resolved toolchain"
    );

    Ok(Self {
      swiftc,
      clang,
      cmake,
      ninja,
      install_name_tool,
    })
  }
}

/// Resolve a single tool to an absolute, existing path.
pub async fn resolve_tool<R: ProcessRunner>(
  spec: &ToolSpec,
  explicit: Option<&Path>,
  host: &Host,
  runner: &R,
) -> Result<PathBuf, ToolchainError> {
  let from_env = spec
    .env_var
    .and_then(std::env::var_os)
    .filter(|value| !value.is_empty())
    .map(PathBuf::from);

  let candidate = match (explicit, from_env) {
    (Some(path), _) => path.to_path_buf(),
    (None, Some(path)) => {
      debug!(tool = spec.name, var = spec.env_var, "using tool from environment");
      command_from_env(spec, path)?
    }
    (None, None) => discover(spec.name, host, runner)
      .await
      .ok_or_else(|| ToolchainError::ToolNotFound {
        tool: spec.name.to_string(),
        location: match host.discovery {
          ToolDiscovery::Xcrun => "xcrun --find".to_string(),
          ToolDiscovery::SearchPath => "PATH".to_string(),
        },
      })?,
  };

  let candidate = std::path::absolute(&candidate).map_err(|source| ToolchainError::Absolute {
    path: candidate.clone(),
    source,
  })?;
  let candidate = compile_variant(spec, candidate, host);

  if !candidate.exists() {
    return Err(ToolchainError::ToolNotFound {
      tool: spec.name.to_string(),
      location: candidate.display().to_string(),
    });
  }

  debug!(tool = spec.name, path = %candidate.display(), "resolved tool");
  Ok(candidate)
}

/// A bare command name such as `CC=gcc` is looked up on the search path,
/// anything with a directory component is taken as a path.
fn command_from_env(spec: &ToolSpec, value: PathBuf) -> Result<PathBuf, ToolchainError> {
  if value.is_absolute() || value.components().count() > 1 {
    return Ok(value);
  }
  which::which(&value).map_err(|_| ToolchainError::ToolNotFound {
    tool: spec.name.to_string(),
    location: format!("{} on PATH", value.display()),
  })
}

/// `swift` is the front end; the compile driver is `swiftc` next to it.
fn compile_variant(spec: &ToolSpec, path: PathBuf, host: &Host) -> PathBuf {
  if spec.name != SWIFTC.name {
    return path;
  }
  match path.file_name().and_then(|n| n.to_str()) {
    Some(name) if name == host.exe_name("swift") => path.with_file_name(host.exe_name("swiftc")),
    _ => path,
  }
}

async fn discover<R: ProcessRunner>(name: &str, host: &Host, runner: &R) -> Option<PathBuf> {
  match host.discovery {
    ToolDiscovery::Xcrun => {
      let invocation = Invocation::new("xcrun").args(["--find", name]);
      match runner.run(&invocation).await {
        Ok(output) if !output.stdout.is_empty() => Some(PathBuf::from(output.stdout)),
        Ok(_) => None,
        Err(e) => {
          debug!(tool = name, error = %e, "xcrun could not find tool");
          None
        }
      }
    }
    ToolDiscovery::SearchPath => which::which(name).ok(),
  }
}

/// Ask the compiler for its target triple and runtime library paths.
///
/// On Darwin a failed query falls back to the host architecture and the
/// runtime next to the compiler; elsewhere it is fatal.
pub async fn host_target<R: ProcessRunner>(swiftc: &Path, host: &Host, runner: &R) -> Result<TargetInfo, ToolchainError> {
  let invocation = Invocation::new(swiftc).arg("-print-target-info");
  let queried = match runner.run(&invocation).await {
    Ok(output) => TargetInfo::parse(&output.stdout).map_err(|e| format!("invalid target info: {}", e)),
    Err(e) => Err(e.to_string()),
  };

  match queried {
    Ok(info) => {
      debug!(triple = info.triple(), "queried host target");
      Ok(info)
    }
    Err(reason) if host.is_darwin() => {
      let info = TargetInfo::darwin_fallback(host, swiftc);
      warn!(reason = %reason, triple = info.triple(), "target info query failed, using fallback");
      Ok(info)
    }
    Err(reason) => Err(ToolchainError::ToolchainQueryFailed {
      compiler: swiftc.to_path_buf(),
      reason,
    }),
  }
}

/// SDK root passed to the compiler. Only Darwin has one.
pub async fn sdk_root<R: ProcessRunner>(host: &Host, runner: &R) -> Option<PathBuf> {
  if host.discovery != ToolDiscovery::Xcrun {
    return None;
  }
  let invocation = Invocation::new("xcrun").args(["--sdk", "macosx", "--show-sdk-path"]);
  match runner.run(&invocation).await {
    Ok(output) if !output.stdout.is_empty() => Some(PathBuf::from(output.stdout)),
    Ok(_) => None,
    Err(e) => {
      warn!(error = %e, "could not determine SDK root");
      None
    }
  }
}
