//! External process execution.
//!
//! Every tool the bootstrap drives (compiler queries, CMake, Ninja,
//! `install_name_tool`, the self-hosted `swift-build`) goes through the single
//! [`ProcessRunner::run`] primitive. A non-zero exit status is always an error;
//! callers map it onto their own failure kind.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors produced while running an external process.
#[derive(Debug, Error)]
pub enum ExecError {
  /// The program could not be started at all.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {command}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

impl ExecError {
  /// Captured stderr of a failed command (empty when output was inherited).
  pub fn stderr(&self) -> &str {
    match self {
      ExecError::Failed { stderr, .. } => stderr,
      ExecError::Spawn { .. } => "",
    }
  }
}

/// Where the child's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
  /// Collect output and hand it back to the caller.
  #[default]
  Capture,
  /// Stream straight to the terminal. Used for long-running builds.
  Inherit,
}

/// A fully described process invocation.
///
/// `env` is layered on top of the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: PathBuf,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: BTreeMap<String, String>,
  pub output: OutputMode,
}

impl Invocation {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: BTreeMap::new(),
      output: OutputMode::Capture,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn envs<I, K, V>(mut self, vars: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    self.env.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
    self
  }

  pub fn inherit_output(mut self) -> Self {
    self.output = OutputMode::Inherit;
    self
  }

  /// File name of the program, e.g. `cmake` for `/usr/bin/cmake`.
  pub fn program_name(&self) -> &str {
    self.program.file_name().and_then(|n| n.to_str()).unwrap_or_default()
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.display())?;
    for arg in &self.args {
      if arg.is_empty() || arg.contains(char::is_whitespace) {
        write!(f, " '{}'", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

/// Output of a successful process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
  /// Trimmed stdout; empty for [`OutputMode::Inherit`].
  pub stdout: String,
  pub stderr: String,
}

/// Runs external processes to completion.
pub trait ProcessRunner {
  fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ProcessOutput, ExecError>>;
}

/// Runs processes on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
  async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
    debug!(command = %invocation, cwd = ?invocation.cwd, "spawning process");

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).envs(&invocation.env);
    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    let spawn_error = |source| ExecError::Spawn {
      program: invocation.program.clone(),
      source,
    };

    match invocation.output {
      OutputMode::Capture => {
        let output = command.output().await.map_err(spawn_error)?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
          if !stderr.is_empty() {
            debug!(stderr = %stderr, "command stderr");
          }
          return Err(ExecError::Failed {
            command: invocation.to_string(),
            code: output.status.code(),
            stderr,
          });
        }

        Ok(ProcessOutput { stdout, stderr })
      }
      OutputMode::Inherit => {
        let status = command.status().await.map_err(spawn_error)?;
        if !status.success() {
          return Err(ExecError::Failed {
            command: invocation.to_string(),
            code: status.code(),
            stderr: String::new(),
          });
        }
        Ok(ProcessOutput::default())
      }
    }
  }
}

/// Join a list of paths with the host's list separator.
pub fn join_paths<P: AsRef<Path>>(paths: &[P], separator: char) -> String {
  paths
    .iter()
    .map(|p| p.as_ref().display().to_string())
    .collect::<Vec<_>>()
    .join(&separator.to_string())
}
