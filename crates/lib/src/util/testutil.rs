//! Test helpers: a recording process runner and on-disk fixtures.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::exec::{ExecError, Invocation, ProcessOutput, ProcessRunner};

pub const LINUX_TARGET_INFO: &str = r#"{
  "compilerVersion": "Swift version 6.0",
  "target": {
    "triple": "x86_64-unknown-linux-gnu",
    "unversionedTriple": "x86_64-unknown-linux-gnu",
    "moduleTriple": "x86_64-unknown-linux-gnu"
  },
  "paths": {
    "runtimeLibraryPaths": ["/toolchain/usr/lib/swift/linux"],
    "runtimeResourcePath": "/toolchain/usr/lib/swift"
  }
}"#;

/// Records every invocation and imitates the tools the bootstrap drives.
///
/// - `swiftc -print-target-info` prints the configured target info
/// - `cmake` writes `CMakeCache.txt` (its arguments) into its working directory
/// - `ninja` creates `lib/`, `pm/` and the `swift-*` executables in `bin/`
/// - anything else succeeds silently unless a canned stdout was registered
pub struct FakeRunner {
  calls: Mutex<Vec<Invocation>>,
  failures: Mutex<Vec<(String, Option<String>)>>,
  stdout: Mutex<BTreeMap<String, String>>,
  broken: Mutex<HashSet<String>>,
}

impl FakeRunner {
  pub fn new() -> Self {
    let runner = Self {
      calls: Mutex::new(Vec::new()),
      failures: Mutex::new(Vec::new()),
      stdout: Mutex::new(BTreeMap::new()),
      broken: Mutex::new(HashSet::new()),
    };
    runner.respond("swiftc", LINUX_TARGET_INFO);
    runner
  }

  /// Register stdout for a program name.
  pub fn respond(&self, program: &str, stdout: &str) {
    self.stdout.lock().unwrap().insert(program.to_string(), stdout.to_string());
  }

  /// Make `program` exit non-zero, optionally only when its cwd contains `cwd_part`.
  pub fn fail_on(&self, program: &str, cwd_part: Option<&str>) {
    self
      .failures
      .lock()
      .unwrap()
      .push((program.to_string(), cwd_part.map(str::to_string)));
  }

  /// Make `program` impossible to spawn.
  pub fn break_program(&self, program: &str) {
    self.broken.lock().unwrap().insert(program.to_string());
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn program_names(&self) -> Vec<String> {
    self.calls().iter().map(|c| c.program_name().to_string()).collect()
  }

  /// Invocations of `program`, in order.
  pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
    self.calls().into_iter().filter(|c| c.program_name() == program).collect()
  }

  pub fn clear(&self) {
    self.calls.lock().unwrap().clear();
  }

  fn should_fail(&self, invocation: &Invocation) -> bool {
    let cwd = invocation
      .cwd
      .as_ref()
      .map(|c| c.display().to_string())
      .unwrap_or_default();
    self
      .failures
      .lock()
      .unwrap()
      .iter()
      .any(|(program, part)| program == invocation.program_name() && part.as_ref().is_none_or(|p| cwd.contains(p)))
  }
}

impl ProcessRunner for FakeRunner {
  async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
    self.calls.lock().unwrap().push(invocation.clone());
    let name = invocation.program_name().to_string();

    if self.broken.lock().unwrap().contains(&name) {
      return Err(ExecError::Spawn {
        program: invocation.program.clone(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
      });
    }

    if self.should_fail(invocation) {
      return Err(ExecError::Failed {
        command: invocation.to_string(),
        code: Some(1),
        stderr: "simulated failure".to_string(),
      });
    }

    if let Some(cwd) = &invocation.cwd {
      match name.as_str() {
        "cmake" => std::fs::write(cwd.join("CMakeCache.txt"), invocation.args.join("\n")).unwrap(),
        "ninja" => fake_build_outputs(cwd),
        _ => {}
      }
    }

    let stdout = self.stdout.lock().unwrap().get(&name).cloned().unwrap_or_default();
    Ok(ProcessOutput {
      stdout,
      stderr: String::new(),
    })
  }
}

fn fake_build_outputs(build_dir: &Path) {
  std::fs::create_dir_all(build_dir.join("lib")).unwrap();
  std::fs::create_dir_all(build_dir.join("bin")).unwrap();
  std::fs::create_dir_all(build_dir.join("pm").join("ManifestAPI")).unwrap();
  std::fs::write(build_dir.join("lib").join("libstage.so"), b"").unwrap();
  for tool in ["swift-build", "swift-test", "swift-run", "swift-package"] {
    std::fs::write(build_dir.join("bin").join(tool), b"").unwrap();
  }
}

/// Create an empty file standing in for an executable.
pub fn touch_tool(dir: &Path, name: &str) -> PathBuf {
  std::fs::create_dir_all(dir).unwrap();
  let path = dir.join(name);
  std::fs::write(&path, b"").unwrap();
  path
}

/// Lay out a package checkout with sibling dependency checkouts.
///
/// Returns the package directory (`<root>/swiftpm`).
pub fn sibling_checkouts(root: &Path) -> PathBuf {
  for name in ["swiftpm", "llbuild", "swift-tools-support-core", "yams", "swift-driver"] {
    std::fs::create_dir_all(root.join(name)).unwrap();
  }
  root.join("swiftpm")
}
