//! Shared helpers for pipeline integration tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pmboot_lib::config::{BuildConfiguration, BuildOptions};
use pmboot_lib::exec::{ExecError, Invocation, ProcessOutput, ProcessRunner};
use pmboot_lib::platform::{Host, arch::Arch, os::Os};
use pmboot_lib::toolchain::ToolOverrides;
use tempfile::TempDir;

const TARGET_INFO: &str = r#"{
  "target": { "unversionedTriple": "x86_64-unknown-linux-gnu" },
  "paths": { "runtimeLibraryPaths": ["/opt/swift/usr/lib/swift/linux"] }
}"#;

/// Stands in for the external tools; records every invocation.
#[derive(Default)]
pub struct RecordingRunner {
  calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn programs(&self) -> Vec<String> {
    self.calls().iter().map(|c| c.program_name().to_string()).collect()
  }
}

impl ProcessRunner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecError> {
    self.calls.lock().unwrap().push(invocation.clone());

    let stdout = match (invocation.program_name(), &invocation.cwd) {
      ("swiftc", _) => TARGET_INFO.to_string(),
      ("cmake", Some(cwd)) => {
        std::fs::write(cwd.join("CMakeCache.txt"), invocation.args.join("\n")).unwrap();
        String::new()
      }
      ("ninja", Some(cwd)) => {
        std::fs::create_dir_all(cwd.join("lib")).unwrap();
        std::fs::create_dir_all(cwd.join("bin")).unwrap();
        for tool in ["swift-build", "swift-test"] {
          std::fs::write(cwd.join("bin").join(tool), b"").unwrap();
        }
        String::new()
      }
      _ => String::new(),
    };

    Ok(ProcessOutput {
      stdout,
      stderr: String::new(),
    })
  }
}

/// A package checkout with its sibling dependencies and a fake toolchain.
pub struct Workspace {
  pub temp: TempDir,
  pub package_dir: PathBuf,
}

impl Workspace {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    for name in ["swiftpm", "llbuild", "swift-tools-support-core", "yams", "swift-driver"] {
      std::fs::create_dir_all(temp.path().join(name)).unwrap();
    }
    let package_dir = temp.path().join("swiftpm");
    Self { temp, package_dir }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn options(&self) -> BuildOptions {
    let tools = self.root().join("toolchain");
    std::fs::create_dir_all(&tools).unwrap();
    let tool = |name: &str| {
      let path = tools.join(name);
      std::fs::write(&path, b"").unwrap();
      Some(path)
    };

    BuildOptions {
      package_dir: self.package_dir.clone(),
      tools: ToolOverrides {
        swiftc: tool("swiftc"),
        clang: tool("clang"),
        cmake: tool("cmake"),
        ninja: tool("ninja"),
      },
      ..BuildOptions::default()
    }
  }

  pub async fn configure(&self, runner: &RecordingRunner) -> BuildConfiguration {
    BuildConfiguration::resolve(&self.options(), linux_host(), runner)
      .await
      .unwrap()
  }
}

pub fn linux_host() -> Host {
  Host::for_os(Os::Linux, Some(Arch::X86_64), false)
}

/// Relative paths of every directory under `root`, sorted.
pub fn directory_layout(root: &Path) -> Vec<PathBuf> {
  let mut dirs: Vec<PathBuf> = walkdir::WalkDir::new(root)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_dir())
    .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
    .collect();
  dirs.sort();
  dirs
}
