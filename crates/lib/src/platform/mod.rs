//! Host capability record.
//!
//! Everything that differs between operating system families is captured once
//! in [`Host`] at startup. The stage builder, the pipeline and the self-hosted
//! runner read these fields instead of branching on the OS themselves.

pub mod arch;
pub mod os;

use std::fmt;

use arch::Arch;
use os::Os;

/// Environment variable whose presence marks an Android userland.
pub const ANDROID_MARKER_VAR: &str = "ANDROID_DATA";

/// How tools that were not named explicitly are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDiscovery {
  /// Ask `xcrun --find <tool>` (Darwin).
  Xcrun,
  /// Walk the executable search path.
  SearchPath,
}

/// Platform capabilities consumed uniformly by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
  pub os: Os,
  pub arch: Option<Arch>,
  /// Running inside an Android environment (e.g. Termux).
  pub android: bool,
  /// Variable the dynamic loader reads library directories from.
  pub library_path_var: &'static str,
  /// Separator for path lists such as the library path variable.
  pub path_list_separator: char,
  /// Linker token meaning "the directory of the executable".
  pub rpath_origin: &'static str,
  pub dylib_extension: &'static str,
  pub exe_suffix: &'static str,
  pub discovery: ToolDiscovery,
}

impl Host {
  /// Build the capability record for an OS family.
  pub fn for_os(os: Os, arch: Option<Arch>, android: bool) -> Self {
    match os {
      Os::MacOs => Self {
        os,
        arch,
        android: false,
        library_path_var: "DYLD_LIBRARY_PATH",
        path_list_separator: ':',
        rpath_origin: "@executable_path",
        dylib_extension: "dylib",
        exe_suffix: "",
        discovery: ToolDiscovery::Xcrun,
      },
      Os::Windows => Self {
        os,
        arch,
        android: false,
        library_path_var: "PATH",
        path_list_separator: ';',
        rpath_origin: "",
        dylib_extension: "dll",
        exe_suffix: ".exe",
        discovery: ToolDiscovery::SearchPath,
      },
      Os::Linux | Os::FreeBsd => Self {
        os,
        arch,
        android,
        library_path_var: "LD_LIBRARY_PATH",
        path_list_separator: ':',
        rpath_origin: "$ORIGIN",
        dylib_extension: "so",
        exe_suffix: "",
        discovery: ToolDiscovery::SearchPath,
      },
    }
  }

  /// Detect the current host.
  ///
  /// Returns `None` if the operating system is not supported.
  pub fn detect() -> Option<Self> {
    let os = Os::current()?;
    let android = std::env::var_os(ANDROID_MARKER_VAR).is_some();
    Some(Self::for_os(os, Arch::current(), android))
  }

  pub fn is_darwin(&self) -> bool {
    self.os.is_darwin()
  }

  /// Name of an executable as it appears on disk.
  pub fn exe_name(&self, name: &str) -> String {
    format!("{}{}", name, self.exe_suffix)
  }

  /// Whether `file_name` looks like a shared library on this host.
  pub fn is_dylib(&self, file_name: &str) -> bool {
    file_name.ends_with(&format!(".{}", self.dylib_extension)) || file_name.contains(&format!(".{}.", self.dylib_extension))
  }
}

impl fmt::Display for Host {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.arch {
      Some(arch) => write!(f, "{}-{}", arch, self.os)?,
      None => write!(f, "{}", self.os)?,
    }
    if self.android {
      write!(f, " (android)")?;
    }
    Ok(())
  }
}
