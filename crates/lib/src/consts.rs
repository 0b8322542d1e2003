pub const APP_NAME: &str = "pmboot";

/// Build root created inside the package directory when none is given.
pub const DEFAULT_BUILD_DIR: &str = ".build";

/// Install prefix used when `install` is given no `--prefix`.
pub const DEFAULT_PREFIX: &str = "/usr/local";

/// Executables produced by the package manager build.
pub const PACKAGE_MANAGER_TOOLS: [&str; 4] = ["swift-build", "swift-test", "swift-run", "swift-package"];
