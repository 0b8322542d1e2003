mod build;
mod clean;
mod install;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use pmboot_lib::config::{BuildConfiguration, BuildOptions};
use pmboot_lib::exec::SystemRunner;
use pmboot_lib::platform::Host;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use install::cmd_install;
pub use test::cmd_test;

/// Single-threaded runtime: every process is awaited before the next starts.
fn runtime() -> Result<Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")
}

/// Detect the host and resolve the configuration.
async fn configure(options: &BuildOptions, runner: &SystemRunner) -> Result<BuildConfiguration> {
  let host = Host::detect().context("Unsupported host platform")?;
  BuildConfiguration::resolve(options, host, runner)
    .await
    .context("Failed to resolve build configuration")
}
