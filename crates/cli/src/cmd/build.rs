//! Implementation of the `pmboot build` command.

use std::time::Instant;

use anyhow::{Context, Result};

use pmboot_lib::config::BuildOptions;
use pmboot_lib::exec::SystemRunner;
use pmboot_lib::pipeline;

use crate::output::{format_duration, print_stat, print_success};

/// Build the native stages, then rebuild the package manager with itself.
pub fn cmd_build(options: BuildOptions) -> Result<()> {
  let start = Instant::now();
  let runner = SystemRunner;

  let rt = super::runtime()?;
  let (config, results) = rt.block_on(async {
    let config = super::configure(&options, &runner).await?;
    let results = pipeline::build(&config, &runner).await.context("Build failed")?;
    anyhow::Ok((config, results))
  })?;

  println!();
  print_success("Bootstrap complete!");
  print_stat("Stages built", &results.len().to_string());
  print_stat(
    "Stages reconfigured",
    &results.iter().filter(|(_, r)| r.reconfigured).count().to_string(),
  );
  print_stat("Build directory", &dunce::simplified(&config.build_root).display().to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
