//! Implementation of the `pmboot install` command.

use std::time::Instant;

use anyhow::{Context, Result};

use pmboot_lib::config::BuildOptions;
use pmboot_lib::consts::DEFAULT_PREFIX;
use pmboot_lib::exec::SystemRunner;
use pmboot_lib::install;

use crate::output::{format_duration, print_stat, print_success};

pub fn cmd_install(options: BuildOptions) -> Result<()> {
  let start = Instant::now();
  let runner = SystemRunner;

  let prefixes = if options.prefixes.is_empty() {
    DEFAULT_PREFIX.to_string()
  } else {
    options
      .prefixes
      .iter()
      .map(|p| p.display().to_string())
      .collect::<Vec<_>>()
      .join(", ")
  };

  let rt = super::runtime()?;
  let report = rt.block_on(async {
    let config = super::configure(&options, &runner).await?;
    install::install(&config, &runner).await.context("Install failed")
  })?;

  println!();
  print_success("Install complete!");
  print_stat("Prefixes", &prefixes);
  print_stat("Files installed", &report.files.len().to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
