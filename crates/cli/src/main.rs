mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pmboot_lib::config::BuildOptions;
use pmboot_lib::consts::APP_NAME;
use pmboot_lib::toolchain::ToolOverrides;

use output::print_error;

#[derive(Parser)]
#[command(name = APP_NAME, author, version, about = "Bootstrap the Swift package manager from source", long_about = None)]
struct Cli {
  #[command(flatten)]
  common: CommonArgs,

  /// Build options for the default `build` command
  #[command(flatten)]
  build: BuildArgs,

  /// Defaults to `build`.
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
  /// Package root (the swiftpm checkout)
  #[arg(long, global = true, default_value = ".")]
  package_path: PathBuf,

  /// Build root (default: <package>/.build)
  #[arg(long, global = true)]
  build_path: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Re-run CMake even when a configured build exists
  #[arg(long, global = true)]
  reconfigure: bool,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
struct BuildArgs {
  /// Swift compiler (default: $SWIFT_EXEC, then the search path)
  #[arg(long)]
  swiftc_path: Option<PathBuf>,

  /// C compiler (default: $CC, then the search path)
  #[arg(long)]
  clang_path: Option<PathBuf>,

  #[arg(long)]
  cmake_path: Option<PathBuf>,

  #[arg(long)]
  ninja_path: Option<PathBuf>,

  /// Use an existing llbuild build instead of building it
  #[arg(long)]
  llbuild_build_dir: Option<PathBuf>,

  #[arg(long)]
  foundation_build_dir: Option<PathBuf>,

  #[arg(long)]
  dispatch_build_dir: Option<PathBuf>,

  /// Link llbuild as a framework
  #[arg(long)]
  llbuild_link_framework: bool,

  /// Build in release configuration
  #[arg(long)]
  release: bool,

  /// Where dependency libraries are installed (default: <prefix>/lib)
  #[arg(long)]
  lib_install_dir: Option<PathBuf>,

  /// Install prefix, may be repeated
  #[arg(long = "prefix")]
  prefixes: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct TestArgs {
  #[command(flatten)]
  build: BuildArgs,

  /// Run tests serially
  #[arg(long)]
  no_parallel: bool,

  /// Only run tests matching this filter, may be repeated
  #[arg(long = "filter")]
  filters: Vec<String>,

  /// Test another source tree with the bootstrapped tools
  #[arg(long)]
  test_package: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Remove the build directory
  Clean,

  /// Build the dependencies and the package manager, then rebuild it with itself
  Build(BuildArgs),

  /// Build, then run the test suite with the bootstrapped tools
  Test(TestArgs),

  /// Build and install the package manager
  Install(BuildArgs),
}

fn build_options(common: &CommonArgs, args: &BuildArgs) -> BuildOptions {
  BuildOptions {
    package_dir: common.package_path.clone(),
    build_root: common.build_path.clone(),
    verbose: common.verbose,
    reconfigure: common.reconfigure,
    release: args.release,
    tools: ToolOverrides {
      swiftc: args.swiftc_path.clone(),
      clang: args.clang_path.clone(),
      cmake: args.cmake_path.clone(),
      ninja: args.ninja_path.clone(),
    },
    llbuild_build_dir: args.llbuild_build_dir.clone(),
    foundation_build_dir: args.foundation_build_dir.clone(),
    dispatch_build_dir: args.dispatch_build_dir.clone(),
    llbuild_link_framework: args.llbuild_link_framework,
    lib_install_dir: args.lib_install_dir.clone(),
    prefixes: args.prefixes.clone(),
  }
}

/// Top-level build options only apply when no subcommand is given.
fn select_command(build: BuildArgs, command: Option<Commands>) -> anyhow::Result<Commands> {
  match command {
    None => Ok(Commands::Build(build)),
    Some(_) if build != BuildArgs::default() => {
      anyhow::bail!("build options must follow the subcommand, e.g. `{} build --release`", APP_NAME)
    }
    Some(command) => Ok(command),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.common.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let Cli { common, build, command } = cli;
  let common = &common;
  let result = select_command(build, command).and_then(|command| match command {
    Commands::Clean => cmd::cmd_clean(&common.package_path, common.build_path.as_deref()),
    Commands::Build(args) => cmd::cmd_build(build_options(common, &args)),
    Commands::Test(args) => cmd::cmd_test(
      build_options(common, &args.build),
      !args.no_parallel,
      args.filters,
      args.test_package,
    ),
    Commands::Install(args) => cmd::cmd_install(build_options(common, &args)),
  });

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
