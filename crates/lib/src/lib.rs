//! pmboot-lib: bootstrap build orchestration for the Swift package manager
//!
//! Builds the package manager from source on a machine that only has a
//! compiler toolchain, CMake and Ninja:
//! - `toolchain`: locating tools and querying the compiler's target
//! - `stage`: configuring and building one CMake project
//! - `pipeline`: the native stage graph (llbuild, TSC, Yams, driver, SwiftPM)
//! - `bootstrap`: rebuilding the package manager with itself
//! - `install` / `clean`: the remaining commands

pub mod bootstrap;
pub mod clean;
pub mod config;
pub mod consts;
pub mod exec;
pub mod install;
pub mod pipeline;
pub mod platform;
pub mod stage;
pub mod toolchain;
pub mod util;
