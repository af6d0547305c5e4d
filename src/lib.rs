//! # cm - Compiler Manager
//!
//! cm is a tiny tool for automating modern C++ projects. Point it at a
//! directory laid out as `src/`, `tests/`, `lib/` and it assembles the
//! compiler call, links local shared objects, and runs the result.
//!
//! ## Quick Start
//!
//! ```bash
//! # Scaffold the layout
//! cm --init
//!
//! # Build bin/<dir-name> and run it
//! cm --run
//!
//! # Build and run the Catch tests in tests/
//! cm --test
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Discovery, invocation building, linking, and the test harness
//! - [`config`] - The immutable `BuildTarget` and optional `cm.toml` defaults
//! - [`process`] - Deadline-bound external process execution
//! - [`resources`] - Bundled test framework files

/// Build engine: discovery, invocation, linking, orchestration.
pub mod build;

/// CLI command handlers outside the build engine.
pub mod commands;

/// Build target and project configuration (`cm.toml`).
pub mod config;

/// Error taxonomy.
pub mod error;

/// External process execution under a deadline.
pub mod process;

/// Bundled test framework resources.
pub mod resources;

/// Terminal UI utilities (banner, framed commands).
pub mod ui;

pub use error::{CmError, Result};
