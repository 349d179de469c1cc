//! Command Line Interface (CLI) layer for MSIPRO.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that opens one tile and loads a
//! band, an angle grid or the footprint. It wires user-provided options to
//! the library functionality exposed via `msipro::api`.
//!
//! If you are embedding MSIPRO into another application, prefer using
//! the high-level `msipro::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
