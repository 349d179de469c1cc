//! MSIPRO CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, open the tile,
//! dispatch to band, angle or footprint output, and exit with appropriate status.
//! For programmatic use, prefer the library API (`msipro::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
