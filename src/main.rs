//! Command-line front end for prerequisite parsing.
//!
//! Module records are read from stdin and results written to stdout; the
//! program never touches the filesystem except to read a rules file.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
