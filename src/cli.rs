use std::{
    io,
    path::{Path, PathBuf},
};

mod check;
mod parse;
mod process;
mod rules;
mod terminal;

use anyhow::Context;
use check::Check;
use clap::ArgAction;
use modmaven::{ModuleRecord, Rules};
use parse::Parse;
use process::Process;
use rules::ShowRules;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// A TOML file replacing some or all of the built-in rule tables
    #[arg(long, value_name = "FILE", global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let rules = load_rules(self.rules.as_deref())?;
        self.command.run(&rules)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        // stdout carries results, so diagnostics go to stderr
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Augment module records read from stdin
    ///
    /// Adds the parsed prerequisite, dependency tree and locked modules to
    /// every record, and replaces preclusion text with the precluded codes.
    Process(Process),

    /// Parse a single prerequisite or preclusion string
    Parse(Parse),

    /// Report cycles and unparsed text in module records read from stdin
    Check(Check),

    /// Print the effective rule tables as TOML
    Rules(ShowRules),
}

impl Command {
    fn run(self, rules: &Rules) -> anyhow::Result<()> {
        match self {
            Self::Process(command) => command.run(rules)?,
            Self::Parse(command) => command.run(rules)?,
            Self::Check(command) => command.run(rules)?,
            Self::Rules(command) => command.run(rules)?,
        }
        Ok(())
    }
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<Rules> {
    let Some(path) = path else {
        return Ok(Rules::default());
    };

    let rules = Rules::load(path).with_context(|| format!("loading {}", path.display()))?;
    tracing::debug!("Loaded rules from {}", path.display());
    Ok(rules)
}

/// Reads a JSON array of module records from stdin.
fn read_records() -> anyhow::Result<Vec<ModuleRecord>> {
    let records: Vec<ModuleRecord> = serde_json::from_reader(io::stdin().lock())
        .context("failed to read module records from stdin")?;
    tracing::info!("Read {} module records", records.len());
    Ok(records)
}
