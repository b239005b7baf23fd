use std::io::{self, Write};

use clap::Parser;
use modmaven::{Catalogue, Rules};
use tracing::instrument;

use super::read_records;

#[derive(Debug, Parser)]
pub struct Process {
    /// Write compact JSON instead of pretty-printing it
    #[arg(long)]
    compact: bool,
}

impl Process {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, rules: &Rules) -> anyhow::Result<()> {
        let records = read_records()?;
        let catalogue = Catalogue::parse(records, rules).link();

        for cycle in catalogue.cycles() {
            tracing::warn!("Prerequisite cycle: {}", cycle.join(" -> "));
        }

        let processed = catalogue.process();

        let mut out = io::BufWriter::new(io::stdout().lock());
        if self.compact {
            serde_json::to_writer(&mut out, &processed)?;
        } else {
            serde_json::to_writer_pretty(&mut out, &processed)?;
        }
        writeln!(out)?;
        out.flush()?;

        Ok(())
    }
}
