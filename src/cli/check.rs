use std::process;

use clap::Parser;
use modmaven::{Catalogue, Rules};
use tracing::instrument;

use super::{read_records, terminal::Tone};

#[derive(Debug, Parser, Default)]
#[command(about = "Report prerequisite cycles and text that could not be parsed")]
pub struct Check {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

struct Report<'a> {
    modules: usize,
    cycles: Vec<Vec<String>>,
    opaque: Vec<&'a str>,
    unresolved: Vec<&'a str>,
}

impl Check {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, rules: &Rules) -> anyhow::Result<()> {
        let records = read_records()?;
        let catalogue = Catalogue::parse(records, rules).link();

        let report = Report {
            modules: catalogue.len(),
            cycles: catalogue.cycles(),
            opaque: catalogue.opaque_prerequisites().collect(),
            unresolved: catalogue.unresolved_preclusions().collect(),
        };

        match self.output {
            OutputFormat::Json => Self::output_json(&report)?,
            OutputFormat::Table if self.quiet => Self::output_quiet(&report),
            OutputFormat::Table => Self::output_table(&report),
        }

        // Exit with a non-zero code when the catalogue needs attention.
        let mut exit_code = 0;
        if !report.opaque.is_empty() || !report.unresolved.is_empty() {
            exit_code = exit_code.max(2);
        }
        if !report.cycles.is_empty() {
            exit_code = exit_code.max(3);
        }

        if exit_code != 0 {
            process::exit(exit_code);
        }

        Ok(())
    }

    fn output_json(report: &Report<'_>) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "modules": report.modules,
            "cycles": {
                "count": report.cycles.len(),
                "members": report.cycles,
            },
            "unparsed_prerequisites": report.opaque,
            "unresolved_preclusions": report.unresolved,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(report: &Report<'_>) {
        println!(
            "modules={} cycles={} unparsed={} unresolved={}",
            report.modules,
            report.cycles.len(),
            report.opaque.len(),
            report.unresolved.len()
        );
    }

    fn output_table(report: &Report<'_>) {
        const MAX_DISPLAY: usize = 5;

        println!("Modules: {}", report.modules);
        println!();

        Self::print_section("Unparsed prerequisites", &report.opaque, MAX_DISPLAY);
        Self::print_section("Unresolved preclusions", &report.unresolved, MAX_DISPLAY);

        let count = report.cycles.len();
        if count == 0 {
            println!("Cycles: {} ✅", Tone::Clean.paint(count));
        } else {
            println!("Cycles: {} ⚠️", Tone::for_count(count).paint(count));
            for cycle in report.cycles.iter().take(MAX_DISPLAY) {
                println!("  - {}", cycle.join(" -> "));
            }
            if report.cycles.len() > MAX_DISPLAY {
                println!("  - ... and {} more cycles", report.cycles.len() - MAX_DISPLAY);
            }
            println!(
                "{}",
                Tone::Note.paint("Modules in a cycle can never be unlocked as written.")
            );
        }
    }

    fn print_section(title: &str, codes: &[&str], max_display: usize) {
        let count = codes.len();
        if count == 0 {
            println!("{title}: {} ✅", Tone::Clean.paint(count));
        } else {
            println!("{title}: {} ⚠️", Tone::for_count(count).paint(count));
            for code in codes.iter().take(max_display) {
                println!("  - {code}");
            }
            if codes.len() > max_display {
                println!("  - ... and {} more", codes.len() - max_display);
            }
        }
        println!();
    }
}
