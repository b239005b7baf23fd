use clap::Parser;
use modmaven::{Preclusions, Rules, parse_prerequisite, resolve_preclusions};
use tracing::instrument;

#[derive(Debug, Parser)]
#[command(about = "Parse a single prerequisite or preclusion string")]
pub struct Parse {
    /// The text to parse
    text: String,

    /// Code of the module the text belongs to
    #[arg(short, long, default_value = "")]
    module: String,

    /// Treat the text as a preclusion rather than a prerequisite
    #[arg(long)]
    preclusion: bool,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Parse {
    #[instrument(level = "debug", skip(self, rules), fields(module = %self.module))]
    pub fn run(self, rules: &Rules) -> anyhow::Result<()> {
        if self.preclusion {
            let preclusions = resolve_preclusions(&self.text, &self.module, rules);
            match self.output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&preclusions)?);
                }
                OutputFormat::Text => match preclusions {
                    Preclusions::Resolved(codes) => {
                        let codes: Vec<_> = codes.iter().map(ToString::to_string).collect();
                        println!("{}", codes.join(", "));
                    }
                    Preclusions::Unresolved(text) => println!("unresolved: {text}"),
                },
            }
        } else {
            let expression = parse_prerequisite(&self.text, &self.module, rules);
            match self.output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&expression)?);
                }
                OutputFormat::Text if expression.is_opaque() => {
                    println!("unparsed: {expression}");
                }
                OutputFormat::Text => println!("{expression}"),
            }
        }

        Ok(())
    }
}
