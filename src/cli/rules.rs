use clap::Parser;
use modmaven::Rules;

#[derive(Debug, Parser)]
#[command(about = "Print the effective rule tables as TOML")]
pub struct ShowRules {}

impl ShowRules {
    pub fn run(self, rules: &Rules) -> anyhow::Result<()> {
        print!("{}", rules.to_toml()?);
        Ok(())
    }
}
