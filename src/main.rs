use anyhow::Result;
use callops::{
    cli::{self, Cli},
    config::ConsoleConfig,
    logging,
};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConsoleConfig::load(cli.config.as_deref())?.with_overrides(cli.overrides());
    config.validate()?;
    logging::init_logging(&config.log)?;

    cli::run(cli.command, &config).await
}
