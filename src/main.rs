mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    rucase::logger::init_logger(cli.verbose);

    if !cli::execute(cli).await? {
        std::process::exit(1);
    }
    Ok(())
}
