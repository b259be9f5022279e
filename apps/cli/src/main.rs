//! LeadPipe CLI: job-posting driven lead generation.
//!
//! Scrapes companies hiring sales roles, finds and verifies a decision maker,
//! writes an outbound sequence, and exports ready prospects to a campaign.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // Credentials may come from a local .env file.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
