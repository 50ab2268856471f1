//! BrandLens CLI — AI-answer brand visibility measurement.
//!
//! Runs the visibility pipeline against a brand's website and scores how
//! often the brand shows up in AI-generated search answers.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
