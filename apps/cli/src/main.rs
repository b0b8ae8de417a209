//! certledger CLI: compile certificate competencies into a contact ledger.
//!
//! Reads certificate text, expands each course code into a ledger row, and
//! joins the rows against a contact roster by holder name.

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
