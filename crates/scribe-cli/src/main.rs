//! Scribe CLI - multi-agent documentation generator command-line interface
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::Cli;

mod cli;
mod handlers;
mod interactive;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    handlers::handle_generate(cli).await
}
