//! stewardctl - Debian maintenance orchestrator

use clap::Parser;
use stewardctl::cli::Cli;
use stewardctl::commands;
use stewardctl::display::display_error;
use stewardctl::errors::exit_code_for_error;
use stewardctl::logging::init_tracing;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match commands::dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            display_error(&format!("{:#}", e));
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}
