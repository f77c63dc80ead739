//! skin-updater binary entry point.
//!
//! Parses the command line, performs one update run and exits with the
//! run's exit code. The process only exits after the run has returned, so
//! the downloaded archive has already been cleaned up.

use clap::Parser;
use skin_updater::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let code = cli.execute().await;
    std::process::exit(code);
}
