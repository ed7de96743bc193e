//! webcheck - scripted browser checks against monitored web applications
//!
//! Runs suites of UI checks through a WebDriver hub and reports one
//! structured verdict per application.

use clap::Parser;
use commands::Commands;
use std::path::PathBuf;
use webcheck::common::logging;
use webcheck::{cli, commands};

#[derive(Parser)]
#[command(name = "webcheck", about = "Scripted browser checks for web applications")]
#[command(version, long_about = None)]
struct Cli {
    /// Debug level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to this file (default location when given without a path)
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_file = cli.log_file.map(|path| {
        if path.as_os_str().is_empty() {
            logging::default_log_path().unwrap_or_else(|| PathBuf::from("webcheck.log"))
        } else {
            path
        }
    });
    let _guard = logging::init_cli(cli.verbose, log_file.as_deref());

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
