//! CLI command definitions
//!
//! Defines the clap commands for the webcheck CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every test case of a suite file and write the suite report
    Run {
        /// Path to the suite file (YAML, or JSON with a .json extension)
        suite: PathBuf,

        /// Write the JSON report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Attach a screenshot to every test case, not only failed ones
        #[arg(long)]
        screenshot_always: bool,

        /// Configuration file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only run the test cases with these ids
        /// Can be specified multiple times: --only HR --only PORTAL
        #[arg(long = "only")]
        only: Vec<String>,
    },

    /// Check a suite file without opening a browser
    Validate {
        /// Path to the suite file
        suite: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Configuration file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
