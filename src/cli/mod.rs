//! CLI command handling
//!
//! Dispatches CLI commands and formats their terminal output.

use std::fmt::Display;
use std::path::Path;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::session::{HubLauncher, SessionPool};
use crate::testing::{self, Command, ResultDocument, Status, SuiteReport, TestSuite};

/// Dispatch a CLI command. `Ok(false)` means the command ran but its
/// verdict is failing and the process should exit non-zero.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            suite,
            output,
            screenshot_always,
            config,
            only,
        } => {
            let mut config = load_config(config.as_deref())?;
            if screenshot_always {
                config.report.screenshot_always = true;
            }

            let mut suite = testing::load_suite(&suite)?;
            if !only.is_empty() {
                suite.cases.retain(|case| only.contains(&case.id));
                if suite.cases.is_empty() {
                    return Err(Error::Config(format!(
                        "No test case matches --only {}",
                        only.join(", ")
                    )));
                }
            }

            // The report itself may own stdout
            let console = Console {
                to_stderr: output.is_none(),
            };
            let report = run(&console, &suite, config).await?;

            let json = serde_json::to_string_pretty(&report)?;
            match &output {
                Some(path) => {
                    std::fs::write(path, json)?;
                    console.line(format!("Report written to {}", path.display()).dimmed());
                }
                None => println!("{}", json),
            }

            Ok(report.passed())
        }

        Commands::Validate { suite } => {
            let suite = testing::load_suite(&suite)?;
            Ok(validate(&suite))
        }

        Commands::Config { config } => {
            let path = Config::source_path(config.as_deref());
            let loaded = load_config(config.as_deref())?;

            match &path {
                Some(path) if path.exists() => println!("Config file: {}", path.display()),
                Some(path) => println!("Config file: {} {}", path.display(), "(not found, using defaults)".dimmed()),
                None => println!("Config file: {}", "(no config directory, using defaults)".dimmed()),
            }
            println!();
            let rendered = toml::to_string_pretty(&loaded)
                .map_err(|e| Error::Config(format!("Failed to render configuration: {}", e)))?;
            print!("{}", rendered);
            Ok(true)
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Where human-readable progress goes
struct Console {
    to_stderr: bool,
}

impl Console {
    fn line(&self, text: impl Display) {
        if self.to_stderr {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }
}

async fn run(console: &Console, suite: &TestSuite, config: Config) -> Result<SuiteReport> {
    let name = suite.name.as_deref().unwrap_or("suite");
    console.line(format!(
        "\n{} {} ({} test cases)",
        "Running Suite:".blue().bold(),
        name.white().bold(),
        suite.cases.len()
    ));

    let launcher = HubLauncher::new(config.clone())?;
    let mut pool = SessionPool::new(Box::new(launcher));

    let pb = ProgressBar::new(suite.cases.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let report = testing::run_suite(&mut pool, suite, &config, |document| {
        pb.suspend(|| print_case(console, document));
        pb.inc(1);
    })
    .await;
    pb.finish_and_clear();

    print_summary(console, &report);
    Ok(report)
}

fn status_label(status: Status) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        Status::Passed => label.green().bold(),
        Status::Warning => label.yellow().bold(),
        Status::Failed => label.red().bold(),
        Status::Debug => label.magenta().bold(),
        Status::Skipped => label.dimmed(),
    }
}

fn print_case(console: &Console, document: &ResultDocument) {
    let results = &document.results;
    console.line(format!(
        "  {:<9} {} {} {}",
        status_label(results.status),
        document.application.id.white().bold(),
        document.application.name.dimmed(),
        format!(
            "[{}/{} steps, {:.2}s]",
            results.executed_count, results.declared_count, results.duration_seconds
        )
        .dimmed()
    ));
    if let Some(error) = &results.error {
        console.line(format!("            {}", error));
    }
    for line in &document.trace {
        console.line(format!("            {} {}", "·".dimmed(), line.dimmed()));
    }
}

fn print_summary(console: &Console, report: &SuiteReport) {
    let s = &report.summary;
    console.line("");
    console.line(format!(
        "{} {} passed, {} warning, {} failed, {} debug, {} skipped ({} steps in {:.2}s)",
        "Summary:".blue().bold(),
        s.passed.to_string().green(),
        s.warning.to_string().yellow(),
        s.failed.to_string().red(),
        s.debug.to_string().magenta(),
        s.skipped,
        s.executed_steps,
        report.duration_seconds
    ));
    if report.passed() {
        console.line(format!("{}", "✓ Suite passed".green().bold()));
    } else {
        console.line(format!("{}", "✗ Suite failed".red().bold()));
    }
}

/// Resolve every step of every test case; prints problems and returns
/// whether the suite is runnable as written
fn validate(suite: &TestSuite) -> bool {
    let name = suite.name.as_deref().unwrap_or("suite");
    println!("\n{} {}", "Validating Suite:".blue().bold(), name.white().bold());

    let mut problems = 0;
    for case in &suite.cases {
        let mut issues = Vec::new();
        if case.profile().name() != case.browser {
            issues.push(format!(
                "browser '{}' is not a known profile, {} will be used",
                case.browser,
                case.profile()
            ));
        }
        for (index, step) in case.steps.iter().enumerate() {
            if let Err(e) = Command::from_step(step) {
                problems += 1;
                issues.push(format!("step {}: {}", index + 1, e));
            }
        }

        if issues.is_empty() {
            println!(
                "  {} {} ({} steps, {} enabled)",
                "✓".green(),
                case.id,
                case.steps.len(),
                case.declared_count()
            );
        } else {
            println!("  {} {}", "✗".red(), case.id);
            for issue in issues {
                println!("      {}", issue);
            }
        }
    }

    if problems == 0 {
        println!("\n{}", "Suite is valid".green().bold());
    } else {
        println!("\n{} {}", problems.to_string().red().bold(), "invalid steps".red());
    }
    problems == 0
}
