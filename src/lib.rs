//! webcheck - scripted browser checks against monitored web applications
//!
//! This library drives remote browser sessions through declared step
//! sequences and classifies what each application did into a small set of
//! verdicts (Passed, Warning, Failed, Debug, Skipped).

pub mod cli;
pub mod commands;
pub mod common;
pub mod session;
pub mod testing;
pub mod webdriver;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{ResultDocument, Status, SuiteReport};
