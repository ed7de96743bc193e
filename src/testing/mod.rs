//! UI check runner
//!
//! Reads suites of test cases and drives each one through a pooled browser
//! session, producing one structured result document per test case.

mod command;
mod config;
mod health;
mod navigation;
mod report;
mod runner;

#[cfg(test)]
pub mod fake;

pub use command::{Command, MatchMode, Target};
pub use config::{load_suite, parse_suite, Step, TestCase, TestSuite};
pub use health::{evaluate_v1, evaluate_v2, parse_document, DEFAULT_KEY};
pub use navigation::{classify, NavigationAttempt, PageSnapshot};
pub use report::{
    Application, CaseResults, Recorder, ResultDocument, Status, StepOutcome, StepResult,
    SuiteReport, SuiteSummary,
};
pub use runner::{run_suite, run_test_case};
