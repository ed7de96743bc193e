//! Step commands
//!
//! A declared [`Step`] is resolved into a [`Command`] before it runs. The
//! set of commands is closed; a name outside it resolves to
//! [`Error::UnhandledCommand`].

use regex::RegexBuilder;
use std::fmt;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::webdriver::Locator;

use super::config::Step;
use super::health::DEFAULT_KEY;

/// How an expected string is compared against page text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole string, ignoring case
    Exact,
    /// Regular expression searched anywhere, ignoring case
    Pattern,
}

impl MatchMode {
    /// `equals` selects exact matching; anything else is a pattern
    pub fn from_assert(assert: &str) -> Self {
        if assert == "equals" {
            MatchMode::Exact
        } else {
            MatchMode::Pattern
        }
    }

    pub fn matches(&self, actual: &str, expected: &str) -> Result<bool> {
        match self {
            MatchMode::Exact => Ok(actual.to_lowercase() == expected.to_lowercase()),
            MatchMode::Pattern => {
                let pattern = RegexBuilder::new(expected)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::invalid_step("pattern", format!("bad pattern '{}': {}", expected, e)))?;
                Ok(pattern.is_match(actual))
            }
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Exact => write!(f, "equals"),
            MatchMode::Pattern => write!(f, "matches"),
        }
    }
}

/// An element lookup as declared, kept for error messages
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub strategy: String,
    pub value: String,
    pub locator: Locator,
}

impl Target {
    fn from_step(step: &Step) -> Result<Self> {
        let strategy = step.required("element_name")?;
        let value = step.required("element_value")?;
        let locator = Locator::parse(&strategy, &value)
            .map_err(|e| Error::invalid_step(&step.command, e.to_string()))?;
        Ok(Self {
            strategy,
            value,
            locator,
        })
    }
}

/// A resolved step command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open {
        url: String,
    },
    VerifyTitle {
        mode: MatchMode,
        assert: String,
        expected: String,
    },
    Find(Target),
    Click(Target),
    FindText {
        mode: MatchMode,
        expected: String,
    },
    Type {
        text: String,
    },
    SwitchToFrame {
        name: String,
    },
    Wait {
        duration: Duration,
    },
    GetAttribute {
        name: String,
    },
    /// Health document with dependency lists under categories
    Health {
        key: String,
    },
    /// Health document with a top-level key and named entries
    HealthCheck {
        key: String,
        expected: Option<String>,
    },
}

impl Command {
    /// Resolve a declared step
    pub fn from_step(step: &Step) -> Result<Self> {
        let command = match step.command.as_str() {
            "Open" => Command::Open {
                url: step.required("url")?,
            },
            "Verify title" => {
                let assert = step.param_or("assert", "equals");
                Command::VerifyTitle {
                    mode: MatchMode::from_assert(&assert),
                    assert,
                    expected: step.required("title_expected")?,
                }
            }
            "Find" => Command::Find(Target::from_step(step)?),
            "Click" => Command::Click(Target::from_step(step)?),
            "FindText" => Command::FindText {
                mode: MatchMode::from_assert(&step.param_or("assert", "equals")),
                expected: step.required("expected_text")?,
            },
            "Type" => Command::Type {
                text: step.required("text")?,
            },
            "Switch to" => {
                let target = step.required("element_name")?;
                if !target.eq_ignore_ascii_case("frame") {
                    return Err(Error::invalid_step(
                        &step.command,
                        format!("cannot switch to '{}', only Frame is supported", target),
                    ));
                }
                Command::SwitchToFrame {
                    name: step.required("element_value")?,
                }
            }
            "Wait" => {
                let raw = step.required("seconds")?;
                let duration = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
                    .ok_or_else(|| Error::invalid_step(&step.command, format!("'{}' is not a number of seconds", raw)))?;
                Command::Wait { duration }
            }
            "Get attribute" => Command::GetAttribute {
                name: step.required("attribute")?,
            },
            "Health" => Command::Health {
                key: step.param_or("key", DEFAULT_KEY),
            },
            "HealthCheck" => Command::HealthCheck {
                key: step.param_or("key", DEFAULT_KEY),
                expected: step.param("value").filter(|v| !v.is_empty()),
            },
            other => return Err(Error::UnhandledCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Whether the network log is drained before this command runs
    pub fn starts_action(&self) -> bool {
        matches!(self, Command::Open { .. } | Command::Click(_))
    }

    /// Human-readable description recorded with the step result
    pub fn describe(&self) -> String {
        match self {
            Command::Open { url } => format!("Go to url {}", url),
            Command::VerifyTitle {
                assert, expected, ..
            } => format!("Verify title {} \"{}\"", assert, expected),
            Command::Find(target) => format!("Find element with {} \"{}\"", target.strategy, target.value),
            Command::Click(target) => format!("Click element with {} \"{}\"", target.strategy, target.value),
            Command::FindText { expected, .. } => format!("Find text \"{}\"", expected),
            Command::Type { text } => format!("Enter text \"{}\"", text),
            Command::SwitchToFrame { name } => format!("Switch to Frame with name \"{}\"", name),
            Command::Wait { duration } => format!("Wait {} seconds", duration.as_secs_f64()),
            Command::GetAttribute { name } => format!("Get \"{}\" attribute of current element", name),
            Command::Health { .. } | Command::HealthCheck { .. } => {
                "Evaluate Health Check results".to_string()
            }
        }
    }
}
