//! Health document evaluation
//!
//! Applications expose a JSON health document at a known URL. Two layouts
//! are in use:
//!
//! - v1 groups dependency objects in lists under category keys, each object
//!   carrying the health key.
//! - v2 carries the health key at the top level plus an optional `entries`
//!   map of named dependencies carrying the same key.

use serde_json::{Map, Value};

use crate::common::text::strip_markup;
use crate::common::{Error, Result};

use super::report::StepOutcome;

/// Health key looked up when a step does not name one
pub const DEFAULT_KEY: &str = "isHealthy";

const NOT_AN_OBJECT: &str = "The health check did not return a valid JSON object";
const NOT_PASSED: &str = "The health check did not pass";

/// Strip markup from a page source and parse it as a JSON object
pub fn parse_document(source: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(&strip_markup(source)) {
        Ok(Value::Object(document)) => Ok(document),
        _ => Err(Error::SchemaFault(NOT_AN_OBJECT.to_string())),
    }
}

/// `true` or `1` in any representation, case-insensitively
pub fn is_truthy(value: &Value) -> bool {
    let text = match value {
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    text == "true" || text == "1"
}

fn render(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "None".to_string(),
    }
}

/// Evaluate a v1 document: every dependency object listed under any
/// category must carry a truthy `key`. The first offending object is
/// attached to the outcome.
pub fn evaluate_v1(document: &Map<String, Value>, key: &str) -> StepOutcome {
    let dependencies = document
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|dependency| dependency.is_object());

    for dependency in dependencies {
        match dependency.get(key) {
            None => {
                return StepOutcome::failed(format!(
                    "The key \"{}\" was not found in the Health Check output",
                    key
                ))
                .with_extra("failed_dependency", dependency.clone());
            }
            Some(value) if !is_truthy(value) => {
                return StepOutcome::failed(NOT_PASSED)
                    .with_extra("failed_dependency", dependency.clone());
            }
            Some(_) => {}
        }
    }
    StepOutcome::passed()
}

/// Evaluate a v2 document against `expected` (truthiness when `None`).
///
/// Named entries are always inspected so an unhealthy dependency fails the
/// check even when the top-level flag claims health.
pub fn evaluate_v2(document: &Map<String, Value>, key: &str, expected: Option<&str>) -> StepOutcome {
    let healthy = |value: Option<&Value>| match (value, expected) {
        (None, _) => false,
        (Some(value), None) => is_truthy(value),
        (Some(value), Some(expected)) => render(Some(value)).eq_ignore_ascii_case(expected),
    };

    let failing: Vec<String> = document
        .get("entries")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(name, entry)| {
                    let entry = entry.as_object()?;
                    let value = entry.get(key);
                    (!healthy(value)).then(|| format!("{} ({}: {})", name, key, render(value)))
                })
                .collect()
        })
        .unwrap_or_default();

    if !failing.is_empty() {
        return StepOutcome::failed(format!(
            "Health check failed for dependencies: {}",
            failing.join(", ")
        ));
    }

    let status = document.get(key);
    if !healthy(status) {
        return StepOutcome::failed(format!("Health check failed with {}: {}", key, render(status)));
    }
    StepOutcome::passed()
}
