//! Test suite definitions
//!
//! Defines the data structures for deserializing suite files. YAML is the
//! default; files ending in `.json` are read as JSON. The upper-case keys of
//! older suite files (`ITEM_ID`, `URL`, `TESTS`, ...) are accepted as aliases.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::path::Path;

use crate::common::{Error, Result};
use crate::webdriver::BrowserProfile;

/// A suite of test cases run against one pool of browser sessions
#[derive(Deserialize, Debug, Clone)]
pub struct TestSuite {
    /// Name of the suite (defaults to the file stem)
    #[serde(default)]
    pub name: Option<String>,
    /// Test cases in execution order
    #[serde(alias = "applications", alias = "APPS")]
    pub cases: Vec<TestCase>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuiteFile {
    Suite(TestSuite),
    Cases(Vec<TestCase>),
}

/// One application under test and the steps run against it
#[derive(Deserialize, Debug, Clone)]
pub struct TestCase {
    /// Identifier of the monitored application
    #[serde(alias = "ITEM_ID")]
    pub id: String,
    /// Display name (defaults to the id)
    #[serde(default, alias = "ITEM_NAME")]
    pub name: Option<String>,
    /// Target URL of the application
    #[serde(alias = "URL")]
    pub url: String,
    /// Browser profile name (Chrome, ChromeIncognito, Firefox)
    #[serde(default = "default_browser", alias = "BROWSER")]
    pub browser: String,
    /// Server hosting the application, when known
    #[serde(default, alias = "SERVER")]
    pub server: Option<String>,
    /// Collect a step trace into the result instead of capturing screenshots
    #[serde(default, alias = "DEBUG", deserialize_with = "flag")]
    pub debug: bool,
    /// The ordered steps
    #[serde(default, alias = "TESTS")]
    pub steps: Vec<Step>,
}

fn default_browser() -> String {
    "Firefox".to_string()
}

impl TestCase {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn profile(&self) -> BrowserProfile {
        BrowserProfile::from_name(&self.browser)
    }

    /// Number of steps that are enabled and will be attempted
    pub fn declared_count(&self) -> usize {
        self.steps.iter().filter(|s| s.enabled).count()
    }
}

/// A declared step: a command name, an enabled flag and free-form parameters
#[derive(Deserialize, Debug, Clone)]
pub struct Step {
    /// Command name, e.g. "Open" or "Verify title"
    pub command: String,
    /// Disabled steps are reported as skipped and never run
    #[serde(default, deserialize_with = "flag")]
    pub enabled: bool,
    /// Every other key, echoed back into the step result
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Step {
    /// A parameter rendered as text; numbers and booleans are accepted too
    pub fn param(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A parameter that must be present
    pub fn required(&self, key: &str) -> Result<String> {
        self.param(key)
            .ok_or_else(|| Error::invalid_step(&self.command, format!("missing parameter '{}'", key)))
    }

    /// A parameter that falls back to `default` when absent or empty
    pub fn param_or(&self, key: &str, default: &str) -> String {
        self.param(key)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Integer-like flag: `1`, `"1"` and `true` are set, anything else is not
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i == 1,
        Some(Flag::Float(f)) => f == 1.0,
        Some(Flag::Text(s)) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true")
        }
        None => false,
    })
}

/// Parse suite text; `json` selects JSON, otherwise YAML
pub fn parse_suite(content: &str, json: bool) -> Result<TestSuite> {
    let file: SuiteFile = if json {
        serde_json::from_str(content)?
    } else {
        serde_yaml::from_str(content)?
    };
    Ok(match file {
        SuiteFile::Suite(suite) => suite,
        SuiteFile::Cases(cases) => TestSuite { name: None, cases },
    })
}

/// Load a suite file from disk
pub fn load_suite(path: &Path) -> Result<TestSuite> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut suite = parse_suite(&content, json).map_err(|e| {
        Error::Config(format!("Failed to parse suite '{}': {}", path.display(), e))
    })?;

    if suite.name.is_none() {
        suite.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    Ok(suite)
}
