//! Result documents and suite report
//!
//! A [`Recorder`] owns the in-progress [`ResultDocument`] of one test case:
//! it times each step, appends exactly one [`StepResult`] per executed step
//! and keeps the derived counters current.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Instant;

use crate::common::Error;
use crate::session::{Environment, UNKNOWN};

use super::config::{Step, TestCase};

/// Verdict of a step, and of a test case through its last executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Passed,
    Warning,
    Failed,
    Debug,
    Skipped,
}

impl Status {
    /// Whether execution continues after a step with this status
    pub fn proceeds(&self) -> bool {
        matches!(self, Status::Passed | Status::Warning)
    }

    /// Whether a downstream pass/fail gate treats this verdict as failing
    pub fn is_failing(&self) -> bool {
        matches!(self, Status::Failed | Status::Debug)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Passed => "Passed",
            Status::Warning => "Warning",
            Status::Failed => "Failed",
            Status::Debug => "Debug",
            Status::Skipped => "Skipped",
        };
        f.write_str(name)
    }
}

/// Record of one declared step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub command: String,
    pub description: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: f64,
    /// Echoed step parameters followed by command-specific fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// The application a test case targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub server: String,
    pub url: String,
}

/// Test case level results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResults {
    pub duration_seconds: f64,
    /// Enabled steps
    pub declared_count: usize,
    /// Steps that were actually run
    pub executed_count: usize,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_log: Option<Vec<Value>>,
}

/// One document per test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDocument {
    pub timestamp: String,
    pub application: Application,
    pub environment: Environment,
    pub results: CaseResults,
    pub steps: Vec<StepResult>,
    /// Handler notes, collected only for debug test cases
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl ResultDocument {
    pub fn new(case: &TestCase, environment: Environment, ip: Option<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            application: Application {
                id: case.id.clone(),
                name: case.display_name().to_string(),
                ip: ip.unwrap_or_else(|| UNKNOWN.to_string()),
                server: case
                    .server
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                url: case.url.clone(),
            },
            environment,
            results: CaseResults {
                duration_seconds: 0.0,
                declared_count: case.declared_count(),
                executed_count: 0,
                status: Status::Skipped,
                error: None,
                screenshot: None,
                network_log: None,
            },
            steps: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.results.status
    }
}

/// What a handler decided about its step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub status: Status,
    pub error: Option<String>,
    /// Command-specific fields added to the step result
    pub extras: Map<String, Value>,
}

impl StepOutcome {
    pub fn passed() -> Self {
        Self {
            status: Status::Passed,
            error: None,
            extras: Map::new(),
        }
    }

    pub fn with_status(status: Status, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
            extras: Map::new(),
        }
    }

    pub fn warning(error: impl Into<String>) -> Self {
        Self::with_status(Status::Warning, error)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::with_status(Status::Failed, error)
    }

    pub fn debug(error: impl Into<String>) -> Self {
        Self::with_status(Status::Debug, error)
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }
}

/// An error a handler gives up on, recorded with the status it maps to
impl From<Error> for StepOutcome {
    fn from(error: Error) -> Self {
        Self::with_status(error.status(), error.to_string())
    }
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Builds the result document of the test case currently executing
pub struct Recorder {
    document: ResultDocument,
    started: Option<Instant>,
    debug: bool,
}

impl Recorder {
    pub fn new(document: ResultDocument, debug: bool) -> Self {
        Self {
            document,
            started: None,
            debug,
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stop the step timer, returning the step duration in seconds
    fn finish(&mut self) -> f64 {
        let elapsed = self
            .started
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or_default();
        round2(elapsed)
    }

    /// Add a handler note; kept in the document for debug test cases
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{}", message);
        if self.debug {
            self.document.trace.push(message);
        }
    }

    /// Append the result of an executed step
    pub fn record(&mut self, step: &Step, description: String, outcome: StepOutcome) -> Status {
        let duration = self.finish();
        let mut fields = step.params.clone();
        fields.extend(outcome.extras);

        let results = &mut self.document.results;
        results.duration_seconds = round2(results.duration_seconds + duration);
        results.executed_count += 1;
        results.status = outcome.status;
        results.error = outcome.error.clone();

        self.document.steps.push(StepResult {
            command: step.command.clone(),
            description,
            status: outcome.status,
            error: outcome.error,
            duration_seconds: duration,
            fields,
        });
        outcome.status
    }

    /// Append a placeholder for a disabled step
    pub fn skipped(&mut self, step: &Step) {
        self.document.steps.push(StepResult {
            command: step.command.clone(),
            description: format!("{} (disabled)", step.command),
            status: Status::Skipped,
            error: None,
            duration_seconds: 0.0,
            fields: step.params.clone(),
        });
    }

    pub fn document(&self) -> &ResultDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ResultDocument {
        &mut self.document
    }

    pub fn into_document(self) -> ResultDocument {
        self.document
    }
}

/// Per-status counters folded over a suite's result documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub cases: usize,
    pub passed: usize,
    pub warning: usize,
    pub failed: usize,
    pub debug: usize,
    pub skipped: usize,
    pub executed_steps: usize,
    pub duration_seconds: f64,
}

impl SuiteSummary {
    pub fn fold(documents: &[ResultDocument]) -> Self {
        documents.iter().fold(Self::default(), |mut summary, doc| {
            summary.cases += 1;
            match doc.results.status {
                Status::Passed => summary.passed += 1,
                Status::Warning => summary.warning += 1,
                Status::Failed => summary.failed += 1,
                Status::Debug => summary.debug += 1,
                Status::Skipped => summary.skipped += 1,
            }
            summary.executed_steps += doc.results.executed_count;
            summary.duration_seconds = round2(summary.duration_seconds + doc.results.duration_seconds);
            summary
        })
    }

    /// Gate verdict: warnings pass, failures and instrumentation faults do not
    pub fn passed(&self) -> bool {
        self.failed == 0 && self.debug == 0
    }
}

/// Report of a whole suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub name: String,
    pub started_at: String,
    pub duration_seconds: f64,
    pub summary: SuiteSummary,
    pub cases: Vec<ResultDocument>,
}

impl SuiteReport {
    pub fn new(name: String, started_at: String, duration_seconds: f64, cases: Vec<ResultDocument>) -> Self {
        Self {
            name,
            started_at,
            duration_seconds: round2(duration_seconds),
            summary: SuiteSummary::fold(&cases),
            cases,
        }
    }

    pub fn passed(&self) -> bool {
        self.summary.passed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case() -> TestCase {
        serde_json::from_value(json!({
            "id": "APP",
            "url": "https://app.example.com",
            "server": "WEB01",
            "steps": [
                {"command": "Open", "enabled": 1, "url": "https://app.example.com"},
                {"command": "Wait", "enabled": 0, "seconds": 1}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_new_document() {
        let doc = ResultDocument::new(&case(), Environment::unknown(), None);
        assert_eq!(doc.application.name, "APP");
        assert_eq!(doc.application.server, "web01");
        assert_eq!(doc.application.ip, UNKNOWN);
        assert_eq!(doc.results.declared_count, 1);
        assert_eq!(doc.results.status, Status::Skipped);
    }

    #[test]
    fn test_record_echoes_params_and_extras() {
        let case = case();
        let mut recorder = Recorder::new(ResultDocument::new(&case, Environment::unknown(), None), false);

        recorder.start();
        let status = recorder.record(
            &case.steps[0],
            "Go to url".into(),
            StepOutcome::warning("Not authorized").with_extra("url_loaded", "https://idp/"),
        );
        recorder.skipped(&case.steps[1]);

        assert_eq!(status, Status::Warning);
        let doc = recorder.into_document();
        assert_eq!(doc.results.executed_count, 1);
        assert_eq!(doc.results.status, Status::Warning);
        assert_eq!(doc.results.error.as_deref(), Some("Not authorized"));
        assert_eq!(doc.steps.len(), 2);
        assert_eq!(doc.steps[0].fields["url"], "https://app.example.com");
        assert_eq!(doc.steps[0].fields["url_loaded"], "https://idp/");
        assert_eq!(doc.steps[1].status, Status::Skipped);
    }

    #[test]
    fn test_step_result_serializes_flat() {
        let case = case();
        let mut recorder = Recorder::new(ResultDocument::new(&case, Environment::unknown(), None), false);
        recorder.start();
        recorder.record(&case.steps[0], "Go to url".into(), StepOutcome::passed());

        let value = serde_json::to_value(recorder.document()).unwrap();
        let step = &value["steps"][0];
        assert_eq!(step["status"], "Passed");
        assert_eq!(step["url"], "https://app.example.com");
        assert!(step.get("error").is_none());
        assert!(step["durationSeconds"].is_number());
        assert_eq!(value["results"]["executedCount"], 1);
        assert!(value.get("trace").is_none());
    }

    #[test]
    fn test_notes_kept_only_for_debug_cases() {
        let case = case();
        let mut quiet = Recorder::new(ResultDocument::new(&case, Environment::unknown(), None), false);
        quiet.note("hidden");
        assert!(quiet.document().trace.is_empty());

        let mut loud = Recorder::new(ResultDocument::new(&case, Environment::unknown(), None), true);
        loud.note("kept");
        assert_eq!(loud.document().trace, vec!["kept".to_string()]);
    }

    #[test]
    fn test_summary_gate() {
        let mut passed = ResultDocument::new(&case(), Environment::unknown(), None);
        passed.results.status = Status::Passed;
        let mut warned = passed.clone();
        warned.results.status = Status::Warning;

        let summary = SuiteSummary::fold(&[passed.clone(), warned]);
        assert_eq!(summary.cases, 2);
        assert_eq!(summary.warning, 1);
        assert!(summary.passed());

        let mut debug = passed;
        debug.results.status = Status::Debug;
        assert!(!SuiteSummary::fold(&[debug]).passed());
    }
}
