//! Test case execution
//!
//! Runs the steps of each test case in order against the pooled browser
//! session for its profile. Every executed step produces exactly one step
//! result; the first step that neither passes nor warns ends the test case
//! and the remaining steps leave no record.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::session::{Environment, SessionPool};
use crate::webdriver::wait::{poll_until, wait_for_element};
use crate::webdriver::{BrowserProfile, BrowserSession, ElementRef, Locator};

use super::command::{Command, MatchMode, Target};
use super::config::{Step, TestCase, TestSuite};
use super::health;
use super::navigation;
use super::report::{Recorder, ResultDocument, Status, StepOutcome, SuiteReport};

const SCREENSHOT_FAILED: &str = "Screenshot capture failed";

/// State of the test case currently executing
struct CaseRun<'a> {
    session: &'a dyn BrowserSession,
    profile: BrowserProfile,
    config: &'a Config,
    recorder: Recorder,
    /// Element selected by the last Find/Click, target of Type and FindText
    current_element: Option<ElementRef>,
}

/// Run every test case of a suite, then release the pooled sessions.
///
/// `on_case` is called with each result document as soon as its test case
/// finishes.
pub async fn run_suite(
    pool: &mut SessionPool,
    suite: &TestSuite,
    config: &Config,
    mut on_case: impl FnMut(&ResultDocument),
) -> SuiteReport {
    let name = suite.name.clone().unwrap_or_else(|| "suite".to_string());
    let started_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let started = Instant::now();
    tracing::info!(suite = %name, cases = suite.cases.len(), "Running suite");

    let mut documents = Vec::with_capacity(suite.cases.len());
    for case in &suite.cases {
        let document = run_test_case(pool, case, config).await;
        on_case(&document);
        documents.push(document);
    }

    pool.release_all().await;
    SuiteReport::new(name, started_at, started.elapsed().as_secs_f64(), documents)
}

/// Run one test case and return its result document. Never fails: a session
/// that cannot be launched yields a `Debug` document without steps.
pub async fn run_test_case(pool: &mut SessionPool, case: &TestCase, config: &Config) -> ResultDocument {
    let profile = case.profile();
    let ip = resolve_ip(&case.url).await;

    let entry = match pool.acquire(profile).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::error!(case = %case.id, profile = %profile, error = %e, "Could not acquire browser session");
            let mut document = ResultDocument::new(case, Environment::unknown(), ip);
            document.results.status = Status::Debug;
            document.results.error = Some(e.to_string());
            return document;
        }
    };

    let mut run = CaseRun {
        session: entry.session.as_ref(),
        profile,
        config,
        recorder: Recorder::new(ResultDocument::new(case, entry.environment.clone(), ip), case.debug),
        current_element: None,
    };

    for step in &case.steps {
        if !step.enabled {
            tracing::debug!(command = %step.command, "Step disabled, skipping");
            run.recorder.skipped(step);
            continue;
        }
        let status = run.execute(step).await;
        if !status.proceeds() {
            tracing::debug!(command = %step.command, status = %status, "Stopping test case");
            break;
        }
    }

    if !case.debug {
        run.capture_evidence().await;
    }
    run.teardown().await;

    let document = run.recorder.into_document();
    tracing::info!(
        case = %case.id,
        status = %document.results.status,
        steps = document.results.executed_count,
        "Test case finished"
    );
    document
}

/// Address the target URL's host resolves to, if any
async fn resolve_ip(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_string();
    let port = parsed.port_or_known_default().unwrap_or(80);
    let lookup = tokio::net::lookup_host((host.as_str(), port));
    let ip = match tokio::time::timeout(Duration::from_secs(5), lookup).await {
        Ok(Ok(mut addrs)) => addrs.next().map(|addr| addr.ip().to_string()),
        _ => {
            tracing::debug!(host = %host, "Could not resolve application address");
            None
        }
    };
    ip
}

impl CaseRun<'_> {
    /// Resolve, run and record one enabled step
    async fn execute(&mut self, step: &Step) -> Status {
        let command = match Command::from_step(step) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(command = %step.command, error = %e, "Cannot dispatch step");
                self.recorder.start();
                return self
                    .recorder
                    .record(step, step.command.clone(), StepOutcome::debug(e.to_string()));
            }
        };

        if command.starts_action() && self.profile.records_network_log() {
            if let Err(e) = self.session.performance_log().await {
                tracing::warn!(error = %e, "Failed to drain performance log");
            }
        }

        let description = command.describe();
        self.recorder.note(description.clone());
        self.recorder.start();
        let outcome = match self.handle(&command).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(command = %step.command, error = %e, "Step raised an error");
                StepOutcome::from(e)
            }
        };
        if let Some(error) = &outcome.error {
            self.recorder.note(format!("{}: {}", outcome.status, error));
        }
        self.recorder.record(step, description, outcome)
    }

    async fn handle(&mut self, command: &Command) -> Result<StepOutcome> {
        match command {
            Command::Open { url } => self.open(url).await,
            Command::VerifyTitle { mode, expected, .. } => self.verify_title(*mode, expected).await,
            Command::Find(target) => Ok(match self.select(target).await {
                Ok(_) => StepOutcome::passed(),
                Err(outcome) => outcome,
            }),
            Command::Click(target) => self.click(target).await,
            Command::FindText { mode, expected } => self.find_text(*mode, expected).await,
            Command::Type { text } => self.type_text(text).await,
            Command::SwitchToFrame { name } => self.switch_to_frame(name).await,
            Command::Wait { duration } => {
                tokio::time::sleep(*duration).await;
                Ok(StepOutcome::passed())
            }
            Command::GetAttribute { name } => self.get_attribute(name).await,
            Command::Health { key } => self.health(|document| health::evaluate_v1(document, key)).await,
            Command::HealthCheck { key, expected } => {
                self.health(|document| health::evaluate_v2(document, key, expected.as_deref()))
                    .await
            }
        }
    }

    async fn open(&mut self, url: &str) -> Result<StepOutcome> {
        self.current_element = None;
        let attempt = navigation::attempt(self.session, self.profile, url, self.config, &mut self.recorder).await;
        Ok(navigation::classify(&attempt, &self.config.navigation))
    }

    async fn verify_title(&mut self, mode: MatchMode, expected: &str) -> Result<StepOutcome> {
        let timeouts = &self.config.timeouts;
        let session = self.session;
        let needle = expected.to_lowercase();
        let needle = needle.as_str();

        // Wait for the title to settle, then judge whatever is there
        let title = poll_until(
            Duration::from_secs(timeouts.expected_title_secs),
            timeouts.poll_interval(),
            || async move {
                let title = session.title().await?;
                Ok(title.to_lowercase().contains(needle).then_some(title))
            },
        )
        .await?;
        let title = match title {
            Some(title) => title,
            None => session.title().await?,
        };
        self.recorder.note(format!("Loaded title: {}", title));

        let outcome = match mode.matches(&title, expected) {
            Ok(true) => StepOutcome::passed(),
            Ok(false) => Error::AssertionMismatch(format!(
                "Unexpected title: \"{}\" instead of \"{}\"",
                title, expected
            ))
            .into(),
            Err(e) => e.into(),
        };
        Ok(outcome.with_extra("title_loaded", title))
    }

    /// Wait for `target` and make it the current element
    async fn select(&mut self, target: &Target) -> std::result::Result<ElementRef, StepOutcome> {
        let timeouts = &self.config.timeouts;
        let found = wait_for_element(
            self.session,
            &target.locator,
            Duration::from_secs(timeouts.element_secs),
            timeouts.poll_interval(),
        )
        .await;

        match found {
            Ok(Some(element)) => {
                self.recorder.note("Element found");
                self.current_element = Some(element.clone());
                Ok(element)
            }
            Ok(None) => Err(StepOutcome::failed(format!(
                "Timeout waiting for element with {}=\"{}\".",
                target.strategy, target.value
            ))),
            Err(Error::ElementNotFound(_)) => Err(StepOutcome::failed(format!(
                "Unable to locate element with {}=\"{}\".",
                target.strategy, target.value
            ))),
            Err(e) => Err(StepOutcome::debug(format!("Unhandled Exception: {}", e))),
        }
    }

    async fn click(&mut self, target: &Target) -> Result<StepOutcome> {
        let element = match self.select(target).await {
            Ok(element) => element,
            Err(outcome) => return Ok(outcome),
        };
        Ok(match self.session.click(&element).await {
            Ok(()) => StepOutcome::passed(),
            Err(e) => StepOutcome::debug(format!("Unhandled Exception: {}", e)),
        })
    }

    async fn find_text(&mut self, mode: MatchMode, expected: &str) -> Result<StepOutcome> {
        let element = match self.current_element.clone() {
            Some(element) => element,
            None => {
                self.recorder.note("No current element, select body");
                let timeouts = &self.config.timeouts;
                let found = wait_for_element(
                    self.session,
                    &Locator::document(),
                    Duration::from_secs(timeouts.element_secs),
                    timeouts.poll_interval(),
                )
                .await;
                match found {
                    Ok(Some(body)) => {
                        self.current_element = Some(body.clone());
                        body
                    }
                    Ok(None) => return Ok(StepOutcome::failed("Timeout waiting for body text using xpath")),
                    Err(Error::ElementNotFound(_)) => {
                        return Ok(StepOutcome::failed("Unable to locate body element using xpath"))
                    }
                    Err(e) => return Ok(StepOutcome::debug(format!("Unhandled Exception: {}", e))),
                }
            }
        };

        let text = self.session.element_text(&element).await?;
        self.recorder.note(format!("Element text: {}", text));
        if mode.matches(&text, expected)? {
            return Ok(StepOutcome::passed());
        }
        Ok(Error::AssertionMismatch(match mode {
            MatchMode::Exact => format!("Unexpected text: \"{}\" instead of \"{}\"", text, expected),
            MatchMode::Pattern => format!("Unexpected text: \"{}\" not found in \"{}\"", expected, text),
        })
        .into())
    }

    async fn type_text(&mut self, text: &str) -> Result<StepOutcome> {
        let accepted = match &self.current_element {
            Some(element) => self.enter(element, text).await,
            None => Err(Error::ElementNotFound("no element selected".to_string())),
        };
        Ok(match accepted {
            Ok(true) => StepOutcome::passed(),
            Ok(false) => StepOutcome::failed("Text entry was not successful"),
            Err(e) => {
                tracing::debug!(error = %e, "Text entry failed");
                StepOutcome::failed("Text entry was not successful")
            }
        })
    }

    /// Click, type and confirm the field now holds `text`
    async fn enter(&self, element: &ElementRef, text: &str) -> Result<bool> {
        let session = self.session;
        let timeouts = &self.config.timeouts;
        session.click(element).await?;
        session.send_keys(element, text).await?;
        let confirmed = poll_until(
            Duration::from_secs(timeouts.input_secs),
            timeouts.poll_interval(),
            || async move {
                let value = session.property(element, "value").await?;
                Ok((value.as_deref() == Some(text)).then_some(()))
            },
        )
        .await?;
        Ok(confirmed.is_some())
    }

    async fn switch_to_frame(&mut self, name: &str) -> Result<StepOutcome> {
        self.current_element = None;
        let timeouts = &self.config.timeouts;
        let session = self.session;
        let switched: Result<bool> = async {
            session.switch_to_default().await?;
            let frame = wait_for_element(
                session,
                &Locator::Name(name.to_string()),
                Duration::from_secs(timeouts.element_secs),
                timeouts.poll_interval(),
            )
            .await?;
            match frame {
                Some(frame) => {
                    session.switch_to_frame(&frame).await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        .await;

        Ok(match switched {
            Ok(true) => StepOutcome::passed(),
            Ok(false) | Err(_) => StepOutcome::failed(format!("Unable to locate element: Frame=\"{}\"", name)),
        })
    }

    async fn get_attribute(&mut self, name: &str) -> Result<StepOutcome> {
        let failed = || StepOutcome::failed(format!("Unable to get \"{}\" attribute of current element", name));
        let Some(element) = &self.current_element else {
            return Ok(failed());
        };
        Ok(match self.session.attribute(element, name).await {
            Ok(value) => {
                self.recorder.note(format!("Attribute {}: {:?}", name, value));
                StepOutcome::passed().with_extra(name, value.map_or(Value::Null, Value::String))
            }
            Err(e) => {
                tracing::debug!(error = %e, "Attribute read failed");
                failed()
            }
        })
    }

    async fn health(
        &mut self,
        evaluate: impl FnOnce(&serde_json::Map<String, Value>) -> StepOutcome,
    ) -> Result<StepOutcome> {
        let source = self.session.page_source().await?;
        self.recorder.note(format!("Page source: {}", source));
        Ok(match health::parse_document(&source) {
            Ok(document) => evaluate(&document),
            Err(Error::SchemaFault(message)) => StepOutcome::failed(message),
            Err(e) => return Err(e),
        })
    }

    /// Attach a screenshot and the network log when the case failed or
    /// capture is always on
    async fn capture_evidence(&mut self) {
        let status = self.recorder.document().status();
        if status != Status::Failed && !self.config.report.screenshot_always {
            return;
        }

        let screenshot = match self.session.screenshot_base64().await {
            Ok(screenshot) => screenshot,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to capture screenshot");
                SCREENSHOT_FAILED.to_string()
            }
        };

        let network_log = if self.profile.records_network_log() {
            match self.session.performance_log().await {
                Ok(entries) => Some(network_entries(entries)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read performance log");
                    None
                }
            }
        } else {
            None
        };

        let results = &mut self.recorder.document_mut().results;
        results.screenshot = Some(screenshot);
        results.network_log = network_log;
    }

    /// Leave the session clean for the next test case; runs whatever the outcome
    async fn teardown(&mut self) {
        self.current_element = None;
        if let Err(e) = self.session.navigate("about:blank").await {
            tracing::warn!(error = %e, "Failed to reset page during teardown");
        }
        if let Err(e) = self.session.delete_all_cookies().await {
            tracing::warn!(error = %e, "Failed to clear cookies during teardown");
        }
    }
}

/// Network-category messages out of raw performance log entries
fn network_entries(entries: Vec<Value>) -> Vec<Value> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let raw = entry.get("message")?.as_str()?;
            let mut parsed: Value = serde_json::from_str(raw).ok()?;
            let message = parsed.get_mut("message").map(Value::take)?;
            let is_network = message
                .get("method")
                .and_then(Value::as_str)
                .is_some_and(|method| method.starts_with("Network"));
            is_network.then_some(message)
        })
        .collect()
}
