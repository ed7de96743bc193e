//! Navigation outcome classification
//!
//! Opening a URL happens in two phases. [`attempt`] drives the browser and
//! captures everything the verdict depends on into a [`NavigationAttempt`].
//! [`classify`] then turns that capture into exactly one [`StepOutcome`]
//! without touching the browser, so the same capture always yields the same
//! verdict.
//!
//! A loaded page is run through [`CASCADE`], an ordered list of checks. The
//! first check that yields an outcome wins. More specific signals (explicit
//! banners, browser error chrome) come before weaker ones (a missing title).
//! Anything that looks like denied access is a `Warning`, never `Failed`.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::common::config::{Config, NavigationConfig};
use crate::common::text::sanitize;
use crate::common::{Error, Result};
use crate::webdriver::wait::{poll_until, wait_for_element};
use crate::webdriver::{BrowserProfile, BrowserSession, Locator};

use super::report::{Recorder, Status, StepOutcome};

static AUTH_DENIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\D|^)40[13](?:\D|$)|unauthorized|denied").expect("valid auth pattern")
});

static TITLE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\D|^)[45]\d{2}(?:\D|$)|problem|failed|service\sunavailable|not\savailable|error|denied")
        .expect("valid title error pattern")
});

static APOLOGY_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)apology|outage").expect("valid apology pattern"));

static PLANNED_OUTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Planned").expect("valid planned outage pattern"));

static BODY_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\D|^)[45]\d{2}(?:\D|$)|error|^blank").expect("valid body error pattern")
});

/// Source Chrome reports while its own login prompt blocks the page
const CHROME_LOGIN_PROMPT: &str = "<html><head></head><body></body></html>";

const BLANK_PAGE: &str = "Blank Page Loaded";
const NO_PAGE_TEXT: &str = "failed to get page text";

/// What a loaded page looked like
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    /// Page text shown instead of a title after a blocking prompt
    pub access_error: Option<String>,
    /// Text of the in-page error banner
    pub toast: Option<String>,
    /// First heading, read on apology/outage pages
    pub heading: Option<String>,
    /// Message of a browser-rendered network error page
    pub net_error: Option<String>,
    /// Page text, read when the title is blank
    pub body: Option<String>,
}

/// Result of driving a navigation
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationAttempt {
    Loaded(PageSnapshot),
    /// The page load bound expired; `page_bytes` is the source length at that point
    TimedOut { page_bytes: usize, limit_secs: u64 },
    /// The remote session raised an error while loading
    Faulted {
        message: String,
        net_error: Option<String>,
    },
    /// Anything the classifier cannot attribute to the application
    Unexpected { detail: String },
}

/// A single check of the cascade
pub type Check = fn(&PageSnapshot, &NavigationConfig) -> Option<StepOutcome>;

/// Checks in priority order
pub const CASCADE: [(&str, Check); 6] = [
    ("access error", access_error),
    ("toast banner", toast_banner),
    ("apology page", apology_page),
    ("title error", title_error),
    ("native error", native_error),
    ("blank title", blank_title),
];

/// Verdict of a navigation attempt
pub fn classify(attempt: &NavigationAttempt, settings: &NavigationConfig) -> StepOutcome {
    match attempt {
        NavigationAttempt::Loaded(snapshot) => CASCADE
            .iter()
            .find_map(|(name, check)| {
                let outcome = check(snapshot, settings)?;
                tracing::debug!(check = *name, status = %outcome.status, "Navigation check triggered");
                Some(outcome)
            })
            .unwrap_or_else(StepOutcome::passed)
            .with_extra("url_loaded", snapshot.url.clone()),
        NavigationAttempt::TimedOut { page_bytes, limit_secs } => {
            let bytes_loaded = if *page_bytes < settings.blank_page_bytes {
                0
            } else {
                *page_bytes
            };
            StepOutcome::failed(format!("Timeout: Page did not load within {} seconds", limit_secs))
                .with_extra("bytes_loaded", bytes_loaded)
        }
        NavigationAttempt::Faulted { message, net_error } => match net_error {
            Some(net_error) => anomaly(net_error),
            // Dismissing a login prompt can surface as a session error
            None if message.contains("user prompt dialog") => StepOutcome::warning(message.clone()),
            None => anomaly(message),
        },
        NavigationAttempt::Unexpected { detail } => {
            StepOutcome::debug(format!("An unknown error occured: {}", detail))
        }
    }
}

fn denied(text: &str) -> bool {
    AUTH_DENIED.is_match(text)
}

/// Outcome of a page anomaly; authorization problems only warn
fn anomaly(text: &str) -> StepOutcome {
    if denied(text) {
        StepOutcome::warning(text)
    } else {
        Error::NavigationAnomaly(text.to_string()).into()
    }
}

fn access_error(page: &PageSnapshot, settings: &NavigationConfig) -> Option<StepOutcome> {
    let error = page.access_error.as_deref().filter(|e| !e.is_empty())?;
    // A browser error page behind the prompt decides the verdict
    if let Some(outcome) = native_error(page, settings) {
        return Some(outcome);
    }
    Some(StepOutcome::warning(error))
}

fn toast_banner(page: &PageSnapshot, _: &NavigationConfig) -> Option<StepOutcome> {
    let toast = page.toast.as_deref().filter(|t| !t.is_empty())?;
    Some(anomaly(toast))
}

fn apology_page(page: &PageSnapshot, _: &NavigationConfig) -> Option<StepOutcome> {
    if !APOLOGY_URL.is_match(&page.url) {
        return None;
    }
    Some(match page.heading.as_deref() {
        Some(heading) if PLANNED_OUTAGE.is_match(heading) => StepOutcome::warning(heading),
        _ => anomaly(&page.title),
    })
}

fn title_error(page: &PageSnapshot, _: &NavigationConfig) -> Option<StepOutcome> {
    if page.title.is_empty() || !TITLE_ERROR.is_match(&page.title) {
        return None;
    }
    Some(anomaly(&page.title))
}

fn native_error(page: &PageSnapshot, _: &NavigationConfig) -> Option<StepOutcome> {
    let message = page.net_error.as_deref().filter(|e| !e.is_empty())?;
    Some(anomaly(message))
}

fn blank_title(page: &PageSnapshot, settings: &NavigationConfig) -> Option<StepOutcome> {
    if !page.title.is_empty() {
        return None;
    }
    let body = match page.body.as_deref() {
        None => NO_PAGE_TEXT,
        Some("") => BLANK_PAGE,
        Some(body) => body,
    };

    // A JSON object is a health document, not a broken page
    if matches!(serde_json::from_str::<serde_json::Value>(body), Ok(serde_json::Value::Object(_))) {
        return Some(StepOutcome::passed());
    }
    if denied(body) {
        return Some(anomaly(body));
    }
    // Likely a real page whose title had not rendered yet
    let chars = body.chars().count();
    if chars >= settings.large_body_chars {
        return Some(StepOutcome::warning(format!(
            "Page title was blank after loading {} characters of content",
            chars
        )));
    }
    if BODY_ERROR.is_match(body) {
        return Some(anomaly(body));
    }
    Some(StepOutcome::passed())
}

/// Navigate to `url` and capture the page for classification
pub async fn attempt(
    session: &dyn BrowserSession,
    profile: BrowserProfile,
    url: &str,
    config: &Config,
    recorder: &mut Recorder,
) -> NavigationAttempt {
    match load(session, profile, url, config, recorder).await {
        Ok(snapshot) => NavigationAttempt::Loaded(snapshot),
        Err(Error::Timeout(_)) => {
            recorder.note("Page load timed out");
            let page_bytes = session.page_source().await.map(|s| s.len()).unwrap_or_default();
            recorder.note(format!("Bytes loaded: {}", page_bytes));
            NavigationAttempt::TimedOut {
                page_bytes,
                limit_secs: config.timeouts.page_load_secs,
            }
        }
        Err(e) if e.is_transport() => {
            recorder.note(format!("Remote session error: {}", e));
            let message = match e {
                Error::WebDriver { message, .. } => message,
                other => other.to_string(),
            };
            NavigationAttempt::Faulted {
                message: sanitize(&message),
                net_error: net_error(session, profile).await,
            }
        }
        Err(e) => {
            recorder.note(format!("Unhandled error: {}", e));
            NavigationAttempt::Unexpected {
                detail: e.to_string(),
            }
        }
    }
}

async fn load(
    session: &dyn BrowserSession,
    profile: BrowserProfile,
    url: &str,
    config: &Config,
    recorder: &mut Recorder,
) -> Result<PageSnapshot> {
    let mut snapshot = PageSnapshot::default();

    session.navigate(url).await?;
    recorder.note(format!("Url opened: {}", url));

    snapshot.title = match wait_for_title(session, config).await {
        Ok(title) => title,
        Err(Error::UnexpectedAlert(text)) => {
            recorder.note(format!("Alert present, preventing title: {}", text));
            dismiss_alerts(session, config).await?;
            let title = wait_for_title(session, config).await?;
            if title.is_empty() {
                recorder.note("Page title is blank, get page source text");
                snapshot.access_error = page_text(session).await.filter(|t| !t.is_empty());
            }
            title
        }
        Err(e) => return Err(e),
    };
    recorder.note(format!("Page title: {}", snapshot.title));

    let current = session.current_url().await?;
    let sso = &config.navigation.sso_hosts;
    if sso.iter().any(|host| current.contains(host.as_str())) {
        recorder.note("SSO login prompt detected");
        if let Err(e) = complete_sso(session, url, config).await {
            tracing::warn!(error = %e, "Failed to complete SSO prompt");
            recorder.note("Failed to login to SSO page");
        }
    }

    if snapshot.title.is_empty() && session.page_source().await? == CHROME_LOGIN_PROMPT {
        recorder.note("Chrome login prompt detected");
        snapshot.access_error = Some("Not authorized".to_string());
    }

    snapshot.url = session.current_url().await?;
    recorder.note(format!("Url loaded: {}", snapshot.url));

    snapshot.toast = element_text(session, &Locator::ClassName(config.navigation.toast_class.clone())).await;
    if APOLOGY_URL.is_match(&snapshot.url) {
        snapshot.heading = heading(session).await;
    }
    snapshot.net_error = net_error(session, profile).await;
    if snapshot.title.is_empty() {
        snapshot.body = page_text(session).await;
    }

    tracing::debug!(title = %snapshot.title, url = %snapshot.url, "Captured page");
    Ok(snapshot)
}

/// Wait briefly for a non-empty title; an empty string when none shows up
async fn wait_for_title(session: &dyn BrowserSession, config: &Config) -> Result<String> {
    let timeout = Duration::from_secs(config.timeouts.title_secs);
    let title = poll_until(timeout, config.timeouts.poll_interval(), || async move {
        let title = session.title().await?;
        Ok((!title.is_empty()).then_some(title))
    })
    .await?;
    Ok(title.unwrap_or_default())
}

/// Dismiss prompts until none is left or the alert bound expires
async fn dismiss_alerts(session: &dyn BrowserSession, config: &Config) -> Result<()> {
    let timeout = Duration::from_secs(config.timeouts.alert_secs);
    let cleared = poll_until(timeout, config.timeouts.poll_interval(), || async move {
        match session.dismiss_alert().await {
            Ok(()) => Ok(None),
            Err(Error::NoSuchAlert) => Ok(Some(())),
            Err(e) => Err(e),
        }
    })
    .await?;
    if cleared.is_none() {
        tracing::warn!("Prompts still open after dismissing for {}s", config.timeouts.alert_secs);
    }
    Ok(())
}

async fn complete_sso(session: &dyn BrowserSession, target: &str, config: &Config) -> Result<()> {
    let timeout = Duration::from_secs(config.timeouts.sso_secs);
    let interval = config.timeouts.poll_interval();

    let email = Locator::XPath(r#"//*/input[@type="email"]"#.to_string());
    let field = wait_for_element(session, &email, timeout, interval)
        .await?
        .ok_or(Error::Timeout(config.timeouts.sso_secs))?;
    session.send_keys(&field, &config.user.email).await?;

    let submit = Locator::XPath(r#"//*/input[@type="submit"]"#.to_string());
    let button = wait_for_element(session, &submit, timeout, interval)
        .await?
        .ok_or(Error::Timeout(config.timeouts.sso_secs))?;
    session.click(&button).await?;

    poll_until(timeout, interval, || async move {
        let current = session.current_url().await?;
        Ok(current.contains(target).then_some(()))
    })
    .await?
    .ok_or(Error::Timeout(config.timeouts.sso_secs))
}

/// Sanitized text of the first element matching `locator`, if any
async fn element_text(session: &dyn BrowserSession, locator: &Locator) -> Option<String> {
    let element = session.find_element(locator).await.ok()?;
    let text = session.element_text(&element).await.ok()?;
    Some(sanitize(&text)).filter(|t| !t.is_empty())
}

/// Sanitized text of the whole page
async fn page_text(session: &dyn BrowserSession) -> Option<String> {
    let document = session.find_element(&Locator::document()).await.ok()?;
    let text = session.element_text(&document).await.ok()?;
    Some(sanitize(&text))
}

async fn heading(session: &dyn BrowserSession) -> Option<String> {
    let h1 = session.find_element(&Locator::TagName("h1".to_string())).await.ok()?;
    session.property(&h1, "innerHTML").await.ok().flatten()
}

/// Message of the browser's own network error page
async fn net_error(session: &dyn BrowserSession, profile: BrowserProfile) -> Option<String> {
    let page = session
        .find_element(&Locator::ClassName("neterror".to_string()))
        .await
        .ok()?;
    let message_id = Locator::Id(profile.net_error_message_id().to_string());
    let message = session.find_child(&page, &message_id).await.ok()?;
    let text = session.element_text(&message).await.ok()?;
    Some(sanitize(&text)).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake::FakeSession;
    use crate::testing::report::ResultDocument;
    use crate::session::Environment;

    fn settings() -> NavigationConfig {
        NavigationConfig::default()
    }

    fn page(title: &str, url: &str) -> PageSnapshot {
        PageSnapshot {
            title: title.to_string(),
            url: url.to_string(),
            ..PageSnapshot::default()
        }
    }

    fn verdict(snapshot: PageSnapshot) -> StepOutcome {
        classify(&NavigationAttempt::Loaded(snapshot), &settings())
    }

    #[test]
    fn test_clean_page_passes() {
        let outcome = verdict(page("Home Page", "https://app.example.com/"));
        assert_eq!(outcome.status, Status::Passed);
        assert_eq!(outcome.extras["url_loaded"], "https://app.example.com/");
    }

    #[test]
    fn test_toast_wins_over_blank_title() {
        let mut snapshot = page("", "https://app.example.com/");
        snapshot.toast = Some("Server error while loading dashboard".to_string());
        snapshot.body = Some("".to_string());

        let outcome = verdict(snapshot);
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.error.as_deref(), Some("Server error while loading dashboard"));
    }

    #[test]
    fn test_denied_anomalies_are_warnings() {
        let mut toast = page("Home", "https://app.example.com/");
        toast.toast = Some("Error 403: you are not allowed here".to_string());
        assert_eq!(verdict(toast).status, Status::Warning);

        let title = page("401 - Unauthorized: Access is denied", "https://app.example.com/");
        assert_eq!(verdict(title).status, Status::Warning);

        let mut blank = page("", "https://app.example.com/");
        blank.body = Some("Error: Access Denied".to_string());
        assert_eq!(verdict(blank).status, Status::Warning);
    }

    #[test]
    fn test_denied_apology_native_and_fault_are_warnings() {
        let apology = page("403 - Access Denied", "https://status.example.com/apology.html");
        let outcome = verdict(apology);
        assert_eq!(outcome.status, Status::Warning);
        assert_eq!(outcome.error.as_deref(), Some("403 - Access Denied"));

        let mut native = page("app.example.com", "https://app.example.com/");
        native.net_error = Some("ERR_ACCESS_DENIED".to_string());
        assert_eq!(verdict(native).status, Status::Warning);

        let mut prompt = page("", "https://app.example.com/");
        prompt.access_error = Some("Not authorized".to_string());
        prompt.net_error = Some("ERR_ACCESS_DENIED".to_string());
        assert_eq!(verdict(prompt).status, Status::Warning);

        let fault = NavigationAttempt::Faulted {
            message: "401 unauthorized".to_string(),
            net_error: None,
        };
        let outcome = classify(&fault, &settings());
        assert_eq!(outcome.status, Status::Warning);
        assert_eq!(outcome.error.as_deref(), Some("401 unauthorized"));

        let rejected = NavigationAttempt::Faulted {
            message: "net::ERR_CONNECTION_RESET".to_string(),
            net_error: Some("ERR_ACCESS_DENIED".to_string()),
        };
        assert_eq!(classify(&rejected, &settings()).status, Status::Warning);

        let reset = NavigationAttempt::Faulted {
            message: "net::ERR_CONNECTION_RESET".to_string(),
            net_error: None,
        };
        assert_eq!(classify(&reset, &settings()).status, Status::Failed);
    }

    #[test]
    fn test_title_error_signature_fails() {
        for title in ["503 Service Unavailable", "There was a problem", "Server Error"] {
            let outcome = verdict(page(title, "https://app.example.com/"));
            assert_eq!(outcome.status, Status::Failed, "{}", title);
            assert_eq!(outcome.error.as_deref(), Some(title));
        }
        // Digits that are not a status code
        assert_eq!(verdict(page("Report 2024", "https://app.example.com/")).status, Status::Passed);
    }

    #[test]
    fn test_apology_page() {
        let mut planned = page("We'll be back", "https://status.example.com/apology.html");
        planned.heading = Some("Planned maintenance until 6am".to_string());
        let outcome = verdict(planned);
        assert_eq!(outcome.status, Status::Warning);
        assert_eq!(outcome.error.as_deref(), Some("Planned maintenance until 6am"));

        let unplanned = page("We'll be back", "https://status.example.com/outage");
        let outcome = verdict(unplanned);
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.error.as_deref(), Some("We'll be back"));
    }

    #[test]
    fn test_access_error_warns_unless_browser_rejected() {
        let mut prompt = page("", "https://app.example.com/");
        prompt.access_error = Some("Not authorized".to_string());
        assert_eq!(verdict(prompt.clone()).status, Status::Warning);

        prompt.net_error = Some("This site can't be reached".to_string());
        let outcome = verdict(prompt);
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.error.as_deref(), Some("This site can't be reached"));
    }

    #[test]
    fn test_native_error_page() {
        let mut snapshot = page("app.example.com", "https://app.example.com/");
        snapshot.net_error = Some("ERR_NAME_NOT_RESOLVED".to_string());
        assert_eq!(verdict(snapshot).status, Status::Failed);
    }

    #[test]
    fn test_blank_title_variants() {
        let mut json = page("", "https://app.example.com/health");
        json.body = Some(r#"{"isHealthy": true}"#.to_string());
        assert_eq!(verdict(json).status, Status::Passed);

        let mut empty = page("", "https://app.example.com/");
        empty.body = Some(String::new());
        let outcome = verdict(empty);
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.error.as_deref(), Some(BLANK_PAGE));

        let mut large = page("", "https://app.example.com/");
        large.body = Some("word ".repeat(300));
        assert_eq!(verdict(large).status, Status::Warning);

        let mut plain = page("", "https://app.example.com/");
        plain.body = Some("Welcome".to_string());
        assert_eq!(verdict(plain).status, Status::Passed);

        let mut broken = page("", "https://app.example.com/");
        broken.body = Some("HTTP 502 Bad Gateway".to_string());
        assert_eq!(verdict(broken).status, Status::Failed);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let mut snapshot = page("Internal Server Error", "https://app.example.com/");
        snapshot.body = Some("stack trace".to_string());
        let attempt = NavigationAttempt::Loaded(snapshot);
        assert_eq!(classify(&attempt, &settings()), classify(&attempt, &settings()));
    }

    #[test]
    fn test_timeout_and_faults() {
        let timed_out = |page_bytes| NavigationAttempt::TimedOut {
            page_bytes,
            limit_secs: 30,
        };
        let outcome = classify(&timed_out(39), &settings());
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Timeout: Page did not load within 30 seconds")
        );
        assert_eq!(outcome.extras["bytes_loaded"], 0);

        let outcome = classify(&timed_out(5120), &settings());
        assert_eq!(outcome.extras["bytes_loaded"], 5120);

        let prompt = NavigationAttempt::Faulted {
            message: "unexpected alert open: user prompt dialog dismissed".to_string(),
            net_error: None,
        };
        assert_eq!(classify(&prompt, &settings()).status, Status::Warning);

        let unexpected = NavigationAttempt::Unexpected {
            detail: "boom".to_string(),
        };
        assert_eq!(classify(&unexpected, &settings()).status, Status::Debug);
    }

    fn recorder() -> Recorder {
        let case = serde_json::from_value(serde_json::json!({"id": "APP", "url": "https://app"})).unwrap();
        Recorder::new(ResultDocument::new(&case, Environment::unknown(), None), true)
    }

    #[tokio::test]
    async fn test_attempt_captures_loaded_page() {
        let session = FakeSession::new().with_page("https://app.example.com/", "Home Page", "Welcome");
        let attempt = attempt(
            &session,
            BrowserProfile::Firefox,
            "https://app.example.com/",
            &Config::default(),
            &mut recorder(),
        )
        .await;

        match attempt {
            NavigationAttempt::Loaded(snapshot) => {
                assert_eq!(snapshot.title, "Home Page");
                assert_eq!(snapshot.url, "https://app.example.com/");
                assert!(snapshot.body.is_none());
            }
            other => panic!("unexpected attempt: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_attempt_reports_timeout() {
        let session = FakeSession::new().with_navigation_timeout("<html><body>partial</body></html>");
        let attempt = attempt(
            &session,
            BrowserProfile::Chrome,
            "https://slow.example.com/",
            &Config::default(),
            &mut recorder(),
        )
        .await;
        assert_eq!(
            attempt,
            NavigationAttempt::TimedOut {
                page_bytes: 33,
                limit_secs: 30
            }
        );
    }
}
