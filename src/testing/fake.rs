//! In-memory browser used by unit tests
//!
//! [`FakeSession`] serves scripted pages keyed by URL and records every
//! action it is asked to perform. Clones share state, so a test can keep a
//! handle on a session that was moved into a [`FakeLauncher`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::session::SessionLauncher;
use crate::webdriver::{BrowserProfile, BrowserSession, ElementRef, Locator};

/// An element on a scripted page
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attributes: HashMap<String, String>,
}

/// A scripted page
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub text: String,
    pub source: String,
    /// URL reported after loading, when the page redirects
    pub redirect: Option<String>,
    pub elements: Vec<(Locator, FakeElement)>,
}

impl FakePage {
    pub fn new(title: &str, text: &str) -> Self {
        Self {
            title: title.to_string(),
            text: text.to_string(),
            source: format!("<html><head><title>{}</title></head><body>{}</body></html>", title, text),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn redirecting_to(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    pub fn with_element(mut self, locator: Locator, text: &str) -> Self {
        self.elements.push((
            locator,
            FakeElement {
                text: text.to_string(),
                attributes: HashMap::new(),
            },
        ));
        self
    }

    pub fn with_attribute(mut self, locator: Locator, name: &str, value: &str) -> Self {
        match self.elements.iter_mut().find(|(l, _)| *l == locator) {
            Some((_, element)) => {
                element.attributes.insert(name.to_string(), value.to_string());
            }
            None => {
                let mut element = FakeElement::default();
                element.attributes.insert(name.to_string(), value.to_string());
                self.elements.push((locator, element));
            }
        }
        self
    }
}

#[derive(Default)]
struct State {
    user_agent: String,
    pages: HashMap<String, FakePage>,
    current: FakePage,
    current_url: String,
    /// Page source left behind by a navigation that times out
    timeout_source: Option<String>,
    fault: Option<(String, String)>,
    alerts: usize,
    reject_input: bool,
    failing_screenshot: bool,
    failing_quit: bool,
    typed: HashMap<String, String>,
    performance_log: Vec<Value>,
    /// Entries logged by every navigation or click
    network_events: Vec<Value>,
    calls: Vec<String>,
    quits: Option<Arc<AtomicUsize>>,
}

/// Scripted [`BrowserSession`]
#[derive(Clone, Default)]
pub struct FakeSession {
    state: Arc<Mutex<State>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }

    pub fn with_user_agent(self, user_agent: &str) -> Self {
        self.state().user_agent = user_agent.to_string();
        self
    }

    pub fn with_page(self, url: &str, title: &str, text: &str) -> Self {
        self.with_fake_page(url, FakePage::new(title, text))
    }

    pub fn with_fake_page(self, url: &str, page: FakePage) -> Self {
        self.state().pages.insert(url.to_string(), page);
        self
    }

    /// Every navigation times out, leaving `source` loaded
    pub fn with_navigation_timeout(self, source: &str) -> Self {
        self.state().timeout_source = Some(source.to_string());
        self
    }

    /// Every navigation fails with a WebDriver error
    pub fn with_navigation_fault(self, code: &str, message: &str) -> Self {
        self.state().fault = Some((code.to_string(), message.to_string()));
        self
    }

    /// Prompts blocking the next title reads
    pub fn with_alerts(self, count: usize) -> Self {
        self.state().alerts = count;
        self
    }

    /// Fields silently drop typed characters
    pub fn rejecting_input(self) -> Self {
        self.state().reject_input = true;
        self
    }

    pub fn failing_screenshot(self) -> Self {
        self.state().failing_screenshot = true;
        self
    }

    pub fn failing_quit(self) -> Self {
        self.state().failing_quit = true;
        self
    }

    pub fn with_performance_log(self, entries: Vec<Value>) -> Self {
        self.state().performance_log = entries;
        self
    }

    /// Each navigation and click logs `entries` like the browser would
    pub fn with_network_events(self, entries: Vec<Value>) -> Self {
        self.state().network_events = entries;
        self
    }

    fn counting_quits(self, quits: Arc<AtomicUsize>) -> Self {
        self.state().quits = Some(quits);
        self
    }

    /// Actions performed so far, e.g. `navigate https://a` or `click id="x"`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn element(&self, locator: &Locator) -> Result<ElementRef> {
        let state = self.state();
        if *locator == Locator::document() || state.current.elements.iter().any(|(l, _)| l == locator) {
            Ok(ElementRef(locator.to_string()))
        } else {
            Err(Error::ElementNotFound(locator.to_string()))
        }
    }

    fn lookup<T>(&self, element: &ElementRef, read: impl FnOnce(&State, Option<&FakeElement>) -> T) -> T {
        let state = self.state();
        let found = state
            .current
            .elements
            .iter()
            .find(|(l, _)| l.to_string() == element.id())
            .map(|(_, e)| e);
        read(&state, found)
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn session_id(&self) -> &str {
        "fake-session"
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate {}", url));
        let mut state = self.state();
        let events = state.network_events.clone();
        state.performance_log.extend(events);
        if let Some((code, message)) = &state.fault {
            return Err(Error::webdriver(code, message));
        }
        if let Some(source) = state.timeout_source.clone() {
            state.current = FakePage::default().with_source(&source);
            state.current_url = url.to_string();
            return Err(Error::Timeout(30));
        }
        let page = state.pages.get(url).cloned().unwrap_or_default();
        state.current_url = page.redirect.clone().unwrap_or_else(|| url.to_string());
        state.current = page;
        state.typed.clear();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().current_url.clone())
    }

    async fn title(&self) -> Result<String> {
        let state = self.state();
        if state.alerts > 0 {
            return Err(Error::UnexpectedAlert("Authentication required".to_string()));
        }
        Ok(state.current.title.clone())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.state().current.source.clone())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.record(format!("execute {}", script));
        if script.contains("navigator.userAgent") {
            return Ok(Value::String(self.state().user_agent.clone()));
        }
        Ok(Value::Null)
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementRef> {
        self.element(locator)
    }

    async fn find_child(&self, _parent: &ElementRef, locator: &Locator) -> Result<ElementRef> {
        self.element(locator)
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String> {
        if element.id() == Locator::document().to_string() {
            return Ok(self.state().current.text.clone());
        }
        self.lookup(element, |_, found| {
            found
                .map(|e| e.text.clone())
                .ok_or_else(|| Error::webdriver("stale element reference", element.id()))
        })
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.record(format!("click {}", element.id()));
        let mut state = self.state();
        let events = state.network_events.clone();
        state.performance_log.extend(events);
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.record(format!("type {} {}", element.id(), text));
        let mut state = self.state();
        if !state.reject_input {
            state
                .typed
                .entry(element.id().to_string())
                .or_default()
                .push_str(text);
        }
        Ok(())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        Ok(self.lookup(element, |_, found| found.and_then(|e| e.attributes.get(name).cloned())))
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        Ok(self.lookup(element, |state, found| match name {
            "value" => Some(state.typed.get(element.id()).cloned().unwrap_or_default()),
            "innerHTML" => found.map(|e| e.text.clone()),
            other => found.and_then(|e| e.attributes.get(other).cloned()),
        }))
    }

    async fn screenshot_base64(&self) -> Result<String> {
        if self.state().failing_screenshot {
            return Err(Error::webdriver("unknown error", "screenshot failed"));
        }
        Ok("iVBORw0KGgo=".to_string())
    }

    async fn switch_to_default(&self) -> Result<()> {
        self.record("switch default".to_string());
        Ok(())
    }

    async fn switch_to_frame(&self, frame: &ElementRef) -> Result<()> {
        self.record(format!("switch {}", frame.id()));
        Ok(())
    }

    async fn dismiss_alert(&self) -> Result<()> {
        let mut state = self.state();
        if state.alerts == 0 {
            return Err(Error::NoSuchAlert);
        }
        state.alerts -= 1;
        state.calls.push("dismiss alert".to_string());
        Ok(())
    }

    async fn delete_all_cookies(&self) -> Result<()> {
        self.record("delete cookies".to_string());
        Ok(())
    }

    async fn performance_log(&self) -> Result<Vec<Value>> {
        Ok(std::mem::take(&mut self.state().performance_log))
    }

    async fn quit(&self) -> Result<()> {
        self.record("quit".to_string());
        let state = self.state();
        if let Some(quits) = &state.quits {
            quits.fetch_add(1, Ordering::SeqCst);
        }
        if state.failing_quit {
            return Err(Error::webdriver("invalid session id", "session already gone"));
        }
        Ok(())
    }
}

type Factory = Box<dyn Fn() -> FakeSession + Send + Sync>;

/// [`SessionLauncher`] handing out fake sessions
pub struct FakeLauncher {
    factory: Factory,
    launches: Arc<AtomicUsize>,
    quits: Arc<AtomicUsize>,
    node: Option<String>,
    node_name: Option<String>,
    failing_profile: Option<BrowserProfile>,
}

impl FakeLauncher {
    pub fn new(factory: impl Fn() -> FakeSession + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            launches: Arc::new(AtomicUsize::new(0)),
            quits: Arc::new(AtomicUsize::new(0)),
            node: None,
            node_name: None,
            failing_profile: None,
        }
    }

    /// Node address reported for every session
    pub fn with_node(mut self, address: &str) -> Self {
        self.node = Some(address.to_string());
        self
    }

    /// Host name the node address resolves to; unresolved otherwise
    pub fn with_node_name(mut self, name: &str) -> Self {
        self.node_name = Some(name.to_string());
        self
    }

    /// Launching `profile` fails
    pub fn failing_for(mut self, profile: BrowserProfile) -> Self {
        self.failing_profile = Some(profile);
        self
    }

    pub fn launch_count(&self) -> Arc<AtomicUsize> {
        self.launches.clone()
    }

    pub fn quit_count(&self) -> Arc<AtomicUsize> {
        self.quits.clone()
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, profile: BrowserProfile) -> Result<Box<dyn BrowserSession>> {
        if self.failing_profile == Some(profile) {
            return Err(Error::session_start(profile.name(), "hub refused the session"));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new((self.factory)().counting_quits(self.quits.clone())))
    }

    async fn locate_node(&self, session_id: &str) -> Result<String> {
        self.node
            .clone()
            .ok_or_else(|| Error::TransportFault(format!("No node for session {}", session_id)))
    }

    async fn resolve_host_name(&self, _address: &str) -> Option<String> {
        self.node_name.clone()
    }
}
