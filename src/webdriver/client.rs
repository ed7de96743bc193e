//! W3C WebDriver client
//!
//! Each method is one HTTP round trip to the hub. Protocol errors are mapped
//! onto the crate's failure taxonomy so handlers can match on them.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::locator::{ElementRef, Locator, ELEMENT_KEY};
use super::profile::BrowserProfile;
use super::BrowserSession;

/// A live session on a WebDriver hub
pub struct WebDriverSession {
    http: reqwest::Client,
    /// Hub WebDriver endpoint, e.g. `http://localhost:4444/wd/hub`
    base_url: String,
    session_id: String,
    profile: BrowserProfile,
    page_load_secs: u64,
}

impl WebDriverSession {
    /// Request a new session for `profile` and maximize its window
    #[tracing::instrument(skip(http, config))]
    pub async fn start(
        http: reqwest::Client,
        hub_url: &str,
        profile: BrowserProfile,
        config: &Config,
    ) -> Result<Self> {
        let base_url = hub_url.trim_end_matches('/').to_string();
        let payload = profile.capabilities(config);

        let response = http
            .post(format!("{}/session", base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::session_start(profile.name(), e))?;
        let value = read_value(response, config.timeouts.page_load_secs)
            .await
            .map_err(|e| Error::session_start(profile.name(), e))?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::session_start(profile.name(), "hub response has no sessionId"))?
            .to_string();

        tracing::info!(session_id = %session_id, "Browser session started");

        let session = Self {
            http,
            base_url,
            session_id,
            profile,
            page_load_secs: config.timeouts.page_load_secs,
        };

        if let Err(e) = session.send(Method::POST, "/window/maximize", Some(json!({}))).await {
            tracing::warn!(error = %e, "Could not maximize browser window");
        }

        Ok(session)
    }

    pub fn profile(&self) -> BrowserProfile {
        self.profile
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        tracing::trace!(%method, %url, "WebDriver request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::TransportFault(e.to_string()))?;

        read_value(response, self.page_load_secs).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn get_string(&self, path: &str) -> Result<String> {
        Ok(self.get(path).await?.as_str().unwrap_or_default().to_string())
    }

    async fn get_optional_string(&self, path: &str) -> Result<Option<String>> {
        Ok(match self.get(path).await? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn locate(&self, path: &str, locator: &Locator) -> Result<ElementRef> {
        let (using, value) = locator.to_w3c();
        let found = self
            .post(path, json!({ "using": using, "value": value }))
            .await
            .map_err(|e| match e {
                Error::ElementNotFound(_) => Error::ElementNotFound(locator.to_string()),
                other => other,
            })?;
        element_ref(&found)
            .ok_or_else(|| Error::TransportFault(format!("Malformed element reference: {}", found)))
    }
}

/// Unwrap the `value` member of a WebDriver response, mapping protocol errors
async fn read_value(response: reqwest::Response, page_load_secs: u64) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::TransportFault(e.to_string()))?;
    let mut payload: Value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)
            .map_err(|_| Error::TransportFault(format!("HTTP {}: {}", status, text)))?
    };
    let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let code = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Err(map_error(code, message, page_load_secs))
}

fn map_error(code: &str, message: &str, page_load_secs: u64) -> Error {
    match code {
        "timeout" | "script timeout" => Error::Timeout(page_load_secs),
        "no such element" => Error::ElementNotFound(message.to_string()),
        "unexpected alert open" => Error::UnexpectedAlert(message.to_string()),
        "no such alert" => Error::NoSuchAlert,
        _ => Error::webdriver(code, message),
    }
}

fn element_json(element: &ElementRef) -> Value {
    let mut reference = Map::new();
    reference.insert(ELEMENT_KEY.to_string(), Value::String(element.id().to_string()));
    Value::Object(reference)
}

fn element_ref(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.post("/url", json!({ "url": url })).await.map(|_| ())
    }

    async fn current_url(&self) -> Result<String> {
        self.get_string("/url").await
    }

    async fn title(&self) -> Result<String> {
        self.get_string("/title").await
    }

    async fn page_source(&self) -> Result<String> {
        self.get_string("/source").await
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": [] }))
            .await
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementRef> {
        self.locate("/element", locator).await
    }

    async fn find_child(&self, parent: &ElementRef, locator: &Locator) -> Result<ElementRef> {
        self.locate(&format!("/element/{}/element", parent.id()), locator)
            .await
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String> {
        self.get_string(&format!("/element/{}/text", element.id()))
            .await
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await
            .map(|_| ())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.post(
            &format!("/element/{}/value", element.id()),
            json!({ "text": text }),
        )
        .await
        .map(|_| ())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        self.get_optional_string(&format!("/element/{}/attribute/{}", element.id(), name))
            .await
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        self.get_optional_string(&format!("/element/{}/property/{}", element.id(), name))
            .await
    }

    async fn screenshot_base64(&self) -> Result<String> {
        self.get_string("/screenshot").await
    }

    async fn switch_to_default(&self) -> Result<()> {
        self.post("/frame", json!({ "id": null })).await.map(|_| ())
    }

    async fn switch_to_frame(&self, frame: &ElementRef) -> Result<()> {
        self.post("/frame", json!({ "id": element_json(frame) }))
            .await
            .map(|_| ())
    }

    async fn dismiss_alert(&self) -> Result<()> {
        self.post("/alert/dismiss", json!({})).await.map(|_| ())
    }

    async fn delete_all_cookies(&self) -> Result<()> {
        self.send(Method::DELETE, "/cookie", None).await.map(|_| ())
    }

    async fn performance_log(&self) -> Result<Vec<Value>> {
        if !self.profile.records_network_log() {
            return Ok(Vec::new());
        }
        match self.post("/se/log", json!({ "type": "performance" })).await? {
            Value::Array(entries) => Ok(entries),
            _ => Ok(Vec::new()),
        }
    }

    async fn quit(&self) -> Result<()> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::TransportFault(e.to_string()))?;
        read_value(response, self.page_load_secs).await.map(|_| ())
    }
}
