//! Remote browser session transport
//!
//! The rest of the crate only talks to a browser through [`BrowserSession`].
//! [`WebDriverSession`] implements it over the W3C WebDriver HTTP protocol
//! against an automation hub.

mod client;
mod locator;
mod profile;
pub mod wait;

pub use client::WebDriverSession;
pub use locator::{ElementRef, Locator};
pub use profile::BrowserProfile;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::Result;

/// Capability set of a remote browser session
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Hub-assigned session identifier
    fn session_id(&self) -> &str;

    /// Navigate and block until the page loads or the page load bound expires
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn page_source(&self) -> Result<String>;

    async fn execute_script(&self, script: &str) -> Result<Value>;

    /// Locate an element in the current browsing context (no waiting)
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef>;

    /// Locate an element below `parent` (no waiting)
    async fn find_child(&self, parent: &ElementRef, locator: &Locator) -> Result<ElementRef>;

    async fn element_text(&self, element: &ElementRef) -> Result<String>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    async fn screenshot_base64(&self) -> Result<String>;

    /// Return to the top-level browsing context
    async fn switch_to_default(&self) -> Result<()>;

    async fn switch_to_frame(&self, frame: &ElementRef) -> Result<()>;

    /// Dismiss the open user prompt; `Error::NoSuchAlert` when there is none
    async fn dismiss_alert(&self) -> Result<()>;

    async fn delete_all_cookies(&self) -> Result<()>;

    /// Drain the performance log. Empty for browsers that do not record one.
    async fn performance_log(&self) -> Result<Vec<Value>>;

    async fn quit(&self) -> Result<()>;
}
