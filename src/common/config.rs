//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Automation hub location
    #[serde(default)]
    pub hub: HubConfig,

    /// Browser profile settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Credentials used to complete SSO prompts
    #[serde(default)]
    pub user: UserInfo,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Navigation classifier settings
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Automation hub (Selenium grid) settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HubConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_protocol() -> String {
    "http".to_string()
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    4444
}

impl HubConfig {
    fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// WebDriver endpoint new sessions are requested from
    pub fn webdriver_url(&self) -> String {
        format!("{}/wd/hub", self.base_url())
    }

    /// Endpoint that maps a session id to the node running it
    pub fn session_lookup_url(&self, session_id: &str) -> String {
        format!("{}/grid/api/testsession?session={}", self.base_url(), session_id)
    }
}

/// Browser profile settings
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct BrowserSettings {
    /// Comma separated sites trusted for integrated (negotiate/NTLM) auth
    #[serde(default)]
    pub sitelist: String,
}

/// SSO credentials
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct UserInfo {
    #[serde(default)]
    pub email: String,
}

/// Timeout settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Timeouts {
    /// Page load bound for a navigation
    #[serde(default = "default_page_load")]
    pub page_load_secs: u64,

    /// Wait for any non-empty title after navigation
    #[serde(default = "default_title")]
    pub title_secs: u64,

    /// Wait for the title to contain an expected string
    #[serde(default = "default_expected_title")]
    pub expected_title_secs: u64,

    /// Wait for an element to be present
    #[serde(default = "default_element")]
    pub element_secs: u64,

    /// Wait for blocking dialogs to be dismissed
    #[serde(default = "default_alert")]
    pub alert_secs: u64,

    /// Wait for each SSO prompt interaction
    #[serde(default = "default_sso")]
    pub sso_secs: u64,

    /// Wait for a typed value to show up in its field
    #[serde(default = "default_input")]
    pub input_secs: u64,

    /// Interval between polls of a bounded wait
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_secs: default_page_load(),
            title_secs: default_title(),
            expected_title_secs: default_expected_title(),
            element_secs: default_element(),
            alert_secs: default_alert(),
            sso_secs: default_sso(),
            input_secs: default_input(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_page_load() -> u64 {
    30
}
fn default_title() -> u64 {
    2
}
fn default_expected_title() -> u64 {
    5
}
fn default_element() -> u64 {
    10
}
fn default_alert() -> u64 {
    5
}
fn default_sso() -> u64 {
    10
}
fn default_input() -> u64 {
    2
}
fn default_poll_interval() -> u64 {
    500
}

impl Timeouts {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Navigation classifier settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NavigationConfig {
    /// Identity provider hosts whose login page is auto-completed
    #[serde(default = "default_sso_hosts")]
    pub sso_hosts: Vec<String>,

    /// Class name of the in-page error banner
    #[serde(default = "default_toast_class")]
    pub toast_class: String,

    /// Page sources shorter than this count as nothing loaded
    #[serde(default = "default_blank_page_bytes")]
    pub blank_page_bytes: usize,

    /// Body text longer than this is a real page whose title had not rendered
    #[serde(default = "default_large_body_chars")]
    pub large_body_chars: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            sso_hosts: default_sso_hosts(),
            toast_class: default_toast_class(),
            blank_page_bytes: default_blank_page_bytes(),
            large_body_chars: default_large_body_chars(),
        }
    }
}

fn default_sso_hosts() -> Vec<String> {
    vec!["login.microsoftonline.com".to_string()]
}
fn default_toast_class() -> String {
    "toast-message".to_string()
}
fn default_blank_page_bytes() -> usize {
    // "<html><head></head><body></body></html>" is 39 bytes
    40
}
fn default_large_body_chars() -> usize {
    1000
}

/// Report settings
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ReportConfig {
    /// Attach a screenshot to every test case, not only failed ones
    #[serde(default)]
    pub screenshot_always: bool,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Path the configuration is loaded from, if any
    pub fn source_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(config_path)
    }
}
