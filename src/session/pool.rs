//! Suite-scoped cache of browser sessions, one per browser profile

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::webdriver::{BrowserProfile, BrowserSession, WebDriverSession};

use super::environment::{Environment, UNKNOWN};

/// Creates remote browser sessions and reports where they run
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Start a new session configured for `profile`
    async fn launch(&self, profile: BrowserProfile) -> Result<Box<dyn BrowserSession>>;

    /// Resolve the address of the automation node backing `session_id`
    async fn locate_node(&self, session_id: &str) -> Result<String>;

    /// Host name of the node at `address`, if it has one
    async fn resolve_host_name(&self, address: &str) -> Option<String> {
        reverse_lookup(address).await
    }
}

const REVERSE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Reverse DNS for a node IP; `None` for host names, unknown addresses and slow resolvers
pub async fn reverse_lookup(address: &str) -> Option<String> {
    let ip: IpAddr = address.parse().ok()?;
    let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));
    match tokio::time::timeout(REVERSE_LOOKUP_TIMEOUT, lookup).await {
        Ok(Ok(Ok(name))) => Some(name),
        Ok(Ok(Err(e))) => {
            tracing::debug!(address, error = %e, "Reverse lookup failed");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(address, error = %e, "Reverse lookup task failed");
            None
        }
        Err(_) => {
            tracing::warn!(address, "Reverse lookup timed out");
            None
        }
    }
}

/// Launches sessions on a Selenium-compatible hub
pub struct HubLauncher {
    http: reqwest::Client,
    config: Config,
}

impl HubLauncher {
    pub fn new(config: Config) -> Result<Self> {
        // Navigation blocks on the hub for up to the page load bound
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.page_load_secs + 30))
            .build()?;
        Ok(Self { http, config })
    }
}

/// Hub answer to a test session lookup
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestSessionInfo {
    proxy_id: Option<String>,
}

static PROXY_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//([^:/]+)(?::|/|$)").expect("valid proxy pattern"));

/// Extract the node address from a hub `proxyId` such as `http://192.168.1.100:5555`
pub fn node_address(proxy_id: &str) -> Option<String> {
    PROXY_HOST
        .captures(proxy_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[async_trait]
impl SessionLauncher for HubLauncher {
    async fn launch(&self, profile: BrowserProfile) -> Result<Box<dyn BrowserSession>> {
        let session = WebDriverSession::start(
            self.http.clone(),
            &self.config.hub.webdriver_url(),
            profile,
            &self.config,
        )
        .await?;
        Ok(Box::new(session))
    }

    async fn locate_node(&self, session_id: &str) -> Result<String> {
        let url = self.config.hub.session_lookup_url(session_id);
        let info: TestSessionInfo = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info.proxy_id
            .as_deref()
            .and_then(node_address)
            .ok_or_else(|| Error::TransportFault(format!("No node address for session {}", session_id)))
    }
}

/// A cached session and the environment it reports
pub struct PoolEntry {
    pub profile: BrowserProfile,
    pub session: Box<dyn BrowserSession>,
    pub environment: Environment,
}

/// One browser session per profile for the lifetime of a suite run
pub struct SessionPool {
    launcher: Box<dyn SessionLauncher>,
    entries: HashMap<BrowserProfile, PoolEntry>,
}

impl SessionPool {
    pub fn new(launcher: Box<dyn SessionLauncher>) -> Self {
        Self {
            launcher,
            entries: HashMap::new(),
        }
    }

    /// Session for `profile`, launched on first request and cached afterwards
    pub async fn acquire(&mut self, profile: BrowserProfile) -> Result<&PoolEntry> {
        if !self.entries.contains_key(&profile) {
            tracing::info!(profile = %profile, "Launching browser session");
            let session = self.launcher.launch(profile).await?;
            let environment = describe(self.launcher.as_ref(), session.as_ref()).await;
            tracing::debug!(?environment, "Resolved session environment");
            self.entries.insert(
                profile,
                PoolEntry {
                    profile,
                    session,
                    environment,
                },
            );
        }

        self.entries
            .get(&profile)
            .ok_or_else(|| Error::session_start(profile.name(), "session missing from pool"))
    }

    /// Environment recorded when the session for `profile` was created
    pub fn environment_for(&self, profile: BrowserProfile) -> Option<&Environment> {
        self.entries.get(&profile).map(|entry| &entry.environment)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Close every cached session. Each close is attempted independently and
    /// failures are only logged.
    pub async fn release_all(&mut self) {
        for (profile, entry) in self.entries.drain() {
            match entry.session.quit().await {
                Ok(()) => tracing::info!(profile = %profile, "Browser session closed"),
                Err(e) => tracing::warn!(profile = %profile, error = %e, "Failed to close browser session"),
            }
        }
    }
}

/// Identify the browser and node behind a fresh session; never fails
async fn describe(launcher: &dyn SessionLauncher, session: &dyn BrowserSession) -> Environment {
    let user_agent = match session.execute_script("return navigator.userAgent").await {
        Ok(value) => value.as_str().unwrap_or_default().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read user agent");
            String::new()
        }
    };

    let (node_name, node_ip) = match launcher.locate_node(session.session_id()).await {
        Ok(ip) => {
            let name = launcher.resolve_host_name(&ip).await.unwrap_or_else(|| ip.clone());
            (name, ip)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not locate automation node");
            (UNKNOWN.to_string(), UNKNOWN.to_string())
        }
    };

    if user_agent.is_empty() {
        let mut environment = Environment::unknown();
        environment.host.name = node_name;
        environment.host.ip = node_ip;
        return environment;
    }
    Environment::from_user_agent(&user_agent, &node_name, &node_ip)
}
