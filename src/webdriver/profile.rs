//! Browser profiles and the session capabilities they request

use serde_json::{json, Value};
use std::fmt;

use crate::common::config::Config;

/// Browser profile a test case asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserProfile {
    Chrome,
    ChromeIncognito,
    Firefox,
}

impl BrowserProfile {
    /// Resolve a profile name; anything that is not a Chrome profile runs in Firefox
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "chrome" => Self::Chrome,
            "chromeincognito" | "chrome_incognito" | "chrome-incognito" => Self::ChromeIncognito,
            _ => Self::Firefox,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chrome => "Chrome",
            Self::ChromeIncognito => "ChromeIncognito",
            Self::Firefox => "Firefox",
        }
    }

    /// Chrome family sessions record a performance (network activity) log
    pub fn records_network_log(&self) -> bool {
        matches!(self, Self::Chrome | Self::ChromeIncognito)
    }

    /// Id of the element holding the message on the browser's own error page
    pub fn net_error_message_id(&self) -> &'static str {
        if self.records_network_log() {
            "main-message"
        } else {
            "errorLongContent"
        }
    }

    /// W3C new-session payload for this profile
    pub fn capabilities(&self, config: &Config) -> Value {
        let sitelist = &config.browser.sitelist;
        let page_load_ms = config.timeouts.page_load_secs * 1000;

        let always_match = match self {
            Self::Chrome | Self::ChromeIncognito => {
                let mut args = vec![
                    format!("auth-server-whitelist={}", sitelist),
                    format!("auth-negotiate-delegatewhitelist={}", sitelist),
                    "auth-schemes=digest,ntlm,negotiate".to_string(),
                    "--disable-http2".to_string(),
                ];
                if *self == Self::ChromeIncognito {
                    args.push("--incognito".to_string());
                }
                json!({
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                    "goog:loggingPrefs": { "performance": "ALL" },
                    "timeouts": { "pageLoad": page_load_ms },
                })
            }
            Self::Firefox => json!({
                "browserName": "firefox",
                "acceptInsecureCerts": true,
                "moz:firefoxOptions": {
                    "prefs": {
                        "network.negotiate-auth.trusted-uris": sitelist,
                        "network.negotiate-auth.delegation-uris": sitelist,
                        "network.automatic-ntlm-auth.trusted-uris": sitelist,
                        "browser.cache.disk.enable": false,
                        "browser.cache.memory.enable": false,
                        "browser.cache.offline.enable": false,
                        "network.http.use-cache": false,
                        "plugin.state.flash": 0,
                        "devtools.jsonview.enabled": false,
                    }
                },
                "timeouts": { "pageLoad": page_load_ms },
            }),
        };

        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

impl fmt::Display for BrowserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
