//! Browser and automation node description reported with every result

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const UNKNOWN: &str = "unknown";

/// Where a test case ran: browser and automation node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub browser: BrowserInfo,
    pub host: HostInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    pub ip: String,
    pub os: String,
}

impl Environment {
    /// Environment for a session that could not be identified at all
    pub fn unknown() -> Self {
        Self {
            browser: BrowserInfo {
                name: UNKNOWN.to_string(),
                version: UNKNOWN.to_string(),
            },
            host: HostInfo {
                name: UNKNOWN.to_string(),
                ip: UNKNOWN.to_string(),
                os: UNKNOWN.to_string(),
            },
        }
    }

    /// Build from a `navigator.userAgent` string and the node the session runs on
    pub fn from_user_agent(user_agent: &str, node_name: &str, node_ip: &str) -> Self {
        let (name, version) = parse_browser(user_agent);
        Self {
            browser: BrowserInfo { name, version },
            host: HostInfo {
                name: node_name.to_string(),
                ip: node_ip.to_string(),
                os: parse_os(user_agent),
            },
        }
    }
}

/// Browser families in match order; Edge and Opera carry a Chrome token too
static BROWSERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Edge", r"Edg(?:e|A|iOS)?/(\d+)\.(\d+)(?:\.(\d+))?"),
        ("Opera", r"OPR/(\d+)\.(\d+)(?:\.(\d+))?"),
        ("Firefox", r"Firefox/(\d+)\.(\d+)(?:\.(\d+))?"),
        ("Chrome", r"(?:Chrome|CriOS)/(\d+)\.(\d+)(?:\.(\d+))?"),
        ("Safari", r"Version/(\d+)\.(\d+)(?:\.(\d+))?.*Safari/"),
        ("IE", r"(?:MSIE |Trident/.*rv:)(\d+)\.(\d+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid browser pattern")))
    .collect()
});

static OS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Windows", r"Windows NT (\d+)\.(\d+)"),
        ("Mac OS X", r"Mac OS X (\d+)[._](\d+)"),
        ("Android", r"Android (\d+)(?:\.(\d+))?"),
        ("iOS", r"OS (\d+)_(\d+) like Mac OS X"),
        ("Chrome OS", r"CrOS \S+ (\d+)\.(\d+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid os pattern")))
    .collect()
});

fn parse_browser(user_agent: &str) -> (String, String) {
    for (name, pattern) in BROWSERS.iter() {
        if let Some(caps) = pattern.captures(user_agent) {
            let major = caps.get(1).map_or("", |m| m.as_str());
            let minor = caps.get(2).map_or("0", |m| m.as_str());
            let version = match caps.get(3) {
                Some(patch) => format!("{}.{}.{}", major, minor, patch.as_str()),
                None => format!("{}.{}", major, minor),
            };
            return (name.to_string(), version);
        }
    }
    (UNKNOWN.to_string(), UNKNOWN.to_string())
}

fn parse_os(user_agent: &str) -> String {
    // iOS user agents also mention "Mac OS X"
    let ios_first = user_agent.contains("iPhone") || user_agent.contains("iPad");
    let mut patterns: Vec<&(&str, Regex)> = OS_PATTERNS.iter().collect();
    if ios_first {
        patterns.sort_by_key(|(name, _)| *name != "iOS");
    }

    for (name, pattern) in patterns {
        if let Some(caps) = pattern.captures(user_agent) {
            let major = caps.get(1).map_or("", |m| m.as_str());
            return match (name, caps.get(2)) {
                (&"Windows", Some(minor)) => windows_release(major, minor.as_str()),
                (_, Some(minor)) => format!("{} {}.{}", name, major, minor.as_str()),
                (_, None) => format!("{} {}", name, major),
            };
        }
    }

    if user_agent.contains("Linux") {
        "Linux".to_string()
    } else {
        UNKNOWN.to_string()
    }
}

/// NT kernel version to marketing name
fn windows_release(major: &str, minor: &str) -> String {
    let release = match (major, minor) {
        ("10", "0") => "10",
        ("6", "3") => "8.1",
        ("6", "2") => "8",
        ("6", "1") => "7",
        _ => return format!("Windows NT {}.{}", major, minor),
    };
    format!("Windows {}", release)
}
