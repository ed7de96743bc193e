//! Element locator strategies

use std::fmt;

use crate::common::{Error, Result};

/// W3C web element identifier key
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque handle to an element in a remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Element lookup strategy and value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    XPath(String),
    LinkText(String),
    PartialLinkText(String),
    Name(String),
    TagName(String),
    ClassName(String),
    CssSelector(String),
}

impl Locator {
    /// Build a locator from a step's `element_name` / `element_value` pair
    pub fn parse(strategy: &str, value: &str) -> Result<Self> {
        let value = value.to_string();
        match strategy.to_lowercase().replace(' ', "_").as_str() {
            "id" => Ok(Self::Id(value)),
            "xpath" => Ok(Self::XPath(value)),
            "link_text" => Ok(Self::LinkText(value)),
            "partial_link_text" => Ok(Self::PartialLinkText(value)),
            "name" => Ok(Self::Name(value)),
            "tag_name" => Ok(Self::TagName(value)),
            "class_name" => Ok(Self::ClassName(value)),
            "css_selector" => Ok(Self::CssSelector(value)),
            other => Err(Error::Config(format!(
                "Unknown locator strategy '{}'. Supported: id, xpath, link_text, \
                 partial_link_text, name, tag_name, class_name, css_selector",
                other
            ))),
        }
    }

    /// The whole document, used when no element is selected
    pub fn document() -> Self {
        Self::XPath("//*".to_string())
    }

    /// W3C `using` / `value` pair.
    ///
    /// The protocol only knows five strategies; id, name and class name are
    /// expressed as CSS selectors.
    pub fn to_w3c(&self) -> (&'static str, String) {
        match self {
            Self::Id(v) => ("css selector", format!("[id=\"{}\"]", css_escape(v))),
            Self::Name(v) => ("css selector", format!("[name=\"{}\"]", css_escape(v))),
            Self::ClassName(v) => ("css selector", format!(".{}", v)),
            Self::XPath(v) => ("xpath", v.clone()),
            Self::LinkText(v) => ("link text", v.clone()),
            Self::PartialLinkText(v) => ("partial link text", v.clone()),
            Self::TagName(v) => ("tag name", v.clone()),
            Self::CssSelector(v) => ("css selector", v.clone()),
        }
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, value) = match self {
            Self::Id(v) => ("id", v),
            Self::XPath(v) => ("xpath", v),
            Self::LinkText(v) => ("link_text", v),
            Self::PartialLinkText(v) => ("partial_link_text", v),
            Self::Name(v) => ("name", v),
            Self::TagName(v) => ("tag_name", v),
            Self::ClassName(v) => ("class_name", v),
            Self::CssSelector(v) => ("css_selector", v),
        };
        write!(f, "{}=\"{}\"", name, value)
    }
}
