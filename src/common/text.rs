//! Normalization of page-derived text before it lands in a report

use regex::Regex;
use std::sync::LazyLock;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+|\s{2,}").expect("valid line break pattern"));

static DOUBLED_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\W)\.").expect("valid punctuation pattern"));

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Flatten multi-line page text into a single sentence-like line.
///
/// Line breaks and runs of whitespace become `". "`, and a period that lands
/// right after existing punctuation is dropped again.
pub fn sanitize(text: &str) -> String {
    let flattened = LINE_BREAKS.replace_all(text.trim(), ". ");
    DOUBLED_PUNCTUATION.replace_all(&flattened, "$1").into_owned()
}

/// Remove markup tags and decode the handful of entities browsers emit when
/// rendering a raw JSON body.
pub fn strip_markup(source: &str) -> String {
    TAGS.replace_all(source, "")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
