use serde::Serialize;
use url::Url;

/// Render a nested value as YAML, or an empty string when absent.
pub fn to_yaml<T: Serialize>(value: Option<&T>) -> anyhow::Result<String> {
    match value {
        Some(v) => Ok(serde_yaml::to_string(v)?.trim_end().to_string()),
        None => Ok(String::new()),
    }
}

pub fn bool_text(value: Option<bool>) -> String {
    value.map(|b| b.to_string()).unwrap_or_default()
}

pub fn opt_text<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Display text for a documentation link: the first two path segments,
/// or the whole URL when it has no path.
///
/// Returns `None` unless the link is a valid http(s) URL.
pub fn link_display(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let path = url.path().trim_matches('/');
    if path.is_empty() {
        return Some(link.to_string());
    }
    Some(path.split('/').take(2).collect::<Vec<_>>().join("/"))
}

/// Length of the longest line, in characters.
pub fn max_line_width(text: &str) -> usize {
    text.lines().map(|l| l.chars().count()).max().unwrap_or(0)
}
