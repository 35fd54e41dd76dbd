use std::sync::LazyLock;

use regex::Regex;

use crate::model::line::Viewport;

/// `=== name | filter | defaults ===`, defaults optional
static VIEWPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^=+(?P<name>[^=|]+)\|(?P<filter>[^=|]+)(?:\|(?P<defaults>[^=|]*))?=+")
        .expect("viewport regex")
});

/// Parse a `Project: <name>` declaration. The name may not end in whitespace.
pub fn parse_project_line(line: &str) -> Option<String> {
    let name = line.strip_prefix("Project: ")?.trim_end();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse a viewport heading line
pub fn parse_viewport(line: &str) -> Option<Viewport> {
    let caps = VIEWPORT.captures(line)?;
    let name = caps.name("name")?.as_str().trim();
    let filter = caps.name("filter")?.as_str().trim();
    if name.is_empty() || filter.is_empty() {
        return None;
    }
    let defaults = caps
        .name("defaults")
        .map(|m| m.as_str().trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Some(Viewport {
        name: name.to_string(),
        filter: filter.to_string(),
        defaults,
    })
}
