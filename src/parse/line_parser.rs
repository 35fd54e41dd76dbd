use std::sync::LazyLock;

use regex::Regex;

use crate::model::line::{TaskLine, WikiLine};
use crate::model::task::{Due, Priority, TaskUuid};
use crate::parse::heading_parser::{parse_project_line, parse_viewport};

const UUID_FULL: &str =
    r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";
const UUID_SHORT: &str = r"[0-9a-fA-F]{8}";
const DUE: &str = r"\([0-9]{4}-[0-9]{2}-[0-9]{2}(?: [0-9]{2}:[0-9]{2})?\)";

/// `<indent>* [<mark>] <rest>`
static TASK_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)\* \[(?P<mark>.)\] (?P<rest>.+)$").expect("task head regex")
});

/// Endings the text field may not have, so trailing metadata is never
/// swallowed into it. Includes a partially typed due date.
static TEXT_FORBIDDEN_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:\s| !{{1,3}}|\([0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}(?:\)| [0-9]{{2}}:[0-9]{{2}}\))?|{UUID_FULL}|{UUID_SHORT})$"
    ))
    .expect("forbidden suffix regex")
});

/// Priority, due and UUID, each optional, in this order
static TRAILING_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:(?P<priority>!{{1,3}})(?:\s+|$))?(?:(?P<due>{DUE})(?:\s+|$))?(?:#(?P<uuid>{UUID_FULL}|{UUID_SHORT})(?:\s+|$))?"
    ))
    .expect("trailing fields regex")
});

/// Parse a single wiki line as a task.
///
/// Returns `None` when the line is not a task line. Most wiki lines are not,
/// so this is the common outcome rather than an error.
pub fn parse_task_line(line: &str) -> Option<TaskLine> {
    let caps = TASK_HEAD.captures(line)?;
    let indent = caps.name("indent")?.as_str();
    let mark = caps.name("mark")?.as_str().chars().next()?;
    let rest = caps.name("rest")?.as_str();

    let (text, trailing) = split_text(rest)?;

    let mut task = TaskLine {
        indent: indent.to_string(),
        mark,
        text: text.to_string(),
        priority: None,
        due: None,
        uuid: None,
    };

    if let Some(fields) = TRAILING_FIELDS.captures(trailing) {
        task.priority = fields
            .name("priority")
            .and_then(|m| Priority::from_marks(m.as_str()));
        if let Some(due) = fields.name("due") {
            let inner = due.as_str().trim_start_matches('(').trim_end_matches(')');
            // Well-formed but impossible dates (2024-13-40) make the line unusable
            task.due = Some(Due::parse(inner)?);
        }
        task.uuid = fields.name("uuid").and_then(|m| TaskUuid::parse(m.as_str()));
    }

    Some(task)
}

/// Split the part after the checkbox into text and the trailing field area.
///
/// The text is the longest prefix that is followed by whitespace (or the end
/// of the line) and does not end in a forbidden suffix.
fn split_text(rest: &str) -> Option<(&str, &str)> {
    let mut ends: Vec<usize> = rest
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .collect();
    ends.push(rest.len());

    for &end in ends.iter().rev() {
        if end == 0 {
            continue;
        }
        let text = &rest[..end];
        if TEXT_FORBIDDEN_END.is_match(text) {
            continue;
        }
        return Some((text, rest[end..].trim_start()));
    }
    None
}

/// Classify a line: task, project declaration, viewport heading, or nothing.
pub fn parse_wiki_line(line: &str) -> Option<WikiLine> {
    if let Some(task) = parse_task_line(line) {
        return Some(WikiLine::Task(task));
    }
    if let Some(project) = parse_project_line(line) {
        return Some(WikiLine::Project(project));
    }
    parse_viewport(line).map(WikiLine::Viewport)
}
