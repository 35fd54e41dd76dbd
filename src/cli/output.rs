use serde::Serialize;

use crate::model::line::{TaskLine, WikiLine};
use crate::model::task::Priority;
use crate::sync::SyncSummary;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LineJson {
    Task {
        line: usize,
        mark: String,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
        #[serde(skip_serializing_if = "Option::is_none")]
        due: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },
    Project {
        line: usize,
        name: String,
    },
    Viewport {
        line: usize,
        name: String,
        filter: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        defaults: Option<String>,
    },
}

#[derive(Serialize)]
pub struct OrderEntryJson {
    pub line: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

#[derive(Serialize)]
pub struct WriteResultJson {
    #[serde(flatten)]
    pub summary: SyncSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// `index` is 0-based; output line numbers are 1-based like an editor's
pub fn wiki_line_to_json(index: usize, line: &WikiLine) -> LineJson {
    let line_no = index + 1;
    match line {
        WikiLine::Task(task) => LineJson::Task {
            line: line_no,
            mark: task.mark.to_string(),
            text: task.text.clone(),
            priority: task.priority,
            due: task.due.map(|d| d.to_string()),
            uuid: task.uuid.as_ref().map(|u| u.to_string()),
        },
        WikiLine::Project(name) => LineJson::Project {
            line: line_no,
            name: name.clone(),
        },
        WikiLine::Viewport(vp) => LineJson::Viewport {
            line: line_no,
            name: vp.name.clone(),
            filter: vp.filter.clone(),
            defaults: vp.defaults.clone(),
        },
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Format a task for listing: `[ ] Buy milk !! (2024-03-01) a1b2c3d4`
pub fn format_task(task: &TaskLine) -> String {
    let mut out = format!("[{}] {}", task.mark, task.text);
    if let Some(priority) = task.priority {
        out.push(' ');
        out.push_str(priority.marks());
    }
    if let Some(due) = task.due {
        out.push_str(&format!(" ({})", due));
    }
    if let Some(ref uuid) = task.uuid {
        out.push_str(&format!(" {}", uuid));
    }
    out
}

pub fn format_wiki_line(index: usize, line: &WikiLine) -> String {
    match line {
        WikiLine::Task(task) => format!("{:>4}  {}{}", index + 1, task.indent, format_task(task)),
        WikiLine::Project(name) => format!("{:>4}  project: {}", index + 1, name),
        WikiLine::Viewport(vp) => match vp.defaults {
            Some(ref defaults) => format!(
                "{:>4}  viewport: {} [{}] defaults: {}",
                index + 1,
                vp.name,
                vp.filter,
                defaults
            ),
            None => format!("{:>4}  viewport: {} [{}]", index + 1, vp.name, vp.filter),
        },
    }
}

pub fn format_summary(verb: &str, summary: &SyncSummary) -> String {
    format!(
        "{}: {} tasks, {} saved, {} refreshed",
        verb, summary.tasks, summary.saved, summary.refreshed
    )
}
