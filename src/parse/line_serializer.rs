use crate::model::line::{TaskLine, Viewport};

/// Serialize a task line in canonical form.
///
/// Only present fields are emitted, always in the order priority, due, UUID.
/// The UUID comment is set off by two spaces.
pub fn serialize_task_line(task: &TaskLine) -> String {
    let mut line = format!("{}* [{}] {}", task.indent, task.mark, task.text);

    if let Some(priority) = task.priority {
        line.push(' ');
        line.push_str(priority.marks());
    }

    if let Some(due) = task.due {
        line.push_str(&format!(" ({})", due));
    }

    if let Some(ref uuid) = task.uuid {
        line.push_str(&format!("  #{}", uuid));
    }

    line
}

pub fn serialize_project_line(name: &str) -> String {
    format!("Project: {}", name)
}

pub fn serialize_viewport(viewport: &Viewport) -> String {
    match viewport.defaults {
        Some(ref defaults) => format!(
            "=== {} | {} | {} ===",
            viewport.name, viewport.filter, defaults
        ),
        None => format!("=== {} | {} ===", viewport.name, viewport.filter),
    }
}
