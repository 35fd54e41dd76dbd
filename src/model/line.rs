use serde::Serialize;

use crate::model::task::{Due, Priority, TaskUuid};

/// One parsed task line: `* [X] text !! (2024-03-01)  #uuid`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    /// Leading whitespace, kept verbatim
    pub indent: String,
    /// The character inside the checkbox
    pub mark: char,
    pub text: String,
    pub priority: Option<Priority>,
    pub due: Option<Due>,
    pub uuid: Option<TaskUuid>,
}

impl TaskLine {
    /// A top-level pending line with only text
    pub fn new(text: impl Into<String>) -> Self {
        TaskLine {
            indent: String::new(),
            mark: ' ',
            text: text.into(),
            priority: None,
            due: None,
            uuid: None,
        }
    }
}

/// A viewport heading: `=== name | filter | defaults ===`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub name: String,
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<String>,
}

/// What a single wiki line holds, as far as syncing is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WikiLine {
    Task(TaskLine),
    Project(String),
    Viewport(Viewport),
}
