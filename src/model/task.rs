use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task status as the store records it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Deleted,
    Waiting,
}

impl TaskStatus {
    /// The character used inside the checkbox `[ ]`
    pub fn mark(self) -> char {
        match self {
            TaskStatus::Pending => ' ',
            TaskStatus::Completed => 'X',
            TaskStatus::Deleted => 'D',
            TaskStatus::Waiting => 'W',
        }
    }

    /// Parse a checkbox character into a status.
    /// Unknown marks are left to the caller (they still round-trip in the line).
    pub fn from_mark(c: char) -> Option<TaskStatus> {
        match c {
            ' ' => Some(TaskStatus::Pending),
            'X' | 'x' => Some(TaskStatus::Completed),
            'D' => Some(TaskStatus::Deleted),
            'W' => Some(TaskStatus::Waiting),
            _ => None,
        }
    }
}

/// Store priority, written as `!`, `!!`, `!!!` in the wiki
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    High,
}

impl Priority {
    pub fn marks(self) -> &'static str {
        match self {
            Priority::Low => "!",
            Priority::Medium => "!!",
            Priority::High => "!!!",
        }
    }

    pub fn from_marks(s: &str) -> Option<Priority> {
        match s {
            "!" => Some(Priority::Low),
            "!!" => Some(Priority::Medium),
            "!!!" => Some(Priority::High),
            _ => None,
        }
    }

    /// Store-side letter (`L`, `M`, `H`)
    pub fn letter(self) -> &'static str {
        match self {
            Priority::Low => "L",
            Priority::Medium => "M",
            Priority::High => "H",
        }
    }

    pub fn from_letter(s: &str) -> Option<Priority> {
        match s.trim() {
            "L" | "l" => Some(Priority::Low),
            "M" | "m" => Some(Priority::Medium),
            "H" | "h" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Due timestamp: either a whole day or a day with a minute-resolution time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Due {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

impl Due {
    /// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM`
    pub fn parse(s: &str) -> Option<Due> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
            return Some(Due::DateTime(dt));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT).ok().map(Due::Date)
    }

    /// Collapse a store timestamp: midnight means a date-only due
    pub fn from_datetime(dt: NaiveDateTime) -> Due {
        if dt.time() == chrono::NaiveTime::MIN {
            Due::Date(dt.date())
        } else {
            Due::DateTime(dt)
        }
    }

    pub fn to_datetime(self) -> NaiveDateTime {
        match self {
            Due::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            Due::DateTime(dt) => dt,
        }
    }
}

impl fmt::Display for Due {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Due::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Due::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<Due> for String {
    fn from(due: Due) -> String {
        due.to_string()
    }
}

impl TryFrom<String> for Due {
    type Error = String;

    fn try_from(s: String) -> Result<Due, String> {
        Due::parse(&s).ok_or_else(|| format!("invalid due date: {}", s))
    }
}

/// A task reference as written in the wiki: full UUID or its first 8 hex digits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskUuid {
    Full(Uuid),
    /// Lowercase 8-hex prefix
    Short(String),
}

impl TaskUuid {
    pub fn parse(s: &str) -> Option<TaskUuid> {
        if s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(TaskUuid::Short(s.to_ascii_lowercase()));
        }
        if s.len() == 36 {
            return Uuid::try_parse(s).ok().map(TaskUuid::Full);
        }
        None
    }

    /// The 8-hex form of a full UUID
    pub fn short(uuid: &Uuid) -> TaskUuid {
        TaskUuid::Short(uuid.simple().to_string()[..8].to_string())
    }

    /// Whether this reference names the given UUID
    pub fn matches(&self, uuid: &Uuid) -> bool {
        match self {
            TaskUuid::Full(u) => u == uuid,
            TaskUuid::Short(prefix) => uuid.simple().to_string().starts_with(prefix.as_str()),
        }
    }

    pub fn full(&self) -> Option<Uuid> {
        match self {
            TaskUuid::Full(u) => Some(*u),
            TaskUuid::Short(_) => None,
        }
    }
}

impl fmt::Display for TaskUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskUuid::Full(u) => write!(f, "{}", u.hyphenated()),
            TaskUuid::Short(s) => write!(f, "{}", s),
        }
    }
}

impl From<Uuid> for TaskUuid {
    fn from(uuid: Uuid) -> TaskUuid {
        TaskUuid::Full(uuid)
    }
}

/// A task record as owned by the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreTask {
    /// Store-assigned identity; `None` until the task is first saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// UUIDs of tasks that must exist before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<Uuid>,
}

impl StoreTask {
    /// A new, unsaved pending task
    pub fn new(description: impl Into<String>) -> Self {
        StoreTask {
            uuid: None,
            description: description.into(),
            status: TaskStatus::Pending,
            priority: None,
            due: None,
            project: None,
            tags: Vec::new(),
            depends: Vec::new(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.uuid.is_some()
    }
}

/// The cache's handle on a store record. Every holder sees in-place refreshes.
pub type SharedTask = Rc<RefCell<StoreTask>>;

pub fn share(task: StoreTask) -> SharedTask {
    Rc::new(RefCell::new(task))
}
