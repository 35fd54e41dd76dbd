use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use chrono::{Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::task::{Due, Priority, StoreTask, TaskStatus, TaskUuid};
use crate::parse::strip_control_sequences;
use crate::store::{StoreError, TaskStore, pick_unique};

/// Taskwarrior's compact UTC timestamp, `20240301T120000Z`
const TW_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A store backed by the `task` executable.
///
/// Reads go through `task <filter> export`; saves go through `task import`
/// with the full JSON record on stdin, starting from the stored record so
/// attributes this crate does not model (annotations, entry, tags it did not
/// set) survive the round-trip.
#[derive(Debug, Clone)]
pub struct TaskwarriorStore {
    command: String,
    data_location: Option<PathBuf>,
}

/// The subset of Taskwarrior's export format the sync cares about
#[derive(Debug, Deserialize)]
struct TwTask {
    uuid: Uuid,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    depends: Option<TwDepends>,
}

/// Older releases export `depends` as a comma-joined string, newer ones as a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TwDepends {
    List(Vec<Uuid>),
    Joined(String),
}

impl TwDepends {
    fn into_uuids(self) -> Vec<Uuid> {
        match self {
            TwDepends::List(list) => list,
            TwDepends::Joined(s) => s
                .split(',')
                .filter_map(|part| Uuid::try_parse(part.trim()).ok())
                .collect(),
        }
    }
}

impl TaskwarriorStore {
    pub fn new(command: impl Into<String>, data_location: Option<PathBuf>) -> Self {
        TaskwarriorStore {
            command: command.into(),
            data_location,
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("rc.confirmation=off")
            .arg("rc.json.array=on")
            .arg("rc.verbose=nothing")
            .arg("rc.color=off");
        if let Some(ref location) = self.data_location {
            cmd.arg(format!("rc.data.location={}", location.display()));
        }
        cmd
    }

    /// Run `task <filter> export` and return the raw JSON objects
    fn export(&self, filter: &[String]) -> Result<Vec<Map<String, Value>>, StoreError> {
        let mut cmd = self.base_command();
        cmd.args(filter).arg("export");
        debug!(command = %self.command, ?filter, "taskwarrior export");

        let output = cmd.output().map_err(|e| StoreError::SpawnError {
            command: self.command.clone(),
            source: e,
        })?;
        if !output.status.success() {
            return Err(StoreError::CommandFailed {
                command: format!("{} export", self.command),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_export(&strip_control_sequences(&stdout))
    }

    /// Pipe one JSON record into `task import -`
    fn import(&self, record: &Map<String, Value>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&vec![record])?;
        let mut child = self
            .base_command()
            .arg("import")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoreError::SpawnError {
                command: self.command.clone(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.as_bytes())
                .map_err(|e| StoreError::SpawnError {
                    command: self.command.clone(),
                    source: e,
                })?;
        }

        let output = child.wait_with_output().map_err(|e| StoreError::SpawnError {
            command: self.command.clone(),
            source: e,
        })?;
        if !output.status.success() {
            return Err(StoreError::CommandFailed {
                command: format!("{} import", self.command),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl TaskStore for TaskwarriorStore {
    fn get_by_uuid(&self, uuid: &TaskUuid) -> Result<Option<StoreTask>, StoreError> {
        let raw = self.export(&[uuid.to_string()])?;
        let tasks = raw
            .into_iter()
            .map(from_export)
            .collect::<Result<Vec<_>, _>>()?;
        pick_unique(&tasks, uuid)
    }

    fn filter_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<StoreTask>, StoreError> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }
        let filter: Vec<String> = uuids.iter().map(|u| u.hyphenated().to_string()).collect();
        self.export(&filter)?.into_iter().map(from_export).collect()
    }

    fn save(&mut self, mut task: StoreTask) -> Result<StoreTask, StoreError> {
        let uuid = *task.uuid.get_or_insert_with(Uuid::new_v4);
        let existing = self
            .export(&[uuid.hyphenated().to_string()])?
            .into_iter()
            .next()
            .unwrap_or_default();

        let record = to_import(existing, &task, &Local)?;
        self.import(&record)?;

        self.get_by_uuid(&TaskUuid::Full(uuid))?
            .ok_or(StoreError::MissingAfterSave(uuid))
    }
}

fn parse_export(stdout: &str) -> Result<Vec<Map<String, Value>>, StoreError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

fn from_export(raw: Map<String, Value>) -> Result<StoreTask, StoreError> {
    let tw: TwTask = serde_json::from_value(Value::Object(raw))?;
    let status = match tw.status.as_str() {
        "completed" => TaskStatus::Completed,
        "deleted" => TaskStatus::Deleted,
        "waiting" => TaskStatus::Waiting,
        _ => TaskStatus::Pending,
    };
    let due = match tw.due {
        Some(ref stamp) => {
            let parsed = parse_tw_date(stamp);
            if parsed.is_none() {
                warn!(uuid = %tw.uuid, %stamp, "ignoring unparseable due date");
            }
            parsed
        }
        None => None,
    };

    Ok(StoreTask {
        uuid: Some(tw.uuid),
        description: tw.description,
        status,
        priority: tw.priority.as_deref().and_then(Priority::from_letter),
        due,
        project: tw.project,
        tags: tw.tags,
        depends: tw.depends.map(TwDepends::into_uuids).unwrap_or_default(),
    })
}

/// Overlay the modelled fields onto the stored record, reading the due in `tz`
fn to_import<Tz: TimeZone>(
    mut record: Map<String, Value>,
    task: &StoreTask,
    tz: &Tz,
) -> Result<Map<String, Value>, StoreError> {
    let status = match task.status {
        TaskStatus::Pending => "pending",
        TaskStatus::Completed => "completed",
        TaskStatus::Deleted => "deleted",
        TaskStatus::Waiting => "waiting",
    };

    if let Some(uuid) = task.uuid {
        record.insert("uuid".into(), Value::String(uuid.hyphenated().to_string()));
    }
    record.insert("description".into(), Value::String(task.description.clone()));
    record.insert("status".into(), Value::String(status.to_string()));
    set_or_remove(
        &mut record,
        "priority",
        task.priority.map(|p| Value::String(p.letter().to_string())),
    );
    set_or_remove(
        &mut record,
        "due",
        task.due
            .map(|due| utc_stamp(tz, due))
            .transpose()?
            .map(Value::String),
    );
    set_or_remove(&mut record, "project", task.project.clone().map(Value::String));
    set_or_remove(
        &mut record,
        "tags",
        (!task.tags.is_empty()).then(|| {
            Value::Array(task.tags.iter().cloned().map(Value::String).collect())
        }),
    );
    set_or_remove(
        &mut record,
        "depends",
        (!task.depends.is_empty()).then(|| {
            Value::Array(
                task.depends
                    .iter()
                    .map(|u| Value::String(u.hyphenated().to_string()))
                    .collect(),
            )
        }),
    );
    Ok(record)
}

fn set_or_remove(record: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(v) => {
            record.insert(key.to_string(), v);
        }
        None => {
            record.remove(key);
        }
    }
}

/// UTC stamp → local wall-clock due
fn parse_tw_date(stamp: &str) -> Option<Due> {
    let utc = NaiveDateTime::parse_from_str(stamp, TW_DATE_FORMAT).ok()?;
    let local = Utc.from_utc_datetime(&utc).with_timezone(&Local);
    Some(Due::from_datetime(local.naive_local()))
}

/// Wall-clock due in `tz` → UTC stamp.
///
/// A time skipped by a daylight-saving jump is read one hour later, where the
/// clocks land after the jump. A time that still does not exist is an error,
/// never a silently dropped due.
fn utc_stamp<Tz: TimeZone>(tz: &Tz, due: Due) -> Result<String, StoreError> {
    let naive = due.to_datetime();
    let local = match tz.from_local_datetime(&naive).earliest() {
        Some(local) => Some(local),
        None => {
            let shifted = naive
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|later| tz.from_local_datetime(&later).earliest());
            if shifted.is_some() {
                warn!(%due, "due falls in a daylight-saving gap, moved forward one hour");
            }
            shifted
        }
    };
    local
        .map(|l| l.with_timezone(&Utc).format(TW_DATE_FORMAT).to_string())
        .ok_or_else(|| StoreError::UnrepresentableDue {
            due: due.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveTime};

    fn object(json: &str) -> Map<String, Value> {
        match serde_json::from_str(json).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_parse_export_strips_nothing_when_empty() {
        assert!(parse_export("  \n").unwrap().is_empty());
        let list = parse_export(r#"[{"uuid":"a1b2c3d4-0000-4000-8000-000000000001"}]"#).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_parse_export_after_color_strip() {
        let colored = "\x1b[0m[{\"uuid\":\"a1b2c3d4-0000-4000-8000-000000000001\",\"description\":\"A\"}]\x1b[0m";
        let list = parse_export(&strip_control_sequences(colored)).unwrap();
        let task = from_export(list.into_iter().next().unwrap()).unwrap();
        assert_eq!(task.description, "A");
    }

    #[test]
    fn test_from_export_fields() {
        let raw = object(
            r#"{
                "uuid": "a1b2c3d4-0000-4000-8000-000000000001",
                "description": "Buy milk",
                "status": "completed",
                "priority": "H",
                "project": "Home",
                "tags": ["errand"],
                "depends": "b1b2c3d4-0000-4000-8000-000000000002,c1b2c3d4-0000-4000-8000-000000000003",
                "urgency": 4.2
            }"#,
        );
        let task = from_export(raw).unwrap();
        assert_eq!(task.description, "Buy milk");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.project.as_deref(), Some("Home"));
        assert_eq!(task.tags, vec!["errand"]);
        assert_eq!(task.depends.len(), 2);
    }

    #[test]
    fn test_depends_as_list() {
        let raw = object(
            r#"{
                "uuid": "a1b2c3d4-0000-4000-8000-000000000001",
                "depends": ["b1b2c3d4-0000-4000-8000-000000000002"]
            }"#,
        );
        let task = from_export(raw).unwrap();
        assert_eq!(task.depends.len(), 1);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_to_import_keeps_unmodelled_fields() {
        let existing = object(
            r#"{
                "uuid": "a1b2c3d4-0000-4000-8000-000000000001",
                "description": "old",
                "priority": "L",
                "annotations": [{"entry": "20240101T000000Z", "description": "note"}]
            }"#,
        );
        let mut task = StoreTask::new("new");
        task.uuid = Uuid::try_parse("a1b2c3d4-0000-4000-8000-000000000001").ok();

        let record = to_import(existing, &task, &Utc).unwrap();
        assert_eq!(record["description"], "new");
        assert_eq!(record["status"], "pending");
        assert!(!record.contains_key("priority"));
        assert!(record.contains_key("annotations"));
    }

    #[test]
    fn test_date_round_trip_through_utc() {
        let due = Due::parse("2024-03-01 09:30").unwrap();
        let stamp = utc_stamp(&Local, due).unwrap();
        assert_eq!(parse_tw_date(&stamp), Some(due));

        let day = Due::parse("2024-03-01").unwrap();
        let stamp = utc_stamp(&Local, day).unwrap();
        assert_eq!(parse_tw_date(&stamp), Some(day));
    }

    /// Clocks jump from 00:00 to `00:00 + GAP` hours on 2024-09-08, offset -04:00 before
    #[derive(Debug, Clone, Copy)]
    struct GapZone<const GAP: i32>;

    impl<const GAP: i32> GapZone<GAP> {
        fn change() -> NaiveDateTime {
            Due::parse("2024-09-08").unwrap().to_datetime()
        }

        fn before() -> FixedOffset {
            FixedOffset::west_opt(4 * 3600).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::west_opt((4 - GAP) * 3600).unwrap()
        }
    }

    impl<const GAP: i32> TimeZone for GapZone<GAP> {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            GapZone
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let change = Self::change();
            if *local < change {
                LocalResult::Single(Self::before())
            } else if *local < change + TimeDelta::hours(GAP.into()) {
                LocalResult::None
            } else {
                LocalResult::Single(Self::after())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::change() + TimeDelta::hours(4) {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    #[test]
    fn test_due_in_dst_gap_moves_forward() {
        let zone = GapZone::<1>;
        let due = Due::parse("2024-09-08 00:30").unwrap();
        assert_eq!(utc_stamp(&zone, due).unwrap(), "20240908T043000Z");

        // a date-only due on the changeover day sits at midnight, inside the gap
        let day = Due::parse("2024-09-08").unwrap();
        assert_eq!(utc_stamp(&zone, day).unwrap(), "20240908T040000Z");

        let before = Due::parse("2024-09-07 10:00").unwrap();
        assert_eq!(utc_stamp(&zone, before).unwrap(), "20240907T140000Z");
    }

    #[test]
    fn test_due_in_dst_gap_is_kept_on_import() {
        let existing = object(
            r#"{
                "uuid": "a1b2c3d4-0000-4000-8000-000000000001",
                "description": "Pay rent",
                "due": "20240901T040000Z"
            }"#,
        );
        let mut task = StoreTask::new("Pay rent");
        task.uuid = Uuid::try_parse("a1b2c3d4-0000-4000-8000-000000000001").ok();
        task.due = Due::parse("2024-09-08 00:30");

        let record = to_import(existing, &task, &GapZone::<1>).unwrap();
        assert_eq!(record["due"], "20240908T043000Z");
    }

    #[test]
    fn test_due_that_never_exists_is_an_error() {
        let existing = object(r#"{ "due": "20240901T040000Z" }"#);
        let mut task = StoreTask::new("Pay rent");
        task.due = Due::parse("2024-09-08 00:30");

        let err = to_import(existing, &task, &GapZone::<2>).unwrap_err();
        assert!(matches!(err, StoreError::UnrepresentableDue { .. }));
        assert_eq!(
            err.to_string(),
            "due 2024-09-08 00:30 does not exist in the local time zone"
        );
    }
}
