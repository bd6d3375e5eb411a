//! Append-only JSONL activity log.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so concurrent tailing never sees a partial line.
//! Logging must never take the dashboard down: any failure to open or write
//! the log degrades to silent discard. Nothing is ever written to
//! stdout/stderr, which belong to the alternate screen while the TUI runs.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::core::paths;

/// Log file name under the state directory.
const LOG_FILE: &str = "activity.jsonl";

/// Activity kinds recorded by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Connect,
    ScheduleCreate,
    ScheduleUpdate,
    ScheduleDelete,
    ScheduleRun,
    ScheduleToggle,
    OwnershipTaken,
    PipelineStart,
    ProfileSave,
    ProfileDelete,
    CommandError,
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    ts: String,
    event: ActivityKind,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'a str>,
}

/// Handle for appending activity records.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    /// Log at the default location (`$XDG_STATE_HOME/glsched/activity.jsonl`).
    #[must_use]
    pub fn default_location() -> Self {
        Self {
            path: Some(paths::state_dir().join(LOG_FILE)),
        }
    }

    /// Log at an explicit path (tests).
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A log that discards everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { path: None }
    }

    /// Record a successful action.
    pub fn success(&self, event: ActivityKind, detail: &str) {
        self.append(event, true, Some(detail), None);
    }

    /// Record a failed action with its error code.
    pub fn failure(&self, event: ActivityKind, detail: &str, error_code: &str) {
        self.append(event, false, Some(detail), Some(error_code));
    }

    fn append(
        &self,
        event: ActivityKind,
        ok: bool,
        detail: Option<&str>,
        error_code: Option<&str>,
    ) {
        let Some(path) = &self.path else { return };

        let entry = LogEntry {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
            ok,
            detail,
            error_code,
        };
        let Ok(mut line) = serde_json::to_string(&entry) else {
            return;
        };
        line.push('\n');

        if let Some(dir) = path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::at(dir.path().join("activity.jsonl"));
        log.success(ActivityKind::Connect, "work");
        log.failure(ActivityKind::ScheduleDelete, "nightly", "GLS-2002");

        let text = fs::read_to_string(dir.path().join("activity.jsonl")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "connect");
        assert_eq!(first["ok"], true);
        assert!(first.get("error_code").is_none());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["ok"], false);
        assert_eq!(second["error_code"], "GLS-2002");
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = ActivityLog::disabled();
        log.success(ActivityKind::Connect, "noop");
    }

    #[test]
    fn unwritable_path_is_silently_ignored() {
        let log = ActivityLog::at("/proc/definitely/not/writable/activity.jsonl");
        log.success(ActivityKind::Connect, "noop");
    }
}
