//! Domain records exchanged with the GitLab API and the profile store.
//!
//! All types are plain serde values. Screens hold copies of these records;
//! nothing here performs I/O.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────── schedules ────────────────────

/// A pipeline schedule as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: u64,
    #[serde(default)]
    pub description: String,
    /// Target branch or tag.
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    #[serde(default)]
    pub cron: String,
    #[serde(default)]
    pub cron_timezone: String,
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<User>,
    #[serde(default)]
    pub last_pipeline: Option<Pipeline>,
    /// Only present on the single-schedule endpoint; the list endpoint omits it.
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Field values for creating a schedule. The variables are attached with
/// separate per-variable calls after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDraft {
    pub description: String,
    pub cron: String,
    pub cron_timezone: String,
    pub ref_name: String,
    pub active: bool,
    pub variables: Vec<Variable>,
}

/// Partial update for an existing schedule; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleChanges {
    pub description: Option<String>,
    pub cron: Option<String>,
    pub cron_timezone: Option<String>,
    pub ref_name: Option<String>,
    pub active: Option<bool>,
}

impl ScheduleChanges {
    /// Full-field changes from a form draft (the form always submits
    /// every field).
    #[must_use]
    pub fn from_draft(draft: &ScheduleDraft) -> Self {
        Self {
            description: Some(draft.description.clone()),
            cron: Some(draft.cron.clone()),
            cron_timezone: Some(draft.cron_timezone.clone()),
            ref_name: Some(draft.ref_name.clone()),
            active: Some(draft.active),
        }
    }
}

// ──────────────────── pipelines ────────────────────

/// Pipeline execution state. Unrecognized statuses decode as `Unknown`
/// rather than failing the whole response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PipelineStatus {
    /// Whether the pipeline is still making progress (drives the poll loop).
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::Created
                | Self::WaitingForResource
                | Self::Preparing
                | Self::Pending
                | Self::Running
        )
    }

    /// Severity rank used when folding job statuses into one stage status.
    /// Higher wins.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Failed => 6,
            Self::Running => 5,
            Self::Pending | Self::Created | Self::WaitingForResource | Self::Preparing => 4,
            Self::Success => 3,
            Self::Skipped => 2,
            Self::Canceled => 1,
            Self::Manual | Self::Scheduled | Self::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    #[serde(default)]
    pub status: PipelineStatus,
    /// Trigger source: `schedule`, `web`, `push`, `trigger`, ...
    #[serde(default)]
    pub source: String,
    /// Pipeline display name (usually the commit title).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineJob {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Aggregated status of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInfo {
    pub name: String,
    pub status: PipelineStatus,
}

/// A pipeline joined with its per-stage status summary for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineWithStages {
    pub pipeline: Pipeline,
    pub stages: Vec<StageInfo>,
}

/// Fold jobs into ordered stages, keeping the most severe status per stage.
///
/// The API returns jobs newest-first, so the collected stage order is
/// reversed to read left-to-right in execution order.
#[must_use]
pub fn aggregate_stages(jobs: &[PipelineJob]) -> Vec<StageInfo> {
    let mut order: Vec<&str> = Vec::new();
    let mut status: std::collections::HashMap<&str, PipelineStatus> =
        std::collections::HashMap::new();

    for job in jobs {
        match status.get(job.stage.as_str()) {
            None => {
                order.push(job.stage.as_str());
                status.insert(job.stage.as_str(), job.status);
            }
            Some(current) => {
                if job.status.severity() > current.severity() {
                    status.insert(job.stage.as_str(), job.status);
                }
            }
        }
    }

    order
        .into_iter()
        .rev()
        .map(|name| StageInfo {
            name: name.to_string(),
            status: status[name],
        })
        .collect()
}

/// Request body for launching an ad-hoc pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRequest {
    pub ref_name: String,
    pub variables: Vec<Variable>,
}

// ──────────────────── variables ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_variable_type")]
    pub variable_type: String,
}

fn default_variable_type() -> String {
    "env_var".to_string()
}

impl Variable {
    /// Environment variable with the default type.
    #[must_use]
    pub fn env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            variable_type: default_variable_type(),
        }
    }
}

/// Parse `KEY=value` text into a key/value pair.
///
/// Text without `=` yields the whole string as key and an empty value;
/// an empty key (input starting with `=`) yields `None`.
#[must_use]
pub fn parse_key_value(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.find('=') {
        None => Some((text.to_string(), String::new())),
        Some(0) => None,
        Some(idx) => {
            let key = text[..idx].trim().to_string();
            let value = text[idx + 1..].trim().to_string();
            if key.is_empty() { None } else { Some((key, value)) }
        }
    }
}

// ──────────────────── users ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
}

// ──────────────────── profiles ────────────────────

/// A locally persisted named connection: which GitLab project to talk to
/// and with what credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub project_url: String,
    pub token: String,
    /// Numeric project id resolved from the API; 0 until first connect.
    #[serde(default)]
    pub project_id: u64,
    /// API base URL derived from the project URL; cached alongside the id.
    #[serde(default)]
    pub base_url: String,
}

impl Profile {
    /// Token masked for display: first and last four characters.
    #[must_use]
    pub fn masked_token(&self) -> String {
        if self.token.len() > 8 {
            format!(
                "{}...{}",
                &self.token[..4],
                &self.token[self.token.len() - 4..]
            )
        } else {
            "****".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_value_splits_on_first_equals() {
        assert_eq!(
            parse_key_value("KEY=a=b"),
            Some(("KEY".to_string(), "a=b".to_string()))
        );
    }

    #[test]
    fn parse_key_value_without_equals_is_key_only() {
        assert_eq!(
            parse_key_value("  FLAG "),
            Some(("FLAG".to_string(), String::new()))
        );
    }

    #[test]
    fn parse_key_value_rejects_empty_key() {
        assert_eq!(parse_key_value("=value"), None);
        assert_eq!(parse_key_value("   "), None);
    }

    #[test]
    fn unknown_pipeline_status_decodes_as_unknown() {
        let status: PipelineStatus = serde_json::from_str("\"brand_new_state\"").unwrap();
        assert_eq!(status, PipelineStatus::Unknown);
    }

    #[test]
    fn stage_aggregation_keeps_worst_status_and_reverses_order() {
        let jobs = vec![
            PipelineJob {
                id: 1,
                name: "deploy".into(),
                stage: "deploy".into(),
                status: PipelineStatus::Pending,
                duration: None,
            },
            PipelineJob {
                id: 2,
                name: "test-a".into(),
                stage: "test".into(),
                status: PipelineStatus::Success,
                duration: Some(10.0),
            },
            PipelineJob {
                id: 3,
                name: "test-b".into(),
                stage: "test".into(),
                status: PipelineStatus::Failed,
                duration: Some(3.0),
            },
            PipelineJob {
                id: 4,
                name: "build".into(),
                stage: "build".into(),
                status: PipelineStatus::Success,
                duration: Some(30.0),
            },
        ];

        let stages = aggregate_stages(&jobs);
        let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["build", "test", "deploy"]);
        assert_eq!(stages[1].status, PipelineStatus::Failed);
    }

    #[test]
    fn masked_token_short_and_long() {
        let mut p = Profile {
            token: "glpat-aaaabbbbcccc".into(),
            ..Profile::default()
        };
        assert_eq!(p.masked_token(), "glpa...cccc");
        p.token = "short".into();
        assert_eq!(p.masked_token(), "****");
    }

    #[test]
    fn schedule_decodes_with_missing_optionals() {
        let json = r#"{"id": 7, "description": "nightly", "ref": "main",
                       "cron": "0 0 * * *", "cron_timezone": "UTC", "active": true}"#;
        let s: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(s.id, 7);
        assert!(s.variables.is_empty());
        assert!(s.last_pipeline.is_none());
    }
}
