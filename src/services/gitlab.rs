//! GitLab REST client for pipeline schedules, branches, variables and
//! ad-hoc pipelines.
//!
//! All calls are synchronous; the application core only invokes them from
//! inside command bodies running on worker threads. The client holds the
//! active connection (base URL, token, resolved project id) behind a lock so
//! one shared client instance can serve every worker.

#![allow(missing_docs)]

use std::sync::RwLock;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::core::errors::{GlsError, Result};
use crate::models::{
    Pipeline, PipelineJob, PipelineRequest, Profile, Schedule, ScheduleChanges, ScheduleDraft,
    User, Variable,
};
use crate::services::cron;

/// Request timeout for every API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Branch pagination size.
const BRANCH_PAGE_SIZE: usize = 100;

/// Remote operations the application core schedules as commands.
///
/// `connect` must succeed before any project-scoped call; it resolves the
/// numeric project id from the profile's project URL and returns the profile
/// with `project_id`/`base_url` refreshed for persistence.
pub trait ScheduleApi: Send + Sync {
    fn connect(&self, profile: &Profile) -> Result<Profile>;
    /// Validate a profile draft without switching the active connection.
    fn validate_profile(&self, profile: &Profile) -> Result<Profile>;

    fn list_schedules(&self) -> Result<Vec<Schedule>>;
    fn get_schedule(&self, id: u64) -> Result<Schedule>;
    fn create_schedule(&self, draft: &ScheduleDraft) -> Result<Schedule>;
    fn update_schedule(&self, id: u64, changes: &ScheduleChanges) -> Result<Schedule>;
    fn delete_schedule(&self, id: u64) -> Result<()>;
    /// Trigger an immediate run of a schedule.
    fn run_schedule(&self, id: u64) -> Result<()>;
    fn take_ownership(&self, id: u64) -> Result<Schedule>;

    fn create_variable(&self, schedule_id: u64, variable: &Variable) -> Result<()>;
    fn update_variable(&self, schedule_id: u64, variable: &Variable) -> Result<()>;
    fn delete_variable(&self, schedule_id: u64, key: &str) -> Result<()>;

    fn current_user(&self) -> Result<User>;
    fn list_branches(&self) -> Result<Vec<String>>;

    fn create_pipeline(&self, request: &PipelineRequest) -> Result<Pipeline>;
    fn list_pipelines(&self, limit: usize) -> Result<Vec<Pipeline>>;
    fn list_pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<PipelineJob>>;
}

#[derive(Debug, Clone)]
struct Connection {
    base_url: String,
    token: String,
    project_id: u64,
}

/// [`ScheduleApi`] implementation over the GitLab v4 REST API.
pub struct GitLabClient {
    http: reqwest::blocking::Client,
    connection: RwLock<Option<Connection>>,
}

impl GitLabClient {
    /// Build a client with the standard request timeout.
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            connection: RwLock::new(None),
        })
    }

    fn connection(&self) -> Result<Connection> {
        self.connection
            .read()
            .map_err(|_| GlsError::Runtime {
                details: "connection lock poisoned".to_string(),
            })?
            .clone()
            .ok_or(GlsError::NotConnected)
    }

    fn get_json<T: DeserializeOwned>(&self, operation: &'static str, path: &str) -> Result<T> {
        let conn = self.connection()?;
        let response = self
            .http
            .get(format!("{}{path}", conn.base_url))
            .header("PRIVATE-TOKEN", &conn.token)
            .send()?;
        decode(operation, response, &[200])
    }

    fn send_form<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &str,
        form: &[(&str, String)],
        accept: &[u16],
    ) -> Result<T> {
        let conn = self.connection()?;
        let response = self
            .http
            .request(method, format!("{}{path}", conn.base_url))
            .header("PRIVATE-TOKEN", &conn.token)
            .form(form)
            .send()?;
        decode(operation, response, accept)
    }

    fn send_empty(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &str,
        accept: &[u16],
    ) -> Result<()> {
        let conn = self.connection()?;
        let response = self
            .http
            .request(method, format!("{}{path}", conn.base_url))
            .header("PRIVATE-TOKEN", &conn.token)
            .send()?;
        expect_status(operation, response, accept)?;
        Ok(())
    }

    /// Resolve the numeric project id for a profile without mutating
    /// connection state.
    fn resolve_project(&self, base_url: &str, token: &str, project_path: &str) -> Result<u64> {
        #[derive(serde::Deserialize)]
        struct ProjectId {
            id: u64,
        }

        let encoded = encode_path_component(project_path);
        let response = self
            .http
            .get(format!("{base_url}/api/v4/projects/{encoded}"))
            .header("PRIVATE-TOKEN", token)
            .send()?;
        let project: ProjectId = decode("resolve project", response, &[200])?;
        Ok(project.id)
    }

    fn resolved_profile(&self, profile: &Profile) -> Result<Profile> {
        let (base_url, project_path) = parse_project_url(&profile.project_url)?;
        let project_id = self.resolve_project(&base_url, &profile.token, &project_path)?;
        let mut resolved = profile.clone();
        resolved.base_url = base_url;
        resolved.project_id = project_id;
        Ok(resolved)
    }

    fn project_path(&self, suffix: &str) -> Result<String> {
        let conn = self.connection()?;
        Ok(format!("/api/v4/projects/{}{suffix}", conn.project_id))
    }
}

impl ScheduleApi for GitLabClient {
    fn connect(&self, profile: &Profile) -> Result<Profile> {
        let resolved = self.resolved_profile(profile)?;
        let mut slot = self.connection.write().map_err(|_| GlsError::Runtime {
            details: "connection lock poisoned".to_string(),
        })?;
        *slot = Some(Connection {
            base_url: resolved.base_url.clone(),
            token: resolved.token.clone(),
            project_id: resolved.project_id,
        });
        Ok(resolved)
    }

    fn validate_profile(&self, profile: &Profile) -> Result<Profile> {
        if profile.name.trim().is_empty() {
            return Err(GlsError::InvalidProfile {
                details: "name is required".to_string(),
            });
        }
        if profile.project_url.trim().is_empty() {
            return Err(GlsError::InvalidProfile {
                details: "project URL is required".to_string(),
            });
        }
        if profile.token.trim().is_empty() {
            return Err(GlsError::InvalidProfile {
                details: "access token is required".to_string(),
            });
        }
        self.resolved_profile(profile)
    }

    fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let path = self.project_path("/pipeline_schedules")?;
        let mut schedules: Vec<Schedule> = self.get_json("list schedules", &path)?;

        // The list endpoint omits variables and the last pipeline; expand
        // each schedule from the detail endpoint, tolerating per-item
        // failures (a schedule deleted mid-listing should not fail the list).
        for schedule in &mut schedules {
            if let Ok(detail) = self.get_schedule(schedule.id) {
                schedule.variables = detail.variables;
                schedule.last_pipeline = detail.last_pipeline;
            }
        }
        Ok(schedules)
    }

    fn get_schedule(&self, id: u64) -> Result<Schedule> {
        let path = self.project_path(&format!("/pipeline_schedules/{id}"))?;
        self.get_json("get schedule", &path)
    }

    fn create_schedule(&self, draft: &ScheduleDraft) -> Result<Schedule> {
        cron::validate_cron(&draft.cron)?;

        let mut form = vec![
            ("description", draft.description.clone()),
            ("ref", draft.ref_name.clone()),
            ("cron", draft.cron.clone()),
            ("active", draft.active.to_string()),
        ];
        if !draft.cron_timezone.is_empty() {
            form.push(("cron_timezone", draft.cron_timezone.clone()));
        }

        let path = self.project_path("/pipeline_schedules")?;
        let schedule: Schedule = self.send_form(
            "create schedule",
            reqwest::Method::POST,
            &path,
            &form,
            &[201],
        )?;

        // Variables live on a separate endpoint; attach them after creation.
        for variable in &draft.variables {
            self.create_variable(schedule.id, variable)?;
        }
        Ok(schedule)
    }

    fn update_schedule(&self, id: u64, changes: &ScheduleChanges) -> Result<Schedule> {
        if let Some(cron) = &changes.cron {
            cron::validate_cron(cron)?;
        }

        let mut form: Vec<(&str, String)> = Vec::new();
        if let Some(description) = &changes.description {
            form.push(("description", description.clone()));
        }
        if let Some(ref_name) = &changes.ref_name {
            form.push(("ref", ref_name.clone()));
        }
        if let Some(cron) = &changes.cron {
            form.push(("cron", cron.clone()));
        }
        if let Some(timezone) = &changes.cron_timezone {
            form.push(("cron_timezone", timezone.clone()));
        }
        if let Some(active) = changes.active {
            form.push(("active", active.to_string()));
        }

        let path = self.project_path(&format!("/pipeline_schedules/{id}"))?;
        self.send_form(
            "update schedule",
            reqwest::Method::PUT,
            &path,
            &form,
            &[200],
        )
    }

    fn delete_schedule(&self, id: u64) -> Result<()> {
        let path = self.project_path(&format!("/pipeline_schedules/{id}"))?;
        self.send_empty(
            "delete schedule",
            reqwest::Method::DELETE,
            &path,
            &[200, 204],
        )
    }

    fn run_schedule(&self, id: u64) -> Result<()> {
        let path = self.project_path(&format!("/pipeline_schedules/{id}/play"))?;
        self.send_empty("run schedule", reqwest::Method::POST, &path, &[201])
    }

    fn take_ownership(&self, id: u64) -> Result<Schedule> {
        let path = self.project_path(&format!("/pipeline_schedules/{id}/take_ownership"))?;
        self.send_form(
            "take ownership",
            reqwest::Method::POST,
            &path,
            &[],
            &[200, 201],
        )
    }

    fn create_variable(&self, schedule_id: u64, variable: &Variable) -> Result<()> {
        let form = vec![
            ("key", variable.key.clone()),
            ("value", variable.value.clone()),
            ("variable_type", variable.variable_type.clone()),
        ];
        let path = self.project_path(&format!("/pipeline_schedules/{schedule_id}/variables"))?;
        let _: serde_json::Value =
            self.send_form("create variable", reqwest::Method::POST, &path, &form, &[201])?;
        Ok(())
    }

    fn update_variable(&self, schedule_id: u64, variable: &Variable) -> Result<()> {
        let form = vec![
            ("value", variable.value.clone()),
            ("variable_type", variable.variable_type.clone()),
        ];
        let path = self.project_path(&format!(
            "/pipeline_schedules/{schedule_id}/variables/{}",
            encode_path_component(&variable.key)
        ))?;
        let _: serde_json::Value =
            self.send_form("update variable", reqwest::Method::PUT, &path, &form, &[200])?;
        Ok(())
    }

    fn delete_variable(&self, schedule_id: u64, key: &str) -> Result<()> {
        let path = self.project_path(&format!(
            "/pipeline_schedules/{schedule_id}/variables/{}",
            encode_path_component(key)
        ))?;
        self.send_empty(
            "delete variable",
            reqwest::Method::DELETE,
            &path,
            &[200, 204],
        )
    }

    fn current_user(&self) -> Result<User> {
        self.get_json("current user", "/api/v4/user")
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct Branch {
            name: String,
        }

        let mut names = Vec::new();
        let mut page = 1usize;
        loop {
            let path = self.project_path(&format!(
                "/repository/branches?page={page}&per_page={BRANCH_PAGE_SIZE}"
            ))?;
            let batch: Vec<Branch> = self.get_json("list branches", &path)?;
            let batch_len = batch.len();
            names.extend(batch.into_iter().map(|b| b.name));
            if batch_len < BRANCH_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(names)
    }

    fn create_pipeline(&self, request: &PipelineRequest) -> Result<Pipeline> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            #[serde(rename = "ref")]
            ref_name: &'a str,
            variables: &'a [Variable],
        }

        let conn = self.connection()?;
        let path = self.project_path("/pipeline")?;
        let response = self
            .http
            .post(format!("{}{path}", conn.base_url))
            .header("PRIVATE-TOKEN", &conn.token)
            .json(&Body {
                ref_name: &request.ref_name,
                variables: &request.variables,
            })
            .send()?;
        decode("create pipeline", response, &[201])
    }

    fn list_pipelines(&self, limit: usize) -> Result<Vec<Pipeline>> {
        let path = self.project_path(&format!("/pipelines?per_page={limit}"))?;
        let summaries: Vec<Pipeline> = self.get_json("list pipelines", &path)?;

        // The list endpoint omits source/name/user; expand each entry.
        let mut pipelines = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = summary.id;
            match self.get_json::<Pipeline>(
                "get pipeline",
                &self.project_path(&format!("/pipelines/{id}"))?,
            ) {
                Ok(detail) => pipelines.push(detail),
                Err(_) => pipelines.push(summary),
            }
        }
        Ok(pipelines)
    }

    fn list_pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<PipelineJob>> {
        let path = self.project_path(&format!("/pipelines/{pipeline_id}/jobs"))?;
        self.get_json("list pipeline jobs", &path)
    }
}

/// Split a project URL into API base URL and project path.
///
/// `https://gitlab.example.com/group/app/` →
/// (`https://gitlab.example.com`, `group/app`).
pub fn parse_project_url(project_url: &str) -> Result<(String, String)> {
    let trimmed = project_url.trim().trim_end_matches('/');
    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| GlsError::InvalidProjectUrl {
            details: format!("missing scheme: {project_url}"),
        })?;
    let (host, path) = rest
        .split_once('/')
        .ok_or_else(|| GlsError::InvalidProjectUrl {
            details: format!("missing project path: {project_url}"),
        })?;
    if host.is_empty() {
        return Err(GlsError::InvalidProjectUrl {
            details: format!("missing host: {project_url}"),
        });
    }
    if path.is_empty() {
        return Err(GlsError::InvalidProjectUrl {
            details: format!("missing project path: {project_url}"),
        });
    }
    Ok((format!("{scheme}://{host}"), path.to_string()))
}

/// Percent-encode a single path component (RFC 3986 unreserved set kept).
fn encode_path_component(raw: &str) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

fn expect_status(
    operation: &'static str,
    response: reqwest::blocking::Response,
    accept: &[u16],
) -> Result<String> {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    if accept.contains(&status) {
        Ok(body)
    } else {
        Err(GlsError::ApiStatus {
            operation,
            status,
            body,
        })
    }
}

fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: reqwest::blocking::Response,
    accept: &[u16],
) -> Result<T> {
    let body = expect_status(operation, response, accept)?;
    serde_json::from_str(&body).map_err(|err| GlsError::ApiDecode {
        operation,
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_url_splits_base_and_path() {
        let (base, path) = parse_project_url("https://gitlab.example.com/group/app/").unwrap();
        assert_eq!(base, "https://gitlab.example.com");
        assert_eq!(path, "group/app");
    }

    #[test]
    fn parse_project_url_keeps_nested_groups() {
        let (_, path) = parse_project_url("https://gitlab.com/a/b/c").unwrap();
        assert_eq!(path, "a/b/c");
    }

    #[test]
    fn parse_project_url_rejects_malformed_input() {
        assert!(parse_project_url("gitlab.com/group/app").is_err());
        assert!(parse_project_url("https://gitlab.com").is_err());
        assert!(parse_project_url("https:///group/app").is_err());
    }

    #[test]
    fn encode_path_component_escapes_slashes() {
        assert_eq!(encode_path_component("group/app"), "group%2Fapp");
        assert_eq!(encode_path_component("plain-name_1.0~x"), "plain-name_1.0~x");
        assert_eq!(encode_path_component("a b"), "a%20b");
    }

    #[test]
    fn unconnected_client_reports_not_connected() {
        let client = GitLabClient::new().unwrap();
        let err = client.list_schedules().unwrap_err();
        assert_eq!(err.code(), "GLS-2004");
    }

    #[test]
    fn validate_profile_requires_all_fields() {
        let client = GitLabClient::new().unwrap();
        let err = client.validate_profile(&Profile::default()).unwrap_err();
        assert_eq!(err.code(), "GLS-1001");

        let err = client
            .validate_profile(&Profile {
                name: "work".into(),
                project_url: "https://gitlab.example.com/g/p".into(),
                ..Profile::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn create_schedule_rejects_bad_cron_before_any_request() {
        let client = GitLabClient::new().unwrap();
        let draft = ScheduleDraft {
            cron: "not cron".into(),
            ..ScheduleDraft::default()
        };
        let err = client.create_schedule(&draft).unwrap_err();
        assert_eq!(err.code(), "GLS-1101");
    }
}
