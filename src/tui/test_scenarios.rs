//! Scenario-driven end-to-end drills over the reducer and command bodies.
//!
//! Each drill simulates a realistic multi-step operator workflow against a
//! scripted in-memory API and profile store: keys go in as messages, the
//! returned commands run synchronously through the real command bodies, and
//! their completion messages feed straight back into the reducer. Timer
//! commands are captured instead of sleeping so tests advance the clock
//! explicitly.

#![allow(clippy::too_many_lines)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::errors::{GlsError, Result};
use crate::logger::ActivityLog;
use crate::models::{
    Pipeline, PipelineJob, PipelineRequest, PipelineStatus, Profile, Schedule, ScheduleChanges,
    ScheduleDraft, User, Variable,
};
use crate::services::gitlab::ScheduleApi;
use crate::services::profiles::ProfileStore;

use super::model::{AppModel, BannerKind, Cmd, Msg, Screen, ScreenKind};
use super::render::render_at;
use super::runtime::{Services, run_command};
use super::theme::Theme;
use super::update::update;

// ──────────────────── scripted collaborators ────────────────────

#[derive(Default)]
struct FakeState {
    schedules: Vec<Schedule>,
    branches: Vec<String>,
    user: Option<User>,
    pipelines: Vec<Pipeline>,
    jobs: HashMap<u64, Vec<PipelineJob>>,
    next_id: u64,
    /// Operation name that should fail on its next invocation.
    fail_next: Option<&'static str>,
    calls: Vec<String>,
}

#[derive(Default)]
struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn track(&self, op: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op.to_string());
        if state.fail_next == Some(op) {
            state.fail_next = None;
            return Err(GlsError::ApiStatus {
                operation: op,
                status: 500,
                body: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn call_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    fn fail_next(&self, op: &'static str) {
        self.state.lock().unwrap().fail_next = Some(op);
    }
}

impl ScheduleApi for FakeApi {
    fn connect(&self, profile: &Profile) -> Result<Profile> {
        self.track("connect")?;
        let mut resolved = profile.clone();
        resolved.project_id = 42;
        resolved.base_url = "https://gitlab.example.com".to_string();
        Ok(resolved)
    }

    fn validate_profile(&self, profile: &Profile) -> Result<Profile> {
        self.track("validate_profile")?;
        if profile.name.trim().is_empty() {
            return Err(GlsError::InvalidProfile {
                details: "name is required".to_string(),
            });
        }
        let mut resolved = profile.clone();
        resolved.project_id = 42;
        Ok(resolved)
    }

    fn list_schedules(&self) -> Result<Vec<Schedule>> {
        self.track("list_schedules")?;
        Ok(self.state.lock().unwrap().schedules.clone())
    }

    fn get_schedule(&self, id: u64) -> Result<Schedule> {
        self.track("get_schedule")?;
        self.state
            .lock()
            .unwrap()
            .schedules
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(GlsError::ApiStatus {
                operation: "get schedule",
                status: 404,
                body: String::new(),
            })
    }

    fn create_schedule(&self, draft: &ScheduleDraft) -> Result<Schedule> {
        self.track("create_schedule")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let schedule = Schedule {
            id: state.next_id,
            description: draft.description.clone(),
            ref_name: draft.ref_name.clone(),
            cron: draft.cron.clone(),
            cron_timezone: draft.cron_timezone.clone(),
            next_run_at: None,
            active: draft.active,
            created_at: None,
            updated_at: None,
            owner: state.user.clone(),
            last_pipeline: None,
            variables: draft.variables.clone(),
        };
        state.schedules.push(schedule.clone());
        Ok(schedule)
    }

    fn update_schedule(&self, id: u64, changes: &ScheduleChanges) -> Result<Schedule> {
        self.track("update_schedule")?;
        let mut state = self.state.lock().unwrap();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(GlsError::ApiStatus {
                operation: "update schedule",
                status: 404,
                body: String::new(),
            })?;
        if let Some(description) = &changes.description {
            schedule.description = description.clone();
        }
        if let Some(ref_name) = &changes.ref_name {
            schedule.ref_name = ref_name.clone();
        }
        if let Some(cron) = &changes.cron {
            schedule.cron = cron.clone();
        }
        if let Some(timezone) = &changes.cron_timezone {
            schedule.cron_timezone = timezone.clone();
        }
        if let Some(active) = changes.active {
            schedule.active = active;
        }
        Ok(schedule.clone())
    }

    fn delete_schedule(&self, id: u64) -> Result<()> {
        self.track("delete_schedule")?;
        self.state.lock().unwrap().schedules.retain(|s| s.id != id);
        Ok(())
    }

    fn run_schedule(&self, id: u64) -> Result<()> {
        self.track("run_schedule")?;
        let _ = id;
        Ok(())
    }

    fn take_ownership(&self, id: u64) -> Result<Schedule> {
        self.track("take_ownership")?;
        let mut state = self.state.lock().unwrap();
        let user = state.user.clone();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(GlsError::ApiStatus {
                operation: "take ownership",
                status: 404,
                body: String::new(),
            })?;
        schedule.owner = user;
        Ok(schedule.clone())
    }

    fn create_variable(&self, schedule_id: u64, variable: &Variable) -> Result<()> {
        self.track("create_variable")?;
        let mut state = self.state.lock().unwrap();
        if let Some(schedule) = state.schedules.iter_mut().find(|s| s.id == schedule_id) {
            schedule.variables.push(variable.clone());
        }
        Ok(())
    }

    fn update_variable(&self, schedule_id: u64, variable: &Variable) -> Result<()> {
        self.track("update_variable")?;
        let mut state = self.state.lock().unwrap();
        if let Some(schedule) = state.schedules.iter_mut().find(|s| s.id == schedule_id) {
            if let Some(existing) = schedule.variables.iter_mut().find(|v| v.key == variable.key)
            {
                *existing = variable.clone();
            }
        }
        Ok(())
    }

    fn delete_variable(&self, schedule_id: u64, key: &str) -> Result<()> {
        self.track("delete_variable")?;
        let mut state = self.state.lock().unwrap();
        if let Some(schedule) = state.schedules.iter_mut().find(|s| s.id == schedule_id) {
            schedule.variables.retain(|v| v.key != key);
        }
        Ok(())
    }

    fn current_user(&self) -> Result<User> {
        self.track("current_user")?;
        self.state
            .lock()
            .unwrap()
            .user
            .clone()
            .ok_or(GlsError::ApiStatus {
                operation: "current user",
                status: 401,
                body: String::new(),
            })
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        self.track("list_branches")?;
        Ok(self.state.lock().unwrap().branches.clone())
    }

    fn create_pipeline(&self, request: &PipelineRequest) -> Result<Pipeline> {
        self.track("create_pipeline")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let pipeline = Pipeline {
            id: state.next_id,
            ref_name: request.ref_name.clone(),
            status: PipelineStatus::Running,
            source: "web".to_string(),
            name: None,
            web_url: String::new(),
            created_at: None,
            updated_at: None,
            user: state.user.clone(),
        };
        state.pipelines.insert(0, pipeline.clone());
        Ok(pipeline)
    }

    fn list_pipelines(&self, limit: usize) -> Result<Vec<Pipeline>> {
        self.track("list_pipelines")?;
        let state = self.state.lock().unwrap();
        Ok(state.pipelines.iter().take(limit).cloned().collect())
    }

    fn list_pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<PipelineJob>> {
        self.track("list_pipeline_jobs")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .get(&pipeline_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeStore {
    profiles: Mutex<Vec<Profile>>,
    saves: Mutex<usize>,
}

impl ProfileStore for FakeStore {
    fn load(&self) -> Result<Vec<Profile>> {
        Ok(self.profiles.lock().unwrap().clone())
    }

    fn save(&self, profiles: &[Profile]) -> Result<()> {
        *self.profiles.lock().unwrap() = profiles.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

// ──────────────────── drill harness ────────────────────

/// Drives the real reducer and command bodies synchronously, capturing
/// timer commands for explicit firing.
struct Drill {
    model: AppModel,
    api: Arc<FakeApi>,
    store: Arc<FakeStore>,
    services: Services,
    timers: Vec<(Duration, Msg)>,
    quit: bool,
}

impl Drill {
    fn new(api: FakeApi, profiles: Vec<Profile>) -> Self {
        let api = Arc::new(api);
        let store = Arc::new(FakeStore {
            profiles: Mutex::new(profiles),
            saves: Mutex::new(0),
        });
        let services = Services {
            api: api.clone(),
            store: store.clone(),
            log: ActivityLog::disabled(),
        };
        let mut drill = Self {
            model: AppModel::new((120, 30)),
            api,
            store,
            services,
            timers: Vec::new(),
            quit: false,
        };
        // Startup: the runtime loads profiles before the first frame.
        drill.pump(vec![Cmd::LoadProfiles]);
        drill
    }

    fn pump(&mut self, cmds: Vec<Cmd>) {
        for cmd in cmds {
            match cmd {
                Cmd::Quit => self.quit = true,
                Cmd::ClearStatusAfter { generation, delay } => {
                    self.timers.push((delay, Msg::ClearStatus { generation }));
                }
                Cmd::PollPipelinesAfter { delay } => {
                    self.timers.push((delay, Msg::PollPipelines));
                }
                other => {
                    let msg = run_command(other, &self.services);
                    let next = update(&mut self.model, msg);
                    self.pump(next);
                }
            }
        }
    }

    fn press(&mut self, code: KeyCode) {
        let cmds = update(
            &mut self.model,
            Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)),
        );
        self.pump(cmds);
    }

    fn press_ctrl(&mut self, c: char) {
        let cmds = update(
            &mut self.model,
            Msg::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
        );
        self.pump(cmds);
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    /// Fire the oldest pending timer message.
    fn fire_timer(&mut self) {
        assert!(!self.timers.is_empty(), "no pending timer");
        let (_, msg) = self.timers.remove(0);
        let cmds = update(&mut self.model, msg);
        self.pump(cmds);
    }

    fn frame(&self) -> String {
        render_at(&self.model, &Theme::plain(), chrono::Utc::now())
    }

    fn banner_text(&self) -> Option<String> {
        self.model.banner.as_ref().map(|b| b.text.clone())
    }
}

fn sample_user() -> User {
    User {
        id: 1,
        username: "me".to_string(),
        name: "Me".to_string(),
    }
}

fn seeded_api(schedule_count: u64) -> FakeApi {
    let api = FakeApi::default();
    {
        let mut state = api.state.lock().unwrap();
        state.user = Some(sample_user());
        state.branches = vec!["main".to_string(), "develop".to_string()];
        state.next_id = 100;
        state.schedules = (1..=schedule_count)
            .map(|id| Schedule {
                id,
                description: format!("schedule {id}"),
                ref_name: "main".to_string(),
                cron: "0 0 * * *".to_string(),
                cron_timezone: "UTC".to_string(),
                next_run_at: None,
                active: true,
                created_at: None,
                updated_at: None,
                owner: Some(sample_user()),
                last_pipeline: None,
                variables: Vec::new(),
            })
            .collect();
    }
    api
}

fn work_profile() -> Profile {
    Profile {
        name: "work".to_string(),
        project_url: "https://gitlab.example.com/team/app".to_string(),
        token: "glpat-aaaabbbbcccc".to_string(),
        project_id: 0,
        base_url: String::new(),
    }
}

// ──────────────────── drills ────────────────────

#[test]
fn cold_start_with_no_profiles_shows_empty_state_then_create_form() {
    let mut drill = Drill::new(FakeApi::default(), Vec::new());

    let frame = drill.frame();
    assert!(frame.contains("No profiles found"));

    drill.press(KeyCode::Char('c'));
    assert_eq!(drill.model.screen.kind(), ScreenKind::ProfileForm);
    let Screen::ProfileForm(form) = &drill.model.screen else {
        panic!();
    };
    assert!(form.name.is_empty());
    assert!(form.url.is_empty());
    assert!(form.token.is_empty());
    assert!(form.name.is_focused(), "first field must hold focus");
}

#[test]
fn connect_profile_lands_on_schedule_list_and_persists_project_id() {
    let mut drill = Drill::new(seeded_api(2), vec![work_profile()]);

    drill.press(KeyCode::Enter);

    assert_eq!(drill.model.screen.kind(), ScreenKind::ScheduleList);
    assert_eq!(drill.model.profiles[0].project_id, 42);
    assert_eq!(drill.model.active_profile, Some(0));
    assert_eq!(drill.model.current_user, Some(sample_user()));
    assert_eq!(
        drill.store.profiles.lock().unwrap()[0].project_id,
        42,
        "refreshed project id must be persisted"
    );
    let frame = drill.frame();
    assert!(frame.contains("schedule 1"));
    assert!(frame.contains("work"));
}

#[test]
fn delete_schedule_end_to_end_with_timer_clear() {
    let mut drill = Drill::new(seeded_api(3), vec![work_profile()]);
    drill.press(KeyCode::Enter);

    // Move to the second schedule and request deletion.
    drill.press(KeyCode::Down);
    drill.press(KeyCode::Char('d'));
    let Screen::ScheduleList(state) = &drill.model.screen else {
        panic!();
    };
    assert!(!state.popup.as_ref().unwrap().yes_selected, "defaults to No");

    // Left selects Yes, enter confirms, the command runs.
    drill.press(KeyCode::Left);
    drill.press(KeyCode::Enter);

    assert!(drill.model.schedules.iter().all(|s| s.id != 2));
    assert_eq!(drill.api.call_count("delete_schedule"), 1);
    assert_eq!(drill.banner_text().as_deref(), Some("Schedule deleted!"));

    // The success banner clears after its scheduled timeout.
    drill.fire_timer();
    assert!(drill.model.banner.is_none());
}

#[test]
fn delete_failure_keeps_screen_and_entity_and_banners_error() {
    let mut drill = Drill::new(seeded_api(2), vec![work_profile()]);
    drill.press(KeyCode::Enter);

    drill.api.fail_next("delete_schedule");
    drill.press(KeyCode::Char('d'));
    drill.press(KeyCode::Left);
    drill.press(KeyCode::Enter);

    assert_eq!(drill.model.screen.kind(), ScreenKind::ScheduleList);
    assert_eq!(drill.model.schedules.len(), 2, "nothing deleted on failure");
    let banner = drill.model.banner.as_ref().unwrap();
    assert_eq!(banner.kind, BannerKind::Error);
    assert!(banner.text.contains("GLS-2002"));
}

#[test]
fn create_schedule_from_form_round_trip() {
    let mut drill = Drill::new(seeded_api(1), vec![work_profile()]);
    drill.press(KeyCode::Enter);

    drill.press(KeyCode::Char('c'));
    assert_eq!(drill.model.screen.kind(), ScreenKind::ScheduleForm);

    drill.type_text("Nightly deploy");
    drill.press_ctrl('s');

    assert_eq!(drill.model.screen.kind(), ScreenKind::ScheduleList);
    assert_eq!(drill.banner_text().as_deref(), Some("Schedule created!"));
    assert!(
        drill
            .model
            .schedules
            .iter()
            .any(|s| s.description == "Nightly deploy")
    );
    assert_eq!(drill.api.call_count("create_schedule"), 1);
}

#[test]
fn edit_schedule_syncs_variables_remotely() {
    let api = seeded_api(1);
    {
        let mut state = api.state.lock().unwrap();
        state.schedules[0].variables = vec![Variable::env("OLD", "1"), Variable::env("KEEP", "2")];
    }
    let mut drill = Drill::new(api, vec![work_profile()]);
    drill.press(KeyCode::Enter);

    // Open the edit form; variable rows: OLD=1, KEEP=2, trailing blank.
    drill.press(KeyCode::Char('e'));
    let Screen::ScheduleForm(form) = &drill.model.screen else {
        panic!();
    };
    assert_eq!(form.variables.row_count(), 3);

    // Tab to the variables section (description → cron → timezone →
    // branch → active → variables row 0).
    for _ in 0..5 {
        drill.press(KeyCode::Tab);
    }
    let Screen::ScheduleForm(form) = &drill.model.screen else {
        panic!();
    };
    assert!(matches!(
        form.ring.current(),
        super::model::ScheduleField::Variables
    ));

    // Erase the first row ("OLD=1" is 5 characters); the row collapses.
    for _ in 0..5 {
        drill.press(KeyCode::Backspace);
    }
    drill.press_ctrl('s');

    let schedules = drill.api.state.lock().unwrap().schedules.clone();
    assert_eq!(schedules[0].variables, vec![Variable::env("KEEP", "2")]);
    assert_eq!(drill.api.call_count("delete_variable"), 1);
    assert_eq!(drill.api.call_count("create_variable"), 0);
}

#[test]
fn quick_run_polls_while_running_and_stops_after_navigation() {
    let api = seeded_api(1);
    {
        let mut state = api.state.lock().unwrap();
        state.pipelines = vec![Pipeline {
            id: 500,
            ref_name: "main".to_string(),
            status: PipelineStatus::Running,
            source: "web".to_string(),
            name: None,
            web_url: String::new(),
            created_at: None,
            updated_at: None,
            user: Some(sample_user()),
        }];
    }
    let mut drill = Drill::new(api, vec![work_profile()]);
    drill.press(KeyCode::Enter);

    // Into the launcher: the load runs and schedules a poll.
    drill.press(KeyCode::Char('R'));
    assert_eq!(drill.model.screen.kind(), ScreenKind::QuickRun);
    assert_eq!(drill.api.call_count("list_pipelines"), 1);
    assert_eq!(drill.timers.len(), 1);

    // The poll fires while still on the launcher: another load + poll.
    drill.fire_timer();
    assert_eq!(drill.api.call_count("list_pipelines"), 2);
    assert_eq!(drill.timers.len(), 1);

    // Navigate away, then let the pending poll fire: it must be a no-op.
    drill.press(KeyCode::Esc);
    assert_eq!(drill.model.screen.kind(), ScreenKind::ScheduleList);
    let before = drill.model.clone();
    drill.fire_timer();
    assert_eq!(drill.model, before);
    assert_eq!(
        drill.api.call_count("list_pipelines"),
        2,
        "stale poll must not trigger another refresh"
    );
}

#[test]
fn quick_run_start_pipeline_uses_short_banner() {
    let mut drill = Drill::new(seeded_api(1), vec![work_profile()]);
    drill.press(KeyCode::Enter);
    drill.press(KeyCode::Char('R'));

    // Open the launch form and start on the default branch.
    drill.press(KeyCode::Char('R'));
    drill.press(KeyCode::Tab);
    drill.press(KeyCode::Tab);
    drill.press(KeyCode::Enter);

    assert_eq!(drill.api.call_count("create_pipeline"), 1);
    assert_eq!(drill.banner_text().as_deref(), Some("Pipeline started!"));

    // Shorter clear for pipeline starts, and the list reloaded; the new
    // running pipeline keeps the poll loop alive.
    let (delay, _) = &drill.timers[0];
    assert_eq!(*delay, super::model::PIPELINE_STATUS_CLEAR_AFTER);
    assert!(drill.api.call_count("list_pipelines") >= 2);
}

#[test]
fn profile_save_validation_failure_stays_on_form() {
    let mut drill = Drill::new(FakeApi::default(), Vec::new());
    drill.press(KeyCode::Char('c'));

    // Save with an empty name: the API validation rejects it.
    drill.press_ctrl('s');

    assert_eq!(drill.model.screen.kind(), ScreenKind::ProfileForm);
    let banner = drill.model.banner.as_ref().unwrap();
    assert_eq!(banner.kind, BannerKind::Error);
    assert!(banner.text.contains("GLS-1001"));
    assert_eq!(*drill.store.saves.lock().unwrap(), 0);
}

#[test]
fn profile_create_save_and_delete_round_trip() {
    let mut drill = Drill::new(seeded_api(0), Vec::new());
    drill.press(KeyCode::Char('c'));

    drill.type_text("staging");
    drill.press(KeyCode::Tab);
    drill.type_text("https://gitlab.example.com/team/staging");
    drill.press(KeyCode::Tab);
    drill.type_text("glpat-secret");
    drill.press_ctrl('s');

    assert_eq!(drill.model.screen.kind(), ScreenKind::ProfileList);
    assert_eq!(drill.model.profiles.len(), 1);
    assert_eq!(drill.banner_text().as_deref(), Some("Profile saved!"));
    assert_eq!(drill.store.profiles.lock().unwrap().len(), 1);

    // Delete it again via the confirmation popup.
    drill.press(KeyCode::Char('d'));
    drill.press(KeyCode::Char('y'));
    assert!(drill.model.profiles.is_empty());
    assert_eq!(drill.banner_text().as_deref(), Some("Profile deleted!"));
    assert!(drill.store.profiles.lock().unwrap().is_empty());
}

#[test]
fn search_then_run_schedule_operates_on_filtered_selection() {
    let mut drill = Drill::new(seeded_api(3), vec![work_profile()]);
    drill.press(KeyCode::Enter);

    drill.press(KeyCode::Char('/'));
    drill.type_text("schedule 3");
    drill.press(KeyCode::Enter);

    drill.press(KeyCode::Char('r'));
    assert_eq!(drill.api.call_count("run_schedule"), 1);
    assert_eq!(drill.banner_text().as_deref(), Some("Pipeline started!"));
}

#[test]
fn toggle_schedule_refreshes_silently() {
    let mut drill = Drill::new(seeded_api(1), vec![work_profile()]);
    drill.press(KeyCode::Enter);
    drill.model.banner = None;

    drill.press(KeyCode::Char('A'));
    assert!(!drill.model.schedules[0].active);
    assert!(
        drill.banner_text().is_none(),
        "toggle shows no status banner"
    );
}

#[test]
fn quit_from_schedule_list_stops_the_loop() {
    let mut drill = Drill::new(seeded_api(1), vec![work_profile()]);
    drill.press(KeyCode::Enter);
    drill.press(KeyCode::Char('q'));
    assert!(drill.quit);
}
