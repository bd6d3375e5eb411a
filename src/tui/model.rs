//! Elm-style state model for the dashboard.
//!
//! All display state lives in [`AppModel`]. Input and data events arrive as
//! [`Msg`] values; side-effects are represented as [`Cmd`] values returned
//! from the update function and executed by the runtime.
//!
//! **Design invariant:** the model is deterministic and testable — no I/O
//! happens here.

#![allow(missing_docs)]

use std::time::Duration;

use crossterm::event::KeyEvent;

use crate::models::{
    PipelineRequest, PipelineWithStages, Profile, Schedule, ScheduleDraft, User,
};

use super::form::{FocusRing, KvEditor, TextInput};
use super::popup::{ConfirmPopup, SelectPopup};

/// Application name shown in the header.
pub const APP_NAME: &str = "glsched";

/// Banner lifetime for action results and errors.
pub const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(10);
/// Shorter banner lifetime for ad-hoc pipeline starts.
pub const PIPELINE_STATUS_CLEAR_AFTER: Duration = Duration::from_secs(5);
/// Poll interval while any listed pipeline is still in progress.
pub const PIPELINE_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// How many recent pipelines the quick-run list fetches.
pub const QUICK_RUN_LIST_LIMIT: usize = 10;

// ──────────────────── status banner ────────────────────

/// Visual severity of the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
    Warning,
}

/// The single header banner. Each shown banner gets a fresh generation so a
/// stale delayed clear cannot erase a newer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub text: String,
    pub kind: BannerKind,
    pub generation: u64,
}

// ──────────────────── screens ────────────────────

/// Discriminant of [`Screen`], used for routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    ProfileList,
    ProfileForm,
    ScheduleList,
    ScheduleForm,
    QuickRun,
}

/// The active view. Exactly one variant exists at a time; each owns all of
/// its view-local state and is rebuilt on navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    ProfileList(ProfileListState),
    ProfileForm(ProfileFormState),
    ScheduleList(ScheduleListState),
    ScheduleForm(ScheduleFormState),
    QuickRun(QuickRunState),
}

impl Default for Screen {
    fn default() -> Self {
        Self::ProfileList(ProfileListState::default())
    }
}

impl Screen {
    #[must_use]
    pub const fn kind(&self) -> ScreenKind {
        match self {
            Self::ProfileList(_) => ScreenKind::ProfileList,
            Self::ProfileForm(_) => ScreenKind::ProfileForm,
            Self::ScheduleList(_) => ScreenKind::ScheduleList,
            Self::ScheduleForm(_) => ScreenKind::ScheduleForm,
            Self::QuickRun(_) => ScreenKind::QuickRun,
        }
    }
}

/// Profile table with a delete-confirmation popup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileListState {
    pub cursor: usize,
    pub popup: Option<ConfirmPopup>,
}

/// Fields of the profile form, in ring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Url,
    Token,
    Save,
    Cancel,
}

/// Create/edit form for a connection profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFormState {
    /// `None` creates a new profile; `Some` edits in place.
    pub editing: Option<usize>,
    pub ring: FocusRing<ProfileField>,
    pub name: TextInput,
    pub url: TextInput,
    pub token: TextInput,
}

impl ProfileFormState {
    /// Form seeded from an existing profile (edit) or blank (create), with
    /// the first field focused.
    #[must_use]
    pub fn new(profile: Option<&Profile>, editing: Option<usize>) -> Self {
        let mut name = TextInput::new()
            .with_placeholder("Profile name")
            .with_limit(50)
            .with_width(40);
        let mut url = TextInput::new()
            .with_placeholder("https://gitlab.com/group/project")
            .with_limit(200)
            .with_width(50);
        let mut token = TextInput::new()
            .with_placeholder("glpat-...")
            .with_limit(100)
            .with_width(50)
            .with_masked_echo();

        if let Some(profile) = profile {
            name.set_value(&profile.name);
            url.set_value(&profile.project_url);
            token.set_value(&profile.token);
        }
        name.focus();

        Self {
            editing,
            ring: FocusRing::new(vec![
                ProfileField::Name,
                ProfileField::Url,
                ProfileField::Token,
                ProfileField::Save,
                ProfileField::Cancel,
            ]),
            name,
            url,
            token,
        }
    }

    /// Profile value assembled from the current field contents.
    #[must_use]
    pub fn draft(&self, existing: Option<&Profile>) -> Profile {
        let mut draft = Profile {
            name: self.name.value(),
            project_url: self.url.value(),
            token: self.token.value(),
            project_id: 0,
            base_url: String::new(),
        };
        // Keep the cached id when the URL did not change.
        if let Some(existing) = existing {
            if existing.project_url == draft.project_url {
                draft.project_id = existing.project_id;
                draft.base_url = existing.base_url.clone();
            }
        }
        draft
    }
}

/// Schedule table with live search, scroll window and delete confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleListState {
    /// Cursor within the filtered view.
    pub cursor: usize,
    pub scroll: usize,
    pub search: TextInput,
    pub searching: bool,
    pub popup: Option<ConfirmPopup>,
}

impl Default for ScheduleListState {
    fn default() -> Self {
        Self {
            cursor: 0,
            scroll: 0,
            search: TextInput::new()
                .with_placeholder("Search...")
                .with_limit(40)
                .with_width(30),
            searching: false,
            popup: None,
        }
    }
}

impl ScheduleListState {
    /// Indices into the session schedule cache matching the search text
    /// (case-insensitive substring over description, branch and cron).
    #[must_use]
    pub fn filtered_indices(&self, schedules: &[Schedule]) -> Vec<usize> {
        let query = self.search.value().to_lowercase();
        if query.is_empty() {
            return (0..schedules.len()).collect();
        }
        schedules
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.description.to_lowercase().contains(&query)
                    || s.ref_name.to_lowercase().contains(&query)
                    || s.cron.to_lowercase().contains(&query)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// The schedule under the cursor, if any.
    #[must_use]
    pub fn selected<'a>(&self, schedules: &'a [Schedule]) -> Option<&'a Schedule> {
        let indices = self.filtered_indices(schedules);
        indices.get(self.cursor).map(|&i| &schedules[i])
    }

    /// Clamp the cursor after the underlying list changed.
    pub fn clamp_cursor(&mut self, schedules: &[Schedule]) {
        let len = self.filtered_indices(schedules).len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }
}

/// Fields of the schedule form, in ring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleField {
    Description,
    Cron,
    Timezone,
    Branch,
    Active,
    Variables,
    Save,
    Cancel,
}

/// Create/edit form for a schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleFormState {
    /// `None` creates a new schedule; `Some` updates an existing one.
    pub schedule_id: Option<u64>,
    /// Owner of the schedule being edited, for the ownership-transfer save.
    pub owner: Option<User>,
    pub ring: FocusRing<ScheduleField>,
    pub description: TextInput,
    pub cron: TextInput,
    pub timezone: String,
    pub branch: String,
    pub active: bool,
    pub variables: KvEditor,
    pub popup: Option<SelectPopup>,
}

impl ScheduleFormState {
    /// Form seeded from a schedule (edit, or a duplicate template with no
    /// id) or from defaults (create). The first field is focused.
    #[must_use]
    pub fn new(schedule: Option<&Schedule>, is_new: bool, default_branch: &str) -> Self {
        let mut description = TextInput::new()
            .with_placeholder("Schedule description")
            .with_limit(130)
            .with_width(50);
        let mut cron = TextInput::new()
            .with_placeholder("0 0 * * *")
            .with_limit(50)
            .with_width(20);

        let (schedule_id, owner, timezone, branch, active, variables) = match schedule {
            Some(s) => {
                description.set_value(&s.description);
                cron.set_value(&s.cron);
                let timezone = if s.cron_timezone.is_empty() {
                    "UTC".to_string()
                } else {
                    s.cron_timezone.clone()
                };
                (
                    if is_new { None } else { Some(s.id) },
                    s.owner.clone(),
                    timezone,
                    s.ref_name.clone(),
                    s.active,
                    KvEditor::new(&s.variables),
                )
            }
            None => {
                cron.set_value("0 0 * * *");
                (
                    None,
                    None,
                    "UTC".to_string(),
                    default_branch.to_string(),
                    true,
                    KvEditor::new(&[]),
                )
            }
        };
        description.focus();

        Self {
            schedule_id,
            owner,
            ring: FocusRing::new(vec![
                ScheduleField::Description,
                ScheduleField::Cron,
                ScheduleField::Timezone,
                ScheduleField::Branch,
                ScheduleField::Active,
                ScheduleField::Variables,
                ScheduleField::Save,
                ScheduleField::Cancel,
            ]),
            description,
            cron,
            timezone,
            branch,
            active,
            variables,
            popup: None,
        }
    }

    /// Draft assembled from the current field contents.
    #[must_use]
    pub fn draft(&self) -> ScheduleDraft {
        ScheduleDraft {
            description: self.description.value(),
            cron: self.cron.value(),
            cron_timezone: self.timezone.clone(),
            ref_name: self.branch.clone(),
            active: self.active,
            variables: self.variables.variables(),
        }
    }
}

/// Fields of the quick-run launch form, in ring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickRunField {
    Branch,
    Variables,
    Start,
    Cancel,
}

/// Ad-hoc run launcher: recent pipelines plus an optional launch form.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickRunState {
    pub pipelines: Vec<PipelineWithStages>,
    pub cursor: usize,
    pub scroll: usize,
    pub form_open: bool,
    pub ring: FocusRing<QuickRunField>,
    pub branch: String,
    pub variables: KvEditor,
    pub popup: Option<SelectPopup>,
}

impl QuickRunState {
    #[must_use]
    pub fn new(default_branch: &str) -> Self {
        Self {
            pipelines: Vec::new(),
            cursor: 0,
            scroll: 0,
            form_open: false,
            ring: FocusRing::new(vec![
                QuickRunField::Branch,
                QuickRunField::Variables,
                QuickRunField::Start,
                QuickRunField::Cancel,
            ]),
            branch: default_branch.to_string(),
            variables: KvEditor::new(&[]),
            popup: None,
        }
    }

    /// Whether any listed pipeline is still making progress.
    #[must_use]
    pub fn any_in_progress(&self) -> bool {
        self.pipelines
            .iter()
            .any(|p| p.pipeline.status.is_in_progress())
    }
}

// ──────────────────── the application model ────────────────────

/// The whole application state: session-wide data plus the active screen.
/// Mutated only inside the update function, one message at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct AppModel {
    pub screen: Screen,
    /// (columns, rows) last reported by the terminal.
    pub terminal_size: (u16, u16),
    pub profiles: Vec<Profile>,
    pub active_profile: Option<usize>,
    pub schedules: Vec<Schedule>,
    pub branches: Vec<String>,
    pub current_user: Option<User>,
    pub banner: Option<StatusBanner>,
    pub loading: bool,
    banner_generation: u64,
}

impl AppModel {
    /// Fresh model on the profile list.
    #[must_use]
    pub fn new(terminal_size: (u16, u16)) -> Self {
        Self {
            screen: Screen::default(),
            terminal_size,
            profiles: Vec::new(),
            active_profile: None,
            schedules: Vec::new(),
            branches: vec!["main".to_string(), "master".to_string()],
            current_user: None,
            banner: None,
            loading: false,
            banner_generation: 0,
        }
    }

    /// First cached branch name, used to seed branch dropdowns.
    #[must_use]
    pub fn default_branch(&self) -> &str {
        self.branches.first().map_or("main", String::as_str)
    }

    /// The active profile, if one is connected.
    #[must_use]
    pub fn active_profile(&self) -> Option<&Profile> {
        self.active_profile.and_then(|i| self.profiles.get(i))
    }

    /// Show a banner, superseding any current one. Returns the generation
    /// a delayed clear must carry to be honored.
    pub fn show_banner(&mut self, text: impl Into<String>, kind: BannerKind) -> u64 {
        self.banner_generation += 1;
        self.banner = Some(StatusBanner {
            text: text.into(),
            kind,
            generation: self.banner_generation,
        });
        self.banner_generation
    }

    /// Clear the banner only if `generation` still matches; stale clears
    /// from superseded banners are ignored.
    pub fn clear_banner_if(&mut self, generation: u64) {
        if self
            .banner
            .as_ref()
            .is_some_and(|b| b.generation == generation)
        {
            self.banner = None;
        }
    }

    /// Rows available for the schedule table (header chrome, search row and
    /// column header subtracted from the content area).
    #[must_use]
    pub fn schedule_list_rows(&self) -> usize {
        (self.terminal_size.1 as usize).saturating_sub(9)
    }

    /// Rows available for the quick-run pipeline list.
    #[must_use]
    pub fn pipeline_list_rows(&self) -> usize {
        (self.terminal_size.1 as usize).saturating_sub(13)
    }
}

// ──────────────────── messages ────────────────────

/// Where a navigation message lands, with the payload the new screen needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Nav {
    ProfileList,
    NewProfile,
    EditProfile { index: usize },
    ScheduleList,
    NewSchedule { template: Option<Schedule> },
    EditSchedule { schedule: Schedule },
    QuickRun,
}

/// Every event the update loop can process. Closed set; dispatch is an
/// exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    // Terminal transport.
    Key(KeyEvent),
    Resize(u16, u16),

    // Command completions.
    ProfilesLoaded(Vec<Profile>),
    ProfilesPersisted(Vec<Profile>),
    ProfileConnected {
        index: usize,
        profile: Profile,
        schedules: Vec<Schedule>,
        branches: Vec<String>,
        user: Option<User>,
    },
    SchedulesLoaded(Vec<Schedule>),
    SchedulesSaved {
        schedules: Vec<Schedule>,
        message: String,
    },
    ProfilesSaved {
        profiles: Vec<Profile>,
        message: String,
    },
    OwnershipTaken {
        schedules: Vec<Schedule>,
    },
    PipelineStarted,
    PipelinesLoaded(Vec<PipelineWithStages>),
    PollPipelines,

    // Navigation.
    Navigate(Nav),

    // Action requests emitted by screens.
    ConnectProfile { index: usize },
    SaveProfile {
        index: Option<usize>,
        draft: Profile,
    },
    DeleteProfile { index: usize },
    CreateSchedule { draft: ScheduleDraft },
    SaveSchedule {
        id: u64,
        draft: ScheduleDraft,
        take_ownership: bool,
    },
    DeleteSchedule { id: u64 },
    ToggleSchedule { id: u64, active: bool },
    RunSchedule { id: u64 },
    TakeOwnership { id: u64 },
    RefreshSchedules,
    StartPipeline { request: PipelineRequest },

    // Status banner.
    Status { text: String, kind: BannerKind },
    ClearStatus { generation: u64 },
    Error(String),
}

// ──────────────────── commands ────────────────────

/// A deferred unit of work. Constructed by the update function, executed by
/// the runtime on a worker thread; completion delivers exactly one [`Msg`]
/// back into the loop. Commands carry owned snapshots of everything they
/// need — never references into the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Deliver a message straight back through the loop.
    Emit(Msg),

    LoadProfiles,
    ConnectProfile { index: usize, profile: Profile },
    /// Validate against the API, then persist the full profile list.
    SaveProfile {
        index: Option<usize>,
        draft: Profile,
        profiles: Vec<Profile>,
    },
    DeleteProfile {
        index: usize,
        profiles: Vec<Profile>,
    },
    /// Persist without user-visible confirmation (refreshed project id).
    PersistProfiles { profiles: Vec<Profile> },

    CreateSchedule { draft: ScheduleDraft },
    UpdateSchedule {
        id: u64,
        draft: ScheduleDraft,
        take_ownership: bool,
    },
    DeleteSchedule { id: u64 },
    SetScheduleActive { id: u64, active: bool },
    RunSchedule { id: u64 },
    TakeOwnership { id: u64 },
    RefreshSchedules,

    StartPipeline { request: PipelineRequest },
    LoadPipelines,

    /// Deliver `Msg::ClearStatus { generation }` after the delay.
    ClearStatusAfter { generation: u64, delay: Duration },
    /// Deliver `Msg::PollPipelines` after the delay.
    PollPipelinesAfter { delay: Duration },

    /// Stop the event loop.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_generations_increase() {
        let mut model = AppModel::new((80, 24));
        let first = model.show_banner("a", BannerKind::Success);
        let second = model.show_banner("b", BannerKind::Error);
        assert!(second > first);
        assert_eq!(model.banner.as_ref().unwrap().text, "b");
    }

    #[test]
    fn stale_clear_is_ignored() {
        let mut model = AppModel::new((80, 24));
        let first = model.show_banner("a", BannerKind::Success);
        let _second = model.show_banner("b", BannerKind::Success);
        model.clear_banner_if(first);
        assert!(model.banner.is_some(), "stale clear must not erase newer banner");
    }

    #[test]
    fn matching_clear_empties_banner() {
        let mut model = AppModel::new((80, 24));
        let generation = model.show_banner("a", BannerKind::Success);
        model.clear_banner_if(generation);
        assert!(model.banner.is_none());
    }

    #[test]
    fn filtered_indices_match_search() {
        let schedules = vec![
            Schedule {
                id: 1,
                description: "Nightly build".into(),
                ref_name: "main".into(),
                cron: "0 0 * * *".into(),
                cron_timezone: "UTC".into(),
                next_run_at: None,
                active: true,
                created_at: None,
                updated_at: None,
                owner: None,
                last_pipeline: None,
                variables: Vec::new(),
            },
            Schedule {
                id: 2,
                description: "Weekly report".into(),
                ref_name: "release".into(),
                cron: "0 8 * * 1".into(),
                cron_timezone: "UTC".into(),
                next_run_at: None,
                active: true,
                created_at: None,
                updated_at: None,
                owner: None,
                last_pipeline: None,
                variables: Vec::new(),
            },
        ];

        let mut state = ScheduleListState::default();
        assert_eq!(state.filtered_indices(&schedules), vec![0, 1]);

        state.search.set_value("night");
        assert_eq!(state.filtered_indices(&schedules), vec![0]);

        state.search.set_value("RELEASE");
        assert_eq!(state.filtered_indices(&schedules), vec![1]);

        state.search.set_value("nothing");
        assert!(state.filtered_indices(&schedules).is_empty());
    }

    #[test]
    fn schedule_form_seeds_from_template_without_id() {
        let schedule = Schedule {
            id: 9,
            description: "[Copy] Nightly".into(),
            ref_name: "main".into(),
            cron: "0 2 * * *".into(),
            cron_timezone: "Europe/Berlin".into(),
            next_run_at: None,
            active: false,
            created_at: None,
            updated_at: None,
            owner: None,
            last_pipeline: None,
            variables: vec![crate::models::Variable::env("A", "1")],
        };
        let form = ScheduleFormState::new(Some(&schedule), true, "main");
        assert_eq!(form.schedule_id, None);
        assert_eq!(form.timezone, "Europe/Berlin");
        let draft = form.draft();
        assert_eq!(draft.description, "[Copy] Nightly");
        assert_eq!(draft.variables.len(), 1);
    }

    #[test]
    fn profile_form_preserves_cached_id_when_url_unchanged() {
        let existing = Profile {
            name: "work".into(),
            project_url: "https://gitlab.example.com/g/p".into(),
            token: "tok".into(),
            project_id: 77,
            base_url: "https://gitlab.example.com".into(),
        };
        let form = ProfileFormState::new(Some(&existing), Some(0));
        let draft = form.draft(Some(&existing));
        assert_eq!(draft.project_id, 77);

        let mut changed = ProfileFormState::new(Some(&existing), Some(0));
        changed.url.set_value("https://gitlab.example.com/g/other");
        let draft = changed.draft(Some(&existing));
        assert_eq!(draft.project_id, 0);
    }
}
