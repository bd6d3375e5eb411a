//! Pure update function for the Elm-style dashboard.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns commands describing any side-effects the runtime should execute.
//!
//! **Design invariant:** this module performs zero I/O. All effects are
//! described as [`Cmd`] values. Global messages (loads, saves, errors,
//! status, navigation) are consumed here; key events not resolved globally
//! route to the active screen's handler.

#![allow(clippy::too_many_lines)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::models::{PipelineRequest, Schedule};

use super::input::{self, InputAction, InputContext};
use super::layout::adjust_scroll;
use super::model::{
    AppModel, BannerKind, Cmd, Msg, Nav, PIPELINE_POLL_INTERVAL, PIPELINE_STATUS_CLEAR_AFTER,
    ProfileField, ProfileFormState, ProfileListState, QuickRunField, QuickRunState,
    STATUS_CLEAR_AFTER, ScheduleField, ScheduleFormState, ScheduleListState, Screen,
};
use super::popup::{
    ConfirmAction, ConfirmOutcome, ConfirmPopup, SelectOutcome, SelectPopup, SelectTarget,
};

/// Apply a message to the model and return the commands to run next.
///
/// This is the core state machine of the dashboard. Every state transition
/// goes through this function, making the application deterministic and
/// testable. Dispatch is total: messages that do not apply to the current
/// screen are no-ops.
pub fn update(model: &mut AppModel, msg: Msg) -> Vec<Cmd> {
    match msg {
        Msg::Key(key) => handle_key(model, &key),

        Msg::Resize(cols, rows) => {
            model.terminal_size = (cols, rows);
            resync_scroll(model);
            Vec::new()
        }

        Msg::ProfilesLoaded(profiles) => {
            model.profiles = profiles;
            model.banner = None;
            if let Screen::ProfileList(state) = &mut model.screen {
                clamp_cursor(&mut state.cursor, model.profiles.len());
            }
            Vec::new()
        }

        Msg::ProfilesPersisted(profiles) => {
            model.profiles = profiles;
            Vec::new()
        }

        Msg::ProfileConnected {
            index,
            profile,
            schedules,
            branches,
            user,
        } => {
            model.loading = false;
            model.banner = None;
            model.schedules = schedules;
            if !branches.is_empty() {
                model.branches = branches;
            }
            model.current_user = user;
            model.active_profile = Some(index);

            // Persist the refreshed project id back into the store.
            let mut cmds = Vec::new();
            if let Some(slot) = model.profiles.get_mut(index) {
                *slot = profile;
                cmds.push(Cmd::PersistProfiles {
                    profiles: model.profiles.clone(),
                });
            }

            model.screen = Screen::ScheduleList(ScheduleListState::default());
            cmds
        }

        Msg::SchedulesLoaded(schedules) => {
            model.loading = false;
            model.schedules = schedules;
            if let Screen::ScheduleList(state) = &mut model.screen {
                state.clamp_cursor(&model.schedules);
            }
            Vec::new()
        }

        Msg::SchedulesSaved { schedules, message } => {
            model.loading = false;
            model.schedules = schedules;
            match &mut model.screen {
                Screen::ScheduleForm(_) => {
                    model.screen = Screen::ScheduleList(ScheduleListState::default());
                }
                Screen::ScheduleList(state) => state.clamp_cursor(&model.schedules),
                _ => {}
            }
            let generation = model.show_banner(message, BannerKind::Success);
            vec![Cmd::ClearStatusAfter {
                generation,
                delay: STATUS_CLEAR_AFTER,
            }]
        }

        Msg::ProfilesSaved { profiles, message } => {
            model.loading = false;
            model.profiles = profiles;
            match &mut model.screen {
                Screen::ProfileForm(_) => {
                    model.screen = Screen::ProfileList(ProfileListState::default());
                }
                Screen::ProfileList(state) => {
                    clamp_cursor(&mut state.cursor, model.profiles.len());
                }
                _ => {}
            }
            let generation = model.show_banner(message, BannerKind::Success);
            vec![Cmd::ClearStatusAfter {
                generation,
                delay: STATUS_CLEAR_AFTER,
            }]
        }

        Msg::OwnershipTaken { schedules } => {
            model.loading = false;
            model.schedules = schedules;
            if let Screen::ScheduleList(state) = &mut model.screen {
                state.clamp_cursor(&model.schedules);
            }
            let generation = model.show_banner("Ownership taken!", BannerKind::Success);
            vec![Cmd::ClearStatusAfter {
                generation,
                delay: STATUS_CLEAR_AFTER,
            }]
        }

        Msg::PipelineStarted => {
            model.loading = false;
            let generation = model.show_banner("Pipeline started!", BannerKind::Success);
            vec![
                Cmd::ClearStatusAfter {
                    generation,
                    delay: PIPELINE_STATUS_CLEAR_AFTER,
                },
                Cmd::LoadPipelines,
            ]
        }

        Msg::PipelinesLoaded(pipelines) => {
            let rows = model.pipeline_list_rows();
            // Stale-result tolerance: only the launcher consumes this.
            let Screen::QuickRun(state) = &mut model.screen else {
                return Vec::new();
            };
            state.pipelines = pipelines;
            clamp_cursor(&mut state.cursor, state.pipelines.len());
            state.scroll = adjust_scroll(state.cursor, state.scroll, rows);
            if state.any_in_progress() {
                vec![Cmd::PollPipelinesAfter {
                    delay: PIPELINE_POLL_INTERVAL,
                }]
            } else {
                Vec::new()
            }
        }

        Msg::PollPipelines => {
            // A poll landing after navigation away must not restart itself.
            if matches!(model.screen, Screen::QuickRun(_)) {
                vec![Cmd::LoadPipelines]
            } else {
                Vec::new()
            }
        }

        Msg::Navigate(nav) => handle_navigate(model, nav),

        // ── action requests ──

        Msg::ConnectProfile { index } => match model.profiles.get(index).cloned() {
            Some(profile) => {
                model.loading = true;
                model.show_banner("Connecting...", BannerKind::Warning);
                vec![Cmd::ConnectProfile { index, profile }]
            }
            None => index_error(index, model.profiles.len()),
        },

        Msg::SaveProfile { index, draft } => {
            model.loading = true;
            model.show_banner("Validating...", BannerKind::Warning);
            vec![Cmd::SaveProfile {
                index,
                draft,
                profiles: model.profiles.clone(),
            }]
        }

        Msg::DeleteProfile { index } => {
            if index >= model.profiles.len() {
                return index_error(index, model.profiles.len());
            }
            model.loading = true;
            vec![Cmd::DeleteProfile {
                index,
                profiles: model.profiles.clone(),
            }]
        }

        Msg::CreateSchedule { draft } => {
            model.loading = true;
            model.show_banner("Creating...", BannerKind::Warning);
            vec![Cmd::CreateSchedule { draft }]
        }

        Msg::SaveSchedule {
            id,
            draft,
            take_ownership,
        } => {
            model.loading = true;
            let text = if take_ownership {
                "Taking ownership and saving..."
            } else {
                "Saving..."
            };
            model.show_banner(text, BannerKind::Warning);
            vec![Cmd::UpdateSchedule {
                id,
                draft,
                take_ownership,
            }]
        }

        Msg::DeleteSchedule { id } => {
            model.loading = true;
            model.show_banner("Deleting...", BannerKind::Warning);
            vec![Cmd::DeleteSchedule { id }]
        }

        Msg::ToggleSchedule { id, active } => {
            vec![Cmd::SetScheduleActive { id, active }]
        }

        Msg::RunSchedule { id } => {
            model.loading = true;
            model.show_banner("Running pipeline...", BannerKind::Warning);
            vec![Cmd::RunSchedule { id }]
        }

        Msg::TakeOwnership { id } => {
            model.loading = true;
            model.show_banner("Taking ownership...", BannerKind::Warning);
            vec![Cmd::TakeOwnership { id }]
        }

        Msg::RefreshSchedules => {
            model.loading = true;
            model.show_banner("Refreshing...", BannerKind::Warning);
            vec![Cmd::RefreshSchedules]
        }

        Msg::StartPipeline { request } => {
            model.loading = true;
            model.show_banner("Starting pipeline...", BannerKind::Warning);
            vec![Cmd::StartPipeline { request }]
        }

        // ── status banner ──

        Msg::Status { text, kind } => {
            let generation = model.show_banner(text, kind);
            vec![Cmd::ClearStatusAfter {
                generation,
                delay: STATUS_CLEAR_AFTER,
            }]
        }

        Msg::ClearStatus { generation } => {
            model.clear_banner_if(generation);
            Vec::new()
        }

        Msg::Error(text) => {
            model.loading = false;
            let generation = model.show_banner(text, BannerKind::Error);
            vec![Cmd::ClearStatusAfter {
                generation,
                delay: STATUS_CLEAR_AFTER,
            }]
        }
    }
}

fn index_error(index: usize, len: usize) -> Vec<Cmd> {
    vec![Cmd::Emit(Msg::Error(
        crate::core::errors::GlsError::ProfileIndex { index, len }.to_string(),
    ))]
}

fn clamp_cursor(cursor: &mut usize, len: usize) {
    if len == 0 {
        *cursor = 0;
    } else if *cursor >= len {
        *cursor = len - 1;
    }
}

/// Re-window the active list after a terminal resize.
fn resync_scroll(model: &mut AppModel) {
    let schedule_rows = model.schedule_list_rows();
    let pipeline_rows = model.pipeline_list_rows();
    match &mut model.screen {
        Screen::ScheduleList(state) => {
            state.scroll = adjust_scroll(state.cursor, state.scroll, schedule_rows);
        }
        Screen::QuickRun(state) => {
            state.scroll = adjust_scroll(state.cursor, state.scroll, pipeline_rows);
        }
        _ => {}
    }
}

// ──────────────────── navigation ────────────────────

fn handle_navigate(model: &mut AppModel, nav: Nav) -> Vec<Cmd> {
    match nav {
        Nav::ProfileList => {
            let mut state = ProfileListState::default();
            clamp_cursor(&mut state.cursor, model.profiles.len());
            model.screen = Screen::ProfileList(state);
            Vec::new()
        }
        Nav::NewProfile => {
            model.screen = Screen::ProfileForm(ProfileFormState::new(None, None));
            Vec::new()
        }
        Nav::EditProfile { index } => match model.profiles.get(index) {
            Some(profile) => {
                model.screen =
                    Screen::ProfileForm(ProfileFormState::new(Some(profile), Some(index)));
                Vec::new()
            }
            None => index_error(index, model.profiles.len()),
        },
        Nav::ScheduleList => {
            model.screen = Screen::ScheduleList(ScheduleListState::default());
            Vec::new()
        }
        Nav::NewSchedule { template } => {
            model.screen = Screen::ScheduleForm(ScheduleFormState::new(
                template.as_ref(),
                true,
                model.default_branch(),
            ));
            Vec::new()
        }
        Nav::EditSchedule { schedule } => {
            model.screen = Screen::ScheduleForm(ScheduleFormState::new(
                Some(&schedule),
                false,
                model.default_branch(),
            ));
            Vec::new()
        }
        Nav::QuickRun => {
            model.screen = Screen::QuickRun(QuickRunState::new(model.default_branch()));
            vec![Cmd::LoadPipelines]
        }
    }
}

// ──────────────────── key routing ────────────────────

fn screen_popup_open(screen: &Screen) -> bool {
    match screen {
        Screen::ProfileList(state) => state.popup.is_some(),
        Screen::ScheduleList(state) => state.popup.is_some(),
        Screen::ScheduleForm(state) => state.popup.is_some(),
        Screen::QuickRun(state) => state.popup.is_some(),
        Screen::ProfileForm(_) => false,
    }
}

fn screen_editing(screen: &Screen) -> bool {
    match screen {
        Screen::ProfileList(_) => false,
        Screen::ScheduleList(state) => state.searching,
        Screen::ProfileForm(state) => matches!(
            state.ring.current(),
            ProfileField::Name | ProfileField::Url | ProfileField::Token
        ),
        Screen::ScheduleForm(state) => matches!(
            state.ring.current(),
            ScheduleField::Description | ScheduleField::Cron | ScheduleField::Variables
        ),
        Screen::QuickRun(state) => {
            state.form_open && state.ring.current() == QuickRunField::Variables
        }
    }
}

fn handle_key(model: &mut AppModel, key: &KeyEvent) -> Vec<Cmd> {
    let context = InputContext {
        screen: model.screen.kind(),
        popup_open: screen_popup_open(&model.screen),
        editing: screen_editing(&model.screen),
    };
    if let Some(action) = input::resolve_key(key, context).action {
        return match action {
            InputAction::Quit => vec![Cmd::Quit],
        };
    }

    let mut screen = std::mem::take(&mut model.screen);
    let cmds = match &mut screen {
        Screen::ProfileList(state) => profile_list_key(model, state, key),
        Screen::ProfileForm(state) => profile_form_key(model, state, key),
        Screen::ScheduleList(state) => schedule_list_key(model, state, key),
        Screen::ScheduleForm(state) => schedule_form_key(model, state, key),
        Screen::QuickRun(state) => quick_run_key(model, state, key),
    };
    model.screen = screen;
    cmds
}

fn is_ctrl_s(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL)
}

// ──────────────────── profile list ────────────────────

fn profile_list_key(
    model: &mut AppModel,
    state: &mut ProfileListState,
    key: &KeyEvent,
) -> Vec<Cmd> {
    if let Some(popup) = &mut state.popup {
        return match popup.handle_key(key.code) {
            ConfirmOutcome::Open => Vec::new(),
            ConfirmOutcome::Resolved(false) => {
                state.popup = None;
                Vec::new()
            }
            ConfirmOutcome::Resolved(true) => {
                let action = popup.action;
                state.popup = None;
                match action {
                    ConfirmAction::DeleteProfile { index } => {
                        vec![Cmd::Emit(Msg::DeleteProfile { index })]
                    }
                    ConfirmAction::DeleteSchedule { .. } => Vec::new(),
                }
            }
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            state.cursor = state.cursor.saturating_sub(1);
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.cursor + 1 < model.profiles.len() {
                state.cursor += 1;
            }
            Vec::new()
        }
        KeyCode::Enter => {
            if state.cursor < model.profiles.len() {
                vec![Cmd::Emit(Msg::ConnectProfile {
                    index: state.cursor,
                })]
            } else {
                Vec::new()
            }
        }
        KeyCode::Char('c') => vec![Cmd::Emit(Msg::Navigate(Nav::NewProfile))],
        KeyCode::Char('e') => {
            if state.cursor < model.profiles.len() {
                vec![Cmd::Emit(Msg::Navigate(Nav::EditProfile {
                    index: state.cursor,
                }))]
            } else {
                Vec::new()
            }
        }
        KeyCode::Char('d') => {
            if let Some(profile) = model.profiles.get(state.cursor) {
                state.popup = Some(ConfirmPopup::new(
                    "Delete Profile",
                    vec![format!("Delete \"{}\"?", profile.name)],
                    ConfirmAction::DeleteProfile {
                        index: state.cursor,
                    },
                ));
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

// ──────────────────── profile form ────────────────────

fn profile_form_focus(state: &mut ProfileFormState) {
    state.name.blur();
    state.url.blur();
    state.token.blur();
    match state.ring.current() {
        ProfileField::Name => state.name.focus(),
        ProfileField::Url => state.url.focus(),
        ProfileField::Token => state.token.focus(),
        ProfileField::Save | ProfileField::Cancel => {}
    }
}

fn profile_form_save(model: &AppModel, state: &ProfileFormState) -> Vec<Cmd> {
    let existing = state.editing.and_then(|i| model.profiles.get(i));
    vec![Cmd::Emit(Msg::SaveProfile {
        index: state.editing,
        draft: state.draft(existing),
    })]
}

fn profile_form_key(
    model: &mut AppModel,
    state: &mut ProfileFormState,
    key: &KeyEvent,
) -> Vec<Cmd> {
    if is_ctrl_s(key) {
        return profile_form_save(model, state);
    }

    match key.code {
        KeyCode::Esc => vec![Cmd::Emit(Msg::Navigate(Nav::ProfileList))],
        KeyCode::Tab | KeyCode::Down => {
            state.ring.focus_next();
            profile_form_focus(state);
            Vec::new()
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.ring.focus_prev();
            profile_form_focus(state);
            Vec::new()
        }
        KeyCode::Enter => match state.ring.current() {
            ProfileField::Save => profile_form_save(model, state),
            ProfileField::Cancel => vec![Cmd::Emit(Msg::Navigate(Nav::ProfileList))],
            _ => {
                state.ring.focus_next();
                profile_form_focus(state);
                Vec::new()
            }
        },
        KeyCode::Left if state.ring.current() == ProfileField::Cancel => {
            state.ring.focus(ProfileField::Save);
            Vec::new()
        }
        KeyCode::Right if state.ring.current() == ProfileField::Save => {
            state.ring.focus(ProfileField::Cancel);
            Vec::new()
        }
        _ => {
            match state.ring.current() {
                ProfileField::Name => state.name.handle_key(key),
                ProfileField::Url => state.url.handle_key(key),
                ProfileField::Token => state.token.handle_key(key),
                ProfileField::Save | ProfileField::Cancel => false,
            };
            Vec::new()
        }
    }
}

// ──────────────────── schedule list ────────────────────

fn schedule_list_key(
    model: &mut AppModel,
    state: &mut ScheduleListState,
    key: &KeyEvent,
) -> Vec<Cmd> {
    if let Some(popup) = &mut state.popup {
        return match popup.handle_key(key.code) {
            ConfirmOutcome::Open => Vec::new(),
            ConfirmOutcome::Resolved(false) => {
                state.popup = None;
                Vec::new()
            }
            ConfirmOutcome::Resolved(true) => {
                let action = popup.action;
                state.popup = None;
                match action {
                    ConfirmAction::DeleteSchedule { id } => {
                        vec![Cmd::Emit(Msg::DeleteSchedule { id })]
                    }
                    ConfirmAction::DeleteProfile { .. } => Vec::new(),
                }
            }
        };
    }

    if state.searching {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                state.searching = false;
                state.search.blur();
            }
            _ => {
                if state.search.handle_key(key) {
                    state.cursor = 0;
                    state.scroll = 0;
                }
            }
        }
        return Vec::new();
    }

    let rows = model.schedule_list_rows();
    let filtered_len = state.filtered_indices(&model.schedules).len();

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            if state.cursor > 0 {
                state.cursor -= 1;
            } else if filtered_len > 0 {
                state.cursor = filtered_len - 1;
            }
            state.scroll = adjust_scroll(state.cursor, state.scroll, rows);
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.cursor + 1 < filtered_len {
                state.cursor += 1;
            } else if filtered_len > 0 {
                state.cursor = 0;
            }
            state.scroll = adjust_scroll(state.cursor, state.scroll, rows);
            Vec::new()
        }
        KeyCode::Enter | KeyCode::Char('e') => state.selected(&model.schedules).map_or_else(
            Vec::new,
            |schedule| {
                vec![Cmd::Emit(Msg::Navigate(Nav::EditSchedule {
                    schedule: schedule.clone(),
                }))]
            },
        ),
        KeyCode::Char('c') => {
            vec![Cmd::Emit(Msg::Navigate(Nav::NewSchedule { template: None }))]
        }
        KeyCode::Char('y') => state.selected(&model.schedules).map_or_else(
            Vec::new,
            |schedule| {
                vec![Cmd::Emit(Msg::Navigate(Nav::NewSchedule {
                    template: Some(duplicate_template(schedule)),
                }))]
            },
        ),
        KeyCode::Char('d') => {
            if let Some(schedule) = state.selected(&model.schedules) {
                state.popup = Some(ConfirmPopup::new(
                    "Delete Schedule",
                    vec![format!("Delete \"{}\"?", schedule.description)],
                    ConfirmAction::DeleteSchedule { id: schedule.id },
                ));
            }
            Vec::new()
        }
        KeyCode::Char('A') => state.selected(&model.schedules).map_or_else(
            Vec::new,
            |schedule| {
                vec![Cmd::Emit(Msg::ToggleSchedule {
                    id: schedule.id,
                    active: !schedule.active,
                })]
            },
        ),
        KeyCode::Char('r') => state.selected(&model.schedules).map_or_else(
            Vec::new,
            |schedule| vec![Cmd::Emit(Msg::RunSchedule { id: schedule.id })],
        ),
        KeyCode::Char('R') => vec![Cmd::Emit(Msg::Navigate(Nav::QuickRun))],
        KeyCode::Char('t') => state.selected(&model.schedules).map_or_else(
            Vec::new,
            |schedule| vec![Cmd::Emit(Msg::TakeOwnership { id: schedule.id })],
        ),
        KeyCode::Char('u') => vec![Cmd::Emit(Msg::RefreshSchedules)],
        KeyCode::Char('o') => vec![Cmd::Emit(Msg::Navigate(Nav::ProfileList))],
        KeyCode::Char('/') => {
            state.searching = true;
            state.search.focus();
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Copy a schedule into a create-form template.
fn duplicate_template(schedule: &Schedule) -> Schedule {
    let mut template = schedule.clone();
    template.description = format!("[Copy] {}", schedule.description);
    template
}

// ──────────────────── schedule form ────────────────────

enum FocusDirection {
    Forward,
    Backward,
}

fn schedule_form_focus(state: &mut ScheduleFormState, direction: &FocusDirection) {
    state.description.blur();
    state.cron.blur();
    state.variables.blur_all();
    match state.ring.current() {
        ScheduleField::Description => state.description.focus(),
        ScheduleField::Cron => state.cron.focus(),
        ScheduleField::Variables => {
            let row = match direction {
                FocusDirection::Forward => 0,
                FocusDirection::Backward => state.variables.row_count() - 1,
            };
            state.variables.focus_row(row);
        }
        _ => {}
    }
}

fn schedule_form_next(state: &mut ScheduleFormState) {
    if state.ring.current() == ScheduleField::Variables
        && state.variables.focused + 1 < state.variables.row_count()
    {
        state.variables.focus_row(state.variables.focused + 1);
        return;
    }
    state.ring.focus_next();
    schedule_form_focus(state, &FocusDirection::Forward);
}

fn schedule_form_prev(state: &mut ScheduleFormState) {
    if state.ring.current() == ScheduleField::Variables && state.variables.focused > 0 {
        state.variables.focus_row(state.variables.focused - 1);
        return;
    }
    state.ring.focus_prev();
    schedule_form_focus(state, &FocusDirection::Backward);
}

fn schedule_form_save(model: &AppModel, state: &ScheduleFormState) -> Vec<Cmd> {
    let draft = state.draft();
    match state.schedule_id {
        None => vec![Cmd::Emit(Msg::CreateSchedule { draft })],
        Some(id) => {
            // Updating someone else's schedule requires taking it over first.
            let take_ownership = match (&state.owner, &model.current_user) {
                (Some(owner), Some(user)) => owner.id != user.id,
                _ => false,
            };
            vec![Cmd::Emit(Msg::SaveSchedule {
                id,
                draft,
                take_ownership,
            })]
        }
    }
}

fn schedule_form_key(
    model: &mut AppModel,
    state: &mut ScheduleFormState,
    key: &KeyEvent,
) -> Vec<Cmd> {
    if let Some(popup) = &mut state.popup {
        match popup.handle_key(key.code) {
            SelectOutcome::Open => {}
            SelectOutcome::Cancelled => state.popup = None,
            SelectOutcome::Chosen(choice) => {
                let target = popup.target;
                let value = popup.options[choice].clone();
                state.popup = None;
                match target {
                    SelectTarget::Timezone => state.timezone = value,
                    SelectTarget::Branch => state.branch = value,
                }
            }
        }
        return Vec::new();
    }

    if is_ctrl_s(key) {
        return schedule_form_save(model, state);
    }

    match key.code {
        KeyCode::Esc => vec![Cmd::Emit(Msg::Navigate(Nav::ScheduleList))],
        KeyCode::Tab | KeyCode::Down => {
            schedule_form_next(state);
            Vec::new()
        }
        KeyCode::BackTab | KeyCode::Up => {
            schedule_form_prev(state);
            Vec::new()
        }
        KeyCode::Enter => match state.ring.current() {
            ScheduleField::Timezone => {
                let options: Vec<String> = crate::services::cron::COMMON_TIMEZONES
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                let selected = options
                    .iter()
                    .position(|tz| *tz == state.timezone)
                    .unwrap_or(0);
                state.popup = Some(SelectPopup::new(
                    "Timezone",
                    options,
                    selected,
                    SelectTarget::Timezone,
                    popup_width_budget(model),
                ));
                Vec::new()
            }
            ScheduleField::Branch => {
                let options = branch_options(model, &state.branch);
                let selected = options
                    .iter()
                    .position(|b| *b == state.branch)
                    .unwrap_or(0);
                state.popup = Some(SelectPopup::new(
                    "Branch",
                    options,
                    selected,
                    SelectTarget::Branch,
                    popup_width_budget(model),
                ));
                Vec::new()
            }
            ScheduleField::Active => {
                state.active = !state.active;
                Vec::new()
            }
            ScheduleField::Variables => {
                state.variables.commit_trailing();
                Vec::new()
            }
            ScheduleField::Save => schedule_form_save(model, state),
            ScheduleField::Cancel => vec![Cmd::Emit(Msg::Navigate(Nav::ScheduleList))],
            ScheduleField::Description | ScheduleField::Cron => Vec::new(),
        },
        KeyCode::Left if state.ring.current() == ScheduleField::Cancel => {
            state.ring.focus(ScheduleField::Save);
            Vec::new()
        }
        KeyCode::Right if state.ring.current() == ScheduleField::Save => {
            state.ring.focus(ScheduleField::Cancel);
            Vec::new()
        }
        _ => {
            match state.ring.current() {
                ScheduleField::Description => {
                    state.description.handle_key(key);
                }
                ScheduleField::Cron => {
                    state.cron.handle_key(key);
                }
                ScheduleField::Variables => {
                    state.variables.handle_key(key);
                }
                _ => {}
            }
            Vec::new()
        }
    }
}

/// Branch dropdown options: the cached branch list, or the current value
/// alone when no branches were fetched.
fn branch_options(model: &AppModel, current: &str) -> Vec<String> {
    if model.branches.is_empty() {
        vec![current.to_string()]
    } else {
        model.branches.clone()
    }
}

/// Widest popup that still fits the content area.
fn popup_width_budget(model: &AppModel) -> usize {
    (model.terminal_size.0 as usize).saturating_sub(10)
}

// ──────────────────── quick run ────────────────────

fn quick_run_focus(state: &mut QuickRunState, direction: &FocusDirection) {
    state.variables.blur_all();
    if state.ring.current() == QuickRunField::Variables {
        let row = match direction {
            FocusDirection::Forward => 0,
            FocusDirection::Backward => state.variables.row_count() - 1,
        };
        state.variables.focus_row(row);
    }
}

fn quick_run_next(state: &mut QuickRunState) {
    if state.ring.current() == QuickRunField::Variables
        && state.variables.focused + 1 < state.variables.row_count()
    {
        state.variables.focus_row(state.variables.focused + 1);
        return;
    }
    state.ring.focus_next();
    quick_run_focus(state, &FocusDirection::Forward);
}

fn quick_run_prev(state: &mut QuickRunState) {
    if state.ring.current() == QuickRunField::Variables && state.variables.focused > 0 {
        state.variables.focus_row(state.variables.focused - 1);
        return;
    }
    state.ring.focus_prev();
    quick_run_focus(state, &FocusDirection::Backward);
}

fn quick_run_form_key(model: &AppModel, state: &mut QuickRunState, key: &KeyEvent) -> Vec<Cmd> {
    match key.code {
        KeyCode::Esc => {
            state.form_open = false;
            Vec::new()
        }
        KeyCode::Tab | KeyCode::Down => {
            quick_run_next(state);
            Vec::new()
        }
        KeyCode::BackTab | KeyCode::Up => {
            quick_run_prev(state);
            Vec::new()
        }
        KeyCode::Enter => match state.ring.current() {
            QuickRunField::Branch => {
                let options = branch_options(model, &state.branch);
                let selected = options
                    .iter()
                    .position(|b| *b == state.branch)
                    .unwrap_or(0);
                state.popup = Some(SelectPopup::new(
                    "Branch",
                    options,
                    selected,
                    SelectTarget::Branch,
                    popup_width_budget(model),
                ));
                Vec::new()
            }
            QuickRunField::Variables => {
                state.variables.commit_trailing();
                Vec::new()
            }
            QuickRunField::Start => {
                state.form_open = false;
                vec![Cmd::Emit(Msg::StartPipeline {
                    request: PipelineRequest {
                        ref_name: state.branch.clone(),
                        variables: state.variables.variables(),
                    },
                })]
            }
            QuickRunField::Cancel => {
                state.form_open = false;
                Vec::new()
            }
        },
        KeyCode::Left if state.ring.current() == QuickRunField::Cancel => {
            state.ring.focus(QuickRunField::Start);
            Vec::new()
        }
        KeyCode::Right if state.ring.current() == QuickRunField::Start => {
            state.ring.focus(QuickRunField::Cancel);
            Vec::new()
        }
        _ => {
            if state.ring.current() == QuickRunField::Variables {
                state.variables.handle_key(key);
            }
            Vec::new()
        }
    }
}

fn quick_run_key(model: &mut AppModel, state: &mut QuickRunState, key: &KeyEvent) -> Vec<Cmd> {
    if let Some(popup) = &mut state.popup {
        match popup.handle_key(key.code) {
            SelectOutcome::Open => {}
            SelectOutcome::Cancelled => state.popup = None,
            SelectOutcome::Chosen(choice) => {
                let value = popup.options[choice].clone();
                state.popup = None;
                state.branch = value;
            }
        }
        return Vec::new();
    }

    if state.form_open {
        return quick_run_form_key(model, state, key);
    }

    let rows = model.pipeline_list_rows();
    match key.code {
        KeyCode::Esc => vec![Cmd::Emit(Msg::Navigate(Nav::ScheduleList))],
        KeyCode::Char('R') => {
            state.form_open = true;
            state.ring.focus(QuickRunField::Branch);
            state.variables.blur_all();
            Vec::new()
        }
        KeyCode::Char('u') => vec![Cmd::Emit(Msg::PollPipelines)],
        KeyCode::Up | KeyCode::Char('k') => {
            state.cursor = state.cursor.saturating_sub(1);
            state.scroll = adjust_scroll(state.cursor, state.scroll, rows);
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.cursor + 1 < state.pipelines.len() {
                state.cursor += 1;
            }
            state.scroll = adjust_scroll(state.cursor, state.scroll, rows);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pipeline, PipelineStatus, PipelineWithStages, Profile};
    use crate::tui::model::{ScreenKind, StatusBanner};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_msg(code: KeyCode) -> Msg {
        Msg::Key(press(code))
    }

    fn schedule(id: u64, description: &str) -> Schedule {
        Schedule {
            id,
            description: description.to_string(),
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
        }
    }

    fn model_on_schedule_list(count: usize) -> AppModel {
        let mut model = AppModel::new((100, 19));
        model.schedules = (0..count)
            .map(|i| schedule(i as u64 + 1, &format!("job {i}")))
            .collect();
        model.screen = Screen::ScheduleList(ScheduleListState::default());
        model
    }

    #[test]
    fn quit_only_from_list_screens() {
        let mut model = AppModel::new((80, 24));
        assert_eq!(update(&mut model, key_msg(KeyCode::Char('q'))), vec![Cmd::Quit]);

        model.screen = Screen::ProfileForm(ProfileFormState::new(None, None));
        let cmds = update(&mut model, key_msg(KeyCode::Char('q')));
        assert!(!cmds.contains(&Cmd::Quit));
    }

    #[test]
    fn resize_updates_terminal_size() {
        let mut model = AppModel::new((80, 24));
        update(&mut model, Msg::Resize(120, 40));
        assert_eq!(model.terminal_size, (120, 40));
    }

    #[test]
    fn error_sets_banner_and_schedules_clear() {
        let mut model = AppModel::new((80, 24));
        let cmds = update(&mut model, Msg::Error("boom".into()));
        let banner = model.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(
            cmds,
            vec![Cmd::ClearStatusAfter {
                generation: banner.generation,
                delay: STATUS_CLEAR_AFTER,
            }]
        );
    }

    #[test]
    fn error_does_not_change_screen() {
        let mut model = model_on_schedule_list(3);
        update(&mut model, Msg::Error("network down".into()));
        assert_eq!(model.screen.kind(), ScreenKind::ScheduleList);
    }

    #[test]
    fn stale_clear_after_newer_banner_is_noop() {
        let mut model = AppModel::new((80, 24));
        let first = update(&mut model, Msg::Error("first".into()));
        let Cmd::ClearStatusAfter { generation, .. } = first[0] else {
            panic!("expected clear command");
        };
        update(
            &mut model,
            Msg::Status {
                text: "second".into(),
                kind: BannerKind::Success,
            },
        );
        update(&mut model, Msg::ClearStatus { generation });
        assert_eq!(model.banner.as_ref().unwrap().text, "second");
    }

    #[test]
    fn scroll_follows_cursor_through_long_list() {
        // 25 schedules, 10 visible rows (19-row terminal).
        let mut model = model_on_schedule_list(25);
        assert_eq!(model.schedule_list_rows(), 10);

        for _ in 0..24 {
            update(&mut model, key_msg(KeyCode::Down));
        }
        let Screen::ScheduleList(state) = &model.screen else {
            panic!("expected schedule list");
        };
        assert_eq!(state.cursor, 24);
        assert_eq!(state.scroll, 15);
    }

    #[test]
    fn schedule_cursor_wraps_at_both_ends() {
        let mut model = model_on_schedule_list(3);
        update(&mut model, key_msg(KeyCode::Up));
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert_eq!(state.cursor, 2);

        update(&mut model, key_msg(KeyCode::Down));
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn delete_flow_defaults_no_and_confirms_with_left_enter() {
        let mut model = model_on_schedule_list(3);
        update(&mut model, key_msg(KeyCode::Char('d')));
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        let popup = state.popup.as_ref().unwrap();
        assert!(!popup.yes_selected, "delete must default to No");

        // Enter on the default resolves No: popup gone, nothing emitted.
        let cmds = update(&mut model, key_msg(KeyCode::Enter));
        assert!(cmds.is_empty());
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert!(state.popup.is_none());

        // Reopen, move to Yes, confirm.
        update(&mut model, key_msg(KeyCode::Char('d')));
        update(&mut model, key_msg(KeyCode::Left));
        let cmds = update(&mut model, key_msg(KeyCode::Enter));
        assert_eq!(cmds, vec![Cmd::Emit(Msg::DeleteSchedule { id: 1 })]);
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert!(state.popup.is_none());
    }

    #[test]
    fn delete_request_issues_command_and_warning_banner() {
        let mut model = model_on_schedule_list(2);
        let cmds = update(&mut model, Msg::DeleteSchedule { id: 2 });
        assert_eq!(cmds, vec![Cmd::DeleteSchedule { id: 2 }]);
        assert_eq!(model.banner.as_ref().unwrap().kind, BannerKind::Warning);
        assert!(model.loading);
    }

    #[test]
    fn schedules_saved_updates_cache_and_banners_success() {
        let mut model = model_on_schedule_list(3);
        let cmds = update(
            &mut model,
            Msg::SchedulesSaved {
                schedules: vec![schedule(1, "only one left")],
                message: "Schedule deleted!".into(),
            },
        );
        assert_eq!(model.schedules.len(), 1);
        assert!(!model.loading);
        assert_eq!(model.banner.as_ref().unwrap().kind, BannerKind::Success);
        assert!(matches!(cmds[0], Cmd::ClearStatusAfter { .. }));
    }

    #[test]
    fn saved_from_form_returns_to_schedule_list() {
        let mut model = AppModel::new((100, 30));
        model.screen = Screen::ScheduleForm(ScheduleFormState::new(None, true, "main"));
        update(
            &mut model,
            Msg::SchedulesSaved {
                schedules: Vec::new(),
                message: "Schedule created!".into(),
            },
        );
        assert_eq!(model.screen.kind(), ScreenKind::ScheduleList);
    }

    #[test]
    fn search_filters_and_resets_cursor() {
        let mut model = model_on_schedule_list(5);
        update(&mut model, key_msg(KeyCode::Down));
        update(&mut model, key_msg(KeyCode::Char('/')));
        for c in "job 3".chars() {
            update(&mut model, key_msg(KeyCode::Char(c)));
        }
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert!(state.searching);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.filtered_indices(&model.schedules), vec![3]);

        // Enter leaves search mode; the filter text stays applied.
        update(&mut model, key_msg(KeyCode::Enter));
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert!(!state.searching);
        assert_eq!(state.filtered_indices(&model.schedules), vec![3]);
    }

    #[test]
    fn searching_swallows_quit_key() {
        let mut model = model_on_schedule_list(2);
        update(&mut model, key_msg(KeyCode::Char('/')));
        let cmds = update(&mut model, key_msg(KeyCode::Char('q')));
        assert!(!cmds.contains(&Cmd::Quit));
        let Screen::ScheduleList(state) = &model.screen else {
            panic!();
        };
        assert_eq!(state.search.value(), "q");
    }

    #[test]
    fn duplicate_prefixes_description_and_creates() {
        let mut model = model_on_schedule_list(1);
        let cmds = update(&mut model, key_msg(KeyCode::Char('y')));
        let Cmd::Emit(Msg::Navigate(Nav::NewSchedule {
            template: Some(template),
        })) = &cmds[0]
        else {
            panic!("expected duplicate navigation, got {cmds:?}");
        };
        assert_eq!(template.description, "[Copy] job 0");

        update(
            &mut model,
            Msg::Navigate(Nav::NewSchedule {
                template: Some(duplicate_template(&schedule(1, "job 0"))),
            }),
        );
        let Screen::ScheduleForm(form) = &model.screen else {
            panic!();
        };
        assert_eq!(form.schedule_id, None, "duplicate must create, not update");
    }

    #[test]
    fn connect_profile_snapshot_and_banner() {
        let mut model = AppModel::new((80, 24));
        model.profiles = vec![Profile {
            name: "work".into(),
            ..Profile::default()
        }];
        let cmds = update(&mut model, Msg::ConnectProfile { index: 0 });
        assert!(matches!(
            &cmds[0],
            Cmd::ConnectProfile { index: 0, profile } if profile.name == "work"
        ));
        assert!(model.loading);
    }

    #[test]
    fn connect_profile_out_of_range_is_error_message() {
        let mut model = AppModel::new((80, 24));
        let cmds = update(&mut model, Msg::ConnectProfile { index: 3 });
        assert!(matches!(&cmds[0], Cmd::Emit(Msg::Error(text)) if text.contains("GLS-3001")));
    }

    #[test]
    fn profile_connected_switches_to_schedule_list_and_persists() {
        let mut model = AppModel::new((80, 24));
        model.profiles = vec![Profile::default()];
        let cmds = update(
            &mut model,
            Msg::ProfileConnected {
                index: 0,
                profile: Profile {
                    project_id: 42,
                    ..Profile::default()
                },
                schedules: vec![schedule(1, "a")],
                branches: vec!["develop".into()],
                user: None,
            },
        );
        assert_eq!(model.screen.kind(), ScreenKind::ScheduleList);
        assert_eq!(model.profiles[0].project_id, 42);
        assert_eq!(model.branches, vec!["develop".to_string()]);
        assert!(matches!(&cmds[0], Cmd::PersistProfiles { profiles } if profiles[0].project_id == 42));
    }

    fn running_pipelines() -> Vec<PipelineWithStages> {
        vec![PipelineWithStages {
            pipeline: Pipeline {
                id: 1,
                ref_name: "main".into(),
                status: PipelineStatus::Running,
                source: "web".into(),
                name: None,
                web_url: String::new(),
                created_at: None,
                updated_at: None,
                user: None,
            },
            stages: Vec::new(),
        }]
    }

    #[test]
    fn pipelines_loaded_schedules_poll_while_running() {
        let mut model = AppModel::new((80, 24));
        model.screen = Screen::QuickRun(QuickRunState::new("main"));
        let cmds = update(&mut model, Msg::PipelinesLoaded(running_pipelines()));
        assert_eq!(
            cmds,
            vec![Cmd::PollPipelinesAfter {
                delay: PIPELINE_POLL_INTERVAL,
            }]
        );
    }

    #[test]
    fn pipelines_loaded_stops_polling_when_settled() {
        let mut model = AppModel::new((80, 24));
        model.screen = Screen::QuickRun(QuickRunState::new("main"));
        let mut pipelines = running_pipelines();
        pipelines[0].pipeline.status = PipelineStatus::Success;
        let cmds = update(&mut model, Msg::PipelinesLoaded(pipelines));
        assert!(cmds.is_empty());
    }

    #[test]
    fn poll_after_navigation_away_is_noop() {
        let mut model = AppModel::new((80, 24));
        model.screen = Screen::QuickRun(QuickRunState::new("main"));
        update(&mut model, Msg::Navigate(Nav::ScheduleList));

        let before = model.clone();
        let cmds = update(&mut model, Msg::PollPipelines);
        assert!(cmds.is_empty());
        assert_eq!(model, before, "stale poll must not change state");

        // A stale load result is equally inert.
        let cmds = update(&mut model, Msg::PipelinesLoaded(running_pipelines()));
        assert!(cmds.is_empty());
        assert_eq!(model, before);
    }

    #[test]
    fn pipeline_started_uses_short_banner_and_reloads() {
        let mut model = AppModel::new((80, 24));
        model.screen = Screen::QuickRun(QuickRunState::new("main"));
        let cmds = update(&mut model, Msg::PipelineStarted);
        assert_eq!(
            cmds,
            vec![
                Cmd::ClearStatusAfter {
                    generation: model.banner.as_ref().unwrap().generation,
                    delay: PIPELINE_STATUS_CLEAR_AFTER,
                },
                Cmd::LoadPipelines,
            ]
        );
    }

    #[test]
    fn navigate_to_quick_run_loads_pipelines() {
        let mut model = model_on_schedule_list(1);
        let cmds = update(&mut model, Msg::Navigate(Nav::QuickRun));
        assert_eq!(cmds, vec![Cmd::LoadPipelines]);
        assert_eq!(model.screen.kind(), ScreenKind::QuickRun);
    }

    #[test]
    fn profile_form_enter_on_text_advances_ring() {
        let mut model = AppModel::new((80, 24));
        model.screen = Screen::ProfileForm(ProfileFormState::new(None, None));
        update(&mut model, key_msg(KeyCode::Enter));
        let Screen::ProfileForm(form) = &model.screen else {
            panic!();
        };
        assert_eq!(form.ring.current(), ProfileField::Url);
    }

    #[test]
    fn profile_form_save_emits_draft() {
        let mut model = AppModel::new((80, 24));
        model.screen = Screen::ProfileForm(ProfileFormState::new(None, None));
        for c in "work".chars() {
            update(&mut model, key_msg(KeyCode::Char(c)));
        }
        let cmds = update(
            &mut model,
            Msg::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
        );
        let Cmd::Emit(Msg::SaveProfile { index: None, draft }) = &cmds[0] else {
            panic!("expected save request, got {cmds:?}");
        };
        assert_eq!(draft.name, "work");
    }

    #[test]
    fn schedule_form_dropdown_round_trip() {
        let mut model = AppModel::new((100, 30));
        model.branches = vec!["main".into(), "develop".into(), "release".into()];
        model.screen = Screen::ScheduleForm(ScheduleFormState::new(None, true, "main"));

        // Tab to the branch field and open the picker.
        for _ in 0..3 {
            update(&mut model, key_msg(KeyCode::Tab));
        }
        update(&mut model, key_msg(KeyCode::Enter));
        let Screen::ScheduleForm(form) = &model.screen else {
            panic!();
        };
        let popup = form.popup.as_ref().unwrap();
        assert_eq!(popup.cursor, 0, "seeded on current branch");

        // Choose the next branch; popup closes, field updated, ring intact.
        update(&mut model, key_msg(KeyCode::Down));
        update(&mut model, key_msg(KeyCode::Enter));
        let Screen::ScheduleForm(form) = &model.screen else {
            panic!();
        };
        assert!(form.popup.is_none());
        assert_eq!(form.branch, "develop");
        assert_eq!(form.ring.current(), ScheduleField::Branch);
    }

    #[test]
    fn schedule_form_esc_discards_and_navigates_back() {
        let mut model = model_on_schedule_list(1);
        update(
            &mut model,
            Msg::Navigate(Nav::EditSchedule {
                schedule: schedule(1, "job 0"),
            }),
        );
        let cmds = update(&mut model, key_msg(KeyCode::Esc));
        assert_eq!(cmds, vec![Cmd::Emit(Msg::Navigate(Nav::ScheduleList))]);
    }

    #[test]
    fn schedule_form_save_with_foreign_owner_takes_ownership() {
        use crate::models::User;
        let mut model = AppModel::new((100, 30));
        model.current_user = Some(User {
            id: 1,
            username: "me".into(),
            name: "Me".into(),
        });
        let mut s = schedule(9, "theirs");
        s.owner = Some(User {
            id: 2,
            username: "them".into(),
            name: "Them".into(),
        });
        model.screen = Screen::ScheduleForm(ScheduleFormState::new(Some(&s), false, "main"));

        let cmds = update(
            &mut model,
            Msg::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
        );
        let Cmd::Emit(Msg::SaveSchedule { take_ownership, .. }) = &cmds[0] else {
            panic!("expected save request, got {cmds:?}");
        };
        assert!(take_ownership);
    }

    #[test]
    fn quick_run_start_emits_pipeline_request() {
        let mut model = AppModel::new((100, 30));
        model.screen = Screen::QuickRun(QuickRunState::new("main"));
        update(&mut model, key_msg(KeyCode::Char('R')));
        // Branch → Variables → Start.
        update(&mut model, key_msg(KeyCode::Tab));
        update(&mut model, key_msg(KeyCode::Tab));
        let cmds = update(&mut model, key_msg(KeyCode::Enter));
        let Cmd::Emit(Msg::StartPipeline { request }) = &cmds[0] else {
            panic!("expected pipeline start, got {cmds:?}");
        };
        assert_eq!(request.ref_name, "main");
    }

    #[test]
    fn banner_generation_loop_closes() {
        // show → clear command → deliver clear → banner gone.
        let mut model = AppModel::new((80, 24));
        let cmds = update(
            &mut model,
            Msg::Status {
                text: "saved".into(),
                kind: BannerKind::Success,
            },
        );
        let Cmd::ClearStatusAfter { generation, .. } = cmds[0] else {
            panic!();
        };
        update(&mut model, Msg::ClearStatus { generation });
        assert!(model.banner.is_none());
    }

    #[test]
    fn banner_struct_is_exposed_for_render() {
        let mut model = AppModel::new((80, 24));
        model.show_banner("hello", BannerKind::Warning);
        let StatusBanner { text, kind, .. } = model.banner.clone().unwrap();
        assert_eq!(text, "hello");
        assert_eq!(kind, BannerKind::Warning);
    }
}
