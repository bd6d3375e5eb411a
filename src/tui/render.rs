//! Full-frame string rendering: header, active screen body, footer legend.
//!
//! `render()` is pure — model plus theme in, one frame out. The frame is
//! always exactly the reported terminal size; every line is padded or
//! truncated. The runtime writes the returned string to the terminal in one
//! shot per cycle.

#![allow(missing_docs)]
#![allow(clippy::too_many_lines)]

use chrono::{DateTime, Utc};

use crate::models::{PipelineStatus, PipelineWithStages, Schedule};

use super::layout::{
    BORDER_BL, BORDER_BR, BORDER_H, BORDER_JOIN_L, BORDER_JOIN_R, BORDER_TL, BORDER_TR, BORDER_V,
    adjust_scroll, bordered_panel, center, display_width, finalize_frame, join_columns,
    pad_right, pad_to_width, scrollbar, truncate_str, truncate_url, wrap_text,
};
use super::model::{
    APP_NAME, AppModel, BannerKind, ProfileField, ProfileFormState, ProfileListState,
    QuickRunField, QuickRunState, ScheduleField, ScheduleFormState, ScheduleListState, Screen,
    ScreenKind,
};
use super::popup::{Popup, overlay_centered};
use super::theme::Theme;

/// Rows consumed by the outer grid: top border, header, two separators,
/// footer, bottom border.
const CHROME_ROWS: usize = 6;

/// Render one complete frame sized to the terminal.
#[must_use]
pub fn render(model: &AppModel, theme: &Theme) -> String {
    render_at(model, theme, Utc::now())
}

/// Render with an explicit clock (tests pin `now`).
#[must_use]
pub fn render_at(model: &AppModel, theme: &Theme, now: DateTime<Utc>) -> String {
    let (w, h) = (
        model.terminal_size.0 as usize,
        model.terminal_size.1 as usize,
    );
    if w < 4 || h < CHROME_ROWS + 1 {
        return finalize_frame(vec!["terminal too small".to_string()], w.max(1), h.max(1));
    }

    let inner = w - 2;
    let content_height = h - CHROME_ROWS;

    let mut body = match &model.screen {
        Screen::ProfileList(state) => profile_list_body(model, state, theme, inner, content_height),
        Screen::ProfileForm(state) => profile_form_body(state, theme, inner, content_height),
        Screen::ScheduleList(state) => {
            schedule_list_body(model, state, theme, inner, content_height, now)
        }
        Screen::ScheduleForm(state) => schedule_form_body(state, theme, inner, content_height),
        Screen::QuickRun(state) => quick_run_body(state, theme, inner, content_height),
    };

    if let Some(popup) = active_popup(&model.screen) {
        let popup_lines = popup.render(theme);
        let composed = overlay_centered(
            &body.join("\n"),
            &popup_lines,
            popup.width(),
            inner,
            content_height,
        );
        body = composed.split('\n').map(String::from).collect();
    }

    let border = BORDER_H.repeat(inner);
    let mut frame = Vec::with_capacity(h);
    frame.push(format!("{BORDER_TL}{border}{BORDER_TR}"));
    frame.push(format!(
        "{BORDER_V}{}{BORDER_V}",
        header_line(model, theme, inner)
    ));
    frame.push(format!("{BORDER_JOIN_L}{border}{BORDER_JOIN_R}"));
    for i in 0..content_height {
        let line = body.get(i).map_or("", String::as_str);
        frame.push(format!("{BORDER_V}{}{BORDER_V}", pad_to_width(line, inner)));
    }
    frame.push(format!("{BORDER_JOIN_L}{border}{BORDER_JOIN_R}"));
    frame.push(format!(
        "{BORDER_V}{}{BORDER_V}",
        center(&legend_line(model.screen.kind(), theme), inner)
    ));
    frame.push(format!("{BORDER_BL}{border}{BORDER_BR}"));

    finalize_frame(frame, w, h)
}

fn active_popup(screen: &Screen) -> Option<Popup> {
    match screen {
        Screen::ProfileList(state) => state.popup.clone().map(Popup::Confirm),
        Screen::ScheduleList(state) => state.popup.clone().map(Popup::Confirm),
        Screen::ScheduleForm(state) => state.popup.clone().map(Popup::Select),
        Screen::QuickRun(state) => state.popup.clone().map(Popup::Select),
        Screen::ProfileForm(_) => None,
    }
}

// ──────────────────── header and footer ────────────────────

fn header_line(model: &AppModel, theme: &Theme, width: usize) -> String {
    let mut left = format!(
        " {} {}",
        (theme.title)(APP_NAME),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(profile) = model.active_profile() {
        left.push_str(" - ");
        left.push_str(&(theme.success)(&profile.name));
    }

    let right = model.banner.as_ref().map_or_else(String::new, |banner| {
        let style = match banner.kind {
            BannerKind::Success => theme.success,
            BannerKind::Error => theme.danger,
            BannerKind::Warning => theme.warning,
        };
        format!("{} ", style(&banner.text))
    });

    let padding = width
        .saturating_sub(display_width(&left))
        .saturating_sub(display_width(&right));
    format!("{left}{}{right}", " ".repeat(padding))
}

fn legend_line(screen: ScreenKind, theme: &Theme) -> String {
    let items: &[(&str, &str)] = match screen {
        ScreenKind::ProfileList => &[
            ("↑↓", "Navigate"),
            ("Enter", "Select"),
            ("c", "Create"),
            ("e", "Edit"),
            ("d", "Delete"),
            ("q", "Quit"),
        ],
        ScreenKind::ScheduleList => &[
            ("/", "Search"),
            ("e", "Edit"),
            ("c", "Create"),
            ("y", "Duplicate"),
            ("d", "Delete"),
            ("r", "Run"),
            ("R", "Quick Run"),
            ("A", "Toggle"),
            ("t", "Own"),
            ("u", "Refresh"),
            ("o", "Profiles"),
            ("q", "Quit"),
        ],
        ScreenKind::ScheduleForm => &[
            ("↑↓", "Navigate"),
            ("Enter", "Select/Toggle"),
            ("Ctrl+S", "Save"),
            ("Esc", "Cancel"),
        ],
        ScreenKind::ProfileForm => &[
            ("↑↓", "Navigate"),
            ("Tab", "Next"),
            ("Ctrl+S", "Save"),
            ("Esc", "Cancel"),
        ],
        ScreenKind::QuickRun => &[
            ("R", "New Run"),
            ("u", "Refresh"),
            ("↑↓", "Navigate"),
            ("Esc", "Back"),
            ("q", "Quit"),
        ],
    };

    items
        .iter()
        .map(|(key, label)| format!("{} {label}", (theme.accent)(key)))
        .collect::<Vec<_>>()
        .join("  │  ")
}

// ──────────────────── profile list ────────────────────

fn profile_list_body(
    model: &AppModel,
    state: &ProfileListState,
    theme: &Theme,
    width: usize,
    height: usize,
) -> Vec<String> {
    if model.profiles.is_empty() {
        return empty_state(
            &(theme.title)("No profiles found"),
            &format!("Press {} to add a new profile", (theme.accent)("c")),
            width,
        );
    }

    let left_width = width * 2 / 3;
    let right_width = width - left_width - 1;

    let mut left = Vec::new();
    const COL_NAME: usize = 25;
    left.push((theme.title)(&format!(
        "   {}Project URL",
        pad_right("Name", COL_NAME)
    )));
    for (i, profile) in model.profiles.iter().enumerate() {
        let row = format!(
            "   {}{}",
            pad_right(&truncate_str(&profile.name, COL_NAME - 2), COL_NAME),
            truncate_url(&profile.project_url, left_width.saturating_sub(COL_NAME + 5))
        );
        if i == state.cursor {
            left.push((theme.selected)(&pad_to_width(&row, left_width)));
        } else {
            left.push(row);
        }
    }

    let right = profile_details_panel(model, state, theme, right_width, height);
    join_columns(&left, &right, left_width, right_width)
}

fn profile_details_panel(
    model: &AppModel,
    state: &ProfileListState,
    theme: &Theme,
    width: usize,
    height: usize,
) -> Vec<String> {
    let mut content = Vec::new();
    if let Some(profile) = model.profiles.get(state.cursor) {
        content.push((theme.title)(&profile.name));
        content.push(String::new());

        content.push((theme.label)("Project URL"));
        for line in wrap_text(&profile.project_url, width.saturating_sub(6)) {
            content.push(format!("  {line}"));
        }
        content.push(String::new());

        content.push((theme.label)("Token"));
        content.push(format!("  {}", profile.masked_token()));
        content.push(String::new());

        content.push((theme.label)("Project ID"));
        if profile.project_id > 0 {
            content.push(format!("  {}", profile.project_id));
        } else {
            content.push((theme.muted)("  Not fetched yet"));
        }
    }
    bordered_panel("Details", &content, width, height)
}

fn empty_state(title: &str, hint: &str, width: usize) -> Vec<String> {
    vec![
        String::new(),
        String::new(),
        String::new(),
        center(title, width),
        String::new(),
        center(hint, width),
    ]
}

// ──────────────────── schedule list ────────────────────

fn pipeline_status_icon(status: Option<PipelineStatus>, theme: &Theme) -> String {
    match status {
        Some(PipelineStatus::Success) => (theme.success)("●"),
        Some(PipelineStatus::Failed) => (theme.danger)("●"),
        Some(
            PipelineStatus::Running
            | PipelineStatus::Pending
            | PipelineStatus::Created
            | PipelineStatus::Preparing
            | PipelineStatus::WaitingForResource,
        ) => (theme.warning)("◐"),
        Some(PipelineStatus::Manual) => (theme.info)("○"),
        _ => (theme.muted)("○"),
    }
}

fn schedule_list_body(
    model: &AppModel,
    state: &ScheduleListState,
    theme: &Theme,
    width: usize,
    height: usize,
    now: DateTime<Utc>,
) -> Vec<String> {
    let left_width = width * 2 / 3;
    let right_width = width - left_width - 1;

    let indices = state.filtered_indices(&model.schedules);
    let rows = model.schedule_list_rows();
    let scroll = adjust_scroll(state.cursor, state.scroll, rows);

    let mut left = Vec::new();
    left.push(format!(
        "   {}{}{}",
        (theme.title)("Search: "),
        state.search.view(theme),
        (theme.muted)(&format!("  {}/{}", indices.len(), model.schedules.len()))
    ));
    left.push(String::new());

    const COL_ACTIVE: usize = 3;
    const COL_DESC: usize = 50;
    const COL_CRON: usize = 15;
    const COL_BRANCH: usize = 18;
    const COL_STATUS: usize = 8;
    const COL_NEXT: usize = 8;

    left.push((theme.title)(&format!(
        "   {}{}{}{}{}{}",
        pad_right("", COL_ACTIVE),
        pad_right("Description", COL_DESC),
        pad_right("Cron", COL_CRON),
        pad_right("Branch", COL_BRANCH),
        pad_right("Status", COL_STATUS),
        pad_right("Next", COL_NEXT)
    )));

    let bar = scrollbar(indices.len(), rows, scroll, rows);
    let table_width = left_width.saturating_sub(2);
    for (window_row, &index) in indices.iter().enumerate().take(scroll + rows).skip(scroll) {
        let schedule = &model.schedules[index];

        let active_icon = if schedule.active { "●" } else { "○" };
        let next_run = schedule
            .next_run_at
            .map_or_else(|| "-".to_string(), |t| format_relative(t, now));

        let plain_cols = format!(
            "{}{}{}",
            pad_right(&truncate_str(&schedule.description, COL_DESC - 2), COL_DESC),
            pad_right(&truncate_str(&schedule.cron, COL_CRON - 2), COL_CRON),
            pad_right(&truncate_str(&schedule.ref_name, COL_BRANCH - 2), COL_BRANCH)
        );
        let status_icon =
            pipeline_status_icon(schedule.last_pipeline.as_ref().map(|p| p.status), theme);
        let status_char = match schedule.last_pipeline.as_ref().map(|p| p.status) {
            Some(PipelineStatus::Success | PipelineStatus::Failed) => "●",
            Some(
                PipelineStatus::Running
                | PipelineStatus::Pending
                | PipelineStatus::Created
                | PipelineStatus::Preparing
                | PipelineStatus::WaitingForResource,
            ) => "◐",
            _ => "○",
        };

        let row = if window_row == state.cursor {
            let flat = format!(
                "   {}{plain_cols}{}{}",
                pad_right(active_icon, COL_ACTIVE),
                pad_right(status_char, COL_STATUS),
                pad_right(&truncate_str(&next_run, COL_NEXT - 2), COL_NEXT)
            );
            (theme.selected)(&pad_to_width(&flat, table_width))
        } else {
            let active_styled = if schedule.active {
                (theme.success)(active_icon)
            } else {
                (theme.muted)(active_icon)
            };
            format!(
                "   {}{plain_cols}{}{}",
                pad_right(&active_styled, COL_ACTIVE),
                pad_right(&status_icon, COL_STATUS),
                pad_right(&truncate_str(&next_run, COL_NEXT - 2), COL_NEXT)
            )
        };

        let bar_cell = bar
            .get(window_row - scroll)
            .map_or(" ", String::as_str);
        left.push(format!(
            "{} {bar_cell}",
            pad_to_width(&row, table_width)
        ));
    }

    let right = schedule_details_panel(state, model, theme, right_width, height, now);
    join_columns(&left, &right, left_width, right_width)
}

fn schedule_details_panel(
    state: &ScheduleListState,
    model: &AppModel,
    theme: &Theme,
    width: usize,
    height: usize,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut content = Vec::new();
    if let Some(schedule) = state.selected(&model.schedules) {
        let (active_icon, active_text, active_style) = if schedule.active {
            ("●", "Active", theme.success)
        } else {
            ("○", "Inactive", theme.danger)
        };

        for line in wrap_text(&schedule.description, width.saturating_sub(8)) {
            content.push((theme.title)(&line));
        }
        content.push(String::new());

        content.push((theme.label)("Status"));
        content.push(format!(
            "  {}",
            active_style(&format!("{active_icon} {active_text}"))
        ));
        content.push(String::new());

        content.push((theme.label)("Schedule"));
        content.push(format!("  {} {}", (theme.info)("Cron:"), schedule.cron));
        content.push(format!(
            "  {} {}",
            (theme.info)("Timezone:"),
            schedule.cron_timezone
        ));
        let next_run = schedule
            .next_run_at
            .map_or_else(|| "Not scheduled".to_string(), |t| format_detail(t, now));
        content.push(format!("  {} {next_run}", (theme.info)("Next run:")));
        content.push(String::new());

        content.push((theme.label)("Target"));
        content.push(format!(
            "  {} {}",
            (theme.info)("Branch:"),
            schedule.ref_name
        ));
        content.push(String::new());

        content.push((theme.label)("Last Pipeline"));
        content.push(format!("  {}", pipeline_status_text(schedule, theme)));
        content.push(String::new());

        content.push((theme.label)("Variables"));
        if schedule.variables.is_empty() {
            content.push((theme.muted)("  (No variables)"));
        } else {
            for variable in &schedule.variables {
                content.push(format!(
                    "  {} {}: {}",
                    (theme.label)("▶"),
                    (theme.info)(&variable.key),
                    (theme.muted)("*****")
                ));
            }
        }
        content.push(String::new());

        content.push((theme.label)("Owner"));
        let owner = schedule.owner.as_ref().map_or_else(
            || "Unknown".to_string(),
            |o| format!("{} (@{})", o.name, o.username),
        );
        content.push(format!("  {owner}"));
    }
    bordered_panel("Details", &content, width, height)
}

fn pipeline_status_text(schedule: &Schedule, theme: &Theme) -> String {
    schedule.last_pipeline.as_ref().map_or_else(
        || (theme.muted)("○ No pipeline"),
        |pipeline| match pipeline.status {
            PipelineStatus::Success => (theme.success)("● Passed"),
            PipelineStatus::Failed => (theme.danger)("● Failed"),
            PipelineStatus::Running => (theme.warning)("◐ Running"),
            PipelineStatus::Pending => (theme.warning)("◐ Pending"),
            PipelineStatus::Canceled => (theme.muted)("○ Canceled"),
            PipelineStatus::Skipped => (theme.muted)("○ Skipped"),
            PipelineStatus::Manual => (theme.info)("○ Manual"),
            _ => (theme.muted)("○ Unknown"),
        },
    )
}

// ──────────────────── schedule form ────────────────────

fn schedule_form_body(
    state: &ScheduleFormState,
    theme: &Theme,
    width: usize,
    height: usize,
) -> Vec<String> {
    let left_width = width * 3 / 5;
    let right_width = width - left_width - 1;

    const LABEL_WIDTH: usize = 22;
    let label = |text: &str| (theme.label)(&pad_right(text, LABEL_WIDTH));

    let mut content = Vec::new();
    content.push(format!(
        "{} {}",
        label("  Description"),
        state.description.view(theme)
    ));
    content.push(String::new());

    content.push(format!(
        "{} {}",
        label("  Cron Expression"),
        state.cron.view(theme)
    ));
    content.push(String::new());

    content.push(dropdown_row(
        &label("  Timezone"),
        &state.timezone,
        state.ring.current() == ScheduleField::Timezone,
        theme,
    ));
    content.push(String::new());

    content.push(dropdown_row(
        &label("  Target Branch"),
        &state.branch,
        state.ring.current() == ScheduleField::Branch,
        theme,
    ));
    content.push(String::new());

    let checkbox = if state.active { "[X]" } else { "[ ]" };
    if state.ring.current() == ScheduleField::Active {
        content.push(format!(
            "{} {}",
            label("  Active"),
            (theme.selected)(&format!(" {checkbox} "))
        ));
    } else {
        content.push(format!("{} {checkbox}", label("  Active")));
    }
    content.push(String::new());

    content.push((theme.label)("  Variables"));
    for view in state.variables.views(theme) {
        content.push(format!("    {view}"));
    }
    content.push(String::new());

    content.push(buttons_row(
        "[ Save ]",
        "[ Cancel ]",
        state.ring.current() == ScheduleField::Save,
        state.ring.current() == ScheduleField::Cancel,
        theme,
    ));

    let title = if state.schedule_id.is_none() {
        "New Schedule"
    } else {
        "Edit Schedule"
    };
    let left = bordered_panel(title, &content, left_width, height);
    let right = cron_help_panel(theme, right_width, height);
    join_columns(&left, &right, left_width, right_width)
}

fn dropdown_row(label: &str, value: &str, focused: bool, theme: &Theme) -> String {
    let text = format!("{value} ▾");
    if focused {
        format!("{label} {}", (theme.selected)(&format!(" {text} ")))
    } else {
        format!("{label} {text}")
    }
}

fn buttons_row(
    primary: &str,
    secondary: &str,
    primary_focused: bool,
    secondary_focused: bool,
    theme: &Theme,
) -> String {
    let primary_view = if primary_focused {
        (theme.selected)(primary)
    } else {
        primary.to_string()
    };
    let secondary_view = if secondary_focused {
        (theme.selected)(secondary)
    } else {
        secondary.to_string()
    };
    format!("  {primary_view}   {secondary_view}")
}

fn cron_help_panel(theme: &Theme, width: usize, height: usize) -> Vec<String> {
    let mut content = Vec::new();
    content.push((theme.title)("Cron Expression Format"));
    content.push(String::new());
    content.push((theme.accent)("┌───────────── minute (0-59)"));
    content.push((theme.accent)("│ ┌───────────── hour (0-23)"));
    content.push((theme.accent)("│ │ ┌───────────── day (1-31)"));
    content.push((theme.accent)("│ │ │ ┌───────────── month (1-12)"));
    content.push((theme.accent)("│ │ │ │ ┌───────────── weekday (0-6)"));
    content.push((theme.accent)("│ │ │ │ │"));
    content.push((theme.success)("* * * * *"));
    content.push(String::new());
    content.push((theme.info)("Examples:"));
    content.push(format!(
        "  {}  Weekdays 8 AM",
        (theme.success)("0 8 * * 1-5")
    ));
    content.push(format!(
        "  {}    Daily midnight",
        (theme.success)("0 0 * * *")
    ));
    content.push(format!(
        "  {} Every 15 min",
        (theme.success)("*/15 * * * *")
    ));
    content.push(format!(
        "  {}  Every 2 hours",
        (theme.success)("0 */2 * * *")
    ));
    content.push(String::new());
    content.push((theme.title)("Variables"));
    content.push(String::new());
    content.push(format!("Enter as {}:", (theme.success)("KEY=value")));
    content.push(format!("  {}", (theme.success)("DEPLOY_ENV=production")));
    content.push(String::new());
    content.push((theme.title)("Keyboard"));
    content.push(String::new());
    content.push(format!("  {}       Navigate", (theme.accent)("↑/↓")));
    content.push(format!("  {}     Select/Toggle", (theme.accent)("Enter")));
    content.push(format!("  {}    Save", (theme.accent)("Ctrl+S")));
    content.push(format!("  {}       Cancel", (theme.accent)("Esc")));
    bordered_panel("Help", &content, width, height)
}

// ──────────────────── profile form ────────────────────

fn profile_form_body(
    state: &ProfileFormState,
    theme: &Theme,
    width: usize,
    height: usize,
) -> Vec<String> {
    let left_width = width * 3 / 5;
    let right_width = width - left_width - 1;

    const LABEL_WIDTH: usize = 20;
    let label = |text: &str| (theme.label)(&pad_right(text, LABEL_WIDTH));

    let mut content = Vec::new();
    content.push(format!("{} {}", label("  Name"), state.name.view(theme)));
    content.push(String::new());
    content.push(format!(
        "{} {}",
        label("  Project URL"),
        state.url.view(theme)
    ));
    content.push(String::new());
    content.push(format!(
        "{} {}",
        label("  Access Token"),
        state.token.view(theme)
    ));
    content.push(String::new());
    content.push(String::new());
    content.push(buttons_row(
        "[ Save ]",
        "[ Cancel ]",
        state.ring.current() == ProfileField::Save,
        state.ring.current() == ProfileField::Cancel,
        theme,
    ));

    let title = if state.editing.is_none() {
        "New Profile"
    } else {
        "Edit Profile"
    };
    let left = bordered_panel(title, &content, left_width, height);
    let right = profile_help_panel(theme, right_width, height);
    join_columns(&left, &right, left_width, right_width)
}

fn profile_help_panel(theme: &Theme, width: usize, height: usize) -> Vec<String> {
    let mut content = Vec::new();
    content.push((theme.title)("Profile Setup"));
    content.push(String::new());
    content.push("Connect to a GitLab project by providing".to_string());
    content.push("the project URL and an access token.".to_string());
    content.push(String::new());
    content.push((theme.title)("Project URL Format"));
    content.push(String::new());
    content.push(format!(
        "  {}",
        (theme.success)("https://gitlab.com/group/project")
    ));
    content.push(String::new());
    content.push((theme.title)("Creating an Access Token"));
    content.push(String::new());
    content.push("1. GitLab → Settings → Access Tokens".to_string());
    content.push(format!(
        "2. Create a token with the {} scope",
        (theme.accent)("api")
    ));
    content.push("3. Paste the token here".to_string());
    content.push(String::new());
    content.push((theme.muted)("Tokens are stored in the profile store"));
    content.push(String::new());
    content.push((theme.title)("Keyboard"));
    content.push(String::new());
    content.push(format!("  {}       Navigate", (theme.accent)("↑/↓")));
    content.push(format!("  {}       Next field", (theme.accent)("Tab")));
    content.push(format!("  {}    Save", (theme.accent)("Ctrl+S")));
    content.push(format!("  {}       Cancel", (theme.accent)("Esc")));
    bordered_panel("Help", &content, width, height)
}

// ──────────────────── quick run ────────────────────

fn quick_run_body(
    state: &QuickRunState,
    theme: &Theme,
    width: usize,
    height: usize,
) -> Vec<String> {
    let mut lines = Vec::new();

    if state.form_open {
        const LABEL_WIDTH: usize = 18;
        let label = |text: &str| (theme.label)(&pad_right(text, LABEL_WIDTH));

        let mut content = Vec::new();
        content.push(dropdown_row(
            &label("  Branch"),
            &state.branch,
            state.ring.current() == QuickRunField::Branch,
            theme,
        ));
        content.push(String::new());
        content.push((theme.label)("  Variables"));
        for view in state.variables.views(theme) {
            content.push(format!("    {view}"));
        }
        content.push(String::new());
        content.push(buttons_row(
            "[ Start Pipeline ]",
            "[ Cancel ]",
            state.ring.current() == QuickRunField::Start,
            state.ring.current() == QuickRunField::Cancel,
            theme,
        ));

        let form_height = (content.len() + 2).min(height.saturating_sub(4));
        lines.extend(bordered_panel("New Pipeline Run", &content, width, form_height));
    }

    let remaining = height.saturating_sub(lines.len());
    lines.extend(pipeline_list_panel(state, theme, width, remaining));
    lines
}

fn pipeline_list_panel(
    state: &QuickRunState,
    theme: &Theme,
    width: usize,
    height: usize,
) -> Vec<String> {
    let mut content = Vec::new();

    if state.pipelines.is_empty() {
        content.push((theme.muted)("  No pipelines yet."));
    } else {
        content.push((theme.title)(&format!(
            " {}{}{}{}{}Stages",
            pad_right("", 4),
            pad_right("ID", 10),
            pad_right("Name", 22),
            pad_right("Branch", 14),
            pad_right("Triggered by", 14)
        )));

        let rows = height.saturating_sub(4);
        let scroll = adjust_scroll(state.cursor, state.scroll, rows);
        let bar = scrollbar(state.pipelines.len(), rows, scroll, rows);

        for (i, entry) in state
            .pipelines
            .iter()
            .enumerate()
            .take(scroll + rows)
            .skip(scroll)
        {
            let pipeline = &entry.pipeline;
            let status = pipeline_status_icon(Some(pipeline.status), theme);
            let name = pipeline
                .name
                .clone()
                .unwrap_or_else(|| trigger_label(&pipeline.source).to_string());
            let triggered = pipeline.user.as_ref().map_or_else(
                || trigger_label(&pipeline.source).to_string(),
                |user| user.username.clone(),
            );
            let stages = stage_strip(entry, theme);

            let row = format!(
                " {} {}{}{}{}{stages}",
                status,
                pad_right(&format!("#{}", pipeline.id), 10),
                pad_right(&truncate_str(&name, 20), 22),
                pad_right(&truncate_str(&pipeline.ref_name, 12), 14),
                pad_right(&truncate_str(&triggered, 12), 14)
            );
            let bar_cell = bar.get(i - scroll).map_or(" ", String::as_str);
            if i == state.cursor {
                content.push(format!(
                    "{} {bar_cell}",
                    (theme.selected)(&pad_to_width(&row, width.saturating_sub(6)))
                ));
            } else {
                content.push(format!(
                    "{} {bar_cell}",
                    pad_to_width(&row, width.saturating_sub(6))
                ));
            }
        }
    }

    bordered_panel("Recent Pipelines", &content, width, height)
}

fn trigger_label(source: &str) -> &str {
    match source {
        "schedule" => "scheduled",
        "web" => "manual",
        "" => "-",
        other => other,
    }
}

fn stage_strip(entry: &PipelineWithStages, theme: &Theme) -> String {
    if entry.stages.is_empty() {
        return (theme.muted)("-");
    }
    entry
        .stages
        .iter()
        .map(|stage| pipeline_status_icon(Some(stage.status), theme))
        .collect::<Vec<_>>()
        .join(" ")
}

// ──────────────────── time formatting ────────────────────

/// Compact relative time for table cells: `<1m`, `12m`, `3h`, `2d`, `past`.
#[must_use]
pub fn format_relative(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (target - now).num_seconds();
    if seconds < 0 {
        return "past".to_string();
    }
    if seconds < 60 {
        return "<1m".to_string();
    }
    if seconds < 3600 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 86_400 {
        return format!("{}h", seconds / 3600);
    }
    format!("{}d", seconds / 86_400)
}

/// Spelled-out relative time for the details panel.
#[must_use]
pub fn format_detail(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (target - now).num_seconds();
    if seconds < 0 {
        return "Past due".to_string();
    }
    if seconds < 60 {
        return "< 1 minute".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return plural("minute", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return plural("hour", hours);
    }
    plural("day", hours / 24)
}

fn plural(unit: &str, n: i64) -> String {
    if n == 1 {
        format!("in 1 {unit}")
    } else {
        format!("in {n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pipeline, Profile, User, Variable};
    use crate::tui::model::{Nav, StatusBanner};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn frame_lines(model: &AppModel) -> Vec<String> {
        let theme = Theme::plain();
        render_at(model, &theme, now())
            .split('\n')
            .map(String::from)
            .collect()
    }

    fn assert_frame_dimensions(model: &AppModel) {
        let lines = frame_lines(model);
        assert_eq!(lines.len(), model.terminal_size.1 as usize);
        for line in &lines {
            assert_eq!(
                display_width(line),
                model.terminal_size.0 as usize,
                "line: {line:?}"
            );
        }
    }

    fn sample_schedule(id: u64, description: &str) -> Schedule {
        Schedule {
            id,
            description: description.to_string(),
            ref_name: "main".into(),
            cron: "0 0 * * *".into(),
            cron_timezone: "UTC".into(),
            next_run_at: Some(now() + chrono::Duration::hours(3)),
            active: true,
            created_at: None,
            updated_at: None,
            owner: Some(User {
                id: 1,
                username: "dev".to_string(),
                name: "Dev".into(),
            }),
            last_pipeline: Some(Pipeline {
                id: 100,
                ref_name: "main".into(),
                status: PipelineStatus::Success,
                source: "schedule".into(),
                name: None,
                web_url: String::new(),
                created_at: None,
                updated_at: None,
                user: None,
            }),
            variables: vec![Variable::env("KEY", "secret")],
        }
    }

    #[test]
    fn empty_profile_list_shows_empty_state() {
        let model = AppModel::new((80, 24));
        let frame = frame_lines(&model).join("\n");
        assert!(frame.contains("No profiles found"));
        assert!(frame.contains("add a new profile"));
        assert_frame_dimensions(&model);
    }

    #[test]
    fn frame_is_exact_for_every_screen() {
        let mut model = AppModel::new((100, 30));
        model.profiles = vec![Profile {
            name: "work".into(),
            project_url: "https://gitlab.example.com/team/app".into(),
            token: "glpat-aaaabbbbcccc".into(),
            project_id: 7,
            base_url: "https://gitlab.example.com".into(),
        }];
        model.schedules = vec![sample_schedule(1, "Nightly build")];
        assert_frame_dimensions(&model);

        crate::tui::update::update(&mut model, crate::tui::model::Msg::Navigate(Nav::ScheduleList));
        assert_frame_dimensions(&model);

        crate::tui::update::update(
            &mut model,
            crate::tui::model::Msg::Navigate(Nav::NewSchedule { template: None }),
        );
        assert_frame_dimensions(&model);

        crate::tui::update::update(&mut model, crate::tui::model::Msg::Navigate(Nav::QuickRun));
        assert_frame_dimensions(&model);

        crate::tui::update::update(&mut model, crate::tui::model::Msg::Navigate(Nav::NewProfile));
        assert_frame_dimensions(&model);
    }

    #[test]
    fn header_shows_banner_and_profile() {
        let mut model = AppModel::new((90, 24));
        model.profiles = vec![Profile {
            name: "work".into(),
            ..Profile::default()
        }];
        model.active_profile = Some(0);
        model.banner = Some(StatusBanner {
            text: "Schedule saved!".into(),
            kind: BannerKind::Success,
            generation: 1,
        });
        let lines = frame_lines(&model);
        assert!(lines[1].contains(APP_NAME));
        assert!(lines[1].contains("work"));
        assert!(lines[1].contains("Schedule saved!"));
    }

    #[test]
    fn schedule_list_renders_rows_and_details() {
        let mut model = AppModel::new((120, 30));
        model.schedules = vec![
            sample_schedule(1, "Nightly build"),
            sample_schedule(2, "Weekly report"),
        ];
        model.screen = Screen::ScheduleList(ScheduleListState::default());
        let frame = frame_lines(&model).join("\n");
        assert!(frame.contains("Nightly build"));
        assert!(frame.contains("Weekly report"));
        assert!(frame.contains("0 0 * * *"));
        assert!(frame.contains("Dev (@dev)"));
        assert!(frame.contains("1/1") || frame.contains("2/2"));
        assert_frame_dimensions(&model);
    }

    #[test]
    fn schedule_list_scrolls_window() {
        let mut model = AppModel::new((120, 19));
        model.schedules = (0..25)
            .map(|i| sample_schedule(i + 1, &format!("job number {i}")))
            .collect();
        let mut state = ScheduleListState::default();
        state.cursor = 24;
        state.scroll = 15;
        model.screen = Screen::ScheduleList(state);

        let frame = frame_lines(&model).join("\n");
        assert!(frame.contains("job number 24"));
        assert!(!frame.contains("job number 5 "));
        assert_frame_dimensions(&model);
    }

    #[test]
    fn popup_overlays_on_schedule_list() {
        let mut model = AppModel::new((120, 30));
        model.schedules = vec![sample_schedule(1, "Nightly build")];
        let mut state = ScheduleListState::default();
        state.popup = Some(crate::tui::popup::ConfirmPopup::new(
            "Delete Schedule",
            vec!["Delete \"Nightly build\"?".to_string()],
            crate::tui::popup::ConfirmAction::DeleteSchedule { id: 1 },
        ));
        model.screen = Screen::ScheduleList(state);
        let frame = frame_lines(&model).join("\n");
        assert!(frame.contains("Delete Schedule"));
        assert!(frame.contains("[ Yes ]"));
        assert_frame_dimensions(&model);
    }

    #[test]
    fn quick_run_form_and_list_render() {
        let mut model = AppModel::new((110, 32));
        let mut state = QuickRunState::new("main");
        state.form_open = true;
        state.pipelines = vec![PipelineWithStages {
            pipeline: Pipeline {
                id: 500,
                ref_name: "main".into(),
                status: PipelineStatus::Running,
                source: "web".into(),
                name: Some("Deploy to staging".into()),
                web_url: String::new(),
                created_at: None,
                updated_at: None,
                user: Some(User {
                    id: 2,
                    username: "ops".to_string(),
                    name: "Ops".into(),
                }),
            },
            stages: vec![
                crate::models::StageInfo {
                    name: "build".into(),
                    status: PipelineStatus::Success,
                },
                crate::models::StageInfo {
                    name: "deploy".into(),
                    status: PipelineStatus::Running,
                },
            ],
        }];
        model.screen = Screen::QuickRun(state);
        let frame = frame_lines(&model).join("\n");
        assert!(frame.contains("New Pipeline Run"));
        assert!(frame.contains("Recent Pipelines"));
        assert!(frame.contains("#500"));
        assert!(frame.contains("Deploy to staging"));
        assert!(frame.contains("ops"));
        assert_frame_dimensions(&model);
    }

    #[test]
    fn relative_time_buckets() {
        let base = now();
        assert_eq!(format_relative(base - chrono::Duration::minutes(1), base), "past");
        assert_eq!(format_relative(base + chrono::Duration::seconds(30), base), "<1m");
        assert_eq!(format_relative(base + chrono::Duration::minutes(12), base), "12m");
        assert_eq!(format_relative(base + chrono::Duration::hours(3), base), "3h");
        assert_eq!(format_relative(base + chrono::Duration::days(2), base), "2d");
    }

    #[test]
    fn detail_time_phrases() {
        let base = now();
        assert_eq!(format_detail(base - chrono::Duration::hours(1), base), "Past due");
        assert_eq!(
            format_detail(base + chrono::Duration::minutes(1), base),
            "in 1 minute"
        );
        assert_eq!(
            format_detail(base + chrono::Duration::minutes(45), base),
            "in 45 minutes"
        );
        assert_eq!(
            format_detail(base + chrono::Duration::hours(26), base),
            "in 1 day"
        );
    }

    #[test]
    fn small_terminal_degrades_gracefully() {
        let model = AppModel::new((30, 4));
        let frame = render_at(&model, &Theme::plain(), now());
        assert!(frame.contains("terminal too small"));
    }
}
