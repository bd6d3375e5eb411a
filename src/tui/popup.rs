//! Modal popups: confirmation dialogs and single-select pickers, plus the
//! compositor that overlays their rendered block onto a background frame.
//!
//! A popup renders independently at its own declared width; the compositor
//! centers it in the viewport with the origin clamped at the top-left. A
//! popup taller than the background simply overruns and is cut by the final
//! frame clamp, not by this module.

#![allow(missing_docs)]

use crossterm::event::KeyCode;

use super::layout::{
    BORDER_BL, BORDER_BR, BORDER_H, BORDER_TL, BORDER_TR, BORDER_V, center, display_width,
    pad_right, pad_to_width, truncate_display, truncate_str, wrap_text,
};
use super::theme::Theme;

/// Rows of options visible at once in a select popup.
const SELECT_WINDOW: usize = 10;

/// Default width of a confirmation dialog.
const CONFIRM_WIDTH: usize = 50;

/// What a confirmed dialog resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteSchedule { id: u64 },
    DeleteProfile { index: usize },
}

/// Which form field a select popup writes back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectTarget {
    Timezone,
    Branch,
}

/// A yes/no dialog. `yes_selected` starts false: destructive actions
/// default to the safe answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPopup {
    pub title: String,
    pub message: Vec<String>,
    pub yes_selected: bool,
    pub width: usize,
    pub action: ConfirmAction,
}

/// Key handling outcome for a confirmation popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Open,
    /// Resolved; `true` means the action was confirmed.
    Resolved(bool),
}

impl ConfirmPopup {
    /// Dialog with the default width and "No" preselected.
    #[must_use]
    pub fn new(title: impl Into<String>, message: Vec<String>, action: ConfirmAction) -> Self {
        Self {
            title: title.into(),
            message,
            yes_selected: false,
            width: CONFIRM_WIDTH,
            action,
        }
    }

    /// Route a key press; arrows move the selection, `y`/`n` shortcut,
    /// enter resolves, esc cancels.
    pub fn handle_key(&mut self, code: KeyCode) -> ConfirmOutcome {
        match code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.yes_selected = true;
                ConfirmOutcome::Open
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.yes_selected = false;
                ConfirmOutcome::Open
            }
            KeyCode::Char('y' | 'Y') => ConfirmOutcome::Resolved(true),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => ConfirmOutcome::Resolved(false),
            KeyCode::Enter => ConfirmOutcome::Resolved(self.yes_selected),
            _ => ConfirmOutcome::Open,
        }
    }

    /// Render as a block of `width`-wide lines.
    #[must_use]
    pub fn render(&self, theme: &Theme) -> Vec<String> {
        let inner = self.width.saturating_sub(2);
        let content_width = inner.saturating_sub(2);
        let mut lines = Vec::new();

        lines.push(title_border(&self.title, self.width));
        lines.push(blank_row(inner));

        for message in &self.message {
            for wrapped in wrap_text(message, content_width) {
                lines.push(boxed_row(&center(&wrapped, inner), inner));
            }
        }

        lines.push(blank_row(inner));

        let yes = "[ Yes ]";
        let no = "[ No ]";
        let buttons = if self.yes_selected {
            format!("{}   {}", (theme.selected)(yes), (theme.muted)(no))
        } else {
            format!("{}   {}", (theme.muted)(yes), (theme.selected)(no))
        };
        lines.push(boxed_row(&center(&buttons, inner), inner));

        lines.push(blank_row(inner));
        lines.push(format!("{BORDER_BL}{}{BORDER_BR}", BORDER_H.repeat(inner)));
        lines
    }
}

/// A scrolling single-select list seeded on the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectPopup {
    pub title: String,
    pub options: Vec<String>,
    pub cursor: usize,
    pub width: usize,
    pub target: SelectTarget,
}

/// Key handling outcome for a select popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Open,
    Cancelled,
    Chosen(usize),
}

impl SelectPopup {
    /// Picker over `options` with the cursor on `selected` (clamped), sized
    /// to the longest option within `max_width`.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        options: Vec<String>,
        selected: usize,
        target: SelectTarget,
        max_width: usize,
    ) -> Self {
        let longest = options.iter().map(|o| o.chars().count()).max().unwrap_or(0);
        let width = (longest + 6).max(35).min(max_width.max(20));
        let cursor = if options.is_empty() {
            0
        } else {
            selected.min(options.len() - 1)
        };
        Self {
            title: title.into(),
            options,
            cursor,
            width,
            target,
        }
    }

    /// Route a key press; up/down move, enter chooses, esc cancels.
    pub fn handle_key(&mut self, code: KeyCode) -> SelectOutcome {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                SelectOutcome::Open
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.options.len() {
                    self.cursor += 1;
                }
                SelectOutcome::Open
            }
            KeyCode::Enter => {
                if self.options.is_empty() {
                    SelectOutcome::Cancelled
                } else {
                    SelectOutcome::Chosen(self.cursor)
                }
            }
            KeyCode::Esc => SelectOutcome::Cancelled,
            _ => SelectOutcome::Open,
        }
    }

    /// Visible window `[start, end)` centered on the cursor.
    #[must_use]
    pub fn window(&self) -> (usize, usize) {
        let start = self.cursor.saturating_sub(SELECT_WINDOW / 2);
        let end = (start + SELECT_WINDOW).min(self.options.len());
        let start = end.saturating_sub(SELECT_WINDOW);
        (start, end)
    }

    /// Render as a block of `width`-wide lines with scroll indicators when
    /// options overflow the window.
    #[must_use]
    pub fn render(&self, theme: &Theme) -> Vec<String> {
        let inner = self.width.saturating_sub(2);
        let item_width = inner.saturating_sub(2);
        let (start, end) = self.window();

        let mut lines = Vec::new();
        lines.push(title_border(&self.title, self.width));

        if start > 0 {
            let marker = pad_right("  ▲ more above", item_width);
            lines.push(boxed_row(&(theme.muted)(&marker), inner));
        }

        for (i, option) in self.options.iter().enumerate().take(end).skip(start) {
            let item = pad_right(&truncate_str(option, item_width), item_width);
            if i == self.cursor {
                lines.push(boxed_row(&(theme.selected)(&item), inner));
            } else {
                lines.push(boxed_row(&item, inner));
            }
        }

        if end < self.options.len() {
            let marker = pad_right("  ▼ more below", item_width);
            lines.push(boxed_row(&(theme.muted)(&marker), inner));
        }

        lines.push(format!("{BORDER_BL}{}{BORDER_BR}", BORDER_H.repeat(inner)));
        lines
    }
}

/// Either popup shape, as owned by a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Confirm(ConfirmPopup),
    Select(SelectPopup),
}

impl Popup {
    /// Rendered block of lines for the compositor.
    #[must_use]
    pub fn render(&self, theme: &Theme) -> Vec<String> {
        match self {
            Self::Confirm(popup) => popup.render(theme),
            Self::Select(popup) => popup.render(theme),
        }
    }

    /// Declared width of the rendered block.
    #[must_use]
    pub const fn width(&self) -> usize {
        match self {
            Self::Confirm(popup) => popup.width,
            Self::Select(popup) => popup.width,
        }
    }
}

// ──────────────────── compositing ────────────────────

/// Overlay a popup block onto a background, centered in the viewport with
/// the origin clamped at (0, 0). Background regions outside the popup
/// rectangle are unchanged.
#[must_use]
pub fn overlay_centered(
    background: &str,
    popup_lines: &[String],
    popup_width: usize,
    viewport_width: usize,
    viewport_height: usize,
) -> String {
    let mut lines: Vec<String> = background.split('\n').map(String::from).collect();
    let origin_x = viewport_width.saturating_sub(popup_width) / 2;
    let origin_y = viewport_height.saturating_sub(popup_lines.len()) / 2;

    while lines.len() < origin_y + popup_lines.len() {
        lines.push(String::new());
    }

    for (i, popup_line) in popup_lines.iter().enumerate() {
        let row = origin_y + i;
        lines[row] = splice_line(&lines[row], popup_line, origin_x, popup_width);
    }

    lines.join("\n")
}

/// Replace `[x, x + width)` of a background line with popup content,
/// preserving whatever lies before and after.
fn splice_line(background: &str, popup_line: &str, x: usize, width: usize) -> String {
    let prefix = pad_to_width(&truncate_display(background, x), x);
    let suffix = skip_display(background, x + width);
    format!("{prefix}{}{suffix}", pad_to_width(popup_line, width))
}

/// Remainder of a string after skipping `skip` visible characters. Escape
/// sequences inside the skipped region are dropped with it.
fn skip_display(s: &str, skip: usize) -> String {
    let mut visible = 0;
    let mut chars = s.chars();
    while visible < skip {
        match chars.next() {
            None => return String::new(),
            Some('\u{1b}') => {
                if chars.next() == Some('[') {
                    for t in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&t) {
                            break;
                        }
                    }
                }
            }
            Some(_) => visible += 1,
        }
    }
    chars.collect()
}

fn title_border(title: &str, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let boxed = format!(" {title} ");
    let used = display_width(&boxed);
    let left = inner.saturating_sub(used) / 2;
    let right = inner.saturating_sub(used).saturating_sub(left);
    format!(
        "{BORDER_TL}{}{boxed}{}{BORDER_TR}",
        BORDER_H.repeat(left),
        BORDER_H.repeat(right)
    )
}

fn blank_row(inner: usize) -> String {
    format!("{BORDER_V}{}{BORDER_V}", " ".repeat(inner))
}

fn boxed_row(content: &str, inner: usize) -> String {
    format!("{BORDER_V} {} {BORDER_V}", pad_to_width(content, inner.saturating_sub(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirm() -> ConfirmPopup {
        ConfirmPopup::new(
            "Delete Schedule",
            vec!["Delete \"nightly\"?".to_string()],
            ConfirmAction::DeleteSchedule { id: 1 },
        )
    }

    #[test]
    fn confirm_defaults_to_no() {
        assert!(!confirm().yes_selected);
    }

    #[test]
    fn confirm_left_then_enter_resolves_yes() {
        let mut popup = confirm();
        assert_eq!(popup.handle_key(KeyCode::Left), ConfirmOutcome::Open);
        assert_eq!(popup.handle_key(KeyCode::Enter), ConfirmOutcome::Resolved(true));
    }

    #[test]
    fn confirm_esc_resolves_no() {
        let mut popup = confirm();
        popup.yes_selected = true;
        assert_eq!(popup.handle_key(KeyCode::Esc), ConfirmOutcome::Resolved(false));
    }

    #[test]
    fn confirm_render_dimensions() {
        let theme = Theme::plain();
        let lines = confirm().render(&theme);
        for line in &lines {
            assert_eq!(display_width(line), CONFIRM_WIDTH, "line: {line:?}");
        }
        assert!(lines[0].contains(" Delete Schedule "));
        assert!(lines.iter().any(|l| l.contains("[ Yes ]")));
    }

    fn select(n: usize, cursor: usize) -> SelectPopup {
        SelectPopup::new(
            "Branch",
            (0..n).map(|i| format!("branch-{i}")).collect(),
            cursor,
            SelectTarget::Branch,
            60,
        )
    }

    #[test]
    fn select_window_centers_cursor() {
        let popup = select(30, 15);
        let (start, end) = popup.window();
        assert!(start <= 15 && 15 < end);
        assert_eq!(end - start, SELECT_WINDOW);
    }

    #[test]
    fn select_window_clamps_at_edges() {
        assert_eq!(select(30, 0).window(), (0, 10));
        assert_eq!(select(30, 29).window(), (20, 30));
        assert_eq!(select(4, 2).window(), (0, 4));
    }

    #[test]
    fn select_shows_scroll_indicators_when_overflowing() {
        let theme = Theme::plain();
        let lines = select(30, 15).render(&theme);
        let text = lines.join("\n");
        assert!(text.contains("more above"));
        assert!(text.contains("more below"));
    }

    #[test]
    fn select_hides_indicators_when_everything_fits() {
        let theme = Theme::plain();
        let text = select(4, 0).render(&theme).join("\n");
        assert!(!text.contains("more above"));
        assert!(!text.contains("more below"));
    }

    #[test]
    fn select_enter_chooses_cursor() {
        let mut popup = select(5, 2);
        popup.handle_key(KeyCode::Down);
        assert_eq!(popup.handle_key(KeyCode::Enter), SelectOutcome::Chosen(3));
    }

    #[test]
    fn overlay_centers_and_preserves_surroundings() {
        let background = vec!["x".repeat(20); 9].join("\n");
        let popup = vec!["#".repeat(10), "#".repeat(10)];
        let composed = overlay_centered(&background, &popup, 10, 20, 9);
        let lines: Vec<&str> = composed.split('\n').collect();

        // Popup occupies rows 3-4, columns 5-14.
        assert_eq!(lines[3], format!("{}{}{}", "x".repeat(5), "#".repeat(10), "x".repeat(5)));
        assert_eq!(lines[2], "x".repeat(20));
        assert_eq!(lines[5], "x".repeat(20));
    }

    #[test]
    fn overlay_clamps_origin_for_oversized_popup() {
        let background = vec!["bg".to_string(); 2].join("\n");
        let popup: Vec<String> = (0..6).map(|i| format!("p{i}")).collect();
        let composed = overlay_centered(&background, &popup, 2, 4, 2);
        let lines: Vec<&str> = composed.split('\n').collect();
        // Origin clamped to row 0; popup overruns below.
        assert!(lines[0].contains("p0"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn splice_line_extends_short_background() {
        let spliced = splice_line("ab", "XY", 5, 2);
        assert_eq!(spliced, "ab   XY");
    }
}
