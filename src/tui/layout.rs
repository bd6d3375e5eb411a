//! Pure layout primitives: display-width math, padding/truncation, column
//! composition, bordered panels, scroll windows and the proportional
//! scrollbar.
//!
//! Everything here is a pure function over strings and indices; no state,
//! no I/O. Widths are measured in visible characters — ANSI escape
//! sequences contribute zero width.

// ──────────────────── border characters ────────────────────

pub(crate) const BORDER_H: &str = "─";
pub(crate) const BORDER_V: &str = "│";
pub(crate) const BORDER_TL: &str = "┌";
pub(crate) const BORDER_TR: &str = "┐";
pub(crate) const BORDER_BL: &str = "└";
pub(crate) const BORDER_BR: &str = "┘";
pub(crate) const BORDER_JOIN_L: &str = "├";
pub(crate) const BORDER_JOIN_R: &str = "┤";

// ──────────────────── display width ────────────────────

/// Visible width of a string, skipping ANSI CSI sequences.
#[must_use]
pub fn display_width(s: &str) -> usize {
    let mut width = 0;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // CSI sequence: ESC '[' parameters, terminated by 0x40..=0x7e.
            if chars.next() == Some('[') {
                for t in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&t) {
                        break;
                    }
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

/// Truncate a possibly-styled string to a visible width, preserving escape
/// sequences and appending a reset when any styling was present.
#[must_use]
pub fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut visible = 0;
    let mut styled = false;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            styled = true;
            out.push(c);
            if let Some(bracket) = chars.next() {
                out.push(bracket);
                if bracket == '[' {
                    for t in chars.by_ref() {
                        out.push(t);
                        if ('\u{40}'..='\u{7e}').contains(&t) {
                            break;
                        }
                    }
                }
            }
        } else {
            if visible == width {
                break;
            }
            out.push(c);
            visible += 1;
        }
    }
    if styled {
        out.push_str("\u{1b}[0m");
    }
    out
}

/// Pad (or truncate) to an exact visible width.
#[must_use]
pub fn pad_to_width(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current > width {
        return truncate_display(s, width);
    }
    let mut out = s.to_string();
    out.push_str(&" ".repeat(width - current));
    out
}

/// Right-pad without truncation (table columns whose content is pre-cut).
#[must_use]
pub fn pad_right(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    let mut out = s.to_string();
    out.push_str(&" ".repeat(width - current));
    out
}

/// Left-pad to a visible width.
#[must_use]
pub fn pad_left(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    format!("{}{s}", " ".repeat(width - current))
}

/// Center within a width (extra space goes right).
#[must_use]
pub fn center(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    let left = (width - current) / 2;
    format!("{}{s}", " ".repeat(left))
}

/// Truncate plain text to `max` characters with a `...` marker.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let cut: String = s.chars().take(max - 3).collect();
    format!("{cut}...")
}

/// Truncate a URL keeping its tail, which carries the project path.
#[must_use]
pub fn truncate_url(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if max < 6 || count <= max {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - (max - 3)).collect();
    format!("...{tail}")
}

/// Greedy word wrap; words longer than the width are hard-split.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            if word_len <= width {
                current.push_str(word);
            } else {
                // Hard-split an overlong word.
                let mut rest: Vec<char> = word.chars().collect();
                while rest.len() > width {
                    lines.push(rest[..width].iter().collect());
                    rest = rest[width..].to_vec();
                }
                current = rest.into_iter().collect();
            }
        } else if current.chars().count() + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            if word_len <= width {
                current.push_str(word);
            } else {
                let mut rest: Vec<char> = word.chars().collect();
                while rest.len() > width {
                    lines.push(rest[..width].iter().collect());
                    rest = rest[width..].to_vec();
                }
                current = rest.into_iter().collect();
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ──────────────────── columns and panels ────────────────────

/// Join two line columns side by side with a `│` separator, padding each
/// side to its width.
#[must_use]
pub fn join_columns(
    left: &[String],
    right: &[String],
    left_width: usize,
    right_width: usize,
) -> Vec<String> {
    let rows = left.len().max(right.len());
    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let l = left.get(i).map_or("", String::as_str);
        let r = right.get(i).map_or("", String::as_str);
        out.push(format!(
            "{}{BORDER_V}{}",
            pad_to_width(l, left_width),
            pad_to_width(r, right_width)
        ));
    }
    out
}

/// A bordered panel with the title embedded in the top border, content rows
/// padded inside one space of margin, filled to `height` rows.
#[must_use]
pub fn bordered_panel(title: &str, content: &[String], width: usize, height: usize) -> Vec<String> {
    let inner = width.saturating_sub(2);
    let boxed_title = format!(" {title} ");
    let border_len = inner
        .saturating_sub(display_width(&boxed_title))
        .saturating_sub(2);

    let mut lines = Vec::with_capacity(height);
    lines.push(format!(
        "{BORDER_TL}{BORDER_H}{boxed_title}{}{BORDER_H}{BORDER_TR}",
        BORDER_H.repeat(border_len)
    ));

    for line in content {
        let padded = format!(" {} ", pad_to_width(line, inner.saturating_sub(2)));
        lines.push(format!("{BORDER_V}{padded}{BORDER_V}"));
        if lines.len() == height.saturating_sub(1) {
            break;
        }
    }
    while lines.len() < height.saturating_sub(1) {
        lines.push(format!("{BORDER_V}{}{BORDER_V}", " ".repeat(inner)));
    }
    lines.push(format!(
        "{BORDER_BL}{}{BORDER_BR}",
        BORDER_H.repeat(inner)
    ));
    lines
}

// ──────────────────── scrolling ────────────────────

/// Keep the selection inside the visible window: pull the offset up when the
/// selection is above it, down when below, leave it alone otherwise.
#[must_use]
pub fn adjust_scroll(selected: usize, offset: usize, visible: usize) -> usize {
    if visible == 0 {
        return selected;
    }
    if selected < offset {
        selected
    } else if selected >= offset + visible {
        selected + 1 - visible
    } else {
        offset
    }
}

/// Largest valid scroll offset for a list.
#[must_use]
pub fn max_scroll(total: usize, visible: usize) -> usize {
    total.saturating_sub(visible)
}

/// Scrollbar characters.
const SCROLL_THUMB: &str = "┃";
const SCROLL_TRACK: &str = "│";
const SCROLL_UP: &str = "▲";
const SCROLL_DOWN: &str = "▼";

/// Render a vertical scrollbar as one cell per row.
///
/// Blank when everything fits. The thumb is proportional to the visible
/// share, at least one cell, pinned to the ends at the extremes and linearly
/// interpolated in between. Arrow caps appear when more content exists in
/// that direction.
#[must_use]
pub fn scrollbar(total: usize, visible: usize, offset: usize, height: usize) -> Vec<String> {
    if height == 0 {
        return Vec::new();
    }
    if total <= visible {
        return vec![" ".to_string(); height];
    }

    let thumb_size = ((visible * height) / total).clamp(1, height);
    let max_offset = max_scroll(total, visible).max(1);
    let offset = offset.min(max_offset);

    let thumb_pos = if offset == 0 {
        0
    } else if offset >= max_offset {
        height - thumb_size
    } else {
        (offset * (height - thumb_size)) / max_offset
    };

    let mut cells = Vec::with_capacity(height);
    for row in 0..height {
        let cell = if row >= thumb_pos && row < thumb_pos + thumb_size {
            SCROLL_THUMB
        } else if row == 0 && offset > 0 {
            SCROLL_UP
        } else if row == height - 1 && offset < max_offset {
            SCROLL_DOWN
        } else {
            SCROLL_TRACK
        };
        cells.push(cell.to_string());
    }
    cells
}

// ──────────────────── frame finishing ────────────────────

/// Clamp a frame to exactly `height` lines of exactly `width` columns.
#[must_use]
pub fn finalize_frame(lines: Vec<String>, width: usize, height: usize) -> String {
    let mut out = Vec::with_capacity(height);
    for i in 0..height {
        let line = lines.get(i).map_or("", String::as_str);
        out.push(pad_to_width(line, width));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_ignores_ansi() {
        assert_eq!(display_width("plain"), 5);
        assert_eq!(display_width("\u{1b}[31mred\u{1b}[0m"), 3);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncate_display_preserves_styling_and_resets() {
        let styled = "\u{1b}[31mabcdef\u{1b}[0m";
        let cut = truncate_display(styled, 3);
        assert_eq!(display_width(&cut), 3);
        assert!(cut.ends_with("\u{1b}[0m"));
        assert!(cut.contains("abc"));
    }

    #[test]
    fn pad_to_width_is_exact() {
        assert_eq!(pad_to_width("ab", 5), "ab   ");
        assert_eq!(display_width(&pad_to_width("abcdefgh", 5)), 5);
    }

    #[test]
    fn truncate_str_uses_ellipsis() {
        assert_eq!(truncate_str("deploy-production", 9), "deploy...");
        assert_eq!(truncate_str("short", 9), "short");
    }

    #[test]
    fn truncate_url_keeps_tail() {
        let url = "https://gitlab.example.com/group/project";
        let cut = truncate_url(url, 20);
        assert!(cut.starts_with("..."));
        assert!(cut.ends_with("group/project"));
        assert_eq!(cut.chars().count(), 20);
    }

    #[test]
    fn wrap_text_respects_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_text_hard_splits_long_words() {
        let lines = wrap_text("abcdefghijklmnop", 5);
        assert!(lines.iter().all(|l| l.chars().count() <= 5));
    }

    #[test]
    fn join_columns_pads_both_sides() {
        let left = vec!["a".to_string()];
        let right = vec!["b".to_string(), "c".to_string()];
        let rows = join_columns(&left, &right, 3, 3);
        assert_eq!(rows, vec!["a  │b  ", "   │c  "]);
    }

    #[test]
    fn bordered_panel_has_exact_dimensions() {
        let content = vec!["hello".to_string()];
        let panel = bordered_panel("Details", &content, 20, 6);
        assert_eq!(panel.len(), 6);
        for line in &panel {
            assert_eq!(display_width(line), 20, "line: {line:?}");
        }
        assert!(panel[0].contains(" Details "));
    }

    #[test]
    fn bordered_panel_truncates_overflowing_content() {
        let content: Vec<String> = (0..20).map(|i| format!("row {i}")).collect();
        let panel = bordered_panel("T", &content, 12, 5);
        assert_eq!(panel.len(), 5);
        assert!(panel[4].starts_with(BORDER_BL));
    }

    #[test]
    fn adjust_scroll_keeps_selection_visible() {
        // Above the window: snap up.
        assert_eq!(adjust_scroll(2, 5, 10), 2);
        // Below the window: snap down.
        assert_eq!(adjust_scroll(24, 0, 10), 15);
        // Already visible: unchanged.
        assert_eq!(adjust_scroll(7, 5, 10), 5);
    }

    #[test]
    fn scrollbar_blank_when_everything_fits() {
        let bar = scrollbar(5, 10, 0, 4);
        assert!(bar.iter().all(|c| c == " "));
    }

    #[test]
    fn scrollbar_thumb_at_ends() {
        let top = scrollbar(100, 10, 0, 10);
        assert_eq!(top[0], SCROLL_THUMB);

        let bottom = scrollbar(100, 10, 90, 10);
        assert_eq!(bottom[9], SCROLL_THUMB);
        // More content above: up arrow cap.
        assert_eq!(bottom[0], SCROLL_UP);
    }

    #[test]
    fn scrollbar_thumb_is_proportional_and_bounded() {
        for total in [11usize, 25, 100, 1000] {
            for offset in [0usize, 3, 7, 15] {
                let bar = scrollbar(total, 10, offset.min(total - 10), 10);
                let thumb = bar.iter().filter(|c| *c == SCROLL_THUMB).count();
                assert!(thumb >= 1);
                assert!(thumb <= 10);
            }
        }
    }

    #[test]
    fn finalize_frame_is_exact() {
        let frame = finalize_frame(vec!["abc".to_string()], 5, 3);
        let lines: Vec<&str> = frame.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| display_width(l) == 5));
    }
}
