//! Form machinery: single-line text inputs, the wraparound focus ring, and
//! the dynamic key/value row editor used for pipeline variables.
//!
//! These widgets are pure state + key routing; rendering returns strings and
//! all I/O stays in the runtime.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent};

use crate::models::{Variable, parse_key_value};

use super::theme::Theme;

// ──────────────────── text input ────────────────────

/// A single-line editable text field with its own cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    value: Vec<char>,
    cursor: usize,
    focused: bool,
    /// Shown dimmed while the field is empty.
    pub placeholder: String,
    /// Maximum number of characters accepted.
    pub char_limit: usize,
    /// Visible width of the rendered field.
    pub width: usize,
    /// Echo every character as `*` (credentials).
    pub masked: bool,
}

impl TextInput {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: Vec::new(),
            cursor: 0,
            focused: false,
            placeholder: String::new(),
            char_limit: 200,
            width: 40,
            masked: false,
        }
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.char_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub const fn with_masked_echo(mut self) -> Self {
        self.masked = true;
        self
    }

    /// Current contents.
    #[must_use]
    pub fn value(&self) -> String {
        self.value.iter().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Replace the contents, moving the cursor to the end.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.chars().collect();
        self.cursor = self.value.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    /// Apply an editing key. Returns `true` when the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                if self.value.len() < self.char_limit {
                    self.value.insert(self.cursor, c);
                    self.cursor += 1;
                }
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.value.remove(self.cursor);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.value.len() {
                    self.value.remove(self.cursor);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.value.len());
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.value.len();
                true
            }
            _ => false,
        }
    }

    fn echoed(&self) -> Vec<char> {
        if self.masked {
            vec!['*'; self.value.len()]
        } else {
            self.value.clone()
        }
    }

    /// Render the field; the cursor cell is reverse-styled while focused.
    #[must_use]
    pub fn view(&self, theme: &Theme) -> String {
        if self.value.is_empty() && !self.focused {
            return (theme.muted)(&self.placeholder);
        }

        let chars = self.echoed();
        // Keep the cursor in view: window the value when it overflows.
        let start = if self.cursor >= self.width {
            self.cursor + 1 - self.width
        } else {
            0
        };
        let end = (start + self.width).min(chars.len());
        let visible: String = chars[start..end].iter().collect();

        if !self.focused {
            return visible;
        }

        let cursor_in_window = self.cursor - start;
        let before: String = chars[start..start + cursor_in_window].iter().collect();
        if self.cursor < self.value.len() {
            let at: String = chars[start + cursor_in_window..=start + cursor_in_window]
                .iter()
                .collect();
            let after: String = chars[start + cursor_in_window + 1..end].iter().collect();
            format!("{before}{}{after}", (theme.selected)(&at))
        } else {
            format!("{before}{}", (theme.selected)(" "))
        }
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────── focus ring ────────────────────

/// Ordered field focus with wraparound at both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRing<T: Copy + PartialEq> {
    fields: Vec<T>,
    index: usize,
}

impl<T: Copy + PartialEq> FocusRing<T> {
    /// Ring over a non-empty ordered field list, focused on the first.
    #[must_use]
    pub fn new(fields: Vec<T>) -> Self {
        debug_assert!(!fields.is_empty());
        Self { fields, index: 0 }
    }

    /// The focused field.
    #[must_use]
    pub fn current(&self) -> T {
        self.fields[self.index]
    }

    /// Advance focus, wrapping past the last field.
    pub fn focus_next(&mut self) {
        self.index = (self.index + 1) % self.fields.len();
    }

    /// Retreat focus, wrapping past the first field.
    pub fn focus_prev(&mut self) {
        self.index = (self.index + self.fields.len() - 1) % self.fields.len();
    }

    /// Jump directly to a field (no-op if absent).
    pub fn focus(&mut self, field: T) {
        if let Some(index) = self.fields.iter().position(|f| *f == field) {
            self.index = index;
        }
    }

    /// Number of fields in the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ──────────────────── key/value rows ────────────────────

/// Dynamic `KEY=value` row list: committed rows plus one always-present
/// blank trailing row that grows the list when committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEditor {
    inputs: Vec<TextInput>,
    /// Index of the row holding focus while the editor section is active.
    pub focused: usize,
}

impl KvEditor {
    /// Editor seeded from existing variables.
    #[must_use]
    pub fn new(variables: &[Variable]) -> Self {
        let mut editor = Self {
            inputs: Vec::new(),
            focused: 0,
        };
        editor.rebuild(variables);
        editor
    }

    fn rebuild(&mut self, variables: &[Variable]) {
        self.inputs = variables
            .iter()
            .map(|v| {
                let mut input = TextInput::new().with_width(40);
                input.set_value(&format!("{}={}", v.key, v.value));
                input
            })
            .collect();
        self.inputs.push(
            TextInput::new()
                .with_placeholder("KEY=value")
                .with_width(40),
        );
        self.focused = self.focused.min(self.inputs.len() - 1);
    }

    /// Number of rows including the trailing blank.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the trailing blank row holds focus.
    #[must_use]
    pub fn on_trailing_row(&self) -> bool {
        self.focused + 1 == self.inputs.len()
    }

    /// Rows parsed as variables; rows without a usable key are skipped.
    /// Includes uncommitted text in the trailing row so a save does not
    /// silently drop what the user just typed.
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        self.inputs
            .iter()
            .filter(|input| !input.is_empty())
            .filter_map(|input| parse_key_value(&input.value()))
            .map(|(key, value)| Variable::env(key, value))
            .collect()
    }

    /// Committed rows only (everything except the trailing blank).
    fn committed(&self) -> Vec<Variable> {
        self.inputs[..self.inputs.len() - 1]
            .iter()
            .filter(|input| !input.is_empty())
            .filter_map(|input| parse_key_value(&input.value()))
            .map(|(key, value)| Variable::env(key, value))
            .collect()
    }

    /// Commit the trailing row: non-empty text with a usable key appends a
    /// committed row and recreates the blank. Returns `true` on append.
    pub fn commit_trailing(&mut self) -> bool {
        if !self.on_trailing_row() {
            return false;
        }
        let text = self.inputs[self.focused].value();
        if text.trim().is_empty() || parse_key_value(&text).is_none() {
            return false;
        }

        let mut variables = self.committed();
        if let Some((key, value)) = parse_key_value(&text) {
            variables.push(Variable::env(key, value));
        }
        self.rebuild(&variables);
        self.focused = self.inputs.len() - 1;
        self.focus_row(self.focused);
        true
    }

    /// Route an editing key to the focused row, then drop rows the edit
    /// emptied (only the trailing row may remain empty).
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let consumed = self.inputs[self.focused].handle_key(key);
        if consumed {
            self.drop_emptied_rows();
        }
        consumed
    }

    fn drop_emptied_rows(&mut self) {
        let committed_now = self.committed();
        if committed_now.len() < self.inputs.len() - 1 {
            let was_focused = self.focused;
            self.rebuild(&committed_now);
            self.focused = was_focused.min(self.inputs.len() - 1);
            self.focus_row(self.focused);
        }
    }

    /// Move editor-internal focus to a row and focus its input.
    pub fn focus_row(&mut self, row: usize) {
        self.focused = row.min(self.inputs.len() - 1);
        for (i, input) in self.inputs.iter_mut().enumerate() {
            if i == self.focused {
                input.focus();
            } else {
                input.blur();
            }
        }
    }

    /// Blur every row (focus left the editor section).
    pub fn blur_all(&mut self) {
        for input in &mut self.inputs {
            input.blur();
        }
    }

    /// Rendered rows in order.
    #[must_use]
    pub fn views(&self, theme: &Theme) -> Vec<String> {
        self.inputs.iter().map(|input| input.view(theme)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut TextInput, text: &str) {
        for c in text.chars() {
            input.handle_key(&press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn text_input_inserts_at_cursor() {
        let mut input = TextInput::new();
        type_text(&mut input, "abc");
        input.handle_key(&press(KeyCode::Left));
        input.handle_key(&press(KeyCode::Char('X')));
        assert_eq!(input.value(), "abXc");
    }

    #[test]
    fn text_input_backspace_and_delete() {
        let mut input = TextInput::new();
        type_text(&mut input, "abcd");
        input.handle_key(&press(KeyCode::Backspace));
        assert_eq!(input.value(), "abc");
        input.handle_key(&press(KeyCode::Home));
        input.handle_key(&press(KeyCode::Delete));
        assert_eq!(input.value(), "bc");
    }

    #[test]
    fn text_input_respects_char_limit() {
        let mut input = TextInput::new().with_limit(3);
        type_text(&mut input, "abcdef");
        assert_eq!(input.value(), "abc");
    }

    #[test]
    fn text_input_masked_echo() {
        let theme = Theme::plain();
        let mut input = TextInput::new().with_masked_echo();
        type_text(&mut input, "secret");
        assert!(!input.view(&theme).contains("secret"));
        assert!(input.view(&theme).contains("******"));
        assert_eq!(input.value(), "secret");
    }

    #[test]
    fn text_input_placeholder_when_empty_and_blurred() {
        let theme = Theme::plain();
        let input = TextInput::new().with_placeholder("Search...");
        assert_eq!(input.view(&theme), "Search...");
    }

    #[test]
    fn focus_ring_wraps_both_directions() {
        let mut ring = FocusRing::new(vec![1, 2, 3]);
        assert_eq!(ring.current(), 1);
        ring.focus_prev();
        assert_eq!(ring.current(), 3);
        ring.focus_next();
        assert_eq!(ring.current(), 1);
    }

    #[test]
    fn focus_ring_full_cycle_returns_to_start() {
        let mut ring = FocusRing::new(vec!['a', 'b', 'c', 'd']);
        for _ in 0..ring.len() {
            ring.focus_next();
        }
        assert_eq!(ring.current(), 'a');
        for _ in 0..ring.len() {
            ring.focus_prev();
        }
        assert_eq!(ring.current(), 'a');
    }

    #[test]
    fn kv_editor_commit_appends_row_and_new_blank() {
        let mut editor = KvEditor::new(&[]);
        assert_eq!(editor.row_count(), 1);
        editor.focus_row(0);
        for c in "DEPLOY_ENV=prod".chars() {
            editor.handle_key(&press(KeyCode::Char(c)));
        }
        assert!(editor.commit_trailing());
        assert_eq!(editor.row_count(), 2);
        assert!(editor.on_trailing_row());
        assert_eq!(editor.variables(), vec![Variable::env("DEPLOY_ENV", "prod")]);
    }

    #[test]
    fn kv_editor_rejects_empty_and_keyless_commits() {
        let mut editor = KvEditor::new(&[]);
        editor.focus_row(0);
        assert!(!editor.commit_trailing());

        for c in "=value".chars() {
            editor.handle_key(&press(KeyCode::Char(c)));
        }
        assert!(!editor.commit_trailing());
        assert_eq!(editor.row_count(), 1);
    }

    #[test]
    fn kv_editor_key_only_commit_is_allowed() {
        let mut editor = KvEditor::new(&[]);
        editor.focus_row(0);
        for c in "FLAG".chars() {
            editor.handle_key(&press(KeyCode::Char(c)));
        }
        assert!(editor.commit_trailing());
        assert_eq!(editor.variables(), vec![Variable::env("FLAG", "")]);
    }

    #[test]
    fn kv_editor_drops_row_emptied_by_editing() {
        let mut editor = KvEditor::new(&[Variable::env("A", "1")]);
        assert_eq!(editor.row_count(), 2);
        editor.focus_row(0);
        for _ in 0..3 {
            editor.handle_key(&press(KeyCode::Backspace));
        }
        assert_eq!(editor.row_count(), 1);
        assert!(editor.variables().is_empty());
    }

    #[test]
    fn kv_editor_includes_uncommitted_trailing_text_in_save() {
        let mut editor = KvEditor::new(&[Variable::env("A", "1")]);
        editor.focus_row(1);
        for c in "B=2".chars() {
            editor.handle_key(&press(KeyCode::Char(c)));
        }
        assert_eq!(
            editor.variables(),
            vec![Variable::env("A", "1"), Variable::env("B", "2")]
        );
    }
}
