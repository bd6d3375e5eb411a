//! Theme: a bundle of text-styling functions injected into rendering.
//!
//! A style is a function from text to styled text. The theme value is built
//! once at startup and passed explicitly to every render function; nothing
//! reads styling state from module-level globals. `Theme::plain()` yields
//! byte-identical unstyled output for tests and `--no-color`.

use colored::Colorize;

/// A single style: plain text in, possibly ANSI-decorated text out.
pub type StyleFn = fn(&str) -> String;

/// Styling functions for every visual role the renderer uses.
#[derive(Clone, Copy)]
pub struct Theme {
    /// App name, panel titles, table headers.
    pub title: StyleFn,
    /// Form field labels.
    pub label: StyleFn,
    /// The focused/selected row or button (reverse video).
    pub selected: StyleFn,
    /// Success banners, active dots, passed pipelines.
    pub success: StyleFn,
    /// Error banners, failed pipelines.
    pub danger: StyleFn,
    /// Warning banners, running/pending pipelines.
    pub warning: StyleFn,
    /// Secondary emphasis: key hints, cron examples.
    pub accent: StyleFn,
    /// Informational values (cron field names, URLs).
    pub info: StyleFn,
    /// De-emphasized text: placeholders, masked values, inactive items.
    pub muted: StyleFn,
}

impl Theme {
    /// Default colored theme.
    #[must_use]
    pub fn color() -> Self {
        Self {
            title: |s| s.truecolor(0xff, 0x87, 0x00).bold().to_string(),
            label: |s| s.truecolor(0xff, 0x87, 0x00).bold().to_string(),
            selected: |s| s.reversed().to_string(),
            success: |s| s.bright_green().to_string(),
            danger: |s| s.bright_red().to_string(),
            warning: |s| s.bright_yellow().to_string(),
            accent: |s| s.bright_yellow().to_string(),
            info: |s| s.bright_blue().to_string(),
            muted: |s| s.bright_black().to_string(),
        }
    }

    /// Identity theme: every style returns its input unchanged.
    #[must_use]
    pub fn plain() -> Self {
        fn identity(s: &str) -> String {
            s.to_string()
        }
        Self {
            title: identity,
            label: identity,
            selected: identity,
            success: identity,
            danger: identity,
            warning: identity,
            accent: identity,
            info: identity,
            muted: identity,
        }
    }
}

impl std::fmt::Debug for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Theme")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_is_identity() {
        let theme = Theme::plain();
        assert_eq!((theme.title)("nightly"), "nightly");
        assert_eq!((theme.selected)("row"), "row");
    }
}
