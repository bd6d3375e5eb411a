//! Global input routing.
//!
//! Keys resolve with deterministic precedence: screens with an open popup or
//! an active text edit see every key themselves; otherwise a small set of
//! global bindings (quit) is checked before the key passes through to the
//! active screen's handler.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::model::ScreenKind;

/// What the router needs to know to resolve a key globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputContext {
    pub screen: ScreenKind,
    /// A popup is open on the active screen.
    pub popup_open: bool,
    /// A text field is consuming plain characters (search or form input).
    pub editing: bool,
}

/// Globally resolved actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
}

/// Result of global resolution: an action, a swallowed key, or passthrough
/// to the active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputResolution {
    pub action: Option<InputAction>,
    pub consumed: bool,
}

impl InputResolution {
    const fn action(action: InputAction) -> Self {
        Self {
            action: Some(action),
            consumed: true,
        }
    }

    pub const fn passthrough() -> Self {
        Self {
            action: None,
            consumed: false,
        }
    }
}

/// Screens from which quitting is allowed. Forms never quit so a stray key
/// cannot silently discard unsaved input.
const fn allows_quit(screen: ScreenKind) -> bool {
    matches!(
        screen,
        ScreenKind::ProfileList | ScreenKind::ScheduleList | ScreenKind::QuickRun
    )
}

/// Resolve a key event before screen dispatch.
#[must_use]
pub fn resolve_key(key: &KeyEvent, context: InputContext) -> InputResolution {
    // Popups and text fields take precedence over everything global.
    if context.popup_open || context.editing {
        return InputResolution::passthrough();
    }

    let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
    if (ctrl_c || key.code == KeyCode::Char('q')) && allows_quit(context.screen) {
        return InputResolution::action(InputAction::Quit);
    }

    InputResolution::passthrough()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn q_quits_on_list_screens() {
        for screen in [
            ScreenKind::ProfileList,
            ScreenKind::ScheduleList,
            ScreenKind::QuickRun,
        ] {
            let resolution = resolve_key(
                &press(KeyCode::Char('q')),
                InputContext {
                    screen,
                    popup_open: false,
                    editing: false,
                },
            );
            assert_eq!(resolution.action, Some(InputAction::Quit));
        }
    }

    #[test]
    fn forms_never_quit() {
        for screen in [ScreenKind::ProfileForm, ScreenKind::ScheduleForm] {
            for key in [press(KeyCode::Char('q')), ctrl('c')] {
                let resolution = resolve_key(
                    &key,
                    InputContext {
                        screen,
                        popup_open: false,
                        editing: true,
                    },
                );
                assert_eq!(resolution.action, None);
            }
        }
    }

    #[test]
    fn open_popup_shadows_global_keys() {
        let resolution = resolve_key(
            &press(KeyCode::Char('q')),
            InputContext {
                screen: ScreenKind::ScheduleList,
                popup_open: true,
                editing: false,
            },
        );
        assert_eq!(resolution.action, None);
        assert!(!resolution.consumed);
    }

    #[test]
    fn search_editing_shadows_quit() {
        let resolution = resolve_key(
            &press(KeyCode::Char('q')),
            InputContext {
                screen: ScreenKind::ScheduleList,
                popup_open: false,
                editing: true,
            },
        );
        assert_eq!(resolution.action, None);
    }
}
