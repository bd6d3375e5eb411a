//! Property-based tests for reducer and widget invariants.
//!
//! Uses `proptest` to verify that arbitrary inputs maintain the critical
//! state invariants: focus ring closure, scroll window containment,
//! scrollbar bounds, popup resolution, key/value commit rules and banner
//! generation ordering.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proptest::prelude::*;

use crate::models::Schedule;

use super::form::FocusRing;
use super::layout::{adjust_scroll, max_scroll, scrollbar};
use super::model::{AppModel, BannerKind, Cmd, Msg, ScheduleListState, Screen};
use super::popup::{ConfirmAction, ConfirmOutcome, ConfirmPopup};
use super::update::update;

// ──────────────────── strategies ────────────────────

fn arb_nav_key() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::Char('j')),
        Just(KeyCode::Char('k')),
        Just(KeyCode::Char('/')),
        Just(KeyCode::Char('d')),
        Just(KeyCode::Char('u')),
        Just(KeyCode::Esc),
        Just(KeyCode::Enter),
        Just(KeyCode::Left),
        Just(KeyCode::Right),
        Just(KeyCode::Char('x')),
        Just(KeyCode::Backspace),
    ]
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn schedule(id: u64) -> Schedule {
    Schedule {
        id,
        description: format!("schedule {id}"),
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

fn model_with_schedules(count: usize, rows: u16) -> AppModel {
    let mut model = AppModel::new((120, rows + 9));
    model.schedules = (0..count).map(|i| schedule(i as u64 + 1)).collect();
    model.screen = Screen::ScheduleList(ScheduleListState::default());
    model
}

// ──────────────────── properties ────────────────────

proptest! {
    /// A full cycle of focus_next (or focus_prev) returns to the start.
    #[test]
    fn focus_ring_closes_under_full_cycle(size in 1usize..12) {
        let fields: Vec<usize> = (0..size).collect();
        let mut ring = FocusRing::new(fields);
        let start = ring.current();
        for _ in 0..size {
            ring.focus_next();
        }
        prop_assert_eq!(ring.current(), start);
        for _ in 0..size {
            ring.focus_prev();
        }
        prop_assert_eq!(ring.current(), start);
    }

    /// After adjustment the selection is inside the window and the offset
    /// is within the valid range.
    #[test]
    fn scroll_window_contains_selection(
        total in 1usize..500,
        visible in 1usize..60,
        offset in 0usize..600,
        selected_seed in 0usize..500,
    ) {
        let selected = selected_seed % total;
        let adjusted = adjust_scroll(selected, offset.min(max_scroll(total, visible)), visible);
        prop_assert!(adjusted <= selected);
        prop_assert!(selected < adjusted + visible);
        prop_assert!(adjusted <= max_scroll(total, visible).max(selected));
    }

    /// The thumb is contiguous, at least one cell, and stays inside the bar.
    #[test]
    fn scrollbar_thumb_is_bounded(
        total in 1usize..500,
        visible in 1usize..60,
        height in 1usize..40,
        offset_seed in 0usize..500,
    ) {
        let offset = offset_seed % (max_scroll(total, visible) + 1);
        let bar = scrollbar(total, visible, offset, height);
        prop_assert_eq!(bar.len(), height);

        if total > visible {
            let thumb_cells: Vec<usize> = bar
                .iter()
                .enumerate()
                .filter(|(_, c)| c.as_str() == "┃")
                .map(|(i, _)| i)
                .collect();
            prop_assert!(!thumb_cells.is_empty());
            prop_assert!(thumb_cells.len() <= height);
            // Contiguous run.
            for pair in thumb_cells.windows(2) {
                prop_assert_eq!(pair[1], pair[0] + 1);
            }
            prop_assert!(*thumb_cells.last().unwrap() < height);
        } else {
            prop_assert!(bar.iter().all(|c| c == " "));
        }
    }

    /// Enter always resolves an open confirmation popup, whatever came
    /// before.
    #[test]
    fn confirm_popup_enter_always_resolves(
        prefix in proptest::collection::vec(arb_nav_key(), 0..10),
    ) {
        let mut popup = ConfirmPopup::new(
            "Delete",
            vec!["Delete \"x\"?".to_string()],
            ConfirmAction::DeleteSchedule { id: 1 },
        );
        let mut resolved = false;
        for code in prefix {
            if matches!(popup.handle_key(code), ConfirmOutcome::Resolved(_)) {
                resolved = true;
                break;
            }
        }
        if !resolved {
            prop_assert!(matches!(
                popup.handle_key(KeyCode::Enter),
                ConfirmOutcome::Resolved(_)
            ));
        }
    }

    /// Arbitrary key sequences on the schedule list keep the cursor inside
    /// the filtered list and the scroll window over the cursor.
    #[test]
    fn schedule_list_cursor_and_scroll_invariants(
        count in 0usize..40,
        keys in proptest::collection::vec(arb_nav_key(), 0..60),
    ) {
        let rows = 10u16;
        let mut model = model_with_schedules(count, rows);
        for code in keys {
            update(&mut model, Msg::Key(press(code)));

            let Screen::ScheduleList(state) = &model.screen else {
                // Navigation away is fine; list invariants no longer apply.
                break;
            };
            let filtered = state.filtered_indices(&model.schedules).len();
            if filtered == 0 {
                prop_assert_eq!(state.cursor, 0);
            } else {
                prop_assert!(state.cursor < filtered);
            }
            prop_assert!(state.scroll <= state.cursor);
            prop_assert!(state.cursor < state.scroll + rows as usize || filtered == 0);
        }
    }

    /// A delayed clear only ever erases the banner generation it was
    /// scheduled for; newer banners survive stale clears.
    #[test]
    fn banner_clears_are_generation_safe(shows in 1usize..8, stale_pick in 0usize..8) {
        let mut model = AppModel::new((80, 24));
        let mut generations = Vec::new();
        for i in 0..shows {
            let cmds = update(&mut model, Msg::Status {
                text: format!("banner {i}"),
                kind: BannerKind::Success,
            });
            let Cmd::ClearStatusAfter { generation, .. } = cmds[0] else {
                panic!("status must schedule a clear");
            };
            generations.push(generation);
        }

        let newest = *generations.last().unwrap();
        let stale = generations[stale_pick % generations.len()];
        update(&mut model, Msg::ClearStatus { generation: stale });

        if stale == newest {
            prop_assert!(model.banner.is_none());
        } else {
            prop_assert_eq!(
                model.banner.as_ref().map(|b| b.generation),
                Some(newest)
            );
        }
    }

    /// The reducer is total: these messages applied in any order leave a
    /// renderable model.
    #[test]
    fn reducer_is_total_over_message_soup(
        seed in proptest::collection::vec(0usize..6, 0..30),
    ) {
        let mut model = model_with_schedules(5, 10);
        for pick in seed {
            let msg = match pick {
                0 => Msg::Resize(40, 12),
                1 => Msg::SchedulesLoaded(vec![schedule(1)]),
                2 => Msg::PollPipelines,
                3 => Msg::PipelinesLoaded(Vec::new()),
                4 => Msg::ClearStatus { generation: 999 },
                _ => Msg::Error("synthetic".into()),
            };
            update(&mut model, msg);
        }
        // Render must not panic on whatever state resulted.
        let _ = super::render::render_at(
            &model,
            &super::theme::Theme::plain(),
            chrono::Utc::now(),
        );
    }
}
