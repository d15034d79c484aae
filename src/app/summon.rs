use super::{App, Deferred, RefreshOutcome};
use crate::discovery::{Discovery, OsEvent};
use crate::layout::thumbnail_max_size;
use crate::picker::PanelView;
use crate::platform::WindowServer;
use crate::selection::{move_in_grid, GridDirection, SummonState};
use std::time::Instant;
use tracing::{debug, info, warn};

impl<S: WindowServer, P: PanelView> App<S, P> {
    /// Show trigger. The first one of a session opens the picker, later ones
    /// only move the cursor.
    pub fn show(&mut self, step: isize, now: Instant) {
        self.session.begin_show();
        self.show_ui_or_cycle_selection(step, now);
    }

    fn show_ui_or_cycle_selection(&mut self, step: isize, now: Instant) {
        if !self.session.take_first_summon() {
            self.cycle_selection(step);
            return;
        }
        self.selection.enter_first_summon();

        if self.windows.is_empty() {
            info!(target: "alt_tab::summon", "no windows known, not showing");
            self.hide_ui();
            return;
        }
        if self.server.is_mission_control_active() {
            info!(target: "alt_tab::summon", "mission control active, deferring to the OS");
            self.hide_ui();
            return;
        }

        self.spaces.refresh(&self.server);
        Discovery::new(&self.server, &mut self.windows, &mut self.spaces).update_spaces();
        let screen = self.resolve_screen();
        self.screen = Some(screen);
        self.recompute_eligibility();

        let eligible = self.windows.eligible_count();
        if eligible == 0 {
            info!(target: "alt_tab::summon", "no eligible windows, not showing");
            self.hide_ui();
            return;
        }

        self.selection.reset(&self.windows);
        self.selection.cycle(step, &self.windows);
        debug!(
            target: "alt_tab::summon",
            step,
            eligible,
            cursor = ?self.selection.cursor(),
            "first summon"
        );

        let generation = self.session.generation();
        self.deferred.schedule_after(
            now,
            self.prefs.window_display_delay(),
            Deferred::RebuildUi { generation },
        );
    }

    pub fn cycle_selection(&mut self, step: isize) {
        match self.selection.state() {
            SummonState::Idle => {
                debug!(target: "alt_tab::select", step, "cycle ignored while idle");
            }
            SummonState::FirstSummon => self.selection.cycle(step, &self.windows),
            SummonState::Active => {
                self.selection.cycle(step, &self.windows);
                self.panel.highlight(self.selection.cursor());
            }
        }
    }

    /// Arrow-key move inside the rendered grid.
    pub fn move_selection(&mut self, direction: GridDirection) {
        if self.selection.state() != SummonState::Active {
            return;
        }
        let Some(cursor) = self.selection.cursor() else {
            return;
        };
        let next = move_in_grid(cursor, direction, &self.layout.rows);
        self.selection.move_to(next, &self.windows);
        self.panel.highlight(self.selection.cursor());
    }

    /// Dismiss from any state. Safe to call repeatedly.
    pub fn hide_ui(&mut self) {
        if self.selection.state() == SummonState::Active || self.panel.is_visible() {
            self.panel.order_out();
        }
        self.session.end_hide();
        self.selection.go_idle();
        self.screen = None;
        self.deferred.cancel_rebuilds();
    }

    /// Hide, then ask the OS to focus the window under the cursor.
    pub fn focus_target(&mut self) {
        let target = self
            .selection
            .selected_window(&self.windows)
            .map(|w| (w.id, w.pid));
        self.hide_ui();

        let Some((window, pid)) = target else {
            debug!(target: "alt_tab::focus", "nothing selected");
            return;
        };
        if self.server.is_mission_control_active() {
            info!(target: "alt_tab::focus", %window, "mission control active, focus suppressed");
            return;
        }
        match self.server.request_focus(window, pid) {
            Ok(()) => {
                info!(target: "alt_tab::focus", %window, %pid, "focused");
                Discovery::new(&self.server, &mut self.windows, &mut self.spaces)
                    .apply(OsEvent::WindowFocused(window));
            }
            Err(error) if error.is_transient() => {
                debug!(target: "alt_tab::focus", %window, %error, "focus request dropped");
            }
            Err(error) => {
                warn!(target: "alt_tab::focus", %window, %error, "focus request failed");
            }
        }
    }

    /// Display delay elapsed: capture, lay out and show.
    pub(crate) fn rebuild_ui(&mut self, generation: u64) {
        if generation != self.session.generation()
            || self.selection.state() != SummonState::FirstSummon
            || !self.session.ui_work_should_be_done()
        {
            debug!(target: "alt_tab::summon", generation, "stale rebuild dropped");
            return;
        }
        self.selection.activate();

        if let Some(screen) = &self.screen {
            let max = thumbnail_max_size(screen, &self.prefs.appearance);
            let captured =
                Discovery::new(&self.server, &mut self.windows, &mut self.spaces).refresh_all_thumbnails(max);
            debug!(target: "alt_tab::summon", captured, "thumbnails refreshed");
        }

        if self.show_panel() {
            info!(
                target: "alt_tab::summon",
                windows = self.windows.eligible_count(),
                "picker shown"
            );
        }
    }

    /// Order the panel out and build it again, e.g. after a space switch.
    pub fn reopen_ui(&mut self) {
        if self.selection.state() != SummonState::Active {
            return;
        }
        self.panel.order_out();
        self.show_panel();
    }

    fn show_panel(&mut self) -> bool {
        if self.refresh_open_ui(&[]) != RefreshOutcome::Completed {
            return false;
        }
        if !self.session.ui_work_should_be_done() {
            return false;
        }
        self.panel.highlight(self.selection.cursor());
        self.panel.show();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{app_with, panel_mut, three_windows};
    use super::*;
    use crate::config::{Filters, Preferences, SpacesToShow};
    use crate::model::{Pid, WindowId};
    use crate::picker::recording::PanelCall;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn current_space_only() -> Preferences {
        Preferences {
            filters: Filters {
                spaces_to_show: SpacesToShow::Current,
                ..Filters::default()
            },
            ..Preferences::default()
        }
    }

    #[test]
    fn show_with_step_one_lands_on_second_eligible_window() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), current_space_only());

        app.show(1, now);
        assert_eq!(app.state(), SummonState::FirstSummon);
        assert_eq!(app.windows().eligible_ids(), vec![WindowId(1), WindowId(2)]);
        assert_eq!(app.selection().selected_id(), Some(WindowId(2)));

        app.run_deferred(now);
        assert_eq!(app.state(), SummonState::Active);
        assert_eq!(app.panel().shows(), 1);
        assert_eq!(app.panel().last_items(), Some(&[WindowId(1), WindowId(2)][..]));
        assert!(app.panel().calls.contains(&PanelCall::Highlight(Some(1))));
    }

    #[test]
    fn show_with_nothing_eligible_stays_idle() {
        let server = three_windows();
        server.set_current_space(9);
        let mut app = app_with(server, current_space_only());
        let now = Instant::now();

        app.show(1, now);
        app.run_deferred(now);

        assert_eq!(app.state(), SummonState::Idle);
        assert_eq!(app.panel().shows(), 0);
        assert!(!app.session().app_is_being_used());
        assert!(app.session().is_first_summon());
    }

    #[test]
    fn show_with_empty_registry_stays_idle() {
        let mut app = app_with(crate::platform::fake::FakeServer::new(), Preferences::default());
        app.show(0, Instant::now());
        assert_eq!(app.state(), SummonState::Idle);
        assert!(app.next_deadline().is_none());
    }

    #[test]
    fn later_triggers_cycle_and_wrap_backwards() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());

        app.show(0, now);
        app.run_deferred(now);
        assert_eq!(app.selection().cursor(), Some(0));

        app.show(-1, now);
        assert_eq!(app.selection().cursor(), Some(2));
        app.cycle_selection(1);
        assert_eq!(app.selection().cursor(), Some(0));
        assert_eq!(app.panel().shows(), 1);
    }

    #[test]
    fn hide_from_any_state_resets_flags() {
        let now = Instant::now();
        for run_deferred in [false, true] {
            let mut app = app_with(three_windows(), Preferences::default());
            app.show(1, now);
            if run_deferred {
                app.run_deferred(now);
            }
            app.hide_ui();
            assert_eq!(app.state(), SummonState::Idle);
            assert!(!app.session().app_is_being_used());
            assert!(app.session().is_first_summon());
            assert!(!app.is_visible());

            let calls = app.panel().calls.len();
            app.hide_ui();
            assert_eq!(app.panel().calls.len(), calls);
            assert_eq!(app.state(), SummonState::Idle);
        }
    }

    #[test]
    fn hide_before_display_delay_drops_the_rebuild() {
        let now = Instant::now();
        let prefs = Preferences {
            appearance: crate::config::Appearance {
                window_display_delay_ms: 100,
                ..Default::default()
            },
            ..Preferences::default()
        };
        let mut app = app_with(three_windows(), prefs);

        app.show(1, now);
        app.run_deferred(now);
        assert_eq!(app.state(), SummonState::FirstSummon);
        assert_eq!(app.next_deadline(), Some(now + Duration::from_millis(100)));

        app.hide_ui();
        app.run_deferred(now + Duration::from_secs(1));
        assert_eq!(app.panel().shows(), 0);
    }

    #[test]
    fn stale_rebuild_from_an_earlier_summon_is_ignored() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        app.show(1, now);
        let old = app.session().generation();
        app.hide_ui();
        app.show(1, now);

        app.rebuild_ui(old);
        assert_eq!(app.state(), SummonState::FirstSummon);
        app.run_deferred(now);
        assert_eq!(app.panel().shows(), 1);
    }

    #[test]
    fn hide_racing_the_layout_step_stops_the_pass() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        let remote = app.session().ui_work.clone();
        panel_mut(&mut app).cancel_on_update = Some(remote);

        app.show(1, now);
        app.run_deferred(now);

        assert!(app.panel().last_items().is_some());
        assert!(app.panel().frames().is_empty());
        assert_eq!(app.panel().shows(), 0);

        app.hide_ui();
        app.hide_ui();
        assert_eq!(app.state(), SummonState::Idle);
        assert_eq!(app.panel().shows(), 0);
    }

    #[test]
    fn quick_tap_focuses_without_showing() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());

        app.show(1, now);
        app.focus_target();
        app.run_deferred(now);

        assert_eq!(app.server().focus_log(), vec![WindowId(2)]);
        assert_eq!(app.panel().shows(), 0);
        assert_eq!(app.windows().ids()[0], WindowId(2));
    }

    #[test]
    fn focus_moves_window_to_front_and_hides() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        app.show(0, now);
        app.run_deferred(now);
        app.cycle_selection(2);

        app.focus_target();

        assert_eq!(app.state(), SummonState::Idle);
        assert!(!app.is_visible());
        assert_eq!(app.server().focus_log(), vec![WindowId(3)]);
        assert_eq!(app.windows().ids(), vec![WindowId(3), WindowId(1), WindowId(2)]);
    }

    #[test]
    fn mission_control_suppresses_focus_but_still_hides() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        app.show(1, now);
        app.run_deferred(now);

        app.server().set_mission_control(true);
        app.focus_target();

        assert!(app.server().focus_log().is_empty());
        assert_eq!(app.state(), SummonState::Idle);
        assert!(!app.is_visible());
    }

    #[test]
    fn mission_control_blocks_show() {
        let server = three_windows();
        server.set_mission_control(true);
        let mut app = app_with(server, Preferences::default());
        app.show(1, Instant::now());
        assert_eq!(app.state(), SummonState::Idle);
    }

    #[test]
    fn failed_focus_is_swallowed() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        app.show(1, now);
        app.server().remove_window(2);
        app.focus_target();
        assert!(app.server().focus_log().is_empty());
        assert_eq!(app.state(), SummonState::Idle);
    }

    #[test]
    fn grid_moves_follow_rendered_rows() {
        let now = Instant::now();
        let prefs = Preferences {
            appearance: crate::config::Appearance {
                max_cells_per_row: 2,
                min_cells_per_row: 1,
                ..Default::default()
            },
            ..Preferences::default()
        };
        let mut app = app_with(three_windows(), prefs);
        app.show(0, now);
        app.run_deferred(now);

        app.move_selection(GridDirection::Down);
        assert_eq!(app.selection().cursor(), Some(2));
        app.move_selection(GridDirection::Right);
        assert_eq!(app.selection().cursor(), Some(2));
        app.move_selection(GridDirection::Up);
        assert_eq!(app.selection().cursor(), Some(0));
        app.move_selection(GridDirection::Right);
        assert_eq!(app.selection().selected_id(), Some(WindowId(2)));
    }

    #[test]
    fn removing_selected_window_clamps_cursor() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        app.show(-1, now);
        app.run_deferred(now);
        assert_eq!(app.selection().selected_id(), Some(WindowId(3)));

        app.handle_os_event(OsEvent::WindowDestroyed(WindowId(3)));

        assert_eq!(app.selection().cursor(), Some(1));
        assert_eq!(app.selection().selected_id(), Some(WindowId(2)));
        assert_eq!(app.panel().last_items(), Some(&[WindowId(1), WindowId(2)][..]));
        assert_eq!(app.state(), SummonState::Active);
    }

    #[test]
    fn losing_every_eligible_window_hides_the_picker() {
        let now = Instant::now();
        let mut app = app_with(three_windows(), Preferences::default());
        app.show(0, now);
        app.run_deferred(now);

        for pid in [10, 20, 30] {
            app.handle_os_event(OsEvent::ApplicationTerminated(Pid(pid)));
        }
        assert_eq!(app.state(), SummonState::Idle);
        assert!(!app.is_visible());
    }

    #[test]
    fn minimizing_while_open_relayouts_without_it() {
        let now = Instant::now();
        let prefs = Preferences {
            filters: Filters {
                show_minimized: false,
                ..Filters::default()
            },
            ..Preferences::default()
        };
        let mut app = app_with(three_windows(), prefs);
        app.show(0, now);
        app.run_deferred(now);

        app.handle_os_event(OsEvent::WindowMiniaturized(WindowId(2)));

        assert_eq!(app.panel().last_items(), Some(&[WindowId(1), WindowId(3)][..]));
    }

    #[test]
    fn space_switch_while_open_reopens_the_panel() {
        let now = Instant::now();
        let server = three_windows();
        let mut app = app_with(server, current_space_only());
        app.show(0, now);
        app.run_deferred(now);

        app.server().set_current_space(2);
        app.handle_os_event(OsEvent::SpaceChanged);

        let tail: Vec<_> = app.panel().calls.iter().rev().take(1).cloned().collect();
        assert_eq!(tail, vec![PanelCall::Show]);
        assert!(app.panel().calls.contains(&PanelCall::OrderOut));
        assert_eq!(app.panel().shows(), 2);
        assert_eq!(app.panel().last_items(), Some(&[WindowId(3)][..]));
    }
}
