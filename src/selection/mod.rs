//! Selection state machine and the cursor into the eligible windows.

mod grid;

pub use grid::GridDirection;
pub(crate) use grid::move_in_grid;

use crate::model::{Window, WindowId, WindowRegistry};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummonState {
    /// No picker visible.
    #[default]
    Idle,
    /// Triggered; waiting for the display delay before the panel is built.
    FirstSummon,
    /// Panel visible, cursor valid.
    Active,
}

/// `(cursor + step) mod count`, wrapping in both directions.
pub fn cycle_index(cursor: usize, step: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let count = count as isize;
    (cursor as isize % count + step % count).rem_euclid(count) as usize
}

#[derive(Debug, Default)]
pub struct Selection {
    state: SummonState,
    cursor: Option<usize>,
    /// Remembered so the cursor can follow its window when the eligible
    /// list is rebuilt underneath it.
    selected: Option<WindowId>,
}

impl Selection {
    pub fn state(&self) -> SummonState {
        self.state
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn selected_id(&self) -> Option<WindowId> {
        self.selected
    }

    pub fn enter_first_summon(&mut self) {
        self.state = SummonState::FirstSummon;
    }

    pub fn activate(&mut self) {
        self.state = SummonState::Active;
    }

    pub fn go_idle(&mut self) {
        self.state = SummonState::Idle;
        self.cursor = None;
        self.selected = None;
    }

    /// Put the cursor on the first eligible window, or nowhere.
    pub fn reset(&mut self, registry: &WindowRegistry) {
        self.set_cursor((registry.eligible_count() > 0).then_some(0), registry);
    }

    pub fn cycle(&mut self, step: isize, registry: &WindowRegistry) {
        let count = registry.eligible_count();
        if count == 0 {
            self.set_cursor(None, registry);
            return;
        }
        let next = cycle_index(self.cursor.unwrap_or(0), step, count);
        trace!(target: "alt_tab::select", step, count, next, "cycle");
        self.set_cursor(Some(next), registry);
    }

    pub(crate) fn move_to(&mut self, index: usize, registry: &WindowRegistry) {
        let count = registry.eligible_count();
        self.set_cursor((count > 0).then(|| index.min(count - 1)), registry);
    }

    /// After the eligible list changed: follow the selected window if it
    /// survived, otherwise clamp the old index into range.
    pub fn reconcile(&mut self, registry: &WindowRegistry) {
        let count = registry.eligible_count();
        let next = match self.selected.and_then(|id| registry.eligible_index_of(id)) {
            Some(index) => Some(index),
            None if count == 0 => None,
            None => Some(self.cursor.unwrap_or(0).min(count - 1)),
        };
        self.set_cursor(next, registry);
    }

    pub fn selected_window<'r>(&self, registry: &'r WindowRegistry) -> Option<&'r Window> {
        registry.eligible_at(self.cursor?)
    }

    fn set_cursor(&mut self, cursor: Option<usize>, registry: &WindowRegistry) {
        self.cursor = cursor;
        self.selected = cursor.and_then(|i| registry.eligible_at(i)).map(|w| w.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::window::tests::info;
    use crate::model::{Application, Pid, Window};
    use proptest::prelude::*;

    fn registry(eligible: &[(u32, bool)]) -> WindowRegistry {
        let mut registry = WindowRegistry::default();
        let windows = eligible
            .iter()
            .map(|&(id, show)| {
                let mut w = Window::from_info(info(id, 1));
                w.should_show_the_user = show;
                w
            })
            .collect();
        let app = Application {
            pid: Pid(1),
            name: "App".into(),
            is_hidden: false,
            icon: None,
            windows: Vec::new(),
        };
        registry.replace_all(windows, vec![app]);
        registry
    }

    #[test]
    fn cycle_index_wraps_both_ways() {
        let cases = [
            ((0, 1, 3), 1),
            ((2, 1, 3), 0),
            ((0, -1, 3), 2),
            ((1, -4, 3), 0),
            ((0, 0, 3), 0),
            ((5, 7, 1), 0),
            ((0, 1, 0), 0),
        ];
        for ((cursor, step, count), expected) in cases {
            assert_eq!(cycle_index(cursor, step, count), expected, "{cursor} {step} {count}");
        }
    }

    #[test]
    fn backward_cycle_from_start_lands_on_last() {
        let r = registry(&[(1, true), (2, true), (3, true)]);
        let mut s = Selection::default();
        s.reset(&r);
        s.cycle(-1, &r);
        assert_eq!(s.cursor(), Some(2));
        assert_eq!(s.selected_window(&r).map(|w| w.id), Some(WindowId(3)));
    }

    #[test]
    fn step_counts_eligible_windows_only() {
        let r = registry(&[(1, true), (2, true), (3, false)]);
        let mut s = Selection::default();
        s.reset(&r);
        s.cycle(1, &r);
        assert_eq!(s.selected_id(), Some(WindowId(2)));
        s.cycle(1, &r);
        assert_eq!(s.selected_id(), Some(WindowId(1)));
    }

    #[test]
    fn reconcile_follows_surviving_selection() {
        let mut r = registry(&[(1, true), (2, true), (3, true)]);
        let mut s = Selection::default();
        s.reset(&r);
        s.cycle(2, &r);
        r.remove(WindowId(1));
        s.reconcile(&r);
        assert_eq!(s.cursor(), Some(1));
        assert_eq!(s.selected_id(), Some(WindowId(3)));
    }

    #[test]
    fn reconcile_clamps_when_selection_vanishes() {
        let mut r = registry(&[(1, true), (2, true), (3, true)]);
        let mut s = Selection::default();
        s.reset(&r);
        s.cycle(2, &r);
        r.remove(WindowId(3));
        s.reconcile(&r);
        assert_eq!(s.cursor(), Some(1));
        assert_eq!(s.selected_id(), Some(WindowId(2)));

        r.remove(WindowId(1));
        r.remove(WindowId(2));
        s.reconcile(&r);
        assert_eq!(s.cursor(), None);
        assert!(s.selected_window(&r).is_none());
    }

    #[test]
    fn go_idle_forgets_cursor() {
        let r = registry(&[(1, true)]);
        let mut s = Selection::default();
        s.enter_first_summon();
        s.reset(&r);
        s.activate();
        s.go_idle();
        assert_eq!(s.state(), SummonState::Idle);
        assert_eq!(s.cursor(), None);
    }

    proptest! {
        #[test]
        fn cursor_follows_modular_arithmetic(
            count in 1usize..12,
            steps in proptest::collection::vec(-30isize..30, 1..20),
        ) {
            let flags: Vec<(u32, bool)> = (1..=count as u32).map(|id| (id, true)).collect();
            let r = registry(&flags);
            let mut s = Selection::default();
            s.reset(&r);
            for step in steps {
                let before = s.cursor().unwrap_or(0) as isize;
                s.cycle(step, &r);
                let n = count as isize;
                let expected = (((before + step) % n) + n) % n;
                prop_assert_eq!(s.cursor(), Some(expected as usize));
            }
        }
    }
}
