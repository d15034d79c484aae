//! Coordination context. Owns the registries, the selection and the panel;
//! everything here runs on the single coordination thread.

pub(crate) mod deferred;
pub(crate) mod refresh;
mod session;
mod summon;

pub use deferred::{Deferred, DeferredQueue};
pub use refresh::RefreshOutcome;
pub use session::{Session, UiWork};

use crate::config::Preferences;
use crate::daemon::InputEvent;
use crate::discovery::{Discovery, OsEvent};
use crate::layout::ThumbnailLayout;
use crate::model::{SpaceRegistry, WindowRegistry};
use crate::monitor::{preferred_screen, Screen};
use crate::picker::PanelView;
use crate::platform::WindowServer;
use crate::selection::{Selection, SummonState};
use std::time::Instant;
use tracing::{debug, info};

/// One entry of the coordination inbox.
#[derive(Debug)]
pub enum Message {
    Input(InputEvent),
    Os(OsEvent),
}

pub struct App<S, P> {
    server: S,
    panel: P,
    prefs: Preferences,
    windows: WindowRegistry,
    spaces: SpaceRegistry,
    selection: Selection,
    session: Session,
    deferred: DeferredQueue,
    /// Screen the current summon was resolved against; fixed until hide.
    screen: Option<Screen>,
    layout: ThumbnailLayout,
}

impl<S: WindowServer, P: PanelView> App<S, P> {
    pub fn new(server: S, panel: P, prefs: Preferences, ui_work: UiWork) -> Self {
        Self {
            server,
            panel,
            prefs,
            windows: WindowRegistry::default(),
            spaces: SpaceRegistry::default(),
            selection: Selection::default(),
            session: Session::new(ui_work),
            deferred: DeferredQueue::default(),
            screen: None,
            layout: ThumbnailLayout::default(),
        }
    }

    /// Initial discovery, then a sort-by-level once the inbox has drained.
    pub fn start(&mut self, now: Instant) {
        self.discover();
        self.deferred.schedule_at(now, Deferred::SortByLevel);
    }

    pub(crate) fn discover(&mut self) {
        Discovery::new(&self.server, &mut self.windows, &mut self.spaces).initial_discovery();
    }

    pub fn handle(&mut self, message: Message, now: Instant) {
        match message {
            Message::Input(input) => self.handle_input(input, now),
            Message::Os(event) => self.handle_os_event(event),
        }
    }

    fn handle_input(&mut self, input: InputEvent, now: Instant) {
        debug!(target: "alt_tab::input", ?input, state = ?self.selection.state(), "input");
        match input {
            InputEvent::Show { step } => self.show(step, now),
            InputEvent::Cycle(step) => self.cycle_selection(step),
            InputEvent::Move(direction) => self.move_selection(direction),
            InputEvent::Hide => self.hide_ui(),
            InputEvent::Focus => self.focus_target(),
            InputEvent::Kill => {}
        }
    }

    /// Apply one OS notification, then bring an open picker up to date.
    pub fn handle_os_event(&mut self, event: OsEvent) {
        let change = Discovery::new(&self.server, &mut self.windows, &mut self.spaces).apply(event);
        if change.is_empty() || self.selection.state() == SummonState::Idle {
            return;
        }

        if change.affects_eligibility() {
            self.recompute_eligibility();
            self.selection.reconcile(&self.windows);
            if self.windows.eligible_count() == 0 {
                info!(target: "alt_tab::summon", "no eligible windows left, hiding");
                self.hide_ui();
                return;
            }
        }

        if self.selection.state() != SummonState::Active {
            return;
        }
        if change.spaces_changed {
            self.reopen_ui();
            return;
        }
        let mut touched = change.repaint;
        touched.extend(change.added);
        self.refresh_open_ui(&touched);
        self.panel.highlight(self.selection.cursor());
    }

    pub fn run_deferred(&mut self, now: Instant) {
        for task in self.deferred.pop_due(now) {
            match task {
                Deferred::SortByLevel => {
                    Discovery::new(&self.server, &mut self.windows, &mut self.spaces).sort_by_level();
                    if self.selection.state() != SummonState::Idle {
                        self.selection.reconcile(&self.windows);
                    }
                }
                Deferred::RebuildUi { generation } => self.rebuild_ui(generation),
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.next_deadline()
    }

    pub fn set_preferences(&mut self, prefs: Preferences) {
        self.prefs = prefs;
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn state(&self) -> SummonState {
        self.selection.state()
    }

    pub fn is_visible(&self) -> bool {
        self.panel.is_visible()
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn windows(&self) -> &WindowRegistry {
        &self.windows
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    fn resolve_screen(&self) -> Screen {
        preferred_screen(self.prefs.appearance.show_on_screen, &self.server, &self.windows)
    }

    fn recompute_eligibility(&mut self) {
        let screen = match &self.screen {
            Some(screen) => screen.clone(),
            None => self.resolve_screen(),
        };
        Discovery::new(&self.server, &mut self.windows, &mut self.spaces)
            .refresh_which_windows_to_show_the_user(&screen, &self.prefs.filters);
    }
}
