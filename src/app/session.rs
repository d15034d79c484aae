//! Per-process picker session: the activity flags every summon begins and
//! every hide ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Cooperative cancellation for an in-flight UI pass. Cloned into the input
/// listener so a hide can land before the coordination thread sees it.
#[derive(Debug, Clone, Default)]
pub struct UiWork(Arc<AtomicBool>);

impl UiWork {
    pub fn allow(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn should_continue(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Session {
    pub(crate) ui_work: UiWork,
    app_is_being_used: bool,
    is_first_summon: bool,
    /// Bumped on every hide so continuations scheduled by an earlier summon
    /// recognise themselves as stale.
    generation: u64,
}

impl Session {
    pub fn new(ui_work: UiWork) -> Self {
        Self {
            ui_work,
            app_is_being_used: false,
            is_first_summon: true,
            generation: 0,
        }
    }

    pub fn begin_show(&mut self) {
        self.app_is_being_used = true;
        self.ui_work.allow();
    }

    pub fn end_hide(&mut self) {
        self.ui_work.cancel();
        self.app_is_being_used = false;
        self.is_first_summon = true;
        self.generation += 1;
        trace!(target: "alt_tab::session", generation = self.generation, "session ended");
    }

    /// True exactly once per summon.
    pub fn take_first_summon(&mut self) -> bool {
        std::mem::replace(&mut self.is_first_summon, false)
    }

    pub fn app_is_being_used(&self) -> bool {
        self.app_is_being_used
    }

    pub fn is_first_summon(&self) -> bool {
        self.is_first_summon
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ui_work_should_be_done(&self) -> bool {
        self.ui_work.should_continue()
    }
}
