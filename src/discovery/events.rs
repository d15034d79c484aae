use crate::model::{Pid, Rect, WindowId};
use crate::platform::{AppInfo, WindowInfo};

/// Something the OS told us (or the watcher inferred) about windows,
/// applications or spaces. Drained on the coordination thread only.
#[derive(Debug, Clone)]
pub enum OsEvent {
    WindowCreated(WindowInfo),
    WindowDestroyed(WindowId),
    WindowMiniaturized(WindowId),
    WindowDeminiaturized(WindowId),
    WindowTitleChanged { window: WindowId, title: String },
    WindowMoved { window: WindowId, frame: Rect },
    WindowFocused(WindowId),
    ApplicationLaunched(AppInfo),
    ApplicationTerminated(Pid),
    ApplicationActivated(Pid),
    ApplicationHidden(Pid),
    ApplicationShown(Pid),
    SpaceChanged,
}

/// What one registry mutation did, so the coordinator can decide how much
/// of the open picker to redo.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Change {
    pub added: Vec<WindowId>,
    pub removed: Vec<WindowId>,
    /// Attributes changed in a way that affects eligibility or layout.
    pub updated: Vec<WindowId>,
    /// Content probably changed; worth a new thumbnail.
    pub repaint: Vec<WindowId>,
    pub reordered: bool,
    pub spaces_changed: bool,
}

impl Change {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.repaint.is_empty()
            && !self.reordered
            && !self.spaces_changed
    }

    /// Whether the eligible subsequence may now be different.
    pub fn affects_eligibility(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || !self.updated.is_empty()
            || self.reordered
            || self.spaces_changed
    }

    pub(crate) fn updated(id: WindowId) -> Self {
        Self {
            updated: vec![id],
            ..Self::default()
        }
    }
}
