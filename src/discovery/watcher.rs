//! Polling event source. Diffs successive window-server snapshots into the
//! same typed notifications the OS would push, so the coordination thread
//! only ever sees `OsEvent`s.

use super::OsEvent;
use crate::model::{Pid, SpaceId, WindowId};
use crate::platform::{AppInfo, WindowInfo, WindowServer};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

#[derive(Default)]
pub(crate) struct WindowWatcher {
    windows: BTreeMap<WindowId, WindowInfo>,
    apps: BTreeMap<Pid, bool>,
    frontmost: Option<Pid>,
    focused: Option<WindowId>,
    spaces: Vec<SpaceId>,
    current_space: Option<SpaceId>,
    memberships: HashMap<WindowId, Vec<SpaceId>>,
}

impl WindowWatcher {
    /// Record the current state without reporting it.
    pub(crate) fn prime<S: WindowServer + ?Sized>(&mut self, server: &S) {
        let _ = self.poll(server);
    }

    /// Events since the last poll, ordered so that launches precede the
    /// windows they own and terminations follow them. A refused window list
    /// yields nothing rather than a burst of destroys.
    pub(crate) fn poll<S: WindowServer + ?Sized>(&mut self, server: &S) -> Vec<OsEvent> {
        let infos = match server.list_windows() {
            Ok(infos) => infos,
            Err(error) => {
                trace!(target: "alt_tab::watcher", %error, "window list unavailable");
                return Vec::new();
            }
        };
        let apps = server.list_applications().ok();
        let mut events = Vec::new();

        let launched = self.diff_launches(apps.as_deref(), &mut events);
        let terminated: HashSet<Pid> = match &apps {
            Some(apps) => {
                let alive: HashSet<Pid> = apps.iter().map(|a| a.pid).collect();
                self.apps.keys().filter(|p| !alive.contains(p)).copied().collect()
            }
            None => HashSet::new(),
        };
        self.diff_windows(infos, &launched, &terminated, &mut events);
        events.extend(terminated.iter().map(|pid| OsEvent::ApplicationTerminated(*pid)));
        if let Some(apps) = &apps {
            self.diff_app_state(apps, &mut events);
        }

        let focused = server.focused_window();
        let activated = events
            .iter()
            .any(|e| matches!(e, OsEvent::ApplicationActivated(_)));
        if focused != self.focused {
            if let (Some(id), false) = (focused, activated) {
                events.push(OsEvent::WindowFocused(id));
            }
            self.focused = focused;
        }

        if self.diff_spaces(server) {
            events.push(OsEvent::SpaceChanged);
        }

        if !events.is_empty() {
            debug!(target: "alt_tab::watcher", count = events.len(), "changes observed");
        }
        events
    }

    fn diff_launches(&mut self, apps: Option<&[AppInfo]>, events: &mut Vec<OsEvent>) -> HashSet<Pid> {
        let mut launched = HashSet::new();
        for app in apps.unwrap_or_default() {
            if !self.apps.contains_key(&app.pid) {
                launched.insert(app.pid);
                events.push(OsEvent::ApplicationLaunched(app.clone()));
            }
        }
        launched
    }

    fn diff_windows(
        &mut self,
        infos: Vec<WindowInfo>,
        launched: &HashSet<Pid>,
        terminated: &HashSet<Pid>,
        events: &mut Vec<OsEvent>,
    ) {
        let mut next = BTreeMap::new();
        for info in infos {
            match self.windows.get(&info.id) {
                None if !launched.contains(&info.pid) => {
                    events.push(OsEvent::WindowCreated(info.clone()));
                }
                None => {}
                Some(old) => attribute_changes(old, &info, events),
            }
            next.insert(info.id, info);
        }
        for (id, old) in &self.windows {
            if !next.contains_key(id) && !terminated.contains(&old.pid) {
                events.push(OsEvent::WindowDestroyed(*id));
            }
        }
        self.windows = next;
    }

    fn diff_app_state(&mut self, apps: &[AppInfo], events: &mut Vec<OsEvent>) {
        let mut next = BTreeMap::new();
        let mut frontmost = None;
        for app in apps {
            if let Some(&was_hidden) = self.apps.get(&app.pid) {
                match (was_hidden, app.is_hidden) {
                    (false, true) => events.push(OsEvent::ApplicationHidden(app.pid)),
                    (true, false) => events.push(OsEvent::ApplicationShown(app.pid)),
                    _ => {}
                }
            }
            if app.is_frontmost {
                frontmost = Some(app.pid);
            }
            next.insert(app.pid, app.is_hidden);
        }
        if frontmost != self.frontmost {
            if let Some(pid) = frontmost {
                events.push(OsEvent::ApplicationActivated(pid));
            }
            self.frontmost = frontmost;
        }
        self.apps = next;
    }

    /// The OS does not reliably announce space switches or windows moving
    /// between spaces, so both are compared by value.
    fn diff_spaces<S: WindowServer + ?Sized>(&mut self, server: &S) -> bool {
        let mut changed = false;

        let current = server.current_space_id();
        if current != self.current_space {
            self.current_space = current;
            changed = true;
        }
        if let Ok(spaces) = server.list_spaces() {
            let ids: Vec<SpaceId> = spaces.into_iter().map(|s| s.id).collect();
            if ids != self.spaces {
                self.spaces = ids;
                changed = true;
            }
        }
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        if let Ok(memberships) = server.window_spaces(&ids) {
            // New windows carry their spaces in `WindowCreated`.
            let moved = memberships
                .iter()
                .any(|(id, spaces)| self.memberships.get(id).is_some_and(|old| old != spaces));
            self.memberships = memberships;
            changed |= moved;
        }
        changed
    }
}

fn attribute_changes(old: &WindowInfo, new: &WindowInfo, events: &mut Vec<OsEvent>) {
    let id = new.id;
    if old.is_minimized != new.is_minimized {
        events.push(if new.is_minimized {
            OsEvent::WindowMiniaturized(id)
        } else {
            OsEvent::WindowDeminiaturized(id)
        });
    }
    // a title the OS stopped reporting keeps the last known one
    if let Some(title) = new.title.as_ref().filter(|t| old.title.as_ref() != Some(*t)) {
        events.push(OsEvent::WindowTitleChanged {
            window: id,
            title: title.clone(),
        });
    }
    if old.frame != new.frame {
        if let Some(frame) = new.frame {
            events.push(OsEvent::WindowMoved { window: id, frame });
        }
    }
}
