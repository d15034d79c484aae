//! Keeps the window and space registries in step with the window server.
//! The only code allowed to mutate either registry.

mod events;
pub(crate) mod watcher;

pub use events::{Change, OsEvent};

use crate::config::Filters;
use crate::model::eligibility::refresh_which_windows_to_show_the_user;
use crate::model::{Application, Size, SpaceId, SpaceRegistry, Window, WindowId, WindowRegistry};
use crate::monitor::Screen;
use crate::platform::{WindowInfo, WindowServer};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub struct Discovery<'a, S: ?Sized> {
    server: &'a S,
    windows: &'a mut WindowRegistry,
    spaces: &'a mut SpaceRegistry,
}

impl<'a, S: WindowServer + ?Sized> Discovery<'a, S> {
    pub fn new(server: &'a S, windows: &'a mut WindowRegistry, spaces: &'a mut SpaceRegistry) -> Self {
        Self {
            server,
            windows,
            spaces,
        }
    }

    /// Full synchronous enumeration, run once at startup. Whatever the OS
    /// refuses to report is simply absent.
    pub fn initial_discovery(&mut self) {
        self.spaces.refresh(self.server);

        let infos = match self.server.list_windows() {
            Ok(infos) => infos,
            Err(error) => {
                warn!(target: "alt_tab::discovery", %error, "window list unavailable, starting empty");
                Vec::new()
            }
        };
        let mut apps: BTreeMap<_, Application> = match self.server.list_applications() {
            Ok(apps) => apps
                .into_iter()
                .map(|a| (a.pid, Application::from_info(a)))
                .collect(),
            Err(error) => {
                debug!(target: "alt_tab::discovery", %error, "application list unavailable");
                BTreeMap::new()
            }
        };
        for info in &infos {
            apps.entry(info.pid).or_insert_with(|| Application {
                pid: info.pid,
                name: info.app_name.clone(),
                is_hidden: false,
                icon: None,
                windows: Vec::new(),
            });
        }

        let windows = infos.into_iter().map(Window::from_info).collect();
        self.windows.replace_all(windows, apps.into_values().collect());
        self.update_spaces();
        info!(
            target: "alt_tab::discovery",
            windows = self.windows.len(),
            spaces = self.spaces.spaces().len(),
            "initial discovery complete"
        );
    }

    /// Re-derive each window's space. The OS does not reliably report
    /// windows moving between spaces, so this runs on every summon.
    pub fn update_spaces(&mut self) {
        let ids = self.windows.ids();
        if ids.is_empty() {
            return;
        }
        let membership = match self.server.window_spaces(&ids) {
            Ok(map) => map,
            Err(error) => {
                debug!(target: "alt_tab::discovery", %error, "window spaces unavailable");
                return;
            }
        };
        let current = self.spaces.current_space_id();
        for window in self.windows.windows_mut() {
            let spaces = membership.get(&window.id).map(Vec::as_slice).unwrap_or_default();
            assign_space(window, spaces, current, self.spaces);
        }
    }

    pub fn refresh_which_windows_to_show_the_user(&mut self, screen: &Screen, filters: &Filters) {
        refresh_which_windows_to_show_the_user(self.windows, self.spaces, screen, filters);
    }

    /// Capture thumbnails for eligible windows only. Returns how many were
    /// refreshed; failed captures keep their previous image.
    pub fn refresh_all_thumbnails(&mut self, max: Size) -> usize {
        let targets = self.windows.eligible_ids();
        targets
            .into_iter()
            .filter(|id| self.refresh_thumbnail(*id, max).is_some())
            .count()
    }

    /// Capture one window. `Some(changed)` on success, where `changed` tells
    /// whether the pixels differ from the cached image.
    pub fn refresh_thumbnail(&mut self, id: WindowId, max: Size) -> Option<bool> {
        let thumbnail = match self.server.capture_thumbnail(id, max) {
            Ok(t) => t,
            Err(error) => {
                if error.is_transient() {
                    debug!(target: "alt_tab::discovery", window = %id, %error, "thumbnail skipped");
                } else {
                    warn!(target: "alt_tab::discovery", window = %id, %error, "thumbnail capture failed");
                }
                return None;
            }
        };
        let window = self.windows.get_mut(id)?;
        let changed = window
            .thumbnail
            .as_ref()
            .map_or(true, |old| old.content_hash() != thumbnail.content_hash());
        window.thumbnail = Some(thumbnail);
        Some(changed)
    }

    /// Order windows front-to-back as the window server stacks them.
    pub fn sort_by_level(&mut self) {
        match self.server.stacking_order() {
            Ok(order) => {
                self.windows.sort_by_order(&order);
                debug!(target: "alt_tab::discovery", windows = self.windows.len(), "sorted by level");
            }
            Err(error) => {
                debug!(target: "alt_tab::discovery", %error, "stacking order unavailable");
            }
        }
    }

    /// Localised mutation for one OS notification.
    pub fn apply(&mut self, event: OsEvent) -> Change {
        debug!(target: "alt_tab::discovery", ?event, "applying");
        match event {
            OsEvent::WindowCreated(info) => self.window_created(info),
            OsEvent::WindowDestroyed(id) => match self.windows.remove(id) {
                Some(_) => Change {
                    removed: vec![id],
                    ..Change::default()
                },
                None => Change::default(),
            },
            OsEvent::WindowMiniaturized(id) => self.set_minimized(id, true),
            OsEvent::WindowDeminiaturized(id) => self.set_minimized(id, false),
            OsEvent::WindowTitleChanged { window, title } => {
                let Some(w) = self.windows.get_mut(window) else {
                    return Change::default();
                };
                if w.title == title {
                    return Change::default();
                }
                w.title = title;
                Change::updated(window)
            }
            OsEvent::WindowMoved { window, frame } => {
                let Some(w) = self.windows.get_mut(window) else {
                    return Change::default();
                };
                let resized = w.frame.map(|f| f.size) != Some(frame.size);
                w.frame = Some(frame);
                let mut change = Change::updated(window);
                if resized {
                    change.repaint.push(window);
                }
                change
            }
            OsEvent::WindowFocused(id) => Change {
                reordered: self.windows.move_to_front(id),
                ..Change::default()
            },
            OsEvent::ApplicationLaunched(app) => self.application_launched(app),
            OsEvent::ApplicationTerminated(pid) => Change {
                removed: self.windows.remove_app(pid).into_iter().map(|w| w.id).collect(),
                ..Change::default()
            },
            OsEvent::ApplicationActivated(pid) => {
                let focused = self
                    .server
                    .focused_window()
                    .filter(|id| self.windows.get(*id).is_some_and(|w| w.pid == pid));
                let reordered = match focused {
                    Some(id) => self.windows.move_to_front(id),
                    None => self.windows.move_app_to_front(pid),
                };
                Change {
                    reordered,
                    ..Change::default()
                }
            }
            OsEvent::ApplicationHidden(pid) => self.set_hidden(pid, true),
            OsEvent::ApplicationShown(pid) => self.set_hidden(pid, false),
            OsEvent::SpaceChanged => {
                self.spaces.refresh(self.server);
                self.update_spaces();
                Change {
                    spaces_changed: true,
                    ..Change::default()
                }
            }
        }
    }

    fn window_created(&mut self, info: WindowInfo) -> Change {
        let id = info.id;
        if let Some(existing) = self.windows.get_mut(id) {
            existing.update_from(&info);
            return Change::updated(id);
        }
        let app_name = info.app_name.clone();
        let mut window = Window::from_info(info);
        if let Ok(membership) = self.server.window_spaces(&[id]) {
            let spaces = membership.get(&id).map(Vec::as_slice).unwrap_or_default();
            assign_space(&mut window, spaces, self.spaces.current_space_id(), self.spaces);
        }
        self.windows.insert_front(window, &app_name);
        Change {
            added: vec![id],
            ..Change::default()
        }
    }

    fn application_launched(&mut self, app: crate::platform::AppInfo) -> Change {
        let pid = app.pid;
        self.windows.upsert_app(app);
        let infos = match self.server.list_windows() {
            Ok(infos) => infos,
            Err(error) => {
                debug!(target: "alt_tab::discovery", %pid, %error, "windows of launched app unavailable");
                return Change::default();
            }
        };
        let mut change = Change::default();
        for info in infos.into_iter().filter(|i| i.pid == pid) {
            let created = self.window_created(info);
            change.added.extend(created.added);
            change.updated.extend(created.updated);
        }
        change
    }

    fn set_minimized(&mut self, id: WindowId, minimized: bool) -> Change {
        match self.windows.get_mut(id) {
            Some(w) if w.is_minimized != minimized => {
                w.is_minimized = minimized;
                Change::updated(id)
            }
            _ => Change::default(),
        }
    }

    fn set_hidden(&mut self, pid: crate::model::Pid, hidden: bool) -> Change {
        self.windows.set_app_hidden(pid, hidden);
        Change {
            updated: self
                .windows
                .list()
                .iter()
                .filter(|w| w.pid == pid)
                .map(|w| w.id)
                .collect(),
            ..Change::default()
        }
    }
}

/// A window on several spaces is shown as being on the current one when it
/// is among them.
fn assign_space(
    window: &mut Window,
    spaces: &[SpaceId],
    current: Option<SpaceId>,
    registry: &SpaceRegistry,
) {
    window.is_on_all_spaces = spaces.len() > 1;
    window.space_id = current
        .filter(|c| spaces.contains(c))
        .or_else(|| spaces.first().copied());
    window.space_index = window.space_id.and_then(|id| registry.index_of(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Filters, SpacesToShow};
    use crate::model::{size, Pid, Rect};
    use crate::platform::fake::{main_screen, FakeServer};
    use crate::platform::AppInfo;
    use pretty_assertions::assert_eq;

    fn thumb_size() -> Size {
        size(204.0, 114.0)
    }

    fn server() -> FakeServer {
        FakeServer::new()
            .with_spaces(&[1, 2], 1)
            .with_window(1, 10, 1)
            .with_window(2, 10, 1)
            .with_window(3, 20, 2)
    }

    struct Fixture {
        windows: WindowRegistry,
        spaces: SpaceRegistry,
    }

    impl Fixture {
        fn discovered(server: &FakeServer) -> Self {
            let mut f = Self {
                windows: WindowRegistry::default(),
                spaces: SpaceRegistry::default(),
            };
            f.discovery(server).initial_discovery();
            f
        }

        fn discovery<'a>(&'a mut self, server: &'a FakeServer) -> Discovery<'a, FakeServer> {
            Discovery::new(server, &mut self.windows, &mut self.spaces)
        }
    }

    #[test]
    fn initial_discovery_builds_registry_with_spaces() {
        let server = server();
        let f = Fixture::discovered(&server);

        assert_eq!(f.windows.ids(), vec![WindowId(1), WindowId(2), WindowId(3)]);
        assert_eq!(f.windows.get(WindowId(3)).unwrap().space_index, Some(2));
        assert_eq!(f.windows.app(Pid(10)).unwrap().windows, vec![WindowId(1), WindowId(2)]);
        assert_eq!(f.spaces.current_space_id(), Some(SpaceId(1)));
    }

    #[test]
    fn initial_discovery_survives_refused_window_list() {
        let server = server();
        server.fail_windows(true);
        let f = Fixture::discovered(&server);
        assert!(f.windows.is_empty());
    }

    #[test]
    fn update_spaces_follows_moved_windows() {
        let server = server();
        let mut f = Fixture::discovered(&server);

        server.move_window_to_spaces(1, &[2]);
        server.move_window_to_spaces(2, &[1, 2]);
        f.discovery(&server).update_spaces();

        let w1 = f.windows.get(WindowId(1)).unwrap();
        assert_eq!(w1.space_id, Some(SpaceId(2)));
        let w2 = f.windows.get(WindowId(2)).unwrap();
        assert!(w2.is_on_all_spaces);
        assert_eq!(w2.space_id, Some(SpaceId(1)));
    }

    #[test]
    fn eligibility_scenario_from_two_spaces() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        let filters = Filters {
            spaces_to_show: SpacesToShow::Current,
            ..Filters::default()
        };
        f.discovery(&server)
            .refresh_which_windows_to_show_the_user(&main_screen(), &filters);
        assert_eq!(f.windows.eligible_ids(), vec![WindowId(1), WindowId(2)]);
    }

    #[test]
    fn thumbnails_only_for_eligible_windows() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        f.windows.get_mut(WindowId(1)).unwrap().should_show_the_user = true;
        f.windows.get_mut(WindowId(3)).unwrap().should_show_the_user = true;
        server.fail_thumbnail(3);

        let refreshed = f.discovery(&server).refresh_all_thumbnails(thumb_size());

        assert_eq!(refreshed, 1);
        assert_eq!(server.capture_log(), vec![WindowId(1), WindowId(3)]);
        assert!(f.windows.get(WindowId(1)).unwrap().thumbnail.is_some());
        assert!(f.windows.get(WindowId(2)).unwrap().thumbnail.is_none());
        assert!(f.windows.get(WindowId(3)).unwrap().thumbnail.is_none());
    }

    #[test]
    fn refresh_thumbnail_reports_content_change() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        let mut d = f.discovery(&server);

        assert_eq!(d.refresh_thumbnail(WindowId(2), thumb_size()), Some(true));
        assert_eq!(d.refresh_thumbnail(WindowId(2), thumb_size()), Some(false));
        server.repaint(200);
        assert_eq!(d.refresh_thumbnail(WindowId(2), thumb_size()), Some(true));
    }

    #[test]
    fn sort_by_level_uses_stacking_order() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        f.discovery(&server).sort_by_level();
        assert_eq!(f.windows.ids(), vec![WindowId(3), WindowId(2), WindowId(1)]);
    }

    #[test]
    fn created_window_goes_to_front_with_its_space() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        server.add_window(9, 30, 2);
        let info = server.window_info(9).unwrap();

        let change = f.discovery(&server).apply(OsEvent::WindowCreated(info.clone()));

        assert_eq!(change.added, vec![WindowId(9)]);
        assert_eq!(f.windows.ids()[0], WindowId(9));
        assert_eq!(f.windows.get(WindowId(9)).unwrap().space_index, Some(2));
        assert_eq!(f.windows.app(Pid(30)).unwrap().name, "App 30");

        let again = f.discovery(&server).apply(OsEvent::WindowCreated(info));
        assert_eq!(again.updated, vec![WindowId(9)]);
        assert_eq!(f.windows.len(), 4);
    }

    #[test]
    fn destroyed_and_terminated_remove_entries() {
        let server = server();
        let mut f = Fixture::discovered(&server);

        let change = f.discovery(&server).apply(OsEvent::WindowDestroyed(WindowId(2)));
        assert_eq!(change.removed, vec![WindowId(2)]);
        let none = f.discovery(&server).apply(OsEvent::WindowDestroyed(WindowId(2)));
        assert!(none.is_empty());

        let change = f.discovery(&server).apply(OsEvent::ApplicationTerminated(Pid(10)));
        assert_eq!(change.removed, vec![WindowId(1)]);
        assert_eq!(f.windows.ids(), vec![WindowId(3)]);
    }

    #[test]
    fn launched_app_brings_its_windows() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        server.add_window(7, 40, 1);
        server.add_window(8, 40, 1);

        let change = f.discovery(&server).apply(OsEvent::ApplicationLaunched(AppInfo {
            pid: Pid(40),
            name: "Terminal".into(),
            is_hidden: false,
            is_frontmost: true,
            icon: None,
        }));

        assert_eq!(change.added, vec![WindowId(7), WindowId(8)]);
        assert_eq!(f.windows.app(Pid(40)).unwrap().name, "Terminal");
    }

    #[test]
    fn activation_moves_focused_window_first() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        server.set_focused(2);

        let change = f.discovery(&server).apply(OsEvent::ApplicationActivated(Pid(10)));

        assert!(change.reordered);
        assert_eq!(f.windows.ids(), vec![WindowId(2), WindowId(1), WindowId(3)]);
    }

    #[test]
    fn attribute_events_update_in_place() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        let mut d = f.discovery(&server);

        assert_eq!(d.apply(OsEvent::WindowMiniaturized(WindowId(1))), Change::updated(WindowId(1)));
        assert!(d.apply(OsEvent::WindowMiniaturized(WindowId(1))).is_empty());
        let renamed = d.apply(OsEvent::WindowTitleChanged {
            window: WindowId(3),
            title: "Inbox".into(),
        });
        assert_eq!(renamed.updated, vec![WindowId(3)]);
        let moved = d.apply(OsEvent::WindowMoved {
            window: WindowId(3),
            frame: Rect::from_xywh(0.0, 0.0, 300.0, 300.0),
        });
        assert_eq!(moved.repaint, vec![WindowId(3)]);

        assert!(f.windows.get(WindowId(1)).unwrap().is_minimized);
        assert_eq!(f.windows.get(WindowId(3)).unwrap().title, "Inbox");
    }

    #[test]
    fn hiding_an_app_marks_its_windows() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        let change = f.discovery(&server).apply(OsEvent::ApplicationHidden(Pid(10)));
        assert_eq!(change.updated, vec![WindowId(1), WindowId(2)]);
        assert!(f.windows.get(WindowId(1)).unwrap().is_hidden);
    }

    #[test]
    fn space_change_refreshes_membership() {
        let server = server();
        let mut f = Fixture::discovered(&server);
        server.set_current_space(2);

        let change = f.discovery(&server).apply(OsEvent::SpaceChanged);

        assert!(change.spaces_changed);
        assert_eq!(f.spaces.current_space_id(), Some(SpaceId(2)));
    }
}
