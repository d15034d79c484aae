use super::{Pid, Rect, SpaceId, WindowId};
use crate::platform::{AppInfo, WindowInfo};
use crate::preview::Thumbnail;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub pid: Pid,
    pub title: String,
    /// `None` when the OS refused to report geometry; such windows are never shown.
    pub frame: Option<Rect>,
    pub level: i32,
    pub is_minimized: bool,
    pub is_hidden: bool,
    pub space_id: Option<SpaceId>,
    pub space_index: Option<usize>,
    pub is_on_all_spaces: bool,
    pub should_show_the_user: bool,
    pub thumbnail: Option<Thumbnail>,
}

impl Window {
    pub fn from_info(info: WindowInfo) -> Self {
        Self {
            id: info.id,
            pid: info.pid,
            title: info.title.unwrap_or_default(),
            frame: info.frame,
            level: info.level,
            is_minimized: info.is_minimized,
            is_hidden: false,
            space_id: None,
            space_index: None,
            is_on_all_spaces: false,
            should_show_the_user: false,
            thumbnail: None,
        }
    }

    /// Copy fresh OS attributes, keeping what only the core knows
    /// (space membership, eligibility, cached thumbnail).
    pub fn update_from(&mut self, info: &WindowInfo) {
        if let Some(title) = &info.title {
            self.title.clone_from(title);
        }
        self.frame = info.frame;
        self.level = info.level;
        self.is_minimized = info.is_minimized;
    }

    pub fn display_title<'a>(&'a self, app: Option<&'a Application>) -> &'a str {
        if self.title.is_empty() {
            app.map(|a| a.name.as_str()).unwrap_or_default()
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone)]
pub struct Application {
    pub pid: Pid,
    pub name: String,
    pub is_hidden: bool,
    pub icon: Option<Thumbnail>,
    /// Back-references only; the registry owns the windows.
    pub windows: Vec<WindowId>,
}

impl Application {
    pub fn from_info(info: AppInfo) -> Self {
        Self {
            pid: info.pid,
            name: info.name,
            is_hidden: info.is_hidden,
            icon: info.icon,
            windows: Vec::new(),
        }
    }

    fn named(pid: Pid, name: &str) -> Self {
        Self {
            pid,
            name: name.to_string(),
            is_hidden: false,
            icon: None,
            windows: Vec::new(),
        }
    }
}

/// Every known window in picker order (most recently used first), plus the
/// applications owning them.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: Vec<Window>,
    apps: BTreeMap<Pid, Application>,
}

impl WindowRegistry {
    pub fn list(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    pub(crate) fn windows_mut(&mut self) -> impl Iterator<Item = &mut Window> {
        self.windows.iter_mut()
    }

    pub fn position(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == id)
    }

    pub fn app(&self, pid: Pid) -> Option<&Application> {
        self.apps.get(&pid)
    }

    pub fn app_of(&self, window: &Window) -> Option<&Application> {
        self.apps.get(&window.pid)
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(|w| w.id).collect()
    }

    pub fn eligible(&self) -> impl Iterator<Item = &Window> {
        self.windows.iter().filter(|w| w.should_show_the_user)
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible().count()
    }

    pub fn eligible_at(&self, index: usize) -> Option<&Window> {
        self.eligible().nth(index)
    }

    pub fn eligible_index_of(&self, id: WindowId) -> Option<usize> {
        self.eligible().position(|w| w.id == id)
    }

    pub fn eligible_ids(&self) -> Vec<WindowId> {
        self.eligible().map(|w| w.id).collect()
    }

    /// Replace everything, keeping cached thumbnails of windows that survived.
    pub(crate) fn replace_all(&mut self, windows: Vec<Window>, apps: Vec<Application>) {
        let mut previous: BTreeMap<WindowId, Window> =
            self.windows.drain(..).map(|w| (w.id, w)).collect();
        self.apps = apps
            .into_iter()
            .map(|mut a| {
                a.windows.clear();
                (a.pid, a)
            })
            .collect();
        for mut window in windows {
            if let Some(old) = previous.remove(&window.id) {
                window.thumbnail = old.thumbnail;
                window.should_show_the_user = old.should_show_the_user;
            }
            self.link(&mut window);
            self.windows.push(window);
        }
    }

    pub(crate) fn upsert_app(&mut self, info: AppInfo) {
        let (pid, hidden) = (info.pid, info.is_hidden);
        match self.apps.get_mut(&info.pid) {
            Some(app) => {
                app.name = info.name;
                app.is_hidden = info.is_hidden;
                if info.icon.is_some() {
                    app.icon = info.icon;
                }
            }
            None => {
                self.apps.insert(info.pid, Application::from_info(info));
            }
        }
        self.set_app_hidden(pid, hidden);
    }

    /// Insert at the front (new windows are the most recent). Existing ids
    /// are left where they are.
    pub(crate) fn insert_front(&mut self, mut window: Window, app_name: &str) -> bool {
        if self.position(window.id).is_some() {
            return false;
        }
        self.apps
            .entry(window.pid)
            .or_insert_with(|| Application::named(window.pid, app_name));
        self.link(&mut window);
        self.windows.insert(0, window);
        true
    }

    pub(crate) fn remove(&mut self, id: WindowId) -> Option<Window> {
        let pos = self.position(id)?;
        let window = self.windows.remove(pos);
        if let Some(app) = self.apps.get_mut(&window.pid) {
            app.windows.retain(|w| *w != id);
        }
        Some(window)
    }

    pub(crate) fn remove_app(&mut self, pid: Pid) -> Vec<Window> {
        self.apps.remove(&pid);
        let (gone, kept): (Vec<_>, Vec<_>) = self.windows.drain(..).partition(|w| w.pid == pid);
        self.windows = kept;
        gone
    }

    pub(crate) fn set_app_hidden(&mut self, pid: Pid, hidden: bool) {
        if let Some(app) = self.apps.get_mut(&pid) {
            app.is_hidden = hidden;
        }
        for w in self.windows.iter_mut().filter(|w| w.pid == pid) {
            w.is_hidden = hidden;
        }
    }

    pub(crate) fn move_to_front(&mut self, id: WindowId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let window = self.windows.remove(pos);
        self.windows.insert(0, window);
        true
    }

    /// Bring an application's windows to the front, keeping their relative order.
    pub(crate) fn move_app_to_front(&mut self, pid: Pid) -> bool {
        let (front, rest): (Vec<_>, Vec<_>) = self.windows.drain(..).partition(|w| w.pid == pid);
        let moved = !front.is_empty();
        self.windows = front;
        self.windows.extend(rest);
        moved
    }

    /// Stable sort by position in `order`; ids missing from it go last.
    pub(crate) fn sort_by_order(&mut self, order: &[WindowId]) {
        let rank = |id: WindowId| order.iter().position(|o| *o == id).unwrap_or(usize::MAX);
        self.windows.sort_by_key(|w| rank(w.id));
    }

    /// Hidden is an application attribute mirrored on each of its windows.
    fn link(&mut self, window: &mut Window) {
        if let Some(app) = self.apps.get_mut(&window.pid) {
            if !app.windows.contains(&window.id) {
                app.windows.push(window.id);
            }
            window.is_hidden = app.is_hidden;
        }
    }
}
