//! Scripted window server for tests.

use super::{AppInfo, SpaceInfo, WindowInfo, WindowServer};
use crate::error::{Error, Result};
use crate::model::{Pid, Point, Rect, Size, SpaceId, WindowId};
use crate::monitor::Screen;
use crate::preview::Thumbnail;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct State {
    windows: Vec<WindowInfo>,
    hidden_apps: HashSet<Pid>,
    frontmost: Option<Pid>,
    spaces: Vec<SpaceId>,
    current_space: Option<SpaceId>,
    window_spaces: HashMap<WindowId, Vec<SpaceId>>,
    screens: Vec<Screen>,
    cursor: Option<Point>,
    focused: Option<WindowId>,
    mission_control: bool,
    fail_windows: bool,
    fail_spaces: bool,
    fail_thumbnails: HashSet<WindowId>,
    thumbnail_shade: u8,
    focus_log: Vec<WindowId>,
    capture_log: Vec<WindowId>,
}

pub(crate) struct FakeServer {
    state: RefCell<State>,
}

pub(crate) fn main_screen() -> Screen {
    Screen {
        id: 1,
        frame: Rect::from_xywh(0.0, 0.0, 1920.0, 1080.0),
        is_main: true,
    }
}

impl FakeServer {
    pub(crate) fn new() -> Self {
        let state = State {
            screens: vec![main_screen()],
            ..State::default()
        };
        Self {
            state: RefCell::new(state),
        }
    }

    pub(crate) fn with_spaces(self, ids: &[u64], current: u64) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.spaces = ids.iter().copied().map(SpaceId).collect();
            state.current_space = Some(SpaceId(current));
        }
        self
    }

    /// Adds a titled, on-screen window owned by `App {pid}` on `space`.
    pub(crate) fn with_window(self, id: u32, pid: i32, space: u64) -> Self {
        self.add_window(id, pid, space);
        self
    }

    pub(crate) fn with_screen(self, screen: Screen) -> Self {
        self.state.borrow_mut().screens.push(screen);
        self
    }

    pub(crate) fn add_window(&self, id: u32, pid: i32, space: u64) {
        let info = WindowInfo {
            id: WindowId(id),
            pid: Pid(pid),
            app_name: format!("App {pid}"),
            title: Some(format!("Window {id}")),
            frame: Some(Rect::from_xywh(100.0, 100.0, 800.0, 600.0)),
            level: 0,
            is_minimized: false,
        };
        let mut state = self.state.borrow_mut();
        state.windows.push(info);
        state.window_spaces.insert(WindowId(id), vec![SpaceId(space)]);
    }

    pub(crate) fn window_info(&self, id: u32) -> Option<WindowInfo> {
        self.state
            .borrow()
            .windows
            .iter()
            .find(|w| w.id == WindowId(id))
            .cloned()
    }

    pub(crate) fn update_window(&self, id: u32, f: impl FnOnce(&mut WindowInfo)) {
        let mut state = self.state.borrow_mut();
        if let Some(w) = state.windows.iter_mut().find(|w| w.id == WindowId(id)) {
            f(w);
        }
    }

    pub(crate) fn remove_window(&self, id: u32) {
        let mut state = self.state.borrow_mut();
        state.windows.retain(|w| w.id != WindowId(id));
        state.window_spaces.remove(&WindowId(id));
    }

    pub(crate) fn remove_app(&self, pid: i32) {
        let mut state = self.state.borrow_mut();
        let gone: Vec<WindowId> = state
            .windows
            .iter()
            .filter(|w| w.pid == Pid(pid))
            .map(|w| w.id)
            .collect();
        state.windows.retain(|w| w.pid != Pid(pid));
        for id in gone {
            state.window_spaces.remove(&id);
        }
    }

    pub(crate) fn move_window_to_spaces(&self, id: u32, spaces: &[u64]) {
        self.state
            .borrow_mut()
            .window_spaces
            .insert(WindowId(id), spaces.iter().copied().map(SpaceId).collect());
    }

    pub(crate) fn set_current_space(&self, id: u64) {
        self.state.borrow_mut().current_space = Some(SpaceId(id));
    }

    pub(crate) fn set_hidden(&self, pid: i32, hidden: bool) {
        let mut state = self.state.borrow_mut();
        if hidden {
            state.hidden_apps.insert(Pid(pid));
        } else {
            state.hidden_apps.remove(&Pid(pid));
        }
    }

    pub(crate) fn set_frontmost(&self, pid: i32) {
        self.state.borrow_mut().frontmost = Some(Pid(pid));
    }

    pub(crate) fn set_focused(&self, id: u32) {
        self.state.borrow_mut().focused = Some(WindowId(id));
    }

    pub(crate) fn set_cursor(&self, p: Point) {
        self.state.borrow_mut().cursor = Some(p);
    }

    pub(crate) fn set_mission_control(&self, active: bool) {
        self.state.borrow_mut().mission_control = active;
    }

    pub(crate) fn fail_windows(&self, fail: bool) {
        self.state.borrow_mut().fail_windows = fail;
    }

    pub(crate) fn fail_spaces(&self, fail: bool) {
        self.state.borrow_mut().fail_spaces = fail;
    }

    pub(crate) fn fail_thumbnail(&self, id: u32) {
        self.state.borrow_mut().fail_thumbnails.insert(WindowId(id));
    }

    /// Changes the colour every subsequent capture is filled with.
    pub(crate) fn repaint(&self, shade: u8) {
        self.state.borrow_mut().thumbnail_shade = shade;
    }

    pub(crate) fn focus_log(&self) -> Vec<WindowId> {
        self.state.borrow().focus_log.clone()
    }

    pub(crate) fn capture_log(&self) -> Vec<WindowId> {
        self.state.borrow().capture_log.clone()
    }
}

impl WindowServer for FakeServer {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let state = self.state.borrow();
        if state.fail_windows {
            return Err(Error::PermissionDenied {
                what: "accessibility",
            });
        }
        Ok(state.windows.clone())
    }

    fn list_applications(&self) -> Result<Vec<AppInfo>> {
        let state = self.state.borrow();
        let mut seen = HashSet::new();
        let mut apps = Vec::new();
        for w in &state.windows {
            if !seen.insert(w.pid) {
                continue;
            }
            apps.push(AppInfo {
                pid: w.pid,
                name: w.app_name.clone(),
                is_hidden: state.hidden_apps.contains(&w.pid),
                is_frontmost: state.frontmost == Some(w.pid),
                icon: None,
            });
        }
        Ok(apps)
    }

    fn list_spaces(&self) -> Result<Vec<SpaceInfo>> {
        let state = self.state.borrow();
        if state.fail_spaces {
            return Err(Error::unavailable("space list"));
        }
        Ok(state
            .spaces
            .iter()
            .map(|&id| SpaceInfo { id, display: None })
            .collect())
    }

    fn current_space_id(&self) -> Option<SpaceId> {
        self.state.borrow().current_space
    }

    fn window_spaces(&self, windows: &[WindowId]) -> Result<HashMap<WindowId, Vec<SpaceId>>> {
        let state = self.state.borrow();
        if state.fail_spaces {
            return Err(Error::unavailable("window spaces"));
        }
        Ok(windows
            .iter()
            .filter_map(|id| state.window_spaces.get(id).map(|s| (*id, s.clone())))
            .collect())
    }

    fn stacking_order(&self) -> Result<Vec<WindowId>> {
        let state = self.state.borrow();
        Ok(state.windows.iter().rev().map(|w| w.id).collect())
    }

    fn screens(&self) -> Vec<Screen> {
        self.state.borrow().screens.clone()
    }

    fn cursor_position(&self) -> Option<Point> {
        self.state.borrow().cursor
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.state.borrow().focused
    }

    fn request_focus(&self, window: WindowId, _pid: Pid) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.windows.iter().any(|w| w.id == window) {
            return Err(Error::WindowNotFound { window });
        }
        state.focus_log.push(window);
        state.focused = Some(window);
        Ok(())
    }

    fn capture_thumbnail(&self, window: WindowId, max: Size) -> Result<Thumbnail> {
        let mut state = self.state.borrow_mut();
        state.capture_log.push(window);
        if state.fail_thumbnails.contains(&window) {
            return Err(Error::unavailable(format!("thumbnail of window {window}")));
        }
        let shade = state.thumbnail_shade;
        let data = vec![shade; 32 * 18 * 4];
        Thumbnail::fit(&data, 32, 18, max).ok_or_else(|| Error::unavailable("thumbnail"))
    }

    fn is_mission_control_active(&self) -> bool {
        self.state.borrow().mission_control
    }
}
