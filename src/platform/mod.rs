#[cfg(target_os = "macos")]
pub(crate) mod cg_helpers;
#[cfg(test)]
pub(crate) mod fake;

use crate::error::Result;
use crate::model::{Pid, Point, Rect, Size, SpaceId, WindowId};
use crate::monitor::Screen;
use crate::preview::Thumbnail;
use std::collections::HashMap;

/// One entry of the window server's window list. Attributes the OS refused
/// to report are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub pid: Pid,
    pub app_name: String,
    pub title: Option<String>,
    pub frame: Option<Rect>,
    pub level: i32,
    pub is_minimized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
    pub id: SpaceId,
    pub display: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppInfo {
    pub pid: Pid,
    pub name: String,
    pub is_hidden: bool,
    pub is_frontmost: bool,
    pub icon: Option<Thumbnail>,
}

/// Everything the core needs from the OS. Implementations are best-effort:
/// races with exiting processes and missing permissions surface as
/// transient errors which the caller swallows.
pub trait WindowServer {
    fn list_windows(&self) -> Result<Vec<WindowInfo>>;
    fn list_applications(&self) -> Result<Vec<AppInfo>>;
    /// All spaces, in Mission Control order.
    fn list_spaces(&self) -> Result<Vec<SpaceInfo>>;
    fn current_space_id(&self) -> Option<SpaceId>;
    /// Spaces each window belongs to. A window on every space lists all of them.
    fn window_spaces(&self, windows: &[WindowId]) -> Result<HashMap<WindowId, Vec<SpaceId>>>;
    /// On-screen windows, front to back.
    fn stacking_order(&self) -> Result<Vec<WindowId>>;
    fn screens(&self) -> Vec<Screen>;
    fn cursor_position(&self) -> Option<Point>;
    fn focused_window(&self) -> Option<WindowId>;
    fn request_focus(&self, window: WindowId, pid: Pid) -> Result<()>;
    fn capture_thumbnail(&self, window: WindowId, max: Size) -> Result<Thumbnail>;

    /// Whether an exclusive OS switcher (Mission Control, Exposé) owns the screen.
    fn is_mission_control_active(&self) -> bool {
        false
    }
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
compile_error!("spaces-alt-tab: unsupported target OS; add src/platform/<os>.rs and wire it in src/platform/mod.rs");

#[cfg(target_os = "linux")]
pub(crate) fn create() -> Result<impl WindowServer> {
    linux::X11Server::connect()
}

#[cfg(target_os = "macos")]
pub(crate) fn create() -> Result<impl WindowServer> {
    Ok(macos::MacServer::new(Pid(std::process::id() as i32)))
}
