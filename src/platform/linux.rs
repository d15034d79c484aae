//! X11 backend. EWMH desktops stand in for spaces; the window manager's
//! client lists give windows and stacking order.

use super::{AppInfo, SpaceInfo, WindowInfo, WindowServer};
use crate::error::{Error, Result};
use crate::model::{point, Pid, Point, Rect, Size, SpaceId, WindowId};
use crate::monitor::Screen;
use crate::preview::Thumbnail;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageEvent, ConnectionExt as _, EventMask, ImageFormat, Window,
};
use x11rb::rust_connection::RustConnection;

/// `_NET_WM_DESKTOP` value of sticky windows.
const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;
/// `_NET_ACTIVE_WINDOW` source indication for pagers and switchers.
const SOURCE_PAGER: u32 = 2;

x11rb::atom_manager! {
    Atoms: AtomsCookie {
        _NET_CLIENT_LIST,
        _NET_CLIENT_LIST_STACKING,
        _NET_WM_NAME,
        _NET_WM_PID,
        _NET_WM_DESKTOP,
        _NET_CURRENT_DESKTOP,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_ACTIVE_WINDOW,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_NORMAL,
        _NET_WM_STATE,
        _NET_WM_STATE_HIDDEN,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChannelOrder {
    red: usize,
    green: usize,
    blue: usize,
}

impl Default for ChannelOrder {
    fn default() -> Self {
        Self {
            red: 2,
            green: 1,
            blue: 0,
        }
    }
}

fn connection_error(error: impl Display) -> Error {
    Error::Connection {
        message: error.to_string(),
    }
}

pub(crate) struct X11Server {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
    atoms: Atoms,
    channel_order: ChannelOrder,
}

impl X11Server {
    pub(crate) fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(connection_error)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|s| s.root)
            .ok_or_else(|| connection_error(format!("no screen {screen_num}")))?;
        let atoms = Atoms::new(&conn)
            .map_err(connection_error)?
            .reply()
            .map_err(connection_error)?;
        let channel_order = detect_channel_order(&conn, screen_num);
        debug!(target: "alt_tab::platform", screen_num, ?channel_order, "connected to X server");
        Ok(Self {
            conn,
            screen_num,
            root,
            atoms,
            channel_order,
        })
    }

    fn property32(&self, window: Window, property: u32, ty: impl Into<u32>) -> Option<Vec<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, ty, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        let values: Vec<u32> = reply.value32()?.collect();
        Some(values)
    }

    fn property_bytes(&self, window: Window, property: impl Into<u32>) -> Option<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        Some(reply.value)
    }

    fn root_u32(&self, property: u32, ty: AtomEnum) -> Option<u32> {
        self.property32(self.root, property, ty)?.first().copied()
    }

    fn client_list(&self) -> Result<Vec<Window>> {
        self.property32(self.root, self.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW)
            .ok_or_else(|| Error::unavailable("_NET_CLIENT_LIST"))
    }

    fn is_normal(&self, window: Window) -> bool {
        match self.property32(window, self.atoms._NET_WM_WINDOW_TYPE, AtomEnum::ATOM) {
            Some(types) if !types.is_empty() => types.contains(&self.atoms._NET_WM_WINDOW_TYPE_NORMAL),
            _ => true,
        }
    }

    fn title(&self, window: Window) -> Option<String> {
        [u32::from(self.atoms._NET_WM_NAME), u32::from(AtomEnum::WM_NAME)]
            .into_iter()
            .filter_map(|atom| self.property_bytes(window, atom))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .find(|title| !title.is_empty())
    }

    fn frame(&self, window: Window) -> Option<Rect> {
        let geometry = self.conn.get_geometry(window).ok()?.reply().ok()?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .ok()?
            .reply()
            .ok()?;
        Some(Rect::from_xywh(
            f64::from(origin.dst_x),
            f64::from(origin.dst_y),
            f64::from(geometry.width),
            f64::from(geometry.height),
        ))
    }

    /// Windows without `_NET_WM_PID` become their own application.
    fn pid(&self, window: Window) -> Pid {
        self.property32(window, self.atoms._NET_WM_PID, AtomEnum::CARDINAL)
            .and_then(|v| v.first().copied())
            .map_or(Pid(-((window & 0x7fff_ffff) as i32)), |pid| Pid(pid as i32))
    }

    fn window_info(&self, window: Window) -> WindowInfo {
        let app_name = self
            .property_bytes(window, AtomEnum::WM_CLASS)
            .and_then(|raw| wm_class_name(&raw))
            .unwrap_or_default();
        let is_minimized = self
            .property32(window, self.atoms._NET_WM_STATE, AtomEnum::ATOM)
            .is_some_and(|states| states.contains(&self.atoms._NET_WM_STATE_HIDDEN));
        WindowInfo {
            id: WindowId(window),
            pid: self.pid(window),
            app_name,
            title: self.title(window),
            frame: self.frame(window),
            level: 0,
            is_minimized,
        }
    }

    fn desktop_count(&self) -> u32 {
        self.root_u32(self.atoms._NET_NUMBER_OF_DESKTOPS, AtomEnum::CARDINAL)
            .unwrap_or(0)
    }
}

impl WindowServer for X11Server {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self
            .client_list()?
            .into_iter()
            .filter(|&w| self.is_normal(w))
            .map(|w| self.window_info(w))
            .collect())
    }

    fn list_applications(&self) -> Result<Vec<AppInfo>> {
        let active_pid = self.focused_window().map(|w| self.pid(w.0));
        let mut apps: BTreeMap<Pid, AppInfo> = BTreeMap::new();
        for info in self.list_windows()? {
            apps.entry(info.pid).or_insert_with(|| AppInfo {
                pid: info.pid,
                name: info.app_name.clone(),
                is_hidden: false,
                is_frontmost: active_pid == Some(info.pid),
                icon: None,
            });
        }
        Ok(apps.into_values().collect())
    }

    fn list_spaces(&self) -> Result<Vec<SpaceInfo>> {
        Ok((0..self.desktop_count())
            .map(|i| SpaceInfo {
                id: SpaceId(u64::from(i)),
                display: None,
            })
            .collect())
    }

    fn current_space_id(&self) -> Option<SpaceId> {
        self.root_u32(self.atoms._NET_CURRENT_DESKTOP, AtomEnum::CARDINAL)
            .map(|d| SpaceId(u64::from(d)))
    }

    fn window_spaces(&self, windows: &[WindowId]) -> Result<HashMap<WindowId, Vec<SpaceId>>> {
        let count = self.desktop_count();
        Ok(windows
            .iter()
            .filter_map(|&id| {
                let desktop = self
                    .property32(id.0, self.atoms._NET_WM_DESKTOP, AtomEnum::CARDINAL)?
                    .first()
                    .copied()?;
                Some((id, desktop_membership(desktop, count)))
            })
            .collect())
    }

    fn stacking_order(&self) -> Result<Vec<WindowId>> {
        // The property lists bottom to top.
        let stacking = self
            .property32(self.root, self.atoms._NET_CLIENT_LIST_STACKING, AtomEnum::WINDOW)
            .ok_or_else(|| Error::unavailable("_NET_CLIENT_LIST_STACKING"))?;
        Ok(stacking.into_iter().rev().map(WindowId).collect())
    }

    fn screens(&self) -> Vec<Screen> {
        self.conn
            .setup()
            .roots
            .get(self.screen_num)
            .map(|s| {
                vec![Screen {
                    id: self.screen_num as u32,
                    frame: Rect::new(
                        Point::default(),
                        Size {
                            width: f64::from(s.width_in_pixels),
                            height: f64::from(s.height_in_pixels),
                        },
                    ),
                    is_main: true,
                }]
            })
            .unwrap_or_default()
    }

    fn cursor_position(&self) -> Option<Point> {
        let reply = self.conn.query_pointer(self.root).ok()?.reply().ok()?;
        Some(point(f64::from(reply.root_x), f64::from(reply.root_y)))
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.root_u32(self.atoms._NET_ACTIVE_WINDOW, AtomEnum::WINDOW)
            .filter(|&w| w != 0)
            .map(WindowId)
    }

    fn request_focus(&self, window: WindowId, _pid: Pid) -> Result<()> {
        if !self.client_list()?.contains(&window.0) {
            return Err(Error::WindowNotFound { window });
        }
        let event = ClientMessageEvent::new(
            32,
            window.0,
            self.atoms._NET_ACTIVE_WINDOW,
            [SOURCE_PAGER, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        self.conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
                event,
            )
            .map_err(connection_error)?;
        self.conn.flush().map_err(connection_error)?;
        Ok(())
    }

    fn capture_thumbnail(&self, window: WindowId, max: Size) -> Result<Thumbnail> {
        let unavailable = || Error::unavailable(format!("image of window {window}"));
        let geometry = self
            .conn
            .get_geometry(window.0)
            .map_err(connection_error)?
            .reply()
            .map_err(|_| unavailable())?;
        if geometry.width == 0 || geometry.height == 0 {
            return Err(unavailable());
        }
        let image = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                window.0,
                0,
                0,
                geometry.width,
                geometry.height,
                u32::MAX,
            )
            .map_err(connection_error)?
            .reply()
            .map_err(|_| unavailable())?;
        let (w, h) = (usize::from(geometry.width), usize::from(geometry.height));
        let rgba = x11_data_to_rgba(&image.data, w, h, self.channel_order).ok_or_else(unavailable)?;
        Thumbnail::fit(&rgba, w, h, max).ok_or_else(unavailable)
    }
}

/// WM_CLASS is "instance\0class\0"; the class names the application.
fn wm_class_name(raw: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(raw).ok()?;
    let parts: Vec<&str> = text.split('\0').filter(|s| !s.is_empty()).collect();
    parts.get(1).or_else(|| parts.first()).map(|s| s.to_string())
}

fn desktop_membership(desktop: u32, count: u32) -> Vec<SpaceId> {
    if desktop == ALL_DESKTOPS {
        (0..count).map(|d| SpaceId(u64::from(d))).collect()
    } else {
        vec![SpaceId(u64::from(desktop))]
    }
}

fn detect_channel_order<C: Connection>(conn: &C, screen_num: usize) -> ChannelOrder {
    let Some(screen) = conn.setup().roots.get(screen_num) else {
        return ChannelOrder::default();
    };
    let Some(visual) = screen
        .allowed_depths
        .iter()
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| visual.visual_id == screen.root_visual)
    else {
        return ChannelOrder::default();
    };

    let red = (visual.red_mask.trailing_zeros() / 8) as usize;
    let green = (visual.green_mask.trailing_zeros() / 8) as usize;
    let blue = (visual.blue_mask.trailing_zeros() / 8) as usize;
    if red > 3 || green > 3 || blue > 3 {
        return ChannelOrder::default();
    }

    ChannelOrder { red, green, blue }
}

fn x11_data_to_rgba(data: &[u8], width: usize, height: usize, order: ChannelOrder) -> Option<Vec<u8>> {
    let pixels = width.checked_mul(height).filter(|&p| p > 0)?;
    let bytes_per_pixel = data.len() / pixels;
    if bytes_per_pixel < 3 || [order.red, order.green, order.blue].iter().any(|&c| c >= bytes_per_pixel) {
        return None;
    }
    Some(
        data.chunks_exact(bytes_per_pixel)
            .take(pixels)
            .flat_map(|px| [px[order.red], px[order.green], px[order.blue], 255])
            .collect(),
    )
}
