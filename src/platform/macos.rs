//! macOS backend. Window metadata comes from CoreGraphics, spaces from the
//! private CGS calls, applications from NSWorkspace and captures from
//! ScreenCaptureKit.

use super::cg_helpers::{self, array_items, CFArrayRef, CFTypeRef, CGPoint, CGRect, CfOwned, Keys};
use super::{AppInfo, SpaceInfo, WindowInfo, WindowServer};
use crate::error::{Error, Result};
use crate::model::{point, Pid, Point, Rect, Size, SpaceId, WindowId};
use crate::monitor::Screen;
use crate::preview::{bgra_rows_to_rgba, Thumbnail};
use objc2::{AnyThread, Message};
use objc2_app_kit::{
    NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
    NSWorkspace,
};
use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, warn};

type CGImageRef = *const c_void;
type CGDataProviderRef = *const c_void;
type CFDataRef = *const c_void;
type ConnectionId = i32;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relative_to: u32) -> CFArrayRef;
    fn CGGetActiveDisplayList(max: u32, displays: *mut u32, count: *mut u32) -> i32;
    fn CGDisplayBounds(display: u32) -> CGRect;
    fn CGMainDisplayID() -> u32;
    fn CGEventCreate(source: *const c_void) -> CFTypeRef;
    fn CGEventGetLocation(event: CFTypeRef) -> CGPoint;
    fn CGImageGetWidth(image: CGImageRef) -> usize;
    fn CGImageGetHeight(image: CGImageRef) -> usize;
    fn CGImageGetBytesPerRow(image: CGImageRef) -> usize;
    fn CGImageGetBitsPerPixel(image: CGImageRef) -> usize;
    fn CGImageGetDataProvider(image: CGImageRef) -> CGDataProviderRef;
    fn CGDataProviderCopyData(provider: CGDataProviderRef) -> CFDataRef;

    fn CGSMainConnectionID() -> ConnectionId;
    fn CGSGetActiveSpace(cid: ConnectionId) -> u64;
    fn CGSCopyManagedDisplaySpaces(cid: ConnectionId) -> CFArrayRef;
    fn CGSCopySpacesForWindows(cid: ConnectionId, mask: i32, windows: CFArrayRef) -> CFArrayRef;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFDataGetBytePtr(data: CFDataRef) -> *const u8;
    fn CFDataGetLength(data: CFDataRef) -> isize;
    static kCFBooleanFalse: CFTypeRef;
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXUIElementCreateApplication(pid: i32) -> CFTypeRef;
    fn AXUIElementCopyAttributeValue(element: CFTypeRef, attribute: CFTypeRef, value: *mut CFTypeRef) -> i32;
    fn AXUIElementSetAttributeValue(element: CFTypeRef, attribute: CFTypeRef, value: CFTypeRef) -> i32;
    fn AXUIElementPerformAction(element: CFTypeRef, action: CFTypeRef) -> i32;
    fn _AXUIElementGetWindow(element: CFTypeRef, window: *mut u32) -> i32;
}

const K_CG_WINDOW_LIST_OPTION_ALL: u32 = 0;
const K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY: u32 = 1;
const K_CG_WINDOW_LIST_EXCLUDE_DESKTOP_ELEMENTS: u32 = 1 << 4;
const K_CG_NULL_WINDOW_ID: u32 = 0;
const K_CG_MAIN_MENU_WINDOW_LEVEL: i32 = 24;
const K_CG_DOCK_WINDOW_LEVEL: i32 = 20;
const K_CGS_ALL_SPACES_MASK: i32 = 0x7;
const K_AX_ERROR_SUCCESS: i32 = 0;
const MAX_DISPLAYS: usize = 16;
const CAPTURE_TIMEOUT: Duration = Duration::from_millis(2000);
const STEP_TIMEOUT: Duration = Duration::from_millis(1500);

const WINDOW_KEYS: &[&str] = &[
    "kCGWindowNumber",
    "kCGWindowOwnerPID",
    "kCGWindowOwnerName",
    "kCGWindowName",
    "kCGWindowLayer",
    "kCGWindowBounds",
    "kCGWindowIsOnscreen",
    "kCGWindowAlpha",
];

/// One row of `CGWindowListCopyWindowInfo`.
#[derive(Debug, Clone)]
struct CgWindow {
    id: u32,
    pid: i32,
    owner: String,
    title: Option<String>,
    layer: i32,
    bounds: Option<CGRect>,
    on_screen: bool,
}

fn cg_windows(options: u32) -> Vec<CgWindow> {
    let Some(list) = CfOwned::new(unsafe { CGWindowListCopyWindowInfo(options, K_CG_NULL_WINDOW_ID) })
    else {
        return Vec::new();
    };
    let keys = Keys::new(WINDOW_KEYS);
    array_items(list.as_ptr())
        .into_iter()
        .filter_map(|dict| {
            if keys.f64(dict, "kCGWindowAlpha") == Some(0.0) {
                return None;
            }
            Some(CgWindow {
                id: keys.i32(dict, "kCGWindowNumber")? as u32,
                pid: keys.i32(dict, "kCGWindowOwnerPID")?,
                owner: keys
                    .string(dict, "kCGWindowOwnerName")
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                title: keys.string(dict, "kCGWindowName").map(|t| t.trim().to_string()),
                layer: keys.i32(dict, "kCGWindowLayer")?,
                bounds: keys.rect(dict, "kCGWindowBounds"),
                on_screen: keys.flag(dict, "kCGWindowIsOnscreen").unwrap_or(false),
            })
        })
        .collect()
}

fn to_rect(r: CGRect) -> Rect {
    Rect::from_xywh(r.origin.x, r.origin.y, r.size.width, r.size.height)
}

fn is_app_layer(layer: i32) -> bool {
    (0..K_CG_MAIN_MENU_WINDOW_LEVEL).contains(&layer)
}

fn running_application(pid: Pid) -> Option<objc2::rc::Retained<NSRunningApplication>> {
    NSRunningApplication::runningApplicationWithProcessIdentifier(pid.0)
}

pub(crate) struct MacServer {
    own_pid: Pid,
    connection: ConnectionId,
    /// Cleared after a ScreenCaptureKit timeout; captures stay off until restart.
    capture_available: AtomicBool,
}

impl MacServer {
    pub(crate) fn new(own_pid: Pid) -> Self {
        Self {
            own_pid,
            connection: unsafe { CGSMainConnectionID() },
            capture_available: AtomicBool::new(true),
        }
    }

    fn app_windows(&self, options: u32) -> Vec<CgWindow> {
        cg_windows(options | K_CG_WINDOW_LIST_EXCLUDE_DESKTOP_ELEMENTS)
            .into_iter()
            .filter(|w| w.pid != self.own_pid.0 && is_app_layer(w.layer))
            .collect()
    }

    fn hidden_pids(&self) -> HashSet<i32> {
        objc2::rc::autoreleasepool(|_| {
            NSWorkspace::sharedWorkspace()
                .runningApplications()
                .iter()
                .filter(|app| app.isHidden())
                .map(|app| app.processIdentifier())
                .collect()
        })
    }

    fn spaces_of(&self, window: WindowId) -> Option<Vec<SpaceId>> {
        let number = cg_helpers::cfnumber_i32(window.0 as i32)?;
        let windows = cg_helpers::cfarray(&[&number])?;
        let spaces = CfOwned::new(unsafe {
            CGSCopySpacesForWindows(self.connection, K_CGS_ALL_SPACES_MASK, windows.as_ptr())
        })?;
        Some(
            array_items(spaces.as_ptr())
                .into_iter()
                .filter_map(cg_helpers::number_u64)
                .map(SpaceId)
                .collect(),
        )
    }

    /// Raise one window of an already activated app through the accessibility API.
    fn raise_window(&self, window: WindowId, pid: Pid) -> Result<()> {
        if !unsafe { AXIsProcessTrusted() } {
            return Err(Error::PermissionDenied { what: "accessibility" });
        }
        let app = CfOwned::new(unsafe { AXUIElementCreateApplication(pid.0) })
            .ok_or(Error::WindowNotFound { window })?;
        let keys = ["AXWindows", "AXMinimized", "AXRaise"]
            .map(cg_helpers::cfstr)
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::unavailable("accessibility attribute names"))?;
        let mut raw: CFTypeRef = std::ptr::null();
        let status = unsafe { AXUIElementCopyAttributeValue(app.as_ptr(), keys[0].as_ptr(), &mut raw) };
        let ax_windows = CfOwned::new(raw)
            .filter(|_| status == K_AX_ERROR_SUCCESS)
            .ok_or(Error::WindowNotFound { window })?;
        let element = array_items(ax_windows.as_ptr())
            .into_iter()
            .find(|&element| {
                let mut id = 0u32;
                unsafe { _AXUIElementGetWindow(element, &mut id) == K_AX_ERROR_SUCCESS && id == window.0 }
            })
            .ok_or(Error::WindowNotFound { window })?;
        unsafe {
            AXUIElementSetAttributeValue(element, keys[1].as_ptr(), kCFBooleanFalse);
            AXUIElementPerformAction(element, keys[2].as_ptr());
        }
        Ok(())
    }
}

impl WindowServer for MacServer {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let windows = self.app_windows(K_CG_WINDOW_LIST_OPTION_ALL);
        if windows.is_empty() {
            return Err(Error::unavailable("window list"));
        }
        // CoreGraphics does not report minimization; an off-screen window on
        // the current space of a visible app is taken to be minimized.
        let current = self.current_space_id();
        let hidden = self.hidden_pids();
        Ok(windows
            .into_iter()
            .map(|w| {
                let is_minimized = !w.on_screen
                    && !hidden.contains(&w.pid)
                    && current.is_some_and(|c| {
                        self.spaces_of(WindowId(w.id)).is_some_and(|spaces| spaces.contains(&c))
                    });
                WindowInfo {
                    id: WindowId(w.id),
                    pid: Pid(w.pid),
                    app_name: w.owner,
                    title: w.title,
                    frame: w.bounds.map(to_rect),
                    level: w.layer,
                    is_minimized,
                }
            })
            .collect())
    }

    fn list_applications(&self) -> Result<Vec<AppInfo>> {
        Ok(objc2::rc::autoreleasepool(|_| {
            NSWorkspace::sharedWorkspace()
                .runningApplications()
                .iter()
                .filter(|app| app.activationPolicy() == NSApplicationActivationPolicy::Regular)
                .filter(|app| app.processIdentifier() != self.own_pid.0)
                .map(|app| AppInfo {
                    pid: Pid(app.processIdentifier()),
                    name: app.localizedName().map(|n| n.to_string()).unwrap_or_default(),
                    is_hidden: app.isHidden(),
                    is_frontmost: app.isActive(),
                    icon: None,
                })
                .collect()
        }))
    }

    fn list_spaces(&self) -> Result<Vec<SpaceInfo>> {
        let displays = CfOwned::new(unsafe { CGSCopyManagedDisplaySpaces(self.connection) })
            .ok_or_else(|| Error::unavailable("managed display spaces"))?;
        let keys = Keys::new(&["Display Identifier", "Spaces", "id64"]);
        let mut spaces = Vec::new();
        for display in array_items(displays.as_ptr()) {
            let name = keys.string(display, "Display Identifier");
            let Some(list) = keys.value(display, "Spaces") else {
                continue;
            };
            spaces.extend(array_items(list).into_iter().filter_map(|space| {
                Some(SpaceInfo {
                    id: SpaceId(keys.u64(space, "id64")?),
                    display: name.clone(),
                })
            }));
        }
        Ok(spaces)
    }

    fn current_space_id(&self) -> Option<SpaceId> {
        let id = unsafe { CGSGetActiveSpace(self.connection) };
        (id != 0).then_some(SpaceId(id))
    }

    fn window_spaces(&self, windows: &[WindowId]) -> Result<HashMap<WindowId, Vec<SpaceId>>> {
        Ok(windows
            .iter()
            .filter_map(|&id| Some((id, self.spaces_of(id)?)))
            .collect())
    }

    fn stacking_order(&self) -> Result<Vec<WindowId>> {
        Ok(self
            .app_windows(K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY)
            .into_iter()
            .map(|w| WindowId(w.id))
            .collect())
    }

    fn screens(&self) -> Vec<Screen> {
        let mut ids = [0u32; MAX_DISPLAYS];
        let mut count = 0u32;
        if unsafe { CGGetActiveDisplayList(MAX_DISPLAYS as u32, ids.as_mut_ptr(), &mut count) } != 0 {
            return Vec::new();
        }
        let main = unsafe { CGMainDisplayID() };
        ids[..count as usize]
            .iter()
            .map(|&id| Screen {
                id,
                frame: to_rect(unsafe { CGDisplayBounds(id) }),
                is_main: id == main,
            })
            .collect()
    }

    fn cursor_position(&self) -> Option<Point> {
        let event = CfOwned::new(unsafe { CGEventCreate(std::ptr::null()) })?;
        let location = unsafe { CGEventGetLocation(event.as_ptr()) };
        Some(point(location.x, location.y))
    }

    fn focused_window(&self) -> Option<WindowId> {
        let pid = objc2::rc::autoreleasepool(|_| {
            NSWorkspace::sharedWorkspace()
                .frontmostApplication()
                .map(|app| app.processIdentifier())
        })?;
        self.app_windows(K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY)
            .into_iter()
            .find(|w| w.pid == pid && w.layer == 0)
            .map(|w| WindowId(w.id))
    }

    fn request_focus(&self, window: WindowId, pid: Pid) -> Result<()> {
        let app = running_application(pid).ok_or(Error::WindowNotFound { window })?;
        #[allow(deprecated)]
        let activated = app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps);
        if !activated {
            debug!(target: "alt_tab::platform", %pid, "activation request refused");
        }
        match self.raise_window(window, pid) {
            Err(Error::PermissionDenied { what }) => {
                debug!(target: "alt_tab::platform", what, "raising the app without its window");
                Ok(())
            }
            other => other,
        }
    }

    fn capture_thumbnail(&self, window: WindowId, max: Size) -> Result<Thumbnail> {
        if !self.capture_available.load(Ordering::Relaxed) {
            return Err(Error::unavailable("screen capture"));
        }
        let (tx, rx) = mpsc::channel();
        let (max_w, max_h) = (max.width.max(1.0) as usize, max.height.max(1.0) as usize);
        std::thread::spawn(move || {
            let _ = tx.send(sck_capture(window.0, max_w, max_h));
        });
        match rx.recv_timeout(CAPTURE_TIMEOUT) {
            Ok(Ok(capture)) => Thumbnail::fit(&capture.data, capture.width, capture.height, max)
                .ok_or_else(|| Error::unavailable(format!("image of window {window}"))),
            Ok(Err(error)) => Err(error),
            Err(_) => {
                warn!(target: "alt_tab::platform", "screen capture timed out, disabling it for this session");
                self.capture_available.store(false, Ordering::Relaxed);
                Err(Error::unavailable("screen capture"))
            }
        }
    }

    /// Mission Control draws Dock-owned, untitled, full-display windows above
    /// the normal layer.
    fn is_mission_control_active(&self) -> bool {
        let displays: Vec<Rect> = self.screens().into_iter().map(|s| s.frame).collect();
        cg_windows(K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY)
            .into_iter()
            .any(|w| is_mission_control_window(&w, &displays))
    }
}

fn is_mission_control_window(w: &CgWindow, displays: &[Rect]) -> bool {
    w.owner == "Dock"
        && w.title.as_deref().unwrap_or_default().is_empty()
        && w.layer > 0
        && w.layer != K_CG_DOCK_WINDOW_LEVEL
        && w.bounds.map(to_rect).is_some_and(|b| displays.contains(&b))
}

struct Capture {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

fn sck_capture(window_id: u32, max_w: usize, max_h: usize) -> Result<Capture> {
    use objc2_screen_capture_kit::{
        SCContentFilter, SCScreenshotManager, SCShareableContent, SCStreamConfiguration,
    };

    let (content_tx, content_rx) = mpsc::channel();
    let content_completion = block2::RcBlock::new(
        move |content: *mut SCShareableContent, err: *mut objc2_foundation::NSError| {
            if !err.is_null() {
                let desc = unsafe { (*err).localizedDescription() };
                debug!(target: "alt_tab::platform", %desc, "shareable content refused");
                let _ = content_tx.send(Err(Error::PermissionDenied { what: "screen recording" }));
                return;
            }
            if content.is_null() {
                let _ = content_tx.send(Err(Error::unavailable("shareable content")));
                return;
            }
            let windows = unsafe { (*content).windows() };
            let found = (0..windows.count())
                .map(|i| unsafe { windows.objectAtIndex(i) })
                .find(|w| unsafe { w.windowID() } == window_id)
                .map(|w| w.retain())
                .ok_or(Error::WindowNotFound {
                    window: WindowId(window_id),
                });
            let _ = content_tx.send(found);
        },
    );
    unsafe {
        SCShareableContent::getShareableContentWithCompletionHandler(&content_completion);
    }
    let sc_window = content_rx
        .recv_timeout(STEP_TIMEOUT)
        .map_err(|_| Error::unavailable("shareable content"))??;

    let filter = unsafe {
        SCContentFilter::initWithDesktopIndependentWindow(SCContentFilter::alloc(), &sc_window)
    };
    let config = unsafe { SCStreamConfiguration::new() };
    unsafe {
        config.setWidth(max_w);
        config.setHeight(max_h);
        config.setScalesToFit(true);
    }

    let (img_tx, img_rx) = mpsc::channel::<Option<objc2::rc::Retained<objc2_core_graphics::CGImage>>>();
    let img_completion = block2::RcBlock::new(
        move |image: *mut objc2_core_graphics::CGImage, err: *mut objc2_foundation::NSError| {
            if !err.is_null() {
                let desc = unsafe { (*err).localizedDescription() };
                debug!(target: "alt_tab::platform", %desc, window_id, "screenshot failed");
                let _ = img_tx.send(None);
                return;
            }
            let _ = img_tx.send(unsafe { objc2::rc::Retained::retain(image) });
        },
    );
    unsafe {
        SCScreenshotManager::captureImageWithFilter_configuration_completionHandler(
            &filter,
            &config,
            Some(&img_completion),
        );
    }

    let image = img_rx
        .recv_timeout(STEP_TIMEOUT)
        .ok()
        .flatten()
        .ok_or_else(|| Error::unavailable(format!("image of window {window_id}")))?;
    rgba_from_cgimage(&image).ok_or_else(|| Error::unavailable(format!("pixels of window {window_id}")))
}

fn rgba_from_cgimage(image: &objc2_core_graphics::CGImage) -> Option<Capture> {
    let ptr = image as *const objc2_core_graphics::CGImage as CGImageRef;
    let width = unsafe { CGImageGetWidth(ptr) };
    let height = unsafe { CGImageGetHeight(ptr) };
    let bytes_per_row = unsafe { CGImageGetBytesPerRow(ptr) };
    let bytes_per_pixel = unsafe { CGImageGetBitsPerPixel(ptr) } / 8;

    let provider = unsafe { CGImageGetDataProvider(ptr) };
    if provider.is_null() {
        return None;
    }
    let data = CfOwned::new(unsafe { CGDataProviderCopyData(provider) })?;
    let raw = unsafe {
        std::slice::from_raw_parts(CFDataGetBytePtr(data.as_ptr()), CFDataGetLength(data.as_ptr()) as usize)
    };
    let rgba = bgra_rows_to_rgba(raw, width, height, bytes_per_row, bytes_per_pixel)?;
    Some(Capture {
        data: rgba,
        width,
        height,
    })
}
