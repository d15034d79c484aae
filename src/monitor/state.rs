use crate::config::ShowOnScreen;
use crate::model::{Point, Rect, WindowRegistry};
use crate::platform::WindowServer;
use serde::{Deserialize, Serialize};
use tracing::debug;

const FALLBACK_SCREEN: Rect = Rect {
    origin: Point { x: 0.0, y: 0.0 },
    size: crate::model::Size {
        width: 1920.0,
        height: 1080.0,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: u32,
    /// Visible frame in global top-left coordinates.
    pub frame: Rect,
    pub is_main: bool,
}

fn screen_for_point(screens: &[Screen], p: Point) -> Option<&Screen> {
    screens.iter().find(|s| s.frame.contains(p))
}

/// The screen holding the largest part of `bounds`.
fn screen_for_bounds<'a>(screens: &'a [Screen], bounds: &Rect) -> Option<&'a Screen> {
    screens
        .iter()
        .filter_map(|s| {
            let area = s.frame.intersection_area(bounds);
            if area > 0.0 {
                Some((s, area))
            } else {
                None
            }
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(s, _)| s)
}

fn main_screen(screens: &[Screen]) -> Screen {
    screens
        .iter()
        .find(|s| s.is_main)
        .or_else(|| screens.first())
        .cloned()
        .unwrap_or(Screen {
            id: 0,
            frame: FALLBACK_SCREEN,
            is_main: true,
        })
}

/// Resolve the screen the picker should appear on. Falls back to the main
/// screen whenever the policy's signal is missing.
pub fn preferred_screen<S: WindowServer + ?Sized>(
    policy: ShowOnScreen,
    server: &S,
    registry: &WindowRegistry,
) -> Screen {
    let screens = server.screens();
    let picked = match policy {
        ShowOnScreen::Main => None,
        ShowOnScreen::MouseHovered => server
            .cursor_position()
            .and_then(|p| screen_for_point(&screens, p)),
        ShowOnScreen::ActiveWindow => server
            .focused_window()
            .and_then(|id| registry.get(id))
            .and_then(|w| w.frame)
            .and_then(|frame| screen_for_bounds(&screens, &frame)),
    };
    let screen = picked.cloned().unwrap_or_else(|| main_screen(&screens));
    debug!(target: "alt_tab::monitor", ?policy, screen = screen.id, "preferred screen");
    screen
}
