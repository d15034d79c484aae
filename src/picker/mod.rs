//! The panel that shows thumbnails. The core drives it through
//! [`PanelView`] and never looks at what it renders.

pub(crate) mod run;

use crate::model::{Rect, Size, WindowId};
use crate::monitor::Screen;
use crate::preview::Thumbnail;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PanelItem {
    pub window_id: WindowId,
    pub title: String,
    pub app_name: String,
    pub space_label: Option<usize>,
    /// Cell frame relative to the panel.
    pub frame: Rect,
    pub thumbnail: Option<Thumbnail>,
    pub icon: Option<Thumbnail>,
}

pub trait PanelView {
    fn update_items(&mut self, screen: &Screen, items: Vec<PanelItem>, content: Size);
    fn set_frame(&mut self, frame: Rect);
    fn frame(&self) -> Rect;
    fn highlight(&mut self, index: Option<usize>);
    fn show(&mut self);
    fn order_out(&mut self);
    fn is_visible(&self) -> bool;
}

/// Renderer-less panel: keeps the geometry and reports what a real panel
/// would draw.
#[derive(Debug, Default)]
pub struct HeadlessPanel {
    frame: Rect,
    items: Vec<PanelItem>,
    highlighted: Option<usize>,
    visible: bool,
}

impl HeadlessPanel {
    pub fn items(&self) -> &[PanelItem] {
        &self.items
    }
}

impl PanelView for HeadlessPanel {
    fn update_items(&mut self, screen: &Screen, items: Vec<PanelItem>, content: Size) {
        debug!(
            target: "alt_tab::panel",
            screen = screen.id,
            items = items.len(),
            width = content.width,
            height = content.height,
            "update items"
        );
        self.items = items;
    }

    fn set_frame(&mut self, frame: Rect) {
        debug!(target: "alt_tab::panel", x = frame.origin.x, y = frame.origin.y, w = frame.size.width, h = frame.size.height, "set frame");
        self.frame = frame;
    }

    fn frame(&self) -> Rect {
        self.frame
    }

    fn highlight(&mut self, index: Option<usize>) {
        self.highlighted = index;
        if let Some(item) = index.and_then(|i| self.items.get(i)) {
            info!(target: "alt_tab::panel", window = %item.window_id, app = %item.app_name, title = %item.title, "selected");
        }
    }

    fn show(&mut self) {
        self.visible = true;
        info!(target: "alt_tab::panel", items = self.items.len(), "shown");
    }

    fn order_out(&mut self) {
        self.visible = false;
        debug!(target: "alt_tab::panel", "ordered out");
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}
