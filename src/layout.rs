use crate::config::{AlignThumbnails, Appearance};
use crate::model::{size, Rect, Size, SpaceRegistry, WindowId};
use crate::monitor::Screen;

pub const GRID_GAP: f64 = 14.0;
pub const GRID_PADDING: f64 = 22.0;
pub const LABEL_PADDING: f64 = 6.0;
const FALLBACK_ASPECT: f64 = 16.0 / 9.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInput {
    pub window_id: WindowId,
    /// Width over height of the window; `None` when its frame is unknown.
    pub aspect: Option<f64>,
    pub space_label: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub window_id: WindowId,
    /// Cell frame relative to the panel's top-left corner.
    pub frame: Rect,
    pub space_label: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThumbnailLayout {
    pub items: Vec<LayoutItem>,
    /// Number of cells in each rendered row, top to bottom.
    pub rows: Vec<usize>,
    pub size: Size,
}

struct Metrics {
    max: Size,
    cell_height: f64,
    label_height: f64,
    min_cell_width: f64,
    max_cell_width: f64,
}

impl Metrics {
    fn new(screen: &Screen, appearance: &Appearance) -> Self {
        let usage = (appearance.max_screen_usage / 100.0).clamp(0.1, 1.0);
        let max = size(screen.frame.size.width * usage, screen.frame.size.height * usage);
        let label_height = appearance.font_height.max(appearance.icon_size) + LABEL_PADDING;

        let rows = appearance.rows_count.max(1) as f64;
        let content_height = max.height - GRID_PADDING * 2.0;
        let cell_height = ((content_height - GRID_GAP * (rows - 1.0)) / rows).max(label_height + 1.0);

        let content_width = (max.width - GRID_PADDING * 2.0).max(1.0);
        let width_for = |cells: usize| {
            let cells = cells.max(1) as f64;
            ((content_width - GRID_GAP * (cells - 1.0)) / cells).max(1.0)
        };
        let min_cell_width = width_for(appearance.max_cells_per_row);
        let max_cell_width = width_for(appearance.min_cells_per_row).max(min_cell_width);

        Self {
            max,
            cell_height,
            label_height,
            min_cell_width,
            max_cell_width,
        }
    }

    fn content_width(&self) -> f64 {
        (self.max.width - GRID_PADDING * 2.0).max(1.0)
    }

    fn cell_width(&self, aspect: Option<f64>) -> f64 {
        let thumbnail_height = self.cell_height - self.label_height;
        (thumbnail_height * aspect.unwrap_or(FALLBACK_ASPECT)).clamp(self.min_cell_width, self.max_cell_width)
    }
}

/// Largest image a cell can show; thumbnails are captured at this size.
pub fn thumbnail_max_size(screen: &Screen, appearance: &Appearance) -> Size {
    let m = Metrics::new(screen, appearance);
    size(m.max_cell_width, m.cell_height - m.label_height)
}

/// Space numbers are pointless with a single space.
pub fn show_space_labels(appearance: &Appearance, spaces: &SpaceRegistry) -> bool {
    !appearance.hide_space_number_labels && !spaces.is_single_space()
}

/// Flow the thumbnails into at most `rows_count` rows, wrapping at the
/// cells-per-row limit or when the next cell would overflow. Once the last
/// row is reached it takes every remaining window, and the whole grid is
/// scaled down until it fits the screen-usage bounds.
pub fn compute(inputs: &[LayoutInput], screen: &Screen, appearance: &Appearance) -> ThumbnailLayout {
    if inputs.is_empty() {
        return ThumbnailLayout {
            size: size(GRID_PADDING * 2.0, GRID_PADDING * 2.0),
            ..ThumbnailLayout::default()
        };
    }
    let m = Metrics::new(screen, appearance);
    let max_rows = appearance.rows_count.max(1);
    let max_per_row = appearance.max_cells_per_row.max(1).max(inputs.len().div_ceil(max_rows));
    let limit = m.content_width();

    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new()];
    let mut row_width = 0.0;
    for (i, input) in inputs.iter().enumerate() {
        let width = m.cell_width(input.aspect);
        let rows_left = rows.len() < max_rows;
        let Some(row) = rows.last_mut() else { break };
        let needed = if row.is_empty() { width } else { row_width + GRID_GAP + width };
        if rows_left && !row.is_empty() && (row.len() >= max_per_row || needed > limit) {
            rows.push(vec![(i, width)]);
            row_width = width;
        } else {
            row.push((i, width));
            row_width = needed;
        }
    }

    let row_widths: Vec<f64> = rows
        .iter()
        .map(|row| row.iter().map(|(_, w)| w).sum::<f64>() + GRID_GAP * row.len().saturating_sub(1) as f64)
        .collect();
    let content_width = row_widths.iter().copied().fold(0.0, f64::max);
    let row_count = rows.len() as f64;
    let natural = size(
        content_width + GRID_PADDING * 2.0,
        GRID_PADDING * 2.0 + row_count * m.cell_height + (row_count - 1.0) * GRID_GAP,
    );
    let scale = (m.max.width / natural.width)
        .min(m.max.height / natural.height)
        .min(1.0);

    let mut items = Vec::with_capacity(inputs.len());
    for (r, row) in rows.iter().enumerate() {
        let offset = match appearance.align_thumbnails {
            AlignThumbnails::Left => 0.0,
            AlignThumbnails::Center => ((content_width - row_widths[r]) / 2.0).max(0.0),
        };
        let y = GRID_PADDING + r as f64 * (m.cell_height + GRID_GAP);
        let mut x = GRID_PADDING + offset;
        for &(i, width) in row {
            let input = &inputs[i];
            items.push(LayoutItem {
                window_id: input.window_id,
                frame: Rect::from_xywh(x * scale, y * scale, width * scale, m.cell_height * scale),
                space_label: input.space_label,
            });
            x += width + GRID_GAP;
        }
    }

    ThumbnailLayout {
        items,
        rows: rows.iter().map(Vec::len).collect(),
        size: size(natural.width * scale, natural.height * scale),
    }
}
