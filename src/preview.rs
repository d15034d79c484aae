use crate::model::Size;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

const BYTES_PER_PIXEL: usize = 4;

/// A downscaled window or icon image, RGBA8.
#[derive(Clone)]
pub struct Thumbnail {
    image: Arc<RgbaImage>,
    hash: u64,
}

impl Thumbnail {
    pub fn from_rgba(data: Vec<u8>, width: usize, height: usize) -> Option<Self> {
        let hash = fast_pixel_hash(&data);
        let image = RgbaImage::from_raw(width as u32, height as u32, data)?;
        Some(Self {
            image: Arc::new(image),
            hash,
        })
    }

    /// Downscale a full-size capture so it fits in `max`, keeping the aspect ratio.
    pub fn fit(data: &[u8], src_w: usize, src_h: usize, max: Size) -> Option<Self> {
        let (scaled, w, h) = downscale_rgba(
            data,
            src_w,
            src_h,
            max.width.max(1.0) as usize,
            max.height.max(1.0) as usize,
        );
        if w == 0 || h == 0 {
            return None;
        }
        Self::from_rgba(scaled, w, h)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Sampled content hash; equal hashes mean the panel can skip a redraw.
    pub fn content_hash(&self) -> u64 {
        self.hash
    }
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("hash", &self.hash)
            .finish()
    }
}

/// Sample ~1KB of evenly-spaced pixels for a fast content-change check.
pub(crate) fn fast_pixel_hash(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    let stride = (data.len() / 256).max(1);
    let mut i = 0;
    while i < data.len() {
        let end = (i + BYTES_PER_PIXEL).min(data.len());
        data[i..end].hash(&mut hasher);
        i += stride;
    }
    hasher.finish()
}

/// Swap BGRA rows (as handed out by CoreGraphics and X11) into tightly packed RGBA.
pub(crate) fn bgra_rows_to_rgba(
    raw: &[u8],
    width: usize,
    height: usize,
    bytes_per_row: usize,
    bytes_per_pixel: usize,
) -> Option<Vec<u8>> {
    if width == 0 || height == 0 || bytes_per_pixel < 3 {
        return None;
    }
    let mut rgba = Vec::with_capacity(width * height * BYTES_PER_PIXEL);
    for y in 0..height {
        let row_start = y * bytes_per_row;
        for x in 0..width {
            let offset = row_start + x * bytes_per_pixel;
            if offset + 3 > raw.len() {
                rgba.extend_from_slice(&[0, 0, 0, 255]);
                continue;
            }
            let alpha = if bytes_per_pixel >= 4 && offset + 4 <= raw.len() {
                raw[offset + 3]
            } else {
                255
            };
            rgba.extend_from_slice(&[raw[offset + 2], raw[offset + 1], raw[offset], alpha]);
        }
    }
    Some(rgba)
}

/// Nearest-neighbour downscale that never upscales.
pub(crate) fn downscale_rgba(
    data: &[u8],
    src_w: usize,
    src_h: usize,
    max_w: usize,
    max_h: usize,
) -> (Vec<u8>, usize, usize) {
    if src_w == 0 || src_h == 0 || max_w == 0 || max_h == 0 {
        return (Vec::new(), 0, 0);
    }
    let pixels = match src_w.checked_mul(src_h) {
        Some(value) if value > 0 => value,
        _ => return (Vec::new(), 0, 0),
    };
    if data.len() < pixels * BYTES_PER_PIXEL {
        return (Vec::new(), 0, 0);
    }

    let scale_w = max_w as f32 / src_w as f32;
    let scale_h = max_h as f32 / src_h as f32;
    let scale = scale_w.min(scale_h).min(1.0);

    let dst_w = ((src_w as f32 * scale).round() as usize).clamp(1, max_w);
    let dst_h = ((src_h as f32 * scale).round() as usize).clamp(1, max_h);

    if dst_w == src_w && dst_h == src_h {
        return (data[..pixels * BYTES_PER_PIXEL].to_vec(), src_w, src_h);
    }

    let mut out = vec![0u8; dst_w * dst_h * BYTES_PER_PIXEL];
    for y in 0..dst_h {
        let src_y = (y * src_h) / dst_h;
        for x in 0..dst_w {
            let src_x = (x * src_w) / dst_w;
            let src_i = (src_y * src_w + src_x) * BYTES_PER_PIXEL;
            let dst_i = (y * dst_w + x) * BYTES_PER_PIXEL;
            out[dst_i..dst_i + BYTES_PER_PIXEL]
                .copy_from_slice(&data[src_i..src_i + BYTES_PER_PIXEL]);
        }
    }
    (out, dst_w, dst_h)
}
