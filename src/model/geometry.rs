use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Top-left origin, y grows downwards.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

pub fn point(x: f64, y: f64) -> Point {
    Point { x, y }
}

pub fn size(width: f64, height: f64) -> Size {
    Size { width, height }
}

impl Size {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.width / self.height)
    }
}

impl Rect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(point(x, y), size(width, height))
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x && p.x < self.right() && p.y >= self.origin.y && p.y < self.bottom()
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.origin.x.max(other.origin.x);
        let top = self.origin.y.max(other.origin.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::from_xywh(left, top, right - left, bottom - top))
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        self.intersect(other)
            .map(|r| r.size.width * r.size.height)
            .unwrap_or(0.0)
    }

    /// Horizontally centered, a third of the free space above: where the
    /// system's own switchers sit.
    pub fn centered_child(&self, child: Size) -> Rect {
        let x = self.origin.x + (self.size.width - child.width) / 2.0;
        let y = self.origin.y + (self.size.height - child.height) / 3.0;
        Rect::new(point(x, y), child)
    }
}
