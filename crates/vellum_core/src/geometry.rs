//! Pixel-space geometry and colors
//!
//! Every surface in Vellum is addressed in whole pixels, so points, sizes and
//! rectangles are integer types. Rectangles are half-open: a rect at `(0, 0)`
//! with size `10x10` covers columns `0..10` and rows `0..10`.

use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Core Geometry Types
// ─────────────────────────────────────────────────────────────────────────────

/// 2D point in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise sum, saturating at the `i32` bounds
    pub const fn offset(self, other: Point) -> Self {
        Self {
            x: self.x.saturating_add(other.x),
            y: self.y.saturating_add(other.y),
        }
    }
}

/// 2D size in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are strictly positive
    pub const fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

impl From<Size> for Rect {
    /// Convert Size to Rect at origin (0, 0)
    fn from(size: Size) -> Self {
        size.to_rect()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned pixel rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub const fn x(&self) -> i32 {
        self.origin.x
    }

    pub const fn y(&self) -> i32 {
        self.origin.y
    }

    pub const fn width(&self) -> i32 {
        self.size.width
    }

    pub const fn height(&self) -> i32 {
        self.size.height
    }

    /// Exclusive right edge
    pub const fn right(&self) -> i32 {
        self.origin.x.saturating_add(self.size.width)
    }

    /// Exclusive bottom edge
    pub const fn bottom(&self) -> i32 {
        self.origin.y.saturating_add(self.size.height)
    }

    /// Get the size of this rect
    pub const fn size(&self) -> Size {
        self.size
    }

    /// A rect with no area covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.size.width <= 0 || self.size.height <= 0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x < self.right()
            && point.y >= self.origin.y
            && point.y < self.bottom()
    }

    /// Whether `other` lies entirely inside this rect
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x() >= self.x()
                && other.y() >= self.y()
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Rect {
            origin: Point::new(self.origin.x.saturating_add(dx), self.origin.y.saturating_add(dy)),
            size: self.size,
        }
    }

    /// Same size, new origin
    pub fn with_origin(&self, origin: Point) -> Self {
        Rect {
            origin,
            size: self.size,
        }
    }

    /// Get the union of two rects (smallest rect containing both)
    ///
    /// Empty rects contribute nothing, so `Rect::ZERO` is the identity.
    pub fn union(&self, other: &Rect) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let min_x = self.x().min(other.x());
        let min_y = self.y().min(other.y());
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Check if this rect intersects with another
    ///
    /// Returns true if the two rects share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x() < other.right()
            && self.right() > other.x()
            && self.y() < other.bottom()
            && self.bottom() > other.y()
    }

    /// Get the intersection of two rects (if they overlap)
    ///
    /// Returns None if the rects don't overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }

        let x = self.x().max(other.x());
        let y = self.y().max(other.y());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        Some(Rect::new(x, y, right - x, bottom - y))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {}",
            self.origin.x, self.origin.y, self.size
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Color
// ─────────────────────────────────────────────────────────────────────────────

/// 8-bit RGBA color, straight (non-premultiplied) alpha
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `0xRRGGBB`, fully opaque
    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional)
    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        match digits.len() {
            6 => Some(Self::from_hex(value)),
            8 => Some(Self::rgba(
                (value >> 24) as u8,
                ((value >> 16) & 0xFF) as u8,
                ((value >> 8) & 0xFF) as u8,
                (value & 0xFF) as u8,
            )),
            _ => None,
        }
    }

    pub const fn with_alpha(mut self, alpha: u8) -> Self {
        self.a = alpha;
        self
    }

    pub const fn to_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn from_array(rgba: [u8; 4]) -> Self {
        Self::rgba(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Same RGB, ignoring alpha. Chroma keys match on color only.
    pub const fn same_rgb(&self, other: &Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_union_ignores_empty() {
        let a = Rect::new(10, 10, 5, 5);
        assert_eq!(Rect::ZERO.union(&a), a);
        assert_eq!(a.union(&Rect::ZERO), a);

        let b = Rect::new(0, 20, 2, 2);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0, 10, 15, 12));
    }

    #[test]
    fn test_rect_intersection_is_half_open() {
        let a = Rect::new(0, 0, 10, 10);
        let touching = Rect::new(10, 0, 10, 10);
        assert!(!a.intersects(&touching));
        assert!(a.intersection(&touching).is_none());

        let overlap = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&overlap), Some(Rect::new(5, 5, 5, 5)));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(2, 2, 4, 4);
        assert!(r.contains(Point::new(2, 2)));
        assert!(!r.contains(Point::new(6, 6)));
        assert!(r.contains_rect(&Rect::new(3, 3, 3, 3)));
        assert!(!r.contains_rect(&Rect::new(3, 3, 4, 3)));
    }

    #[test]
    fn test_rect_offset_saturates() {
        let r = Rect::new(i32::MAX - 1, i32::MIN + 1, 4, 4);
        assert_eq!(r.offset(10, -10), Rect::new(i32::MAX, i32::MIN, 4, 4));
        assert_eq!(r.offset(-1, 1), Rect::new(i32::MAX - 2, i32::MIN + 2, 4, 4));
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex(0xFF5500), Color::rgb(255, 85, 0));
        assert_eq!(Color::parse_hex("#ff00ff"), Some(Color::MAGENTA));
        assert_eq!(
            Color::parse_hex("00000080"),
            Some(Color::rgba(0, 0, 0, 0x80))
        );
        assert_eq!(Color::parse_hex("#12345"), None);
        assert_eq!(Color::parse_hex("#gg0000"), None);
        assert_eq!(Color::MAGENTA.to_string(), "#ff00ff");
    }
}
