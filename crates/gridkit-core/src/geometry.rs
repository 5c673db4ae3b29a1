#![forbid(unsafe_code)]

//! Geometric primitives for integer cell grids.

/// A cell coordinate on the grid.
///
/// Origin at top-left; `x` grows to the right, `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridPoint {
    /// Column index.
    pub x: u16,
    /// Row index.
    pub y: u16,
}

impl GridPoint {
    /// Create a new point.
    #[inline]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// A rectangle of whole cells.
///
/// Edges are half-open: a rect covers columns `x..x + w` and rows `y..y + h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridRect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub w: u16,
    /// Height in cells.
    pub h: u16,
}

impl GridRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.w)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.h)
    }

    /// Bottom edge without saturation, `None` when it does not fit in `u16`.
    #[inline]
    pub const fn checked_bottom(&self) -> Option<u16> {
        self.y.checked_add(self.h)
    }

    /// Check if the rectangle covers no cells.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Check if a cell is inside the rectangle.
    #[inline]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether the column spans of the two rects share at least one cell.
    #[inline]
    pub const fn overlaps_columns(&self, other: &GridRect) -> bool {
        self.x < other.right() && other.x < self.right()
    }

    /// Whether the row spans of the two rects share at least one cell.
    #[inline]
    pub const fn overlaps_rows(&self, other: &GridRect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }

    /// Whether the two rects share at least one cell.
    ///
    /// Empty rects never intersect anything.
    #[inline]
    pub const fn intersects(&self, other: &GridRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.overlaps_columns(other)
            && self.overlaps_rows(other)
    }

    /// Same size, new origin.
    #[inline]
    #[must_use]
    pub const fn with_origin(self, x: u16, y: u16) -> Self {
        Self::new(x, y, self.w, self.h)
    }

    /// Same origin, new size.
    #[inline]
    #[must_use]
    pub const fn with_size(self, w: u16, h: u16) -> Self {
        Self::new(self.x, self.y, w, h)
    }

    /// Same rect with a different top edge.
    #[inline]
    #[must_use]
    pub const fn with_y(self, y: u16) -> Self {
        Self::new(self.x, y, self.w, self.h)
    }

    /// Whether the rect lies inside a grid `column` cells wide and, when
    /// `max_row > 0`, `max_row` cells tall.
    #[inline]
    pub const fn fits_within(&self, column: u16, max_row: u16) -> bool {
        let right_ok = (self.x as u32 + self.w as u32) <= column as u32;
        let bottom_ok = max_row == 0 || (self.y as u32 + self.h as u32) <= max_row as u32;
        right_ok && bottom_ok
    }
}
