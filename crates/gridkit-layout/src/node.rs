//! Node model: identity, geometry, and per-node constraints.
//!
//! A [`GridNode`] is a passive record. The only rule it owns is size
//! clamping against its own [`SizeBounds`]; every other rule (collisions,
//! gravity, grid bounds) belongs to the engine.

use std::fmt;

use gridkit_core::GridRect;
use serde::{Deserialize, Serialize};

use crate::error::GridModelError;

/// Stable identifier for grid nodes.
///
/// Assigned by the engine in insertion order. `0` is reserved/invalid so IDs
/// are always non-zero. Renderers keep their own `NodeId -> element` map; the
/// engine never holds caller objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Lowest valid node ID.
    pub const MIN: Self = Self(1);

    /// Create a new node ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, GridModelError> {
        if raw == 0 {
            return Err(GridModelError::ZeroNodeId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or `None` on overflow.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional per-node size bounds, in cells.
///
/// When both ends of an axis are set and `min > max`, the minimum wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeBounds {
    pub min_w: Option<u16>,
    pub max_w: Option<u16>,
    pub min_h: Option<u16>,
    pub max_h: Option<u16>,
}

impl SizeBounds {
    /// No bounds on either axis.
    pub const UNBOUNDED: Self = Self {
        min_w: None,
        max_w: None,
        min_h: None,
        max_h: None,
    };

    /// Clamp a proposed width. Never returns 0.
    #[must_use]
    pub fn clamp_w(self, w: u16) -> u16 {
        clamp_axis(w, self.min_w, self.max_w)
    }

    /// Clamp a proposed height. Never returns 0.
    #[must_use]
    pub fn clamp_h(self, h: u16) -> u16 {
        clamp_axis(h, self.min_h, self.max_h)
    }

    /// Clamp a proposed size on both axes.
    #[must_use]
    pub fn clamp(self, w: u16, h: u16) -> (u16, u16) {
        (self.clamp_w(w), self.clamp_h(h))
    }

    /// Whether `(w, h)` satisfies the bounds on a grid `column` cells wide.
    ///
    /// The column width caps the effective minimum width.
    #[must_use]
    pub fn admits(self, w: u16, h: u16, column: u16) -> bool {
        let min_w = self.min_w.unwrap_or(1).min(column).max(1);
        let w_ok = w >= min_w && self.max_w.is_none_or(|max| w <= max.max(min_w));
        let min_h = self.min_h.unwrap_or(1).max(1);
        let h_ok = h >= min_h && self.max_h.is_none_or(|max| h <= max.max(min_h));
        w_ok && h_ok
    }
}

fn clamp_axis(value: u16, min: Option<u16>, max: Option<u16>) -> u16 {
    let mut value = value;
    if let Some(max) = max {
        value = value.min(max);
    }
    if let Some(min) = min {
        value = value.max(min);
    }
    value.max(1)
}

/// Creation options for a new node.
///
/// Missing `x`/`y`, or `auto_position`, asks the engine to pick the first
/// free slot. `no_move`/`no_resize` left as `None` inherit the grid-wide
/// defaults (`disable_drag`/`disable_resize`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    pub x: Option<u16>,
    pub y: Option<u16>,
    pub w: u16,
    pub h: u16,
    pub auto_position: bool,
    pub bounds: SizeBounds,
    pub locked: bool,
    pub no_move: Option<bool>,
    pub no_resize: Option<bool>,
    pub key: Option<String>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            w: 1,
            h: 1,
            auto_position: false,
            bounds: SizeBounds::UNBOUNDED,
            locked: false,
            no_move: None,
            no_resize: None,
            key: None,
        }
    }
}

impl NodeSpec {
    /// A `w x h` node with no position (auto-placed).
    #[must_use]
    pub fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            ..Self::default()
        }
    }

    /// Request an explicit top-left cell.
    #[must_use]
    pub fn at(mut self, x: u16, y: u16) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Ignore any explicit position and search for the first free slot.
    #[must_use]
    pub fn auto_position(mut self) -> Self {
        self.auto_position = true;
        self
    }

    /// Set all size bounds at once.
    #[must_use]
    pub fn bounds(mut self, bounds: SizeBounds) -> Self {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub fn min_w(mut self, min_w: u16) -> Self {
        self.bounds.min_w = Some(min_w);
        self
    }

    #[must_use]
    pub fn max_w(mut self, max_w: u16) -> Self {
        self.bounds.max_w = Some(max_w);
        self
    }

    #[must_use]
    pub fn min_h(mut self, min_h: u16) -> Self {
        self.bounds.min_h = Some(min_h);
        self
    }

    #[must_use]
    pub fn max_h(mut self, max_h: u16) -> Self {
        self.bounds.max_h = Some(max_h);
        self
    }

    /// Forbid both moving and resizing.
    #[must_use]
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    #[must_use]
    pub fn no_move(mut self) -> Self {
        self.no_move = Some(true);
        self
    }

    #[must_use]
    pub fn no_resize(mut self) -> Self {
        self.no_resize = Some(true);
        self
    }

    /// Caller-supplied identifier, unique per grid.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Whether the engine, not the caller, chooses the position.
    #[must_use]
    pub fn wants_auto_position(&self) -> bool {
        self.auto_position || self.x.is_none() || self.y.is_none()
    }
}

/// Partial geometry change for [`crate::GridEngine::update`].
///
/// Absent fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeUpdate {
    pub x: Option<u16>,
    pub y: Option<u16>,
    pub w: Option<u16>,
    pub h: Option<u16>,
}

impl NodeUpdate {
    #[must_use]
    pub fn position(x: u16, y: u16) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn size(w: u16, h: u16) -> Self {
        Self {
            w: Some(w),
            h: Some(h),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rect(rect: GridRect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            w: Some(rect.w),
            h: Some(rect.h),
        }
    }

    pub(crate) fn touches_position(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    pub(crate) fn touches_size(&self) -> bool {
        self.w.is_some() || self.h.is_some()
    }

    /// Apply to `rect`, skipping the axes a node is not allowed to change.
    pub(crate) fn apply(&self, rect: GridRect, can_move: bool, can_resize: bool) -> GridRect {
        let mut next = rect;
        if can_move && self.touches_position() {
            next.x = self.x.unwrap_or(rect.x);
            next.y = self.y.unwrap_or(rect.y);
        }
        if can_resize && self.touches_size() {
            next.w = self.w.unwrap_or(rect.w);
            next.h = self.h.unwrap_or(rect.h);
        }
        next
    }
}

/// One placed widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridNode {
    pub(crate) id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) key: Option<String>,
    #[serde(flatten)]
    pub(crate) rect: GridRect,
    #[serde(default)]
    pub(crate) bounds: SizeBounds,
    #[serde(default)]
    pub(crate) locked: bool,
    #[serde(default)]
    pub(crate) no_move: bool,
    #[serde(default)]
    pub(crate) no_resize: bool,
}

impl GridNode {
    pub(crate) fn new(id: NodeId, rect: GridRect) -> Self {
        Self {
            id,
            key: None,
            rect,
            bounds: SizeBounds::UNBOUNDED,
            locked: false,
            no_move: false,
            no_resize: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub const fn rect(&self) -> GridRect {
        self.rect
    }

    #[must_use]
    pub const fn x(&self) -> u16 {
        self.rect.x
    }

    #[must_use]
    pub const fn y(&self) -> u16 {
        self.rect.y
    }

    #[must_use]
    pub const fn w(&self) -> u16 {
        self.rect.w
    }

    #[must_use]
    pub const fn h(&self) -> u16 {
        self.rect.h
    }

    #[must_use]
    pub const fn bounds(&self) -> SizeBounds {
        self.bounds
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether caller intents may change this node's position.
    #[must_use]
    pub const fn can_move(&self) -> bool {
        !self.locked && !self.no_move
    }

    /// Whether caller intents may change this node's size.
    #[must_use]
    pub const fn can_resize(&self) -> bool {
        !self.locked && !self.no_resize
    }
}
