//! Column-count reflow and the per-column layout cache.
//!
//! When the column count changes, the layout active at the old count is
//! remembered so a later switch back restores it exactly. Counts never seen
//! before are derived by proportional rescaling, or by stacking when the
//! grid collapses to a single column.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use gridkit_core::GridRect;

use crate::node::{GridNode, NodeId};

/// One node's geometry as it was at a cached column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CachedPlacement {
    pub id: NodeId,
    pub rect: GridRect,
}

/// Layouts keyed by the column count they were captured at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ColumnLayoutCache {
    layouts: BTreeMap<u16, Vec<CachedPlacement>>,
}

impl ColumnLayoutCache {
    pub fn contains(&self, column: u16) -> bool {
        self.layouts.contains_key(&column)
    }

    /// Capture `nodes` under `column` unless an entry already exists.
    ///
    /// Returns whether a new entry was stored.
    pub fn remember(&mut self, column: u16, nodes: &[GridNode]) -> bool {
        if self.contains(column) {
            return false;
        }
        let placements = nodes
            .iter()
            .map(|node| CachedPlacement {
                id: node.id,
                rect: node.rect,
            })
            .collect();
        self.layouts.insert(column, placements);
        true
    }

    pub fn get(&self, column: u16) -> Option<&[CachedPlacement]> {
        self.layouts.get(&column).map(Vec::as_slice)
    }

    /// Drop the entry for `column`; the live layout supersedes it.
    pub fn invalidate(&mut self, column: u16) {
        self.layouts.remove(&column);
    }

    /// Remove a deleted node from every cached layout.
    pub fn forget_node(&mut self, id: NodeId) {
        for placements in self.layouts.values_mut() {
            placements.retain(|placement| placement.id != id);
        }
    }

    pub fn clear(&mut self) {
        self.layouts.clear();
    }

    pub fn columns(&self) -> impl Iterator<Item = u16> + '_ {
        self.layouts.keys().copied()
    }
}

/// `round(value * to / from)`, rounding halves up.
fn scale(value: u16, from: u16, to: u16) -> u16 {
    let numerator = u32::from(value) * u32::from(to) * 2 + u32::from(from);
    let scaled = numerator / (u32::from(from) * 2);
    u16::try_from(scaled).unwrap_or(u16::MAX)
}

/// Proportionally rescale `x` and `w` from `from` columns to `to` columns.
///
/// `w` never drops below 1 and the result always fits inside `to` columns.
pub(crate) fn rescale_rect(rect: GridRect, from: u16, to: u16) -> GridRect {
    let w = scale(rect.w, from, to).clamp(1, to);
    let x = scale(rect.x, from, to).min(to - w);
    GridRect::new(x, rect.y, w, rect.h)
}

/// Reading order of nodes: row first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Top-left first.
    #[default]
    Ascending,
    /// Bottom-right first.
    Descending,
}

/// Node indices sorted by `(y, x)` in `dir`; ties keep insertion order.
pub(crate) fn reading_order(nodes: &[GridNode], dir: SortDirection) -> Vec<usize> {
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    let key = |idx: usize| (nodes[idx].rect.y, nodes[idx].rect.x);
    match dir {
        SortDirection::Ascending => order.sort_by_key(|&idx| key(idx)),
        SortDirection::Descending => order.sort_by_key(|&idx| Reverse(key(idx))),
    }
    order
}

/// Order in which nodes are stacked in one-column mode.
///
/// Reading order, unless `dom_sort` asks for plain insertion order.
pub(crate) fn one_column_order(nodes: &[GridNode], dom_sort: bool) -> Vec<usize> {
    if dom_sort {
        return (0..nodes.len()).collect();
    }
    reading_order(nodes, SortDirection::Ascending)
}

/// Stack nodes full-width, top to bottom, in `order`.
pub(crate) fn stack_single_column(nodes: &mut [GridNode], order: &[usize]) {
    let mut y: u16 = 0;
    for &idx in order {
        let h = nodes[idx].rect.h;
        nodes[idx].rect = GridRect::new(0, y, 1, h);
        y = y.saturating_add(h);
    }
}
