//! The grid aggregate and its operation bodies.
//!
//! [`GridState`] is plain data plus the algorithms that mutate it. It knows
//! nothing about transactions, batching, or observers: the engine clones it,
//! runs one operation on the clone, and swaps the clone in on success. Any
//! `Err` returned from here therefore leaves the caller's state untouched.

use std::collections::BTreeSet;

use gridkit_core::GridRect;

use crate::collision::{is_free, resolve_collisions, settle_in_order};
use crate::column::{ColumnLayoutCache, one_column_order, rescale_rect, stack_single_column};
use crate::compact::{CompactionReport, compact, first_unsettled};
use crate::error::{GridError, GridModelError};
use crate::node::{GridNode, NodeId, NodeSpec, NodeUpdate, SizeBounds};
use crate::options::GridOptions;
use crate::placement::find_free_slot;
use crate::snapshot::layout_hash;
use crate::trace;

/// Per-operation scratch state.
#[derive(Debug, Default)]
pub(crate) struct StepContext {
    /// Compaction is deferred to batch end.
    pub batched: bool,
    pub removed: Vec<GridNode>,
    pub touched: BTreeSet<NodeId>,
}

impl StepContext {
    pub fn new(batched: bool) -> Self {
        Self {
            batched,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GridState {
    options: GridOptions,
    nodes: Vec<GridNode>,
    next_id: NodeId,
    cache: ColumnLayoutCache,
}

impl GridState {
    pub fn new(options: GridOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            next_id: NodeId::MIN,
            cache: ColumnLayoutCache::default(),
        }
    }

    /// Rebuild from stored parts. Callers validate afterwards.
    pub fn from_parts(options: GridOptions, next_id: NodeId, nodes: Vec<GridNode>) -> Self {
        Self {
            options,
            nodes,
            next_id,
            cache: ColumnLayoutCache::default(),
        }
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    pub fn next_id(&self) -> NodeId {
        self.next_id
    }

    pub fn cached_columns(&self) -> Vec<u16> {
        self.cache.columns().collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&GridNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_by_key(&self, key: &str) -> Option<&GridNode> {
        self.nodes.iter().find(|node| node.key() == Some(key))
    }

    pub fn row_count(&self) -> u16 {
        let bottom = self.nodes.iter().map(|node| node.rect.bottom()).max().unwrap_or(0);
        bottom.max(self.options.min_row)
    }

    pub fn is_area_empty(&self, rect: GridRect) -> bool {
        is_free(&self.nodes, rect, None)
    }

    pub fn state_hash(&self) -> u64 {
        layout_hash(&self.options, self.next_id, &self.nodes)
    }

    fn index_of(&self, id: NodeId) -> Result<usize, GridError> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or(GridError::UnknownNode { node_id: id })
    }

    fn settles(&self, ctx: &StepContext) -> bool {
        !self.options.float && !ctx.batched
    }

    /// Record that `ids` were mutated at the current column count.
    fn touch(&mut self, ctx: &mut StepContext, ids: impl IntoIterator<Item = NodeId>) {
        ctx.touched.extend(ids);
        self.cache.invalidate(self.options.column);
    }

    /// Run gravity unconditionally; invalidates the live column's cache
    /// entry when anything rose.
    pub fn compact_now(&mut self) -> CompactionReport {
        let report = compact(&mut self.nodes);
        trace::record_compaction(report.passes, report.moved.len());
        if !report.moved.is_empty() {
            self.cache.invalidate(self.options.column);
        }
        report
    }

    fn settle(&mut self, ctx: &mut StepContext) {
        if self.settles(ctx) {
            let report = self.compact_now();
            ctx.touched.extend(report.moved);
        }
    }

    fn out_of_space(&self, w: u16, h: u16) -> GridError {
        GridError::OutOfSpace {
            w,
            h,
            max_row: self.options.max_row,
        }
    }

    /// Clamp a proposed rect for `node` into its size bounds and the grid.
    ///
    /// With `shift` the origin moves to make room; without it the size
    /// shrinks instead.
    fn fit_rect(&self, bounds: SizeBounds, rect: GridRect, shift: bool) -> Result<GridRect, GridError> {
        let column = self.options.column;
        let max_row = self.options.max_row;

        let mut w = bounds.clamp_w(rect.w).min(column);
        let mut x = rect.x.min(column - 1);
        if shift {
            x = x.min(column - w);
        } else {
            w = w.min(column - x);
        }

        let mut h = bounds.clamp_h(rect.h);
        let mut y = rect.y;
        if max_row > 0 {
            if h > max_row {
                return Err(self.out_of_space(w, h));
            }
            if shift {
                y = y.min(max_row - h);
            } else {
                h = h.min(max_row.saturating_sub(y)).max(1);
            }
        }

        if !bounds.admits(w, h, column - x) {
            return Err(self.out_of_space(w, h));
        }
        Ok(GridRect::new(x, y, w, h))
    }

    /// Install `rect` on `nodes[idx]`, push colliders away, then settle.
    fn place(&mut self, idx: usize, rect: GridRect, ctx: &mut StepContext) -> Result<(), GridError> {
        let id = self.nodes[idx].id;
        self.nodes[idx].rect = rect;
        let displaced = resolve_collisions(&mut self.nodes, idx, self.options.max_row)?;
        trace::record_collisions(id, displaced.len());
        self.touch(ctx, std::iter::once(id).chain(displaced));
        self.settle(ctx);
        Ok(())
    }

    pub fn add(&mut self, spec: &NodeSpec, ctx: &mut StepContext) -> Result<NodeId, GridError> {
        if let Some(key) = spec.key.as_deref()
            && self.node_by_key(key).is_some()
        {
            return Err(GridError::DuplicateKey { key: key.to_owned() });
        }

        let id = self.next_id;
        let next_id = id
            .checked_next()
            .ok_or(GridError::NodeIdOverflow { current: id })?;

        let column = self.options.column;
        let max_row = self.options.max_row;
        let w = spec.bounds.clamp_w(spec.w).min(column);
        let h = spec.bounds.clamp_h(spec.h);
        if max_row > 0 && h > max_row {
            return Err(self.out_of_space(w, h));
        }

        let mut node = GridNode::new(id, GridRect::new(0, 0, w, h));
        node.key = spec.key.clone();
        node.bounds = spec.bounds;
        node.locked = spec.locked;
        node.no_move = spec.no_move.unwrap_or(self.options.disable_drag);
        node.no_resize = spec.no_resize.unwrap_or(self.options.disable_resize);

        let mut placed = false;
        if let (false, Some(x), Some(y)) = (spec.wants_auto_position(), spec.x, spec.y) {
            let x = x.min(column - w);
            let y = if max_row > 0 { y.min(max_row - h) } else { y };
            let saved = self.nodes.clone();
            node.rect = GridRect::new(x, y, w, h);
            self.nodes.push(node.clone());
            let idx = self.nodes.len() - 1;
            match resolve_collisions(&mut self.nodes, idx, max_row) {
                Ok(displaced) => {
                    trace::record_collisions(id, displaced.len());
                    ctx.touched.extend(displaced);
                    placed = true;
                }
                // The requested spot overflows max_row; fall back to searching.
                Err(GridError::OutOfSpace { .. }) => self.nodes = saved,
                Err(err) => return Err(err),
            }
        }

        if !placed {
            let slot = find_free_slot(&self.nodes, w, h, column, max_row)
                .ok_or_else(|| self.out_of_space(w, h))?;
            node.rect = GridRect::new(slot.x, slot.y, w, h);
            self.nodes.push(node);
        }

        self.next_id = next_id;
        self.touch(ctx, [id]);
        self.settle(ctx);

        if let Some(node) = self.node(id) {
            tracing::debug!(
                target: "gridkit.engine",
                node_id = id.get(),
                x = node.rect.x,
                y = node.rect.y,
                w = node.rect.w,
                h = node.rect.h,
                "node placed"
            );
        }
        Ok(id)
    }

    pub fn move_node(&mut self, id: NodeId, x: u16, y: u16, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        let node = &self.nodes[idx];
        if !node.can_move() {
            return Ok(());
        }
        let target = self.fit_rect(node.bounds, node.rect.with_origin(x, y), true)?;
        if target == node.rect {
            return Ok(());
        }
        self.place(idx, target, ctx)
    }

    pub fn resize_node(&mut self, id: NodeId, w: u16, h: u16, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        let node = &self.nodes[idx];
        if !node.can_resize() {
            return Ok(());
        }
        let target = self.fit_rect(node.bounds, node.rect.with_size(w, h), false)?;
        if target == node.rect {
            return Ok(());
        }
        self.place(idx, target, ctx)
    }

    pub fn update_node(&mut self, id: NodeId, update: NodeUpdate, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        let node = &self.nodes[idx];
        if node.locked {
            return Ok(());
        }
        let proposed = update.apply(node.rect, node.can_move(), node.can_resize());
        let shift = node.can_move() && update.touches_position();
        let target = self.fit_rect(node.bounds, proposed, shift)?;
        if target == node.rect {
            return Ok(());
        }
        self.place(idx, target, ctx)
    }

    pub fn remove(&mut self, id: NodeId, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        let node = self.nodes.remove(idx);
        self.cache.forget_node(id);
        self.touch(ctx, [id]);
        ctx.removed.push(node);
        self.settle(ctx);
        Ok(())
    }

    pub fn remove_all(&mut self, ctx: &mut StepContext) {
        ctx.touched.extend(self.nodes.iter().map(GridNode::id));
        ctx.removed.append(&mut self.nodes);
        self.cache.clear();
    }

    /// Caller-requested compaction; runs in float mode too.
    pub fn compact_all(&mut self, ctx: &mut StepContext) {
        let report = self.compact_now();
        ctx.touched.extend(report.moved);
    }

    pub fn set_float(&mut self, float: bool, ctx: &mut StepContext) {
        if self.options.float == float {
            return;
        }
        self.options.float = float;
        // Leaving float mode gravitates once; entering it freezes in place.
        self.settle(ctx);
    }

    pub fn set_column(&mut self, column: u16, ctx: &mut StepContext) -> Result<(), GridError> {
        if column == 0 {
            return Err(GridError::InvalidColumn { column });
        }
        let from = self.options.column;
        if column == from {
            return Ok(());
        }

        self.cache.remember(from, &self.nodes);
        let restored = self.cache.get(column).map(<[_]>::to_vec);
        let max_row = self.options.max_row;

        if let Some(cached) = &restored {
            // Cached nodes come back verbatim and settle first; anything added
            // since the snapshot is rescaled around them.
            let mut first = Vec::new();
            let mut rest = Vec::new();
            for (idx, node) in self.nodes.iter_mut().enumerate() {
                let remembered = cached.iter().find(|placement| {
                    placement.id == node.id
                        && node
                            .bounds
                            .admits(placement.rect.w, placement.rect.h, column - placement.rect.x)
                });
                match remembered {
                    Some(placement) => {
                        node.rect = placement.rect;
                        first.push(idx);
                    }
                    None => {
                        node.rect = rescale_within_bounds(node, from, column);
                        rest.push(idx);
                    }
                }
            }
            rest.sort_by_key(|&idx| !self.nodes[idx].locked);
            first.extend(rest);
            settle_in_order(&mut self.nodes, &first, max_row)?;
        } else if column == 1 {
            let order = one_column_order(&self.nodes, self.options.one_column_dom_sort);
            stack_single_column(&mut self.nodes, &order);
        } else {
            for node in &mut self.nodes {
                node.rect = rescale_within_bounds(node, from, column);
            }
            let mut order: Vec<usize> = (0..self.nodes.len()).collect();
            order.sort_by_key(|&idx| !self.nodes[idx].locked);
            settle_in_order(&mut self.nodes, &order, max_row)?;
        }

        self.options.column = column;
        ctx.touched.extend(self.nodes.iter().map(GridNode::id));
        if self.settles(ctx) {
            let report = compact(&mut self.nodes);
            trace::record_compaction(report.passes, report.moved.len());
        }

        if let Some(node) = self
            .nodes
            .iter()
            .find(|node| !node.rect.fits_within(column, max_row))
        {
            return Err(self.out_of_space(node.rect.w, node.rect.h));
        }

        trace::record_column_change(from, column, restored.is_some(), true);
        Ok(())
    }

    /// Change the column count without reflowing the layout.
    ///
    /// Nodes that still fit keep their geometry. Nodes reaching past the new
    /// right edge shrink to the grid width and slide left, then settle below
    /// the untouched ones. No layout is remembered or restored; only the
    /// cached entry for the new count is dropped, since the live layout now
    /// owns that count.
    pub fn set_column_in_place(&mut self, column: u16, ctx: &mut StepContext) -> Result<(), GridError> {
        if column == 0 {
            return Err(GridError::InvalidColumn { column });
        }
        let from = self.options.column;
        if column == from {
            return Ok(());
        }
        self.options.column = column;
        self.cache.invalidate(column);

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut clamped = Vec::new();
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            if node.rect.right() <= column {
                order.push(idx);
                continue;
            }
            let w = node.rect.w.min(column);
            let x = node.rect.x.min(column - w);
            node.rect = GridRect::new(x, node.rect.y, w, node.rect.h);
            ctx.touched.insert(node.id);
            clamped.push(idx);
        }
        clamped.sort_by_key(|&idx| !self.nodes[idx].locked);
        order.extend(clamped);
        let displaced = settle_in_order(&mut self.nodes, &order, self.options.max_row)?;
        ctx.touched.extend(displaced);
        self.settle(ctx);

        trace::record_column_change(from, column, false, false);
        Ok(())
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        if self.nodes[idx].locked == locked {
            return Ok(());
        }
        self.nodes[idx].locked = locked;
        ctx.touched.insert(id);
        // An unlocked node may now rise.
        self.settle(ctx);
        Ok(())
    }

    pub fn set_movable(&mut self, id: NodeId, movable: bool, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        if self.nodes[idx].no_move != movable {
            return Ok(());
        }
        self.nodes[idx].no_move = !movable;
        ctx.touched.insert(id);
        Ok(())
    }

    pub fn set_resizable(&mut self, id: NodeId, resizable: bool, ctx: &mut StepContext) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        if self.nodes[idx].no_resize != resizable {
            return Ok(());
        }
        self.nodes[idx].no_resize = !resizable;
        ctx.touched.insert(id);
        Ok(())
    }

    /// Replace a node's size bounds and re-clamp its current size.
    pub fn set_size_bounds(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut SizeBounds),
        ctx: &mut StepContext,
    ) -> Result<(), GridError> {
        let idx = self.index_of(id)?;
        let mut bounds = self.nodes[idx].bounds;
        edit(&mut bounds);
        if bounds == self.nodes[idx].bounds {
            return Ok(());
        }
        self.nodes[idx].bounds = bounds;
        ctx.touched.insert(id);

        let current = self.nodes[idx].rect;
        let target = self.fit_rect(bounds, current, false)?;
        if target == current {
            return Ok(());
        }
        self.place(idx, target, ctx)
    }

    pub fn enable_move(&mut self, enabled: bool, include_new: bool, ctx: &mut StepContext) {
        for node in &mut self.nodes {
            if node.no_move == enabled {
                node.no_move = !enabled;
                ctx.touched.insert(node.id);
            }
        }
        if include_new {
            self.options.disable_drag = !enabled;
        }
    }

    pub fn enable_resize(&mut self, enabled: bool, include_new: bool, ctx: &mut StepContext) {
        for node in &mut self.nodes {
            if node.no_resize == enabled {
                node.no_resize = !enabled;
                ctx.touched.insert(node.id);
            }
        }
        if include_new {
            self.options.disable_resize = !enabled;
        }
    }

    /// Structural checks: identity, bounds, sizes, overlaps.
    pub fn validate_structure(&self) -> Result<(), GridModelError> {
        let issues = self.options.validate();
        if !issues.is_empty() {
            return Err(GridModelError::InvalidOptions { issues });
        }

        let column = self.options.column;
        let max_row = self.options.max_row;
        let mut ids = BTreeSet::new();
        let mut keys = BTreeSet::new();

        for node in &self.nodes {
            let node_id = node.id;
            if !ids.insert(node_id) {
                return Err(GridModelError::DuplicateNodeId { node_id });
            }
            if let Some(key) = node.key()
                && !keys.insert(key)
            {
                return Err(GridModelError::DuplicateKey { key: key.to_owned() });
            }
            if node_id >= self.next_id {
                return Err(GridModelError::StaleNextId {
                    next_id: self.next_id,
                    node_id,
                });
            }
            if node.rect.is_empty() {
                return Err(GridModelError::EmptyNode { node_id });
            }
            if !node.rect.fits_within(column, max_row) {
                return Err(GridModelError::OutOfBounds {
                    node_id,
                    column,
                    max_row,
                });
            }
            if !node.bounds.admits(node.rect.w, node.rect.h, column - node.rect.x) {
                return Err(GridModelError::SizeOutOfBounds {
                    node_id,
                    w: node.rect.w,
                    h: node.rect.h,
                });
            }
        }

        for (idx, first) in self.nodes.iter().enumerate() {
            if let Some(second) = self.nodes[idx + 1..]
                .iter()
                .find(|other| other.rect.intersects(&first.rect))
            {
                return Err(GridModelError::Overlap {
                    first: first.id,
                    second: second.id,
                });
            }
        }

        Ok(())
    }

    /// Every invariant, including gravity settling outside float mode.
    pub fn validate(&self) -> Result<(), GridModelError> {
        self.validate_structure()?;
        if !self.options.float
            && let Some((idx, floor)) = first_unsettled(&self.nodes)
        {
            let node = &self.nodes[idx];
            return Err(GridModelError::Unsettled {
                node_id: node.id,
                y: node.rect.y,
                floor,
            });
        }
        Ok(())
    }
}

/// Rescale a node's horizontal geometry and re-apply its width bounds.
fn rescale_within_bounds(node: &GridNode, from: u16, to: u16) -> GridRect {
    let scaled = rescale_rect(node.rect, from, to);
    let w = node.bounds.clamp_w(scaled.w).min(to);
    let x = scaled.x.min(to - w);
    GridRect::new(x, scaled.y, w, scaled.h)
}
