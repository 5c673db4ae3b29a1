//! Transactional grid engine.
//!
//! Every mutating call runs against a clone of the grid state. On success
//! the clone replaces the live state and the caller gets a
//! [`GridOperationOutcome`]; on failure the live state is untouched and the
//! caller gets a [`GridOperationError`] carrying both state hashes.
//!
//! Outside a batch the registered [`GridObserver`] hears about every
//! operation that changed geometry. Inside a batch it hears nothing until
//! [`GridEngine::end_batch`], which compacts once and reports the aggregate.

use std::fmt;

use gridkit_core::GridRect;

use crate::batch::{BatchController, BatchState};
use crate::change::{GridChangeSet, GridObserver, baseline_of};
use crate::column::{SortDirection, reading_order};
use crate::error::{GridError, GridModelError, GridOperationError, GridOperationKind};
use crate::node::{GridNode, NodeId, NodeSpec, NodeUpdate, SizeBounds};
use crate::options::{GridOptions, GridOptionsError};
use crate::snapshot::{GRID_SNAPSHOT_SCHEMA_VERSION, GridSnapshot};
use crate::state::{GridState, StepContext};
use crate::trace;

/// Successful operation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridOperationOutcome {
    pub kind: GridOperationKind,
    /// Node the operation addressed; for adds, the newly assigned ID.
    pub target: Option<NodeId>,
    /// Empty while batched; the aggregate arrives from `end_batch`.
    pub changes: GridChangeSet,
    pub before_hash: u64,
    pub after_hash: u64,
    /// Compaction and notification were deferred to batch end.
    pub deferred: bool,
}

pub type GridOpResult = Result<GridOperationOutcome, GridOperationError>;

pub struct GridEngine {
    state: GridState,
    batch: BatchController,
    observer: Option<Box<dyn GridObserver>>,
}

impl fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEngine")
            .field("state", &self.state)
            .field("batch", &self.batch.state())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl GridEngine {
    /// Create an empty grid.
    pub fn new(options: GridOptions) -> Result<Self, GridOptionsError> {
        let options = options.checked()?;
        Ok(Self::from_state(GridState::new(options)))
    }

    fn from_state(state: GridState) -> Self {
        Self {
            state,
            batch: BatchController::default(),
            observer: None,
        }
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// Structure is validated as stored; outside float mode the nodes are
    /// then compacted, so a snapshot with gaps loads settled.
    pub fn from_snapshot(snapshot: GridSnapshot) -> Result<Self, GridModelError> {
        if snapshot.schema_version != GRID_SNAPSHOT_SCHEMA_VERSION {
            return Err(GridModelError::UnsupportedSchemaVersion {
                version: snapshot.schema_version,
            });
        }
        let mut state = GridState::from_parts(snapshot.options, snapshot.next_id, snapshot.nodes);
        state.validate_structure()?;
        if !state.options().float {
            let report = state.compact_now();
            if !report.moved.is_empty() {
                trace::record_snapshot_repaired(report.moved.len());
            }
        }
        state.validate()?;
        Ok(Self::from_state(state))
    }

    #[must_use]
    pub fn to_snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            schema_version: GRID_SNAPSHOT_SCHEMA_VERSION,
            options: self.state.options().clone(),
            next_id: self.state.next_id(),
            nodes: self.state.nodes().to_vec(),
        }
    }

    /// Deterministic hash of options, ID allocator, and node geometry.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Check every layout invariant against the live state.
    pub fn validate(&self) -> Result<(), GridModelError> {
        self.state.validate()
    }

    /// Register the change observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl GridObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    fn notify(&mut self, changes: &GridChangeSet) {
        if changes.is_empty() {
            return;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.on_change(changes);
        }
    }

    fn run<F>(&mut self, kind: GridOperationKind, target: Option<NodeId>, op: F) -> GridOpResult
    where
        F: FnOnce(&mut GridState, &mut StepContext) -> Result<(), GridError>,
    {
        let batched = self.batch.is_batched();
        let span = tracing::debug_span!(
            "grid.op",
            kind = %kind,
            node_id = target.map_or(0, NodeId::get),
            column = self.state.options().column,
            batched = batched,
        );
        let _guard = span.enter();

        let before_hash = self.state.state_hash();
        let baseline = (!batched).then(|| baseline_of(self.state.nodes()));
        let mut working = self.state.clone();
        let mut ctx = StepContext::new(batched);

        if let Err(reason) = op(&mut working, &mut ctx) {
            trace::record_rejected(kind, target, &reason);
            return Err(GridOperationError {
                kind,
                target,
                before_hash,
                after_hash: working.state_hash(),
                reason,
            });
        }

        let after_hash = working.state_hash();
        self.state = working;

        let StepContext { removed, touched, .. } = ctx;
        let changes = match baseline {
            Some(baseline) => {
                let changes = GridChangeSet::diff(&baseline, self.state.nodes(), removed);
                self.notify(&changes);
                changes
            }
            None => {
                self.batch.absorb(removed, touched);
                GridChangeSet::default()
            }
        };

        trace::record_applied(kind, target, &changes, batched, after_hash);
        Ok(GridOperationOutcome {
            kind,
            target,
            changes,
            before_hash,
            after_hash,
            deferred: batched,
        })
    }

    /// Add a node, returning its ID in `outcome.target`.
    ///
    /// With an explicit position the node is placed there (clamped into the
    /// grid) and colliders are pushed down. When that would push something
    /// past `max_row`, or when no position was given, the first free slot in
    /// row-major order is used instead.
    pub fn add(&mut self, spec: NodeSpec) -> GridOpResult {
        let target = Some(self.state.next_id());
        self.run(GridOperationKind::Add, target, |state, ctx| {
            state.add(&spec, ctx).map(|_| ())
        })
    }

    /// Whether `spec` could be added right now. Never mutates.
    #[must_use]
    pub fn will_it_fit(&self, spec: &NodeSpec) -> bool {
        let mut probe = self.state.clone();
        probe.add(spec, &mut StepContext::new(false)).is_ok()
    }

    /// Move a node's top-left cell. No-op for locked or `no_move` nodes.
    pub fn move_node(&mut self, id: NodeId, x: u16, y: u16) -> GridOpResult {
        self.run(GridOperationKind::Move, Some(id), |state, ctx| {
            state.move_node(id, x, y, ctx)
        })
    }

    /// Resize a node. No-op for locked or `no_resize` nodes.
    pub fn resize(&mut self, id: NodeId, w: u16, h: u16) -> GridOpResult {
        self.run(GridOperationKind::Resize, Some(id), |state, ctx| {
            state.resize_node(id, w, h, ctx)
        })
    }

    /// Move and resize in one step.
    pub fn update(&mut self, id: NodeId, update: NodeUpdate) -> GridOpResult {
        self.run(GridOperationKind::Update, Some(id), |state, ctx| {
            state.update_node(id, update, ctx)
        })
    }

    pub fn remove(&mut self, id: NodeId) -> GridOpResult {
        self.run(GridOperationKind::Remove, Some(id), |state, ctx| state.remove(id, ctx))
    }

    /// Remove every node and forget every cached column layout.
    pub fn remove_all(&mut self) -> GridOpResult {
        self.run(GridOperationKind::RemoveAll, None, |state, ctx| {
            state.remove_all(ctx);
            Ok(())
        })
    }

    /// Float every node as high as it goes, even in float mode.
    pub fn compact(&mut self) -> GridOpResult {
        self.run(GridOperationKind::Compact, None, |state, ctx| {
            state.compact_all(ctx);
            Ok(())
        })
    }

    /// Change the column count, restoring a cached layout when one exists.
    pub fn set_column(&mut self, column: u16) -> GridOpResult {
        self.set_column_with(column, true)
    }

    /// Change the column count; with `propagate = false` existing nodes are
    /// left where they are except those that no longer fit, which are
    /// clamped inside the new width. Nothing is cached or restored then.
    pub fn set_column_with(&mut self, column: u16, propagate: bool) -> GridOpResult {
        self.run(GridOperationKind::SetColumn, None, |state, ctx| {
            if propagate {
                state.set_column(column, ctx)
            } else {
                state.set_column_in_place(column, ctx)
            }
        })
    }

    pub fn set_float(&mut self, float: bool) -> GridOpResult {
        self.run(GridOperationKind::SetFloat, None, |state, ctx| {
            state.set_float(float, ctx);
            Ok(())
        })
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> GridOpResult {
        self.run(GridOperationKind::SetLocked, Some(id), |state, ctx| {
            state.set_locked(id, locked, ctx)
        })
    }

    pub fn set_movable(&mut self, id: NodeId, movable: bool) -> GridOpResult {
        self.run(GridOperationKind::SetMovable, Some(id), |state, ctx| {
            state.set_movable(id, movable, ctx)
        })
    }

    pub fn set_resizable(&mut self, id: NodeId, resizable: bool) -> GridOpResult {
        self.run(GridOperationKind::SetResizable, Some(id), |state, ctx| {
            state.set_resizable(id, resizable, ctx)
        })
    }

    /// Replace all size bounds of a node; its current size is re-clamped.
    pub fn set_size_bounds(&mut self, id: NodeId, bounds: SizeBounds) -> GridOpResult {
        self.edit_bounds(id, move |current| *current = bounds)
    }

    pub fn set_min_width(&mut self, id: NodeId, min_w: Option<u16>) -> GridOpResult {
        self.edit_bounds(id, move |bounds| bounds.min_w = min_w)
    }

    pub fn set_max_width(&mut self, id: NodeId, max_w: Option<u16>) -> GridOpResult {
        self.edit_bounds(id, move |bounds| bounds.max_w = max_w)
    }

    pub fn set_min_height(&mut self, id: NodeId, min_h: Option<u16>) -> GridOpResult {
        self.edit_bounds(id, move |bounds| bounds.min_h = min_h)
    }

    pub fn set_max_height(&mut self, id: NodeId, max_h: Option<u16>) -> GridOpResult {
        self.edit_bounds(id, move |bounds| bounds.max_h = max_h)
    }

    fn edit_bounds(&mut self, id: NodeId, edit: impl FnOnce(&mut SizeBounds)) -> GridOpResult {
        self.run(GridOperationKind::SetSizeBounds, Some(id), |state, ctx| {
            state.set_size_bounds(id, edit, ctx)
        })
    }

    /// Allow or forbid moving every node; `include_new` also changes the
    /// default for nodes added later.
    pub fn enable_move(&mut self, enabled: bool, include_new: bool) -> GridOpResult {
        self.run(GridOperationKind::EnableMove, None, |state, ctx| {
            state.enable_move(enabled, include_new, ctx);
            Ok(())
        })
    }

    /// Allow or forbid resizing every node; `include_new` also changes the
    /// default for nodes added later.
    pub fn enable_resize(&mut self, enabled: bool, include_new: bool) -> GridOpResult {
        self.run(GridOperationKind::EnableResize, None, |state, ctx| {
            state.enable_resize(enabled, include_new, ctx);
            Ok(())
        })
    }

    /// Start deferring compaction and notification.
    ///
    /// Returns `false` if a batch is already open; batches do not nest.
    pub fn begin_batch(&mut self) -> bool {
        let opened = self.batch.begin(self.state.nodes());
        if opened {
            tracing::debug!(target: "gridkit.engine", nodes = self.state.nodes().len() as u64, "batch opened");
        }
        opened
    }

    /// Close the batch: compact once (outside float mode) and notify once.
    ///
    /// Returns `None` when no batch was open.
    pub fn end_batch(&mut self) -> Option<GridOperationOutcome> {
        let ledger = self.batch.finish()?;
        let kind = GridOperationKind::EndBatch;
        let span = tracing::debug_span!(
            "grid.op",
            kind = %kind,
            node_id = 0_u64,
            column = self.state.options().column,
            batched = false,
        );
        let _guard = span.enter();

        let before_hash = self.state.state_hash();
        if !self.state.options().float {
            self.state.compact_now();
        }
        if tracing::enabled!(target: "gridkit.engine", tracing::Level::WARN) {
            if let Err(violation) = self.state.validate() {
                trace::record_invariant_violation(kind, &violation);
            }
        }
        let after_hash = self.state.state_hash();

        let changes = GridChangeSet::diff(&ledger.baseline, self.state.nodes(), ledger.removed);
        trace::record_batch_end(ledger.operations, ledger.dirty.len(), &changes);
        self.notify(&changes);
        trace::record_applied(kind, None, &changes, false, after_hash);

        Some(GridOperationOutcome {
            kind,
            target: None,
            changes,
            before_hash,
            after_hash,
            deferred: false,
        })
    }

    #[must_use]
    pub fn in_batch(&self) -> bool {
        self.batch.is_batched()
    }

    #[must_use]
    pub fn batch_state(&self) -> BatchState {
        self.batch.state()
    }

    #[must_use]
    pub fn options(&self) -> &GridOptions {
        self.state.options()
    }

    #[must_use]
    pub fn column(&self) -> u16 {
        self.state.options().column
    }

    #[must_use]
    pub fn is_float(&self) -> bool {
        self.state.options().float
    }

    #[must_use]
    pub fn max_row(&self) -> u16 {
        self.state.options().max_row
    }

    /// Rows currently in use, never less than `min_row`.
    #[must_use]
    pub fn row_count(&self) -> u16 {
        self.state.row_count()
    }

    #[must_use]
    pub fn is_area_empty(&self, x: u16, y: u16, w: u16, h: u16) -> bool {
        self.state.is_area_empty(GridRect::new(x, y, w, h))
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&GridNode> {
        self.state.node(id)
    }

    /// The node covering cell `(x, y)`, if any.
    #[must_use]
    pub fn node_at(&self, x: u16, y: u16) -> Option<&GridNode> {
        self.state.nodes().iter().find(|node| node.rect.contains(x, y))
    }

    #[must_use]
    pub fn node_by_key(&self, key: &str) -> Option<&GridNode> {
        self.state.node_by_key(key)
    }

    /// All nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[GridNode] {
        self.state.nodes()
    }

    /// Nodes in reading order (row, then column); ties keep insertion order.
    #[must_use]
    pub fn sorted_nodes(&self, dir: SortDirection) -> Vec<&GridNode> {
        let nodes = self.state.nodes();
        reading_order(nodes, dir).into_iter().map(|idx| &nodes[idx]).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.nodes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.nodes().is_empty()
    }

    /// Column counts with a remembered layout.
    #[must_use]
    pub fn cached_columns(&self) -> Vec<u16> {
        self.state.cached_columns()
    }
}
