//! Engine observability: monotonic counters and structured log helpers.
//!
//! - **Counters**: `grid_ops_applied_total`, `grid_ops_rejected_total`,
//!   `grid_compactions_total`. Process-wide, relaxed ordering.
//! - **Events**: target `gridkit.engine`, structured fields only. Every
//!   operation additionally runs inside a `grid.op` debug span opened by the
//!   engine.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::change::GridChangeSet;
use crate::error::{GridError, GridModelError, GridOperationKind};
use crate::node::NodeId;

static GRID_OPS_APPLIED: AtomicU64 = AtomicU64::new(0);
static GRID_OPS_REJECTED: AtomicU64 = AtomicU64::new(0);
static GRID_COMPACTIONS: AtomicU64 = AtomicU64::new(0);

/// Total operations applied (monotonic counter).
#[must_use]
pub fn grid_ops_applied_total() -> u64 {
    GRID_OPS_APPLIED.load(Ordering::Relaxed)
}

/// Total operations rejected and rolled back (monotonic counter).
#[must_use]
pub fn grid_ops_rejected_total() -> u64 {
    GRID_OPS_REJECTED.load(Ordering::Relaxed)
}

/// Total compaction runs that moved at least one node (monotonic counter).
#[must_use]
pub fn grid_compactions_total() -> u64 {
    GRID_COMPACTIONS.load(Ordering::Relaxed)
}

fn raw(node: Option<NodeId>) -> u64 {
    node.map_or(0, NodeId::get)
}

pub(crate) fn record_applied(
    kind: GridOperationKind,
    target: Option<NodeId>,
    changes: &GridChangeSet,
    deferred: bool,
    after_hash: u64,
) {
    GRID_OPS_APPLIED.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        target: "gridkit.engine",
        kind = %kind,
        node_id = raw(target),
        added = changes.added.len() as u64,
        removed = changes.removed.len() as u64,
        changed = changes.changed.len() as u64,
        deferred = deferred,
        after_hash = after_hash,
        "grid operation applied"
    );
}

pub(crate) fn record_rejected(kind: GridOperationKind, target: Option<NodeId>, reason: &GridError) {
    GRID_OPS_REJECTED.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        target: "gridkit.engine",
        kind = %kind,
        node_id = raw(target),
        reason = %reason,
        "grid operation rejected"
    );
}

pub(crate) fn record_compaction(passes: usize, moved: usize) {
    if moved > 0 {
        GRID_COMPACTIONS.fetch_add(1, Ordering::Relaxed);
    }
    tracing::trace!(
        target: "gridkit.engine",
        passes = passes as u64,
        moved = moved as u64,
        "compaction settled"
    );
}

pub(crate) fn record_collisions(node_id: NodeId, displaced: usize) {
    if displaced == 0 {
        return;
    }
    tracing::trace!(
        target: "gridkit.engine",
        node_id = node_id.get(),
        displaced = displaced as u64,
        "collisions resolved"
    );
}

pub(crate) fn record_column_change(from: u16, to: u16, restored: bool, propagate: bool) {
    tracing::debug!(
        target: "gridkit.engine",
        from = from,
        to = to,
        restored = restored,
        propagate = propagate,
        "column count changed"
    );
}

pub(crate) fn record_snapshot_repaired(moved: usize) {
    tracing::warn!(
        target: "gridkit.engine",
        moved = moved as u64,
        "unsettled snapshot compacted on load"
    );
}

pub(crate) fn record_invariant_violation(kind: GridOperationKind, violation: &GridModelError) {
    tracing::warn!(
        target: "gridkit.engine",
        kind = %kind,
        violation = %violation,
        "layout invariant violated"
    );
}

pub(crate) fn record_batch_end(operations: u64, dirty: usize, changes: &GridChangeSet) {
    tracing::debug!(
        target: "gridkit.engine",
        operations = operations,
        dirty = dirty as u64,
        changed = changes.len() as u64,
        "batch settled"
    );
}
