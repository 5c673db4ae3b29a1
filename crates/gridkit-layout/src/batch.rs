//! Deferred settlement across a burst of operations.
//!
//! `Live` settles (compacts and notifies) after every operation. `Batched`
//! keeps resolving collisions but defers compaction and notification to a
//! single pass at batch end. Nesting is not supported: a second begin is a
//! no-op, as is ending while live.

use std::collections::BTreeSet;

use crate::change::{Baseline, baseline_of};
use crate::node::{GridNode, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Live,
    Batched,
}

/// Everything accumulated between begin and end.
#[derive(Debug, Default)]
pub(crate) struct BatchLedger {
    pub baseline: Baseline,
    pub removed: Vec<GridNode>,
    pub dirty: BTreeSet<NodeId>,
    pub operations: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BatchController {
    state: BatchState,
    ledger: BatchLedger,
}

impl BatchController {
    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn is_batched(&self) -> bool {
        self.state == BatchState::Batched
    }

    /// Enter `Batched`, capturing the geometry to diff against at the end.
    ///
    /// Returns `false` (and changes nothing) when already batched.
    pub fn begin(&mut self, nodes: &[GridNode]) -> bool {
        if self.is_batched() {
            return false;
        }
        self.state = BatchState::Batched;
        self.ledger = BatchLedger {
            baseline: baseline_of(nodes),
            ..BatchLedger::default()
        };
        true
    }

    /// Fold one applied operation into the ledger.
    pub fn absorb(&mut self, removed: Vec<GridNode>, touched: impl IntoIterator<Item = NodeId>) {
        self.ledger.operations += 1;
        self.ledger.removed.extend(removed);
        self.ledger.dirty.extend(touched);
    }

    /// Leave `Batched`, handing back the ledger. `None` when already live.
    pub fn finish(&mut self) -> Option<BatchLedger> {
        if !self.is_batched() {
            return None;
        }
        self.state = BatchState::Live;
        Some(std::mem::take(&mut self.ledger))
    }
}
