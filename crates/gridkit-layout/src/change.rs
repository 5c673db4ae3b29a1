//! Change sets delivered to the renderer.

use rustc_hash::FxHashMap;

use gridkit_core::GridRect;

use crate::node::{GridNode, NodeId};

/// Geometry captured before an operation (or a batch) started.
pub(crate) type Baseline = FxHashMap<NodeId, GridRect>;

pub(crate) fn baseline_of(nodes: &[GridNode]) -> Baseline {
    let mut baseline = FxHashMap::with_capacity_and_hasher(nodes.len(), Default::default());
    for node in nodes {
        baseline.insert(node.id, node.rect);
    }
    baseline
}

/// Every node an operation added, removed, or moved/resized.
///
/// `added` and `changed` follow insertion order; `removed` follows removal
/// order. A node added and removed inside the same batch appears nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridChangeSet {
    pub added: Vec<GridNode>,
    pub removed: Vec<GridNode>,
    pub changed: Vec<GridNode>,
}

impl GridChangeSet {
    /// Diff the live node set against `baseline`.
    pub(crate) fn diff(baseline: &Baseline, nodes: &[GridNode], removed: Vec<GridNode>) -> Self {
        let mut changes = Self::default();
        for node in nodes {
            match baseline.get(&node.id) {
                None => changes.added.push(node.clone()),
                Some(rect) if *rect != node.rect => changes.changed.push(node.clone()),
                Some(_) => {}
            }
        }
        changes.removed = removed
            .into_iter()
            .filter(|node| baseline.contains_key(&node.id))
            .collect();
        changes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }

    /// IDs of every node in the set: added, then changed, then removed.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.added
            .iter()
            .chain(&self.changed)
            .chain(&self.removed)
            .map(GridNode::id)
    }
}

/// Receiver for change notifications.
///
/// Called once per completed operation outside a batch, and once at batch
/// end, only when something actually changed.
pub trait GridObserver {
    fn on_change(&mut self, changes: &GridChangeSet);
}

impl<F> GridObserver for F
where
    F: FnMut(&GridChangeSet),
{
    fn on_change(&mut self, changes: &GridChangeSet) {
        self(changes);
    }
}
