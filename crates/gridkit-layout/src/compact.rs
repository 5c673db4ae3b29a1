//! Gravity compaction.
//!
//! Each pass walks nodes in insertion order and lifts every unlocked node to
//! the lowest row it can reach without crossing another node. Passes repeat
//! until one moves nothing. Only `y` ever changes.

use crate::node::{GridNode, NodeId};

/// What a compaction run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CompactionReport {
    pub passes: usize,
    pub moved: Vec<NodeId>,
}

/// Highest row `nodes[idx]` can rise to.
///
/// Bounded by the top edge and by the bottom of every node that shares a
/// column with it and starts above it. Never below the node's current row.
pub(crate) fn settle_floor(nodes: &[GridNode], idx: usize) -> u16 {
    let rect = nodes[idx].rect;
    nodes
        .iter()
        .enumerate()
        .filter(|(other, node)| {
            *other != idx && node.rect.overlaps_columns(&rect) && node.rect.y < rect.y
        })
        .map(|(_, node)| node.rect.bottom().min(rect.y))
        .max()
        .unwrap_or(0)
}

/// Lift nodes until no unlocked node can rise any further.
pub(crate) fn compact(nodes: &mut [GridNode]) -> CompactionReport {
    let mut report = CompactionReport::default();

    loop {
        report.passes += 1;
        let mut changed = false;

        for idx in 0..nodes.len() {
            if nodes[idx].locked {
                continue;
            }
            let floor = settle_floor(nodes, idx);
            if floor < nodes[idx].rect.y {
                nodes[idx].rect.y = floor;
                changed = true;
                if !report.moved.contains(&nodes[idx].id) {
                    report.moved.push(nodes[idx].id);
                }
            }
        }

        if !changed {
            break;
        }
    }

    report
}

/// First unlocked node that could still rise, as `(index, floor)`.
pub(crate) fn first_unsettled(nodes: &[GridNode]) -> Option<(usize, u16)> {
    (0..nodes.len())
        .filter(|&idx| !nodes[idx].locked)
        .map(|idx| (idx, settle_floor(nodes, idx)))
        .find(|&(idx, floor)| floor < nodes[idx].rect.y)
}
