//! Collision detection and push-down resolution.
//!
//! Two nodes collide when their half-open cell spans overlap on both axes.
//! Resolution only ever moves nodes downward, so every push strictly
//! increases some node's `y` and the worklist always drains.
//!
//! Locked nodes are never displaced:
//! - a locked node under the candidate rejects the placement outright;
//! - a displaced node cascading into a locked node drops below it instead.

use std::collections::VecDeque;

use gridkit_core::GridRect;

use crate::error::GridError;
use crate::node::{GridNode, NodeId};

/// Index of the first node (insertion order) intersecting `rect`, skipping `skip`.
pub(crate) fn first_collision(nodes: &[GridNode], rect: GridRect, skip: Option<usize>) -> Option<usize> {
    nodes
        .iter()
        .enumerate()
        .find(|(idx, node)| Some(*idx) != skip && node.rect.intersects(&rect))
        .map(|(idx, _)| idx)
}

/// Whether `rect` is free of every node except `skip`.
pub(crate) fn is_free(nodes: &[GridNode], rect: GridRect, skip: Option<usize>) -> bool {
    first_collision(nodes, rect, skip).is_none()
}

/// Move `rect` down to `y`, rejecting overflow and `max_row` violations.
fn push_to(rect: GridRect, y: u16, max_row: u16) -> Result<GridRect, GridError> {
    let pushed = rect.with_y(y);
    let out_of_space = GridError::OutOfSpace {
        w: rect.w,
        h: rect.h,
        max_row,
    };
    let Some(bottom) = pushed.checked_bottom() else {
        return Err(out_of_space);
    };
    if max_row > 0 && bottom > max_row {
        return Err(out_of_space);
    }
    Ok(pushed)
}

/// Push every node overlapping `nodes[candidate]` out of its way.
///
/// Colliders are scanned in insertion order and pushed so their top edge
/// sits on the pushing node's bottom edge; each pushed node then joins the
/// worklist and pushes its own colliders. Returns the displaced node IDs in
/// first-displacement order.
pub(crate) fn resolve_collisions(
    nodes: &mut [GridNode],
    candidate: usize,
    max_row: u16,
) -> Result<Vec<NodeId>, GridError> {
    let candidate_rect = nodes[candidate].rect;
    let candidate_id = nodes[candidate].id;

    if let Some(blocker) = nodes
        .iter()
        .enumerate()
        .find(|(idx, node)| *idx != candidate && node.locked && node.rect.intersects(&candidate_rect))
        .map(|(_, node)| node.id)
    {
        return Err(GridError::PlacementBlocked {
            node_id: candidate_id,
            blocker,
        });
    }

    let mut displaced: Vec<NodeId> = Vec::new();
    let mut queue = VecDeque::from([candidate]);

    while let Some(current) = queue.pop_front() {
        let mut idx = 0;
        while idx < nodes.len() {
            let rect = nodes[current].rect;
            if idx == current || idx == candidate || !nodes[idx].rect.intersects(&rect) {
                idx += 1;
                continue;
            }

            if nodes[idx].locked {
                // Only displaced nodes get here; the candidate was checked above.
                nodes[current].rect = push_to(rect, nodes[idx].rect.bottom(), max_row)?;
                queue.push_back(current);
                break;
            }

            nodes[idx].rect = push_to(nodes[idx].rect, rect.bottom(), max_row)?;
            if !displaced.contains(&nodes[idx].id) {
                displaced.push(nodes[idx].id);
            }
            queue.push_back(idx);
            idx += 1;
        }
    }

    Ok(displaced)
}

/// Settle nodes one by one so earlier entries in `order` win conflicts.
///
/// Each node keeps its `x` and drops below whatever already-settled node it
/// overlaps until it sits in free space. Used after column reflow, where
/// many nodes move at once and no single candidate exists.
pub(crate) fn settle_in_order(
    nodes: &mut [GridNode],
    order: &[usize],
    max_row: u16,
) -> Result<Vec<NodeId>, GridError> {
    let mut settled: Vec<usize> = Vec::with_capacity(order.len());
    let mut displaced = Vec::new();

    for &idx in order {
        let start_y = nodes[idx].rect.y;
        loop {
            let rect = nodes[idx].rect;
            let floor = settled
                .iter()
                .filter(|&&other| nodes[other].rect.intersects(&rect))
                .map(|&other| nodes[other].rect.bottom())
                .max();
            match floor {
                Some(y) => nodes[idx].rect = push_to(rect, y, max_row)?,
                None => break,
            }
        }
        if nodes[idx].rect.y != start_y {
            displaced.push(nodes[idx].id);
        }
        settled.push(idx);
    }

    Ok(displaced)
}
