//! Auto-position search.
//!
//! Row-major scan: `y` ascending, then `x` ascending. The first free cell
//! wins, which makes the result the lexicographically smallest `(y, x)` and a
//! pure function of the current node set.

use gridkit_core::{GridPoint, GridRect};

use crate::collision::is_free;
use crate::node::GridNode;

/// First free top-left cell for a `w x h` rect, or `None` when `max_row`
/// leaves no room.
///
/// `w` must already be clamped to `column`. Without a row limit the scan
/// always succeeds at the latest on the row below every node.
pub(crate) fn find_free_slot(
    nodes: &[GridNode],
    w: u16,
    h: u16,
    column: u16,
    max_row: u16,
) -> Option<GridPoint> {
    if w == 0 || h == 0 || w > column {
        return None;
    }

    let last_y = if max_row > 0 {
        max_row.checked_sub(h)?
    } else {
        let lowest = nodes.iter().map(|node| node.rect.bottom()).max().unwrap_or(0);
        // A full-width row below everything is always free.
        if lowest.checked_add(h).is_none() {
            return None;
        }
        lowest
    };
    let last_x = column - w;

    for y in 0..=last_y {
        for x in 0..=last_x {
            if is_free(nodes, GridRect::new(x, y, w, h), None) {
                return Some(GridPoint::new(x, y));
            }
        }
    }

    None
}
