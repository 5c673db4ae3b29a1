//! Serializable grid snapshots and the deterministic layout hash.

use serde::{Deserialize, Serialize};

use crate::node::{GridNode, NodeId, SizeBounds};
use crate::options::GridOptions;

/// Current schema version for [`GridSnapshot`].
pub const GRID_SNAPSHOT_SCHEMA_VERSION: u16 = 1;

/// Complete, replayable grid state: options plus every node in insertion
/// order. Column-layout caches are not part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    #[serde(default)]
    pub options: GridOptions,
    pub next_id: NodeId,
    #[serde(default)]
    pub nodes: Vec<GridNode>,
}

fn default_schema_version() -> u16 {
    GRID_SNAPSHOT_SCHEMA_VERSION
}

impl GridSnapshot {
    /// Deterministic hash of the layout described by this snapshot.
    ///
    /// Equal to [`crate::GridEngine::state_hash`] of an engine holding the
    /// same state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        layout_hash(&self.options, self.next_id, &self.nodes)
    }
}

/// FNV-1a over options, id allocator, and every node in insertion order.
pub(crate) fn layout_hash(options: &GridOptions, next_id: NodeId, nodes: &[GridNode]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    fn mix(hash: &mut u64, byte: u8) {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(PRIME);
    }

    fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
        for byte in bytes {
            mix(hash, *byte);
        }
    }

    fn mix_u16(hash: &mut u64, value: u16) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_u64(hash: &mut u64, value: u64) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_bool(hash: &mut u64, value: bool) {
        mix(hash, u8::from(value));
    }

    fn mix_opt_u16(hash: &mut u64, value: Option<u16>) {
        match value {
            Some(value) => {
                mix(hash, 1);
                mix_u16(hash, value);
            }
            None => mix(hash, 0),
        }
    }

    fn mix_opt_str(hash: &mut u64, value: Option<&str>) {
        match value {
            Some(value) => {
                mix(hash, 1);
                mix_u64(hash, value.len() as u64);
                mix_bytes(hash, value.as_bytes());
            }
            None => mix(hash, 0),
        }
    }

    fn mix_bounds(hash: &mut u64, bounds: SizeBounds) {
        mix_opt_u16(hash, bounds.min_w);
        mix_opt_u16(hash, bounds.max_w);
        mix_opt_u16(hash, bounds.min_h);
        mix_opt_u16(hash, bounds.max_h);
    }

    let mut hash = OFFSET_BASIS;
    mix_u16(&mut hash, options.column);
    mix_bool(&mut hash, options.float);
    mix_u16(&mut hash, options.max_row);
    mix_u16(&mut hash, options.min_row);
    mix_bool(&mut hash, options.one_column_dom_sort);
    mix_bool(&mut hash, options.disable_drag);
    mix_bool(&mut hash, options.disable_resize);
    mix_u64(&mut hash, next_id.get());
    mix_u64(&mut hash, nodes.len() as u64);

    for node in nodes {
        mix_u64(&mut hash, node.id.get());
        mix_opt_str(&mut hash, node.key());
        mix_u16(&mut hash, node.rect.x);
        mix_u16(&mut hash, node.rect.y);
        mix_u16(&mut hash, node.rect.w);
        mix_u16(&mut hash, node.rect.h);
        mix_bounds(&mut hash, node.bounds);
        mix_bool(&mut hash, node.locked);
        mix_bool(&mut hash, node.no_move);
        mix_bool(&mut hash, node.no_resize);
    }

    hash
}
