//! Error taxonomy for the placement engine.
//!
//! Engine errors are local and recoverable: a rejected operation leaves the
//! grid exactly as it was. Clamps (size bounds, column width, max row) are
//! silent corrections and never surface here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::NodeId;

/// Why a single engine operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// No legal cell keeps the node inside `max_row`.
    #[error("no free cell fits a {w}x{h} node within max_row {max_row}")]
    OutOfSpace { w: u16, h: u16, max_row: u16 },
    /// Placing `node_id` would require displacing a locked node.
    #[error("node {node_id} is blocked by locked node {blocker}")]
    PlacementBlocked { node_id: NodeId, blocker: NodeId },
    #[error("node {node_id} not found")]
    UnknownNode { node_id: NodeId },
    #[error("node key `{key}` is already in use")]
    DuplicateKey { key: String },
    #[error("column count must be > 0, got {column}")]
    InvalidColumn { column: u16 },
    #[error("node id space exhausted after {current}")]
    NodeIdOverflow { current: NodeId },
}

/// Structural violations found while validating a grid or a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridModelError {
    #[error("node id 0 is reserved")]
    ZeroNodeId,
    #[error("unsupported grid snapshot schema version {version}")]
    UnsupportedSchemaVersion { version: u16 },
    #[error("invalid grid options: {}", issues.join("; "))]
    InvalidOptions { issues: Vec<String> },
    #[error("duplicate node id {node_id}")]
    DuplicateNodeId { node_id: NodeId },
    #[error("duplicate node key `{key}`")]
    DuplicateKey { key: String },
    #[error("next id {next_id} is not above existing node {node_id}")]
    StaleNextId { next_id: NodeId, node_id: NodeId },
    #[error("node {node_id} has zero width or height")]
    EmptyNode { node_id: NodeId },
    #[error("node {node_id} exceeds the grid ({column} columns, max_row {max_row})")]
    OutOfBounds {
        node_id: NodeId,
        column: u16,
        max_row: u16,
    },
    #[error("node {node_id} size {w}x{h} violates its size bounds")]
    SizeOutOfBounds { node_id: NodeId, w: u16, h: u16 },
    #[error("nodes {first} and {second} overlap")]
    Overlap { first: NodeId, second: NodeId },
    #[error("node {node_id} can still rise from row {y} to row {floor}")]
    Unsettled { node_id: NodeId, y: u16, floor: u16 },
}

/// Stable operation discriminator used in outcomes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridOperationKind {
    Add,
    Move,
    Resize,
    Update,
    Remove,
    RemoveAll,
    Compact,
    SetColumn,
    SetFloat,
    SetLocked,
    SetMovable,
    SetResizable,
    SetSizeBounds,
    EnableMove,
    EnableResize,
    EndBatch,
}

impl GridOperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Move => "move",
            Self::Resize => "resize",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::RemoveAll => "remove_all",
            Self::Compact => "compact",
            Self::SetColumn => "set_column",
            Self::SetFloat => "set_float",
            Self::SetLocked => "set_locked",
            Self::SetMovable => "set_movable",
            Self::SetResizable => "set_resizable",
            Self::SetSizeBounds => "set_size_bounds",
            Self::EnableMove => "enable_move",
            Self::EnableResize => "enable_resize",
            Self::EndBatch => "end_batch",
        }
    }
}

impl std::fmt::Display for GridOperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure payload for engine operations.
///
/// `before_hash` is the state the grid still holds; `after_hash` is the
/// discarded working state at the point of rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "grid op {kind} failed: {reason} [target={target:?}, before_hash={before_hash:#x}, after_hash={after_hash:#x}]"
)]
pub struct GridOperationError {
    pub kind: GridOperationKind,
    pub target: Option<NodeId>,
    pub before_hash: u64,
    pub after_hash: u64,
    #[source]
    pub reason: GridError,
}

impl GridOperationError {
    #[must_use]
    pub fn is_out_of_space(&self) -> bool {
        matches!(self.reason, GridError::OutOfSpace { .. })
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self.reason, GridError::PlacementBlocked { .. })
    }
}
