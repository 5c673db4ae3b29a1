#![forbid(unsafe_code)]

//! Widget grid placement engine.
//!
//! A [`GridEngine`] owns a set of rectangular nodes on a fixed-width cell
//! grid and keeps them free of overlaps. It places new nodes in the first
//! free slot, pushes colliding nodes down when one is moved or resized,
//! floats nodes upward (unless in float mode), reflows the layout when the
//! column count changes, and reports geometry changes to a single
//! [`GridObserver`].
//!
//! ```
//! use gridkit_layout::{GridEngine, GridOptions, NodeSpec};
//!
//! let mut grid = GridEngine::new(GridOptions::default()).unwrap();
//! let outcome = grid.add(NodeSpec::new(3, 2)).unwrap();
//! let id = outcome.target.unwrap();
//! assert_eq!(grid.node(id).map(|n| (n.x(), n.y())), Some((0, 0)));
//! ```

pub mod batch;
pub mod change;
mod collision;
mod column;
mod compact;
pub mod engine;
pub mod error;
pub mod node;
pub mod options;
mod placement;
pub mod snapshot;
mod state;
pub mod trace;

pub use gridkit_core::geometry::{GridPoint, GridRect};

pub use batch::BatchState;
pub use change::{GridChangeSet, GridObserver};
pub use column::SortDirection;
pub use engine::{GridEngine, GridOpResult, GridOperationOutcome};
pub use error::{GridError, GridModelError, GridOperationError, GridOperationKind};
pub use node::{GridNode, NodeId, NodeSpec, NodeUpdate, SizeBounds};
pub use options::{DEFAULT_COLUMN, GridOptions, GridOptionsError};
pub use snapshot::{GRID_SNAPSHOT_SCHEMA_VERSION, GridSnapshot};
pub use trace::{grid_compactions_total, grid_ops_applied_total, grid_ops_rejected_total};
