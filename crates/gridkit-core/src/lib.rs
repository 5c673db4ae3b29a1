#![forbid(unsafe_code)]

//! Core: cell-grid geometry shared by the gridkit crates.
//!
//! # Role in gridkit
//! `gridkit-core` owns the coordinate vocabulary. Rectangles here are whole
//! cells with half-open edges, so two rects that only touch never collide.
//! The placement engine (`gridkit-layout`) builds every collision and
//! compaction rule on top of [`geometry::GridRect`].

pub mod geometry;

pub use geometry::{GridPoint, GridRect};
