#![no_main]

use arbitrary::Arbitrary;
use gridkit_layout::{GridEngine, GridOptions, NodeId, NodeSpec, NodeUpdate};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    column: u8,
    max_row: u8,
    float: bool,
    ops: Vec<Op>,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Add {
        x: Option<u8>,
        y: Option<u8>,
        w: u8,
        h: u8,
        min_w: Option<u8>,
        max_h: Option<u8>,
        locked: bool,
    },
    Move { node: u8, x: u8, y: u8 },
    Resize { node: u8, w: u8, h: u8 },
    Update { node: u8, x: Option<u8>, y: Option<u8>, w: Option<u8>, h: Option<u8> },
    Remove { node: u8 },
    SetLocked { node: u8, locked: bool },
    SetColumn { column: u8, propagate: bool },
    SetFloat { float: bool },
    Compact,
    RemoveAll,
    BeginBatch,
    EndBatch,
}

/// Map an arbitrary byte onto an existing node, if any.
fn pick(grid: &GridEngine, node: u8) -> Option<NodeId> {
    let nodes = grid.nodes();
    if nodes.is_empty() {
        return None;
    }
    Some(nodes[usize::from(node) % nodes.len()].id())
}

fuzz_target!(|input: Input| {
    // Column 1..=24, max_row 0 (unbounded) or 1..=31.
    let column = u16::from(input.column % 24) + 1;
    let max_row = u16::from(input.max_row % 32);
    let options = GridOptions::default()
        .column(column)
        .max_row(max_row)
        .float(input.float);
    let Ok(mut grid) = GridEngine::new(options) else {
        return;
    };

    for op in input.ops.into_iter().take(256) {
        let before = grid.state_hash();
        let result = match op {
            Op::Add { x, y, w, h, min_w, max_h, locked } => {
                let mut spec = NodeSpec::new(u16::from(w % 16), u16::from(h % 8));
                if let (Some(x), Some(y)) = (x, y) {
                    spec = spec.at(u16::from(x), u16::from(y));
                }
                if let Some(min_w) = min_w {
                    spec = spec.min_w(u16::from(min_w % 8));
                }
                if let Some(max_h) = max_h {
                    spec = spec.max_h(u16::from(max_h % 8));
                }
                if locked {
                    spec = spec.locked();
                }
                Some(grid.add(spec))
            }
            Op::Move { node, x, y } => {
                pick(&grid, node).map(|id| grid.move_node(id, u16::from(x), u16::from(y)))
            }
            Op::Resize { node, w, h } => {
                pick(&grid, node).map(|id| grid.resize(id, u16::from(w), u16::from(h)))
            }
            Op::Update { node, x, y, w, h } => pick(&grid, node).map(|id| {
                let update = NodeUpdate {
                    x: x.map(u16::from),
                    y: y.map(u16::from),
                    w: w.map(u16::from),
                    h: h.map(u16::from),
                };
                grid.update(id, update)
            }),
            Op::Remove { node } => pick(&grid, node).map(|id| grid.remove(id)),
            Op::SetLocked { node, locked } => {
                pick(&grid, node).map(|id| grid.set_locked(id, locked))
            }
            Op::SetColumn { column, propagate } => {
                Some(grid.set_column_with(u16::from(column % 24), propagate))
            }
            Op::SetFloat { float } => Some(grid.set_float(float)),
            Op::Compact => Some(grid.compact()),
            Op::RemoveAll => Some(grid.remove_all()),
            Op::BeginBatch => {
                grid.begin_batch();
                None
            }
            Op::EndBatch => {
                grid.end_batch();
                None
            }
        };

        if let Some(Err(err)) = result {
            assert_eq!(err.before_hash, before, "error must report the kept state");
            assert_eq!(grid.state_hash(), before, "rejected op must roll back: {err}");
        }

        // Collision-free and in bounds at every step, even inside a batch.
        let nodes = grid.nodes();
        for (idx, node) in nodes.iter().enumerate() {
            let rect = node.rect();
            assert!(rect.w > 0 && rect.h > 0);
            assert!(rect.right() <= grid.column());
            assert!(grid.max_row() == 0 || rect.bottom() <= grid.max_row());
            for other in &nodes[idx + 1..] {
                assert!(!rect.intersects(&other.rect()), "{node:?} overlaps {other:?}");
            }
        }
        if !grid.in_batch() {
            grid.validate().expect("every invariant holds between operations");
        }
    }
});
