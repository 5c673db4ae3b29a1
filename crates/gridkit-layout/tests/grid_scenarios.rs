//! End-to-end placement scenarios against the public engine API.

use std::cell::RefCell;
use std::rc::Rc;

use gridkit_layout::{
    GridChangeSet, GridEngine, GridError, GridModelError, GridOptions, GridRect, GridSnapshot,
    NodeId, NodeSpec, NodeUpdate, SizeBounds, SortDirection,
};

fn grid(options: GridOptions) -> GridEngine {
    GridEngine::new(options).expect("valid options")
}

fn add(grid: &mut GridEngine, spec: NodeSpec) -> NodeId {
    grid.add(spec)
        .expect("add should succeed")
        .target
        .expect("add reports the new id")
}

fn rect(grid: &GridEngine, id: NodeId) -> GridRect {
    grid.node(id).expect("node exists").rect()
}

fn rects(grid: &GridEngine) -> Vec<GridRect> {
    grid.nodes().iter().map(|node| node.rect()).collect()
}

fn ids(nodes: &[gridkit_layout::GridNode]) -> Vec<NodeId> {
    nodes.iter().map(|node| node.id()).collect()
}

type Recorded = Rc<RefCell<Vec<GridChangeSet>>>;

fn record(grid: &mut GridEngine) -> Recorded {
    let seen: Recorded = Rc::default();
    let sink = Rc::clone(&seen);
    grid.set_observer(move |changes: &GridChangeSet| sink.borrow_mut().push(changes.clone()));
    seen
}

#[test]
fn auto_position_fills_rows_left_to_right() {
    let mut grid = grid(GridOptions::default());
    let placed: Vec<NodeId> = (0..10).map(|_| add(&mut grid, NodeSpec::new(3, 2))).collect();

    assert_eq!(rect(&grid, placed[0]), GridRect::new(0, 0, 3, 2));
    assert_eq!(rect(&grid, placed[1]), GridRect::new(3, 0, 3, 2));
    assert_eq!(rect(&grid, placed[3]), GridRect::new(9, 0, 3, 2));
    // Four 3-wide nodes fill a 12-column row; the fifth wraps.
    assert_eq!(rect(&grid, placed[4]), GridRect::new(0, 2, 3, 2));
    assert_eq!(rect(&grid, placed[8]), GridRect::new(0, 4, 3, 2));
    assert_eq!(rect(&grid, placed[9]), GridRect::new(3, 4, 3, 2));
    grid.validate().expect("valid layout");
}

#[test]
fn auto_position_fills_holes_first() {
    let mut grid = grid(GridOptions::default().float(true));
    add(&mut grid, NodeSpec::new(4, 2).at(0, 0));
    add(&mut grid, NodeSpec::new(4, 2).at(8, 0));
    let filler = add(&mut grid, NodeSpec::new(4, 1));
    assert_eq!(rect(&grid, filler), GridRect::new(4, 0, 4, 1));
}

#[test]
fn removing_middle_node_compacts_the_rest() {
    let mut grid = grid(GridOptions::default());
    let top = add(&mut grid, NodeSpec::new(4, 2).at(0, 0));
    let middle = add(&mut grid, NodeSpec::new(4, 2).at(0, 2));
    let bottom = add(&mut grid, NodeSpec::new(4, 2).at(0, 4));
    assert_eq!(rect(&grid, bottom).y, 4);

    let seen = record(&mut grid);
    let outcome = grid.remove(middle).expect("remove");

    assert_eq!(rect(&grid, top).y, 0);
    assert_eq!(rect(&grid, bottom).y, 2);
    assert_eq!(ids(&outcome.changes.removed), vec![middle]);
    assert_eq!(ids(&outcome.changes.changed), vec![bottom]);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn oversized_node_is_out_of_space() {
    let mut grid = grid(GridOptions::default().max_row(4));
    let existing = add(&mut grid, NodeSpec::new(6, 2));
    let before = grid.to_snapshot();

    let err = grid.add(NodeSpec::new(12, 5)).expect_err("too tall");
    assert!(err.is_out_of_space());
    assert_eq!(
        err.reason,
        GridError::OutOfSpace {
            w: 12,
            h: 5,
            max_row: 4
        }
    );
    assert_eq!(grid.to_snapshot(), before);
    assert_eq!(ids(grid.nodes()), vec![existing]);
}

#[test]
fn moving_onto_locked_node_is_blocked() {
    let mut grid = grid(GridOptions::default());
    let anchor = add(&mut grid, NodeSpec::new(4, 2).at(0, 0).locked());
    let mover = add(&mut grid, NodeSpec::new(4, 2));
    assert_eq!(rect(&grid, mover), GridRect::new(4, 0, 4, 2));
    let hash = grid.state_hash();

    let err = grid.move_node(mover, 0, 0).expect_err("blocked");
    assert!(err.is_blocked());
    assert_eq!(
        err.reason,
        GridError::PlacementBlocked {
            node_id: mover,
            blocker: anchor
        }
    );
    assert_eq!(rect(&grid, anchor), GridRect::new(0, 0, 4, 2));
    assert_eq!(rect(&grid, mover), GridRect::new(4, 0, 4, 2));
    assert_eq!(grid.state_hash(), hash);
}

#[test]
fn cascade_skips_past_locked_nodes() {
    let mut grid = grid(GridOptions::default().float(true));
    let pushed = add(&mut grid, NodeSpec::new(4, 2).at(0, 0));
    let anchor = add(&mut grid, NodeSpec::new(4, 2).at(0, 2).locked());
    let mover = add(&mut grid, NodeSpec::new(4, 2).at(4, 0));

    grid.move_node(mover, 0, 0).expect("move");
    assert_eq!(rect(&grid, mover), GridRect::new(0, 0, 4, 2));
    assert_eq!(rect(&grid, anchor), GridRect::new(0, 2, 4, 2));
    assert_eq!(rect(&grid, pushed), GridRect::new(0, 4, 4, 2));
}

#[test]
fn move_clamps_into_the_grid() {
    let mut grid = grid(GridOptions::default().float(true).max_row(6));
    let id = add(&mut grid, NodeSpec::new(4, 2));
    grid.move_node(id, 20, 20).expect("move");
    assert_eq!(rect(&grid, id), GridRect::new(8, 4, 4, 2));
}

#[test]
fn move_pushes_colliders_down() {
    let mut grid = grid(GridOptions::default().float(true));
    let a = add(&mut grid, NodeSpec::new(6, 2).at(0, 0));
    let b = add(&mut grid, NodeSpec::new(6, 3).at(6, 0));

    let outcome = grid.move_node(b, 2, 1).expect("move");
    assert_eq!(rect(&grid, b), GridRect::new(2, 1, 6, 3));
    assert_eq!(rect(&grid, a), GridRect::new(0, 4, 6, 2));
    assert_eq!(ids(&outcome.changes.changed), vec![a, b]);
}

#[test]
fn resize_clamps_to_bounds_and_grid_edge() {
    let mut grid = grid(GridOptions::default());
    let id = add(&mut grid, NodeSpec::new(2, 2).at(8, 0).max_h(3));
    grid.resize(id, 10, 10).expect("resize");
    assert_eq!(rect(&grid, id), GridRect::new(8, 0, 4, 3));
}

#[test]
fn locked_and_fixed_nodes_ignore_gestures() {
    let mut grid = grid(GridOptions::default());
    let locked = add(&mut grid, NodeSpec::new(2, 2).locked());
    let pinned = add(&mut grid, NodeSpec::new(2, 2).no_move());
    let fixed = add(&mut grid, NodeSpec::new(2, 2).no_resize());

    for id in [locked, pinned] {
        let outcome = grid.move_node(id, 9, 0).expect("no-op");
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.before_hash, outcome.after_hash);
    }
    assert!(grid.resize(locked, 5, 5).expect("no-op").changes.is_empty());
    assert!(grid.resize(fixed, 5, 5).expect("no-op").changes.is_empty());

    grid.resize(pinned, 3, 3).expect("resize allowed");
    assert_eq!(rect(&grid, pinned).w, 3);
}

#[test]
fn update_moves_and_resizes_atomically() {
    let mut grid = grid(GridOptions::default().float(true));
    let id = add(&mut grid, NodeSpec::new(2, 2).at(0, 0));
    let update = NodeUpdate {
        x: Some(5),
        w: Some(4),
        ..NodeUpdate::default()
    };
    let outcome = grid.update(id, update).expect("update");
    assert_eq!(rect(&grid, id), GridRect::new(5, 0, 4, 2));
    assert_eq!(outcome.changes.changed.len(), 1);

    let pinned = add(&mut grid, NodeSpec::new(2, 2).at(0, 4).no_move());
    grid.update(pinned, NodeUpdate::rect(GridRect::new(9, 9, 3, 1)))
        .expect("update");
    assert_eq!(rect(&grid, pinned), GridRect::new(0, 4, 3, 1));
}

#[test]
fn column_round_trip_restores_exact_layout() {
    let mut grid = grid(GridOptions::default());
    let a = add(&mut grid, NodeSpec::new(6, 2));
    let b = add(&mut grid, NodeSpec::new(6, 2));
    let c = add(&mut grid, NodeSpec::new(4, 3));
    let d = add(&mut grid, NodeSpec::new(8, 1));
    assert_eq!(rect(&grid, c), GridRect::new(0, 2, 4, 3));
    assert_eq!(rect(&grid, d), GridRect::new(4, 2, 8, 1));
    let original = rects(&grid);

    grid.set_column(6).expect("to 6");
    assert_eq!(grid.column(), 6);
    assert_eq!(rect(&grid, a), GridRect::new(0, 0, 3, 2));
    assert_eq!(rect(&grid, b), GridRect::new(3, 0, 3, 2));
    assert_eq!(rect(&grid, c), GridRect::new(0, 2, 2, 3));
    assert_eq!(rect(&grid, d), GridRect::new(2, 2, 4, 1));
    grid.validate().expect("valid at 6");

    grid.set_column(12).expect("back to 12");
    assert_eq!(rects(&grid), original);
    assert_eq!(grid.cached_columns(), vec![6, 12]);
}

#[test]
fn unchanged_column_is_a_no_op() {
    let mut grid = grid(GridOptions::default());
    add(&mut grid, NodeSpec::new(3, 3));
    let outcome = grid.set_column(12).expect("same column");
    assert!(outcome.changes.is_empty());
    assert!(grid.cached_columns().is_empty());
}

#[test]
fn zero_columns_is_rejected() {
    let mut grid = grid(GridOptions::default());
    let err = grid.set_column(0).expect_err("zero");
    assert_eq!(err.reason, GridError::InvalidColumn { column: 0 });
    assert_eq!(grid.column(), 12);
}

#[test]
fn column_change_without_propagation_only_clamps_overhanging_nodes() {
    let mut grid = grid(GridOptions::default());
    let a = add(&mut grid, NodeSpec::new(4, 2));
    let b = add(&mut grid, NodeSpec::new(4, 2));
    let c = add(&mut grid, NodeSpec::new(4, 2));
    assert_eq!(rect(&grid, c), GridRect::new(8, 0, 4, 2));

    let outcome = grid.set_column_with(6, false).expect("to 6 in place");
    assert_eq!(grid.column(), 6);
    assert_eq!(rect(&grid, a), GridRect::new(0, 0, 4, 2));
    assert_eq!(rect(&grid, b), GridRect::new(2, 2, 4, 2));
    assert_eq!(rect(&grid, c), GridRect::new(2, 4, 4, 2));
    assert_eq!(ids(&outcome.changes.changed), vec![b, c]);
    assert!(grid.cached_columns().is_empty());
    grid.validate().expect("valid at 6");

    // Nothing was remembered at 12, so growing back rescales.
    grid.set_column(12).expect("back to 12");
    assert_eq!(rect(&grid, a), GridRect::new(0, 0, 8, 2));
    assert_eq!(grid.cached_columns(), vec![6]);
}

#[test]
fn column_change_without_propagation_drops_stale_cache_entry() {
    let mut grid = grid(GridOptions::default());
    add(&mut grid, NodeSpec::new(6, 2));
    add(&mut grid, NodeSpec::new(6, 2));
    grid.set_column(6).expect("to 6");
    grid.set_column(12).expect("back to 12");
    assert_eq!(grid.cached_columns(), vec![6, 12]);

    grid.set_column_with(6, false).expect("to 6 in place");
    assert_eq!(grid.cached_columns(), vec![12]);
    assert_eq!(rects(&grid), vec![GridRect::new(0, 0, 6, 2), GridRect::new(0, 2, 6, 2)]);
}

#[test]
fn column_change_without_propagation_respects_max_row() {
    let mut grid = grid(GridOptions::default().max_row(2));
    add(&mut grid, NodeSpec::new(6, 2));
    add(&mut grid, NodeSpec::new(6, 2));
    let before = grid.state_hash();

    let err = grid.set_column_with(6, false).expect_err("no room below");
    assert!(matches!(err.reason, GridError::OutOfSpace { .. }));
    assert_eq!(grid.column(), 12);
    assert_eq!(grid.state_hash(), before);
}

#[test]
fn one_column_stacks_by_row_then_column() {
    let mut grid = grid(GridOptions::default().float(true));
    let right = add(&mut grid, NodeSpec::new(6, 1).at(6, 0));
    let left = add(&mut grid, NodeSpec::new(6, 1).at(0, 0));
    let low = add(&mut grid, NodeSpec::new(3, 2).at(0, 3));

    grid.set_column(1).expect("one column");
    assert_eq!(rect(&grid, left), GridRect::new(0, 0, 1, 1));
    assert_eq!(rect(&grid, right), GridRect::new(0, 1, 1, 1));
    assert_eq!(rect(&grid, low), GridRect::new(0, 2, 1, 2));

    grid.set_column(12).expect("restore");
    assert_eq!(rect(&grid, right), GridRect::new(6, 0, 6, 1));
    assert_eq!(rect(&grid, low), GridRect::new(0, 3, 3, 2));
}

#[test]
fn one_column_dom_sort_keeps_insertion_order() {
    let mut grid = grid(GridOptions::default().float(true).one_column_dom_sort(true));
    let right = add(&mut grid, NodeSpec::new(6, 1).at(6, 0));
    let left = add(&mut grid, NodeSpec::new(6, 1).at(0, 0));

    grid.set_column(1).expect("one column");
    assert_eq!(rect(&grid, right).y, 0);
    assert_eq!(rect(&grid, left).y, 1);
}

#[test]
fn batch_defers_compaction_and_notifies_once() {
    let mut grid = grid(GridOptions::default());
    let top = add(&mut grid, NodeSpec::new(12, 2));
    let bottom = add(&mut grid, NodeSpec::new(12, 2));
    let seen = record(&mut grid);

    assert!(grid.begin_batch());
    let outcome = grid.remove(top).expect("remove");
    assert!(outcome.deferred);
    assert!(outcome.changes.is_empty());
    let extra = add(&mut grid, NodeSpec::new(2, 1));
    grid.remove(extra).expect("remove transient");

    assert_eq!(rect(&grid, bottom).y, 2, "gravity waits for batch end");
    assert!(seen.borrow().is_empty());

    let outcome = grid.end_batch().expect("batch was open");
    assert_eq!(rect(&grid, bottom).y, 0);
    assert_eq!(ids(&outcome.changes.removed), vec![top]);
    assert_eq!(ids(&outcome.changes.changed), vec![bottom]);
    assert!(outcome.changes.added.is_empty());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], outcome.changes);
}

#[test]
fn batch_still_resolves_collisions() {
    let mut grid = grid(GridOptions::default());
    let a = add(&mut grid, NodeSpec::new(6, 2));
    let b = add(&mut grid, NodeSpec::new(6, 2).at(6, 0));

    grid.begin_batch();
    grid.move_node(b, 0, 0).expect("move");
    assert!(!rect(&grid, a).intersects(&rect(&grid, b)));
    grid.end_batch();
    grid.validate().expect("settled after batch");
}

#[test]
fn will_it_fit_is_pure() {
    let mut grid = grid(GridOptions::default().max_row(4));
    add(&mut grid, NodeSpec::new(12, 3));
    let hash = grid.state_hash();

    assert!(grid.will_it_fit(&NodeSpec::new(12, 1)));
    assert!(!grid.will_it_fit(&NodeSpec::new(12, 2)));
    assert!(grid.will_it_fit(&NodeSpec::new(6, 1).at(0, 0)));
    assert_eq!(grid.state_hash(), hash);
    assert_eq!(grid.len(), 1);
}

#[test]
fn leaving_float_mode_compacts_once() {
    let mut grid = grid(GridOptions::default().float(true));
    let id = add(&mut grid, NodeSpec::new(3, 1).at(0, 5));
    assert_eq!(rect(&grid, id).y, 5);

    grid.set_float(false).expect("unfloat");
    assert!(!grid.is_float());
    assert_eq!(rect(&grid, id).y, 0);

    grid.set_float(true).expect("float");
    grid.move_node(id, 0, 3).expect("move");
    assert_eq!(rect(&grid, id).y, 3);
}

#[test]
fn explicit_compaction_runs_in_float_mode() {
    let mut grid = grid(GridOptions::default().float(true));
    let id = add(&mut grid, NodeSpec::new(3, 1).at(0, 5));
    let outcome = grid.compact().expect("compact");
    assert_eq!(rect(&grid, id).y, 0);
    assert_eq!(ids(&outcome.changes.changed), vec![id]);
    assert!(grid.is_float());
}

#[test]
fn constraint_setters_take_effect() {
    let mut grid = grid(GridOptions::default());
    let id = add(&mut grid, NodeSpec::new(4, 4));

    grid.set_locked(id, true).expect("lock");
    assert!(grid.node(id).expect("node").is_locked());
    grid.move_node(id, 6, 0).expect("no-op");
    assert_eq!(rect(&grid, id).x, 0);
    grid.set_locked(id, false).expect("unlock");

    grid.set_movable(id, false).expect("pin");
    grid.move_node(id, 6, 0).expect("no-op");
    assert_eq!(rect(&grid, id).x, 0);
    grid.set_movable(id, true).expect("unpin");

    grid.set_max_width(id, Some(2)).expect("max width");
    grid.set_max_height(id, Some(3)).expect("max height");
    assert_eq!(rect(&grid, id), GridRect::new(0, 0, 2, 3));
    grid.set_min_width(id, Some(5)).expect("min width");
    assert_eq!(rect(&grid, id).w, 5);
    grid.set_min_height(id, None).expect("clear");
    grid.set_size_bounds(id, SizeBounds::UNBOUNDED).expect("unbounded");
    assert_eq!(grid.node(id).expect("node").bounds(), SizeBounds::UNBOUNDED);

    grid.set_resizable(id, false).expect("fix size");
    grid.resize(id, 1, 1).expect("no-op");
    assert_eq!(rect(&grid, id).w, 5);
}

#[test]
fn grid_wide_toggles_reach_new_nodes_on_request() {
    let mut grid = grid(GridOptions::default());
    let existing = add(&mut grid, NodeSpec::new(2, 2));

    grid.enable_move(false, false).expect("disable");
    assert!(!grid.node(existing).expect("node").can_move());
    let later = add(&mut grid, NodeSpec::new(2, 2));
    assert!(grid.node(later).expect("node").can_move());

    grid.enable_resize(false, true).expect("disable");
    let newest = add(&mut grid, NodeSpec::new(2, 2));
    assert!(!grid.node(newest).expect("node").can_resize());
    assert!(grid.options().disable_resize);
}

#[test]
fn remove_all_notifies_once_and_drops_caches() {
    let mut grid = grid(GridOptions::default());
    for _ in 0..3 {
        add(&mut grid, NodeSpec::new(4, 1));
    }
    grid.set_column(6).expect("cache 12");
    let seen = record(&mut grid);

    let outcome = grid.remove_all().expect("remove all");
    assert_eq!(outcome.changes.removed.len(), 3);
    assert!(grid.is_empty());
    assert!(grid.cached_columns().is_empty());
    assert_eq!(seen.borrow().len(), 1);

    grid.remove_all().expect("already empty");
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn queries_reflect_layout() {
    let mut grid = grid(GridOptions::default().min_row(5));
    assert_eq!(grid.row_count(), 5);
    let id = add(&mut grid, NodeSpec::new(4, 7).key("chart"));
    assert_eq!(grid.row_count(), 7);
    assert_eq!(grid.node_by_key("chart").map(|n| n.id()), Some(id));
    assert!(grid.node_by_key("table").is_none());
    assert!(!grid.is_area_empty(3, 6, 2, 2));
    assert!(grid.is_area_empty(4, 0, 8, 7));
    assert_eq!(grid.node_at(3, 6).map(|n| n.id()), Some(id));
    assert!(grid.node_at(4, 0).is_none());
    assert_eq!(grid.max_row(), 0);
    assert!(!grid.in_batch());
}

#[test]
fn sorted_nodes_follow_reading_order() {
    let mut grid = grid(GridOptions::default().float(true));
    let low = add(&mut grid, NodeSpec::new(2, 1).at(0, 4));
    let right = add(&mut grid, NodeSpec::new(2, 1).at(8, 0));
    let left = add(&mut grid, NodeSpec::new(2, 1).at(1, 0));

    let ascending: Vec<_> = grid.sorted_nodes(SortDirection::Ascending).iter().map(|n| n.id()).collect();
    assert_eq!(ascending, vec![left, right, low]);
    let descending: Vec<_> = grid.sorted_nodes(SortDirection::Descending).iter().map(|n| n.id()).collect();
    assert_eq!(descending, vec![low, right, left]);
    assert_eq!(ids(grid.nodes()), vec![low, right, left]);
}

#[test]
fn duplicate_keys_are_rejected() {
    let mut grid = grid(GridOptions::default());
    add(&mut grid, NodeSpec::new(1, 1).key("chart"));
    let err = grid.add(NodeSpec::new(1, 1).key("chart")).expect_err("dup");
    assert_eq!(err.reason, GridError::DuplicateKey { key: "chart".into() });
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut grid = grid(GridOptions::default().max_row(20));
    add(&mut grid, NodeSpec::new(3, 2).key("a"));
    add(&mut grid, NodeSpec::new(5, 4).min_w(2).locked());
    add(&mut grid, NodeSpec::new(12, 1).at(0, 9));

    let json = serde_json::to_string(&grid.to_snapshot()).expect("serialize");
    let snapshot: GridSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(snapshot.state_hash(), grid.state_hash());

    let restored = GridEngine::from_snapshot(snapshot).expect("restore");
    assert_eq!(restored.state_hash(), grid.state_hash());
    assert_eq!(restored.nodes(), grid.nodes());
}

#[test]
fn snapshot_with_gaps_loads_compacted() {
    let mut grid = grid(GridOptions::default().float(true));
    let id = add(&mut grid, NodeSpec::new(3, 2).at(0, 6));
    let mut snapshot = grid.to_snapshot();
    snapshot.options.float = false;

    let restored = GridEngine::from_snapshot(snapshot).expect("restore");
    assert_eq!(restored.node(id).map(|n| n.y()), Some(0));
}

/// Edit a stored node the way a hand-written snapshot file would.
fn with_node_x(snapshot: &GridSnapshot, idx: usize, x: u16) -> GridSnapshot {
    let mut value = serde_json::to_value(snapshot).expect("serialize");
    value["nodes"][idx]["x"] = x.into();
    serde_json::from_value(value).expect("deserialize")
}

#[test]
fn snapshot_validation_rejects_bad_input() {
    let mut grid = grid(GridOptions::default().float(true));
    let a = add(&mut grid, NodeSpec::new(4, 2).at(0, 0));
    add(&mut grid, NodeSpec::new(4, 2).at(6, 0));

    let overlapping = with_node_x(&grid.to_snapshot(), 1, 2);
    assert_eq!(
        GridEngine::from_snapshot(overlapping).expect_err("overlap"),
        GridModelError::Overlap {
            first: a,
            second: NodeId::new(2).expect("id")
        }
    );

    let mut future = grid.to_snapshot();
    future.schema_version = 99;
    assert_eq!(
        GridEngine::from_snapshot(future).expect_err("version"),
        GridModelError::UnsupportedSchemaVersion { version: 99 }
    );

    let too_wide = with_node_x(&grid.to_snapshot(), 1, 10);
    assert!(matches!(
        GridEngine::from_snapshot(too_wide),
        Err(GridModelError::OutOfBounds { .. })
    ));
}
