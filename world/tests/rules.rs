use std::collections::{BTreeSet, HashMap};

use sparse_life_core::{CellChange, CellCoord, CellRequest};
use sparse_life_world::{query, GridEngine};

fn engine_with(width: u32, height: u32, cells: &[(u32, u32)]) -> GridEngine {
    let mut engine = GridEngine::new();
    let _ = engine
        .init(
            width,
            height,
            cells.iter().map(|&(x, y)| CellCoord::new(x, y)),
        )
        .expect("valid init");
    engine
}

fn live_set(engine: &GridEngine) -> BTreeSet<(u32, u32)> {
    query::live_cells(engine)
        .into_iter()
        .map(|cell| (cell.x(), cell.y()))
        .collect()
}

fn step(engine: &mut GridEngine) -> Vec<CellChange> {
    let mut changes = Vec::new();
    let _ = engine.step(&mut changes).expect("step");
    changes
}

/// Brute-force full-grid reference used to cross-check the sparse step.
fn reference_step(width: u32, height: u32, live: &BTreeSet<(u32, u32)>) -> BTreeSet<(u32, u32)> {
    let mut next = BTreeSet::new();
    for y in 0..height {
        for x in 0..width {
            let mut count = 0;
            for dy in [height - 1, 0, 1] {
                for dx in [width - 1, 0, 1] {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if live.contains(&((x + dx) % width, (y + dy) % height)) {
                        count += 1;
                    }
                }
            }
            let alive = live.contains(&(x, y));
            if matches!((alive, count), (true, 2 | 3) | (false, 3)) {
                let _ = next.insert((x, y));
            }
        }
    }
    next
}

#[test]
fn block_is_a_still_life_anywhere_on_the_torus() {
    for &(x, y) in &[(3, 3), (9, 9), (0, 9), (9, 0)] {
        let cells = [
            (x, y),
            ((x + 1) % 10, y),
            (x, (y + 1) % 10),
            ((x + 1) % 10, (y + 1) % 10),
        ];
        let mut engine = engine_with(10, 10, &cells);
        let before = live_set(&engine);

        for _ in 0..6 {
            assert!(step(&mut engine).is_empty(), "block at ({x},{y}) changed");
        }
        assert_eq!(live_set(&engine), before);
        assert_eq!(query::generation(&engine), 6);
    }
}

#[test]
fn blinker_has_period_two_and_toggles_each_cell_twice() {
    let vertical = [(5, 4), (5, 5), (5, 6)];
    let mut engine = engine_with(12, 12, &vertical);
    let original = live_set(&engine);

    let first = step(&mut engine);
    assert_eq!(
        live_set(&engine),
        [(4, 5), (5, 5), (6, 5)].into_iter().collect::<BTreeSet<_>>()
    );
    let second = step(&mut engine);
    assert_eq!(live_set(&engine), original);

    let mut toggles: HashMap<(u32, u32), usize> = HashMap::new();
    for change in first.iter().chain(second.iter()) {
        *toggles
            .entry((change.cell().x(), change.cell().y()))
            .or_insert(0) += 1;
    }
    assert_eq!(toggles.len(), 4, "only the four tips ever change");
    assert!(toggles.values().all(|&count| count == 2));
    assert!(!toggles.contains_key(&(5, 5)), "centre cell never changes");
}

#[test]
fn glider_translates_by_one_diagonal_every_four_steps() {
    let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
    let mut engine = engine_with(10, 10, &glider);

    for cycle in 1..=12u32 {
        for _ in 0..4 {
            let _ = step(&mut engine);
        }
        let expected: BTreeSet<(u32, u32)> = glider
            .iter()
            .map(|&(x, y)| ((x + cycle) % 10, (y + cycle) % 10))
            .collect();
        assert_eq!(live_set(&engine), expected, "cycle {cycle}");
    }
}

#[test]
fn corner_cell_counts_as_neighbour_across_both_edges() {
    // (0,0) plus two cells that are its toroidal neighbours give (W-1,H-1)
    // exactly three live neighbours.
    let (width, height) = (7, 5);
    let mut engine = engine_with(width, height, &[(0, 0), (width - 1, 0), (0, height - 1)]);
    let changes = step(&mut engine);

    assert!(changes.contains(&CellChange::new(
        CellCoord::new(width - 1, height - 1),
        true
    )));
    assert!(query::is_alive(
        &engine,
        CellCoord::new(width - 1, height - 1)
    ));
}

#[test]
fn origin_is_a_neighbour_of_each_wrapped_corner() {
    let (width, height) = (6, 6);
    // Each target gets two ordinary neighbours; it is only born if the
    // origin is counted across the edge as the third.
    let probes = [
        ((width - 1, 0), [(width - 2, 0), (width - 2, 1)]),
        ((0, height - 1), [(0, height - 2), (1, height - 2)]),
        ((width - 1, height - 1), [(width - 2, height - 2), (width - 2, height - 1)]),
    ];

    for ((tx, ty), helpers) in probes {
        let mut engine = engine_with(width, height, &[(0, 0), helpers[0], helpers[1]]);
        let changes = step(&mut engine);
        assert!(
            changes.contains(&CellChange::new(CellCoord::new(tx, ty), true)),
            "({tx},{ty}) should be born from a wrapped neighbour"
        );
    }
}

#[test]
fn survival_birth_and_death_follow_b3_s23() {
    // Row of four: ends have one neighbour (die), middles have two (survive),
    // cells above and below the middles have three (born).
    let mut engine = engine_with(10, 10, &[(3, 5), (4, 5), (5, 5), (6, 5)]);
    let _ = step(&mut engine);
    let expected: BTreeSet<(u32, u32)> = [(4, 4), (5, 4), (4, 5), (5, 5), (4, 6), (5, 6)]
        .into_iter()
        .collect();
    assert_eq!(live_set(&engine), expected);

    // A plus shape: the centre has four neighbours and dies of overcrowding.
    let mut crowded = engine_with(10, 10, &[(5, 5), (4, 5), (6, 5), (5, 4), (5, 6)]);
    let _ = step(&mut crowded);
    assert!(!query::is_alive(&crowded, CellCoord::new(5, 5)));
}

#[test]
fn sparse_step_matches_full_grid_reference() {
    let (width, height) = (16, 11);
    let seed = [
        (0, 0),
        (1, 0),
        (15, 0),
        (0, 10),
        (7, 3),
        (8, 3),
        (9, 3),
        (8, 4),
        (12, 9),
        (13, 9),
        (13, 10),
        (3, 7),
        (4, 8),
        (2, 9),
        (3, 9),
        (4, 9),
    ];
    let mut engine = engine_with(width, height, &seed);

    for _ in 0..20 {
        let before = live_set(&engine);
        let expected = reference_step(width, height, &before);
        let changes = step(&mut engine);
        let after = live_set(&engine);
        assert_eq!(after, expected);

        let expected_changes: BTreeSet<(u32, u32, bool)> = before
            .symmetric_difference(&after)
            .map(|&(x, y)| (x, y, after.contains(&(x, y))))
            .collect();
        let reported: BTreeSet<(u32, u32, bool)> = changes
            .iter()
            .map(|change| (change.cell().x(), change.cell().y(), change.alive()))
            .collect();
        assert_eq!(reported, expected_changes);
        assert_eq!(reported.len(), changes.len(), "no duplicate change entries");
    }
}

#[test]
fn step_is_deterministic_for_identical_inputs() {
    let seed = [(1, 1), (2, 1), (3, 1), (2, 3), (3, 3), (7, 7), (7, 8), (8, 7)];
    let mut first = engine_with(20, 20, &seed);
    let mut second = engine_with(20, 20, &seed);

    for _ in 0..10 {
        assert_eq!(step(&mut first), step(&mut second));
        assert_eq!(live_set(&first), live_set(&second));
    }
}

#[test]
fn edits_do_not_advance_generation() {
    let mut engine = engine_with(5, 5, &[]);
    let mut changes = Vec::new();
    let _ = engine
        .set_cells(
            &[CellRequest::new(CellCoord::new(1, 1), true)],
            &mut changes,
        )
        .expect("set cells");
    assert_eq!(query::generation(&engine), 0);
    assert_eq!(query::population(&engine), 1);
}

#[test]
fn idempotent_requests_yield_no_changes() {
    let mut engine = engine_with(5, 5, &[(2, 2)]);
    let mut changes = Vec::new();
    let applied = engine
        .set_cells(
            &[
                CellRequest::new(CellCoord::new(2, 2), true),
                CellRequest::new(CellCoord::new(0, 0), false),
                CellRequest::new(CellCoord::new(5, 0), true),
                CellRequest::new(CellCoord::new(0, 5), false),
            ],
            &mut changes,
        )
        .expect("set cells");

    assert_eq!(applied, 0);
    assert!(changes.is_empty());
    assert_eq!(live_set(&engine), [(2, 2)].into_iter().collect());
}

#[test]
fn large_sparse_grid_steps_only_relevant_cells() {
    let mut engine = engine_with(100_000, 100_000, &[(99_999, 99_999), (0, 99_999), (99_999, 0)]);
    let changes = step(&mut engine);

    // Each cell has two live neighbours; (0,0) is born with three.
    assert!(changes.contains(&CellChange::new(CellCoord::new(0, 0), true)));
    assert_eq!(query::population(&engine), 4);
}
