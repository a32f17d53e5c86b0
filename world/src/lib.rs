#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state for Sparse Life.
//!
//! The engine stores only live cells, keyed by a packed `y * width + x`
//! integer. A generation step restricts all neighbour bookkeeping to live
//! cells and their eight toroidal neighbours, so its cost scales with the
//! population rather than with the grid area.

mod error;

use std::collections::{HashMap, HashSet};

use sparse_life_core::{CellChange, CellCoord, CellRequest, GridDimensions};
use tracing::{debug, info};

pub use error::EngineError;

/// Outcome of a successful [`GridEngine::init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitSummary {
    /// Validated grid dimensions.
    pub dimensions: GridDimensions,
    /// Number of distinct live cells accepted.
    pub population: usize,
    /// Number of entries dropped for lying outside the grid.
    pub skipped: usize,
}

/// Sparse Game of Life engine on a toroidal grid.
#[derive(Debug, Default)]
pub struct GridEngine {
    dimensions: Option<GridDimensions>,
    live: HashSet<u64>,
    generation: u64,
    neighbor_counts: HashMap<u64, u8>,
    next: HashSet<u64>,
}

impl GridEngine {
    /// Creates an engine with no grid configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the grid, the live set and the generation counter.
    ///
    /// Entries outside the grid are skipped without failing the call. When
    /// the dimensions are invalid the engine is left uninitialized.
    pub fn init<I>(&mut self, width: u32, height: u32, cells: I) -> Result<InitSummary, EngineError>
    where
        I: IntoIterator<Item = CellCoord>,
    {
        self.reset();
        let dimensions = GridDimensions::new(width, height)
            .ok_or(EngineError::InvalidDimensions { width, height })?;

        let mut skipped = 0;
        for cell in cells {
            match pack(dimensions, cell) {
                Some(key) => {
                    let _ = self.live.insert(key);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, width, height, "skipped out-of-range initial cells");
        }

        self.dimensions = Some(dimensions);
        let summary = InitSummary {
            dimensions,
            population: self.live.len(),
            skipped,
        };
        info!(
            width,
            height,
            population = summary.population,
            "grid initialized"
        );
        Ok(summary)
    }

    /// Discards the grid and returns the engine to its uninitialized state.
    pub fn reset(&mut self) {
        self.dimensions = None;
        self.live.clear();
        self.next.clear();
        self.neighbor_counts.clear();
        self.generation = 0;
    }

    /// Computes the next generation, appending every changed cell to `out`.
    ///
    /// Appended changes are ordered row-major so identical inputs always
    /// yield identical output. Returns the generation reached.
    pub fn step(&mut self, out: &mut Vec<CellChange>) -> Result<u64, EngineError> {
        let dimensions = self.dimensions.ok_or(EngineError::NotInitialized)?;
        let width = u64::from(dimensions.width());
        let height = u64::from(dimensions.height());

        self.neighbor_counts.clear();
        for &key in &self.live {
            let x = key % width;
            let y = key / width;
            let columns = [(x + width - 1) % width, x, (x + 1) % width];
            let rows = [(y + height - 1) % height, y, (y + 1) % height];
            for (row_offset, row) in rows.into_iter().enumerate() {
                for (column_offset, column) in columns.into_iter().enumerate() {
                    if row_offset == 1 && column_offset == 1 {
                        continue;
                    }
                    *self.neighbor_counts.entry(row * width + column).or_insert(0) += 1;
                }
            }
        }

        let start = out.len();
        self.next.clear();
        for (&key, &count) in &self.neighbor_counts {
            let alive = self.live.contains(&key);
            let alive_next = matches!((alive, count), (true, 2 | 3) | (false, 3));
            if alive_next {
                let _ = self.next.insert(key);
            }
            if alive != alive_next {
                out.push(CellChange::new(unpack(width, key), alive_next));
            }
        }

        // Live cells without any live neighbour never entered the count map.
        for &key in &self.live {
            if !self.neighbor_counts.contains_key(&key) {
                out.push(CellChange::new(unpack(width, key), false));
            }
        }

        std::mem::swap(&mut self.live, &mut self.next);
        self.generation += 1;
        out[start..].sort_unstable_by_key(|change| (change.cell().y(), change.cell().x()));

        debug!(
            generation = self.generation,
            population = self.live.len(),
            changes = out.len() - start,
            "generation advanced"
        );
        Ok(self.generation)
    }

    /// Applies direct cell edits, appending the requests that changed state.
    ///
    /// Requests outside the grid and requests that match the current state
    /// are dropped. Returns the number of changes appended.
    pub fn set_cells(
        &mut self,
        requests: &[CellRequest],
        out: &mut Vec<CellChange>,
    ) -> Result<usize, EngineError> {
        let dimensions = self.dimensions.ok_or(EngineError::NotInitialized)?;
        let start = out.len();

        for request in requests {
            let Some(key) = pack(dimensions, request.cell()) else {
                debug!(
                    x = request.cell().x(),
                    y = request.cell().y(),
                    "dropping out-of-range cell request"
                );
                continue;
            };

            let changed = if request.alive() {
                self.live.insert(key)
            } else {
                self.live.remove(&key)
            };

            if changed {
                out.push(CellChange::new(request.cell(), request.alive()));
            }
        }

        Ok(out.len() - start)
    }
}

/// Query functions that provide read-only access to the engine state.
pub mod query {
    use sparse_life_core::{CellCoord, GridDimensions};

    use super::{pack, unpack, GridEngine};

    /// Dimensions of the configured grid, if any.
    #[must_use]
    pub fn dimensions(engine: &GridEngine) -> Option<GridDimensions> {
        engine.dimensions
    }

    /// Current generation counter.
    #[must_use]
    pub fn generation(engine: &GridEngine) -> u64 {
        engine.generation
    }

    /// Number of live cells.
    #[must_use]
    pub fn population(engine: &GridEngine) -> usize {
        engine.live.len()
    }

    /// Reports whether the provided cell is alive. Cells outside the grid are dead.
    #[must_use]
    pub fn is_alive(engine: &GridEngine, cell: CellCoord) -> bool {
        engine
            .dimensions
            .and_then(|dimensions| pack(dimensions, cell))
            .is_some_and(|key| engine.live.contains(&key))
    }

    /// Snapshot of all live cells in row-major order.
    #[must_use]
    pub fn live_cells(engine: &GridEngine) -> Vec<CellCoord> {
        let Some(dimensions) = engine.dimensions else {
            return Vec::new();
        };
        let width = u64::from(dimensions.width());
        let mut keys: Vec<u64> = engine.live.iter().copied().collect();
        keys.sort_unstable();
        keys.into_iter().map(|key| unpack(width, key)).collect()
    }
}

fn pack(dimensions: GridDimensions, cell: CellCoord) -> Option<u64> {
    if !dimensions.contains(cell) {
        return None;
    }
    Some(u64::from(cell.y()) * u64::from(dimensions.width()) + u64::from(cell.x()))
}

fn unpack(width: u64, key: u64) -> CellCoord {
    // Keys are only produced by `pack` or neighbour wrapping, so both halves fit in u32.
    CellCoord::new((key % width) as u32, (key / width) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(coords: &[(u32, u32)]) -> Vec<CellCoord> {
        coords.iter().map(|&(x, y)| CellCoord::new(x, y)).collect()
    }

    #[test]
    fn init_rejects_zero_dimensions_and_stays_uninitialized() {
        let mut engine = GridEngine::new();
        let result = engine.init(0, 10, cells(&[(0, 0)]));

        assert_eq!(
            result,
            Err(EngineError::InvalidDimensions {
                width: 0,
                height: 10
            })
        );
        assert_eq!(query::dimensions(&engine), None);
        assert_eq!(query::population(&engine), 0);
    }

    #[test]
    fn failed_init_discards_previous_grid() {
        let mut engine = GridEngine::new();
        let _ = engine.init(5, 5, cells(&[(1, 1)])).expect("valid init");
        assert!(engine.init(5, 0, Vec::new()).is_err());

        assert_eq!(query::dimensions(&engine), None);
        assert!(query::live_cells(&engine).is_empty());
    }

    #[test]
    fn init_skips_out_of_range_and_duplicate_cells() {
        let mut engine = GridEngine::new();
        let summary = engine
            .init(4, 4, cells(&[(0, 0), (3, 3), (4, 0), (0, 4), (0, 0)]))
            .expect("valid init");

        assert_eq!(summary.population, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(query::live_cells(&engine), cells(&[(0, 0), (3, 3)]));
    }

    #[test]
    fn reinit_resets_generation() {
        let mut engine = GridEngine::new();
        let _ = engine.init(6, 6, cells(&[(1, 1)])).expect("valid init");
        let mut changes = Vec::new();
        let _ = engine.step(&mut changes).expect("step");
        assert_eq!(query::generation(&engine), 1);

        let _ = engine.init(6, 6, Vec::new()).expect("valid init");
        assert_eq!(query::generation(&engine), 0);
        assert_eq!(query::dimensions(&engine), GridDimensions::new(6, 6));
    }

    #[test]
    fn step_before_init_is_an_error() {
        let mut engine = GridEngine::new();
        let mut changes = Vec::new();
        assert_eq!(engine.step(&mut changes), Err(EngineError::NotInitialized));
        assert!(changes.is_empty());
    }

    #[test]
    fn set_cells_before_init_is_an_error() {
        let mut engine = GridEngine::new();
        let mut changes = Vec::new();
        let requests = [CellRequest::new(CellCoord::new(0, 0), true)];
        assert_eq!(
            engine.set_cells(&requests, &mut changes),
            Err(EngineError::NotInitialized)
        );
    }

    #[test]
    fn set_cells_reports_only_effective_requests() {
        let mut engine = GridEngine::new();
        let _ = engine.init(8, 8, cells(&[(2, 2)])).expect("valid init");
        let mut changes = Vec::new();

        let requests = [
            CellRequest::new(CellCoord::new(2, 2), true),
            CellRequest::new(CellCoord::new(3, 3), false),
            CellRequest::new(CellCoord::new(9, 1), true),
            CellRequest::new(CellCoord::new(4, 4), true),
            CellRequest::new(CellCoord::new(2, 2), false),
        ];
        let applied = engine.set_cells(&requests, &mut changes).expect("set cells");

        assert_eq!(applied, 2);
        assert_eq!(
            changes,
            vec![
                CellChange::new(CellCoord::new(4, 4), true),
                CellChange::new(CellCoord::new(2, 2), false),
            ]
        );
        assert_eq!(query::generation(&engine), 0);
        assert_eq!(query::live_cells(&engine), cells(&[(4, 4)]));
    }

    #[test]
    fn isolated_cell_dies_without_neighbour_entries() {
        let mut engine = GridEngine::new();
        let _ = engine.init(10, 10, cells(&[(5, 5)])).expect("valid init");
        let mut changes = Vec::new();
        let generation = engine.step(&mut changes).expect("step");

        assert_eq!(generation, 1);
        assert_eq!(changes, vec![CellChange::new(CellCoord::new(5, 5), false)]);
        assert_eq!(query::population(&engine), 0);
    }

    #[test]
    fn step_appends_after_existing_entries() {
        let mut engine = GridEngine::new();
        let _ = engine.init(10, 10, cells(&[(5, 5)])).expect("valid init");
        let sentinel = CellChange::new(CellCoord::new(0, 0), true);
        let mut changes = vec![sentinel];
        let _ = engine.step(&mut changes).expect("step");

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], sentinel);
    }

    #[test]
    fn is_alive_treats_out_of_range_as_dead() {
        let mut engine = GridEngine::new();
        let _ = engine.init(3, 3, cells(&[(2, 2)])).expect("valid init");
        assert!(query::is_alive(&engine, CellCoord::new(2, 2)));
        assert!(!query::is_alive(&engine, CellCoord::new(5, 2)));
    }
}
