// THEORY:
// Every per-pixel computation in the engine (background mean, deviation score,
// threshold) reads only that pixel's column of samples. The whole frame is an
// embarrassingly parallel map over a 2D index space.
//
// `GridPass` is how such a map is executed:
// - `Sequential`: plain row-major loop on the calling thread.
// - `Parallel`: the output grid is split into rows and the rows are handed to a
//   dedicated rayon pool. Each task owns a disjoint slice of the output and only
//   reads shared, immutable inputs, so no synchronisation is needed mid-pass.
//
// Two consecutive `map` calls form the barrier between the background pass and
// the scoring pass: `install` only returns once every row of the first grid is
// written.

use crate::core_modules::frame::Grid;
use crate::error::MotionResult;
use rayon::prelude::*;
use std::sync::Arc;

/// Execution policy for a full-frame per-pixel map.
#[derive(Clone)]
pub enum GridPass {
    Sequential,
    Parallel(Arc<rayon::ThreadPool>),
}

impl GridPass {
    /// A row-parallel pass on a fresh pool. `None` sizes the pool to the logical CPU count.
    pub fn parallel(threads: Option<usize>) -> MotionResult<Self> {
        let threads = threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("motion-grid-{index}"))
            .build()?;
        log::debug!("Grid pass runs on {} worker threads", threads);
        Ok(GridPass::Parallel(Arc::new(pool)))
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, GridPass::Parallel(_))
    }

    pub fn threads(&self) -> usize {
        match self {
            GridPass::Sequential => 1,
            GridPass::Parallel(pool) => pool.current_num_threads(),
        }
    }

    /// Builds a `width`×`height` grid where each cell is `cell(offset)`.
    pub fn map<T, F>(&self, width: u32, height: u32, cell: F) -> Grid<T>
    where
        T: Copy + Default + Send,
        F: Fn(usize) -> T + Sync,
    {
        let row_len = width as usize;
        let total = row_len * height as usize;
        if total == 0 {
            return Grid::from_cells(width, height, Vec::new());
        }

        let cells = match self {
            GridPass::Sequential => (0..total).map(&cell).collect(),
            GridPass::Parallel(pool) => {
                let mut cells = vec![T::default(); total];
                pool.install(|| {
                    cells
                        .par_chunks_mut(row_len)
                        .enumerate()
                        .for_each(|(y, row)| {
                            let row_start = y * row_len;
                            for (x, out) in row.iter_mut().enumerate() {
                                *out = cell(row_start + x);
                            }
                        });
                });
                cells
            }
        };
        Grid::from_cells(width, height, cells)
    }
}

impl std::fmt::Debug for GridPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridPass::Sequential => f.write_str("Sequential"),
            GridPass::Parallel(pool) => write!(f, "Parallel({} threads)", pool.current_num_threads()),
        }
    }
}
