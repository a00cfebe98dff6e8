//! Nearest-subset-cell assignment (1-NN in standardized space).

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::distance::StandardizedTable;

/// Nearest subset cell for every target cell, recomputed wholesale per iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Position in the subset set (0..k) of each cell's nearest subset cell.
    pub slot: Vec<usize>,
    /// Standardized distance to that subset cell.
    pub distance: Vec<f64>,
}

impl Assignment {
    pub fn len(&self) -> usize {
        self.slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_empty()
    }

    /// Number of target cells assigned to each slot.
    pub fn cluster_sizes(&self, k: usize) -> Vec<usize> {
        let mut sizes = vec![0usize; k];
        for &s in &self.slot {
            sizes[s] += 1;
        }
        sizes
    }
}

/// Assign every row of `table` to its nearest cell in `subset` (row indices).
///
/// Exact ties resolve to the earliest slot. A cell that is itself in the
/// subset is always assigned to its own slot, even when another subset cell
/// carries identical values.
pub fn assign(table: &StandardizedTable, subset: &[usize]) -> Assignment {
    let mut own_slot = vec![usize::MAX; table.n_cells()];
    for (slot, &row) in subset.iter().enumerate() {
        own_slot[row] = slot;
    }

    let nearest = |i: usize| -> (usize, f64) {
        if own_slot[i] != usize::MAX {
            return (own_slot[i], 0.0);
        }
        let cell = table.row(i);
        let mut best = (0usize, f64::INFINITY);
        for (slot, &s) in subset.iter().enumerate() {
            let d = table.distance_to(s, cell);
            if d < best.1 {
                best = (slot, d);
            }
        }
        best
    };

    #[cfg(feature = "threading")]
    let pairs: Vec<(usize, f64)> = (0..table.n_cells()).into_par_iter().map(nearest).collect();
    #[cfg(not(feature = "threading"))]
    let pairs: Vec<(usize, f64)> = (0..table.n_cells()).map(nearest).collect();

    let (slot, distance) = pairs.into_iter().unzip();
    Assignment { slot, distance }
}
