//! Covered-area accounting: the objective maximized by the solver.

use serde::{Deserialize, Serialize};

/// Standardized distance within which a target cell counts as represented.
pub const MATCH_THRESHOLD: f64 = 1.0;

/// Represented versus total study area for one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub represented_km2: f64,
    pub total_km2: f64,
    /// represented / total, 0 when the total is 0.
    pub fraction: f64,
}

impl AreaSummary {
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// Sum `cell_areas` over all cells (total) and over cells whose assigned
/// distance is ≤ `threshold` (represented). Slices are in table order.
pub fn account_with_threshold(
    distances: &[f64],
    cell_areas: &[f64],
    threshold: f64,
) -> AreaSummary {
    debug_assert_eq!(distances.len(), cell_areas.len());
    let (represented_km2, total_km2) = distances
        .iter()
        .zip(cell_areas)
        .fold((0.0, 0.0), |(rep, tot), (&d, &a)| {
            (if d <= threshold { rep + a } else { rep }, tot + a)
        });
    let fraction = if total_km2 > 0.0 { represented_km2 / total_km2 } else { 0.0 };
    AreaSummary { represented_km2, total_km2, fraction }
}

/// Area accounting at the fixed match threshold of 1.0.
pub fn account(distances: &[f64], cell_areas: &[f64]) -> AreaSummary {
    account_with_threshold(distances, cell_areas, MATCH_THRESHOLD)
}
