//! Dual stopping rule: area stability over a trailing window, or the
//! iteration cap.

use serde::{Deserialize, Serialize};

/// Consecutive iterations whose area change must stay within `min_area`.
pub const STABILITY_WINDOW: usize = 5;

/// Why a restart stopped iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Converged,
    MaxIterReached,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRule {
    /// km²
    pub min_area: f64,
    pub max_iter: usize,
}

impl StopRule {
    pub fn new(min_area: f64, max_iter: usize) -> Self {
        Self { min_area, max_iter }
    }

    /// Decide after the latest iteration, given the represented area of
    /// every iteration so far (oldest first). Iteration 1's change is taken
    /// against 0 km². Convergence wins over the cap when both hold.
    ///
    /// The window compares the absolute change, so a drop in represented
    /// area larger than `min_area` breaks stability just as a gain does.
    pub fn check(&self, areas: &[f64]) -> Option<StopReason> {
        let n = areas.len();
        if n >= STABILITY_WINDOW {
            let stable = (n - STABILITY_WINDOW..n).all(|i| {
                let prev = if i == 0 { 0.0 } else { areas[i - 1] };
                (areas[i] - prev).abs() <= self.min_area
            });
            if stable {
                return Some(StopReason::Converged);
            }
        }
        if n >= self.max_iter {
            return Some(StopReason::MaxIterReached);
        }
        None
    }
}

/// Area change of every iteration against the previous one (the first
/// against 0 km²).
pub fn area_changes(areas: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    areas
        .iter()
        .map(|&a| {
            let d = a - prev;
            prev = a;
            d
        })
        .collect()
}
