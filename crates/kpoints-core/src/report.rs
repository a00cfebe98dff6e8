//! Flat rows for coverage-vs-k plots, stopping-criteria traces and
//! criteria comparisons.

use serde::{Deserialize, Serialize};

use crate::compare::Comparison;
use crate::solver::stopping::area_changes;
use crate::solver::{KpointsRun, SolverResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub k: usize,
    pub represented_km2: f64,
    pub total_km2: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub k: usize,
    pub restart: usize,
    pub iteration: usize,
    pub represented_km2: f64,
    /// Change against the previous iteration of the same restart.
    pub change_km2: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Criteria joined with ';'.
    pub criteria: String,
    pub k: usize,
    pub represented_km2: f64,
    pub total_km2: f64,
    pub percent: f64,
}

/// One row per k, in klist order.
pub fn coverage_rows(run: &KpointsRun) -> Vec<CoverageRow> {
    run.results
        .iter()
        .map(|r| CoverageRow {
            k: r.k,
            represented_km2: r.represented_km2,
            total_km2: r.total_km2,
            percent: r.percent(),
        })
        .collect()
}

/// Per-restart, per-iteration coverage of a `verify_stop` result.
/// Empty when the result carries no trace.
pub fn trace_rows(result: &SolverResult) -> Vec<TraceRow> {
    let mut rows = Vec::with_capacity(result.trace.len());
    let mut restarts: Vec<usize> = result.trace.iter().map(|r| r.restart).collect();
    restarts.sort_unstable();
    restarts.dedup();

    for restart in restarts {
        let mut records: Vec<_> = result.trace.iter().filter(|r| r.restart == restart).collect();
        records.sort_by_key(|r| r.iteration);
        let areas: Vec<f64> = records.iter().map(|r| r.represented_km2).collect();
        for (rec, change) in records.iter().zip(area_changes(&areas)) {
            rows.push(TraceRow {
                k: result.k,
                restart: rec.restart,
                iteration: rec.iteration,
                represented_km2: rec.represented_km2,
                change_km2: change,
                percent: rec.fraction * 100.0,
            });
        }
    }
    rows
}

pub fn comparison_rows(cmp: &Comparison) -> Vec<ComparisonRow> {
    cmp.entries
        .iter()
        .map(|e| ComparisonRow {
            criteria: e
                .criteria
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(";"),
            k: e.k,
            represented_km2: e.represented_km2,
            total_km2: cmp.total_km2,
            percent: e.percent(),
        })
        .collect()
}
