//! One restart: random initial subset, then assign / relocate until the
//! stopping rule fires.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::area::{account, AreaSummary};
use crate::assign::{assign, Assignment};
use crate::distance::StandardizedTable;
use crate::error::{KpointsError, Result};
use crate::table::{CellId, TargetTable};

use super::stopping::{StopReason, StopRule};

/// Snapshot of one iteration: the subset set that was evaluated and the
/// area it represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub restart: usize,
    /// 1-based.
    pub iteration: usize,
    pub subset: Vec<CellId>,
    pub represented_km2: f64,
    pub total_km2: f64,
    pub fraction: f64,
}

/// The winning record of one restart plus how the restart ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartOutcome {
    pub restart: usize,
    pub best: IterationRecord,
    pub stop_reason: StopReason,
    pub iterations: usize,
    /// Every record of the restart; empty unless tracing was requested.
    pub trace: Vec<IterationRecord>,
}

/// Read-only inputs shared by all restarts of one k.
pub struct RestartContext<'a> {
    pub table: &'a TargetTable,
    pub standardized: &'a StandardizedTable,
    pub cell_areas: &'a [f64],
    pub k: usize,
    pub n_starts: usize,
    pub stop: StopRule,
    pub keep_trace: bool,
    pub cancel: Option<&'a AtomicBool>,
}

/// Draw `k` distinct rows uniformly without replacement.
pub fn initial_subset<R: Rng + ?Sized>(n_cells: usize, k: usize, rng: &mut R) -> Vec<usize> {
    rand::seq::index::sample(rng, n_cells, k).into_vec()
}

/// Replace every subset cell with the member of its cluster nearest to the
/// cluster's mean (in standardized space). Ties go to the first member in
/// table order. Returns row indices, one per slot, in slot order.
pub fn relocate(
    table: &StandardizedTable,
    assignment: &Assignment,
    k: usize,
) -> std::result::Result<Vec<usize>, String> {
    let m = table.n_vars();
    let counts = assignment.cluster_sizes(k);
    let mut sums = vec![0.0f64; k * m];
    for (i, &slot) in assignment.slot.iter().enumerate() {
        for (acc, v) in sums[slot * m..(slot + 1) * m].iter_mut().zip(table.row(i)) {
            *acc += v;
        }
    }

    if let Some(slot) = counts.iter().position(|&c| c == 0) {
        return Err(format!("cluster {slot} is empty"));
    }
    for (slot, centroid) in sums.chunks_exact_mut(m).enumerate() {
        let n = counts[slot] as f64;
        centroid.iter_mut().for_each(|v| *v /= n);
        if centroid.iter().any(|v| !v.is_finite()) {
            return Err(format!("centroid of cluster {slot} is not finite"));
        }
    }

    let mut best = vec![(usize::MAX, f64::INFINITY); k];
    for (i, &slot) in assignment.slot.iter().enumerate() {
        let d = table.distance_to(i, &sums[slot * m..(slot + 1) * m]);
        if d < best[slot].1 {
            best[slot] = (i, d);
        }
    }
    if let Some(slot) = best.iter().position(|&(row, _)| row == usize::MAX) {
        return Err(format!("no finite distance to the centroid of cluster {slot}"));
    }
    Ok(best.into_iter().map(|(row, _)| row).collect())
}

/// Record with the largest represented area; the earliest one on ties.
pub fn best_record(records: &[IterationRecord]) -> Option<&IterationRecord> {
    records.iter().reduce(|best, r| {
        if r.represented_km2 > best.represented_km2 {
            r
        } else {
            best
        }
    })
}

/// Run one restart to completion.
pub fn run_restart<R: Rng + ?Sized>(
    ctx: &RestartContext<'_>,
    restart: usize,
    rng: &mut R,
) -> Result<RestartOutcome> {
    let mut subset = initial_subset(ctx.table.len(), ctx.k, rng);
    let mut records: Vec<IterationRecord> = Vec::new();
    let mut areas: Vec<f64> = Vec::new();

    let stop_reason = loop {
        if ctx.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            if records.is_empty() {
                return Err(KpointsError::Cancelled(restart));
            }
            break StopReason::Cancelled;
        }

        let iteration = records.len() + 1;
        info!(
            "iteration {iteration}/{} | k = {} | restart {}/{}",
            ctx.stop.max_iter,
            ctx.k,
            restart + 1,
            ctx.n_starts
        );

        let assignment = assign(ctx.standardized, &subset);
        let area: AreaSummary = account(&assignment.distance, ctx.cell_areas);
        if !area.represented_km2.is_finite() {
            return Err(KpointsError::Numerical {
                restart,
                iteration,
                message: "represented area is not finite".into(),
            });
        }
        let next = relocate(ctx.standardized, &assignment, ctx.k)
            .map_err(|message| KpointsError::Numerical { restart, iteration, message })?;

        records.push(IterationRecord {
            restart,
            iteration,
            subset: subset.iter().map(|&row| ctx.table.id(row)).collect(),
            represented_km2: area.represented_km2,
            total_km2: area.total_km2,
            fraction: area.fraction,
        });
        areas.push(area.represented_km2);

        info!(
            "iteration {iteration} done | restart {}/{} | k = {} | represented {:.2} km² ({:.2}%)",
            restart + 1,
            ctx.n_starts,
            ctx.k,
            area.represented_km2,
            area.percent()
        );

        if let Some(reason) = ctx.stop.check(&areas) {
            break reason;
        }
        subset = next;
    };

    let iterations = records.len();
    let best = best_record(&records).cloned().ok_or(KpointsError::Cancelled(restart))?;
    debug!(
        "restart {}/{} (k = {}) stopped after {iterations} iterations ({stop_reason:?}); best iteration {} with {:.2} km²",
        restart + 1,
        ctx.n_starts,
        ctx.k,
        best.iteration,
        best.represented_km2
    );

    Ok(RestartOutcome {
        restart,
        best,
        stop_reason,
        iterations,
        trace: if ctx.keep_trace { records } else { Vec::new() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Criteria;
    use crate::table::TargetCell;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        table: TargetTable,
        standardized: StandardizedTable,
        areas: Vec<f64>,
    }

    /// 1-D gradient of `n` cells, one km² each.
    fn fixture(n: usize, criterion: f64) -> Fixture {
        let cells = (0..n)
            .map(|i| TargetCell {
                id: 100 + i as u64,
                x: i as f64,
                y: 0.0,
                values: vec![(i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1],
            })
            .collect();
        let table = TargetTable::from_cells(cells).unwrap();
        let criteria = Criteria::new(vec![criterion]).unwrap();
        let standardized = StandardizedTable::new(&table, &criteria).unwrap();
        Fixture { table, standardized, areas: vec![1.0; n] }
    }

    fn context(f: &Fixture, k: usize, keep_trace: bool) -> RestartContext<'_> {
        RestartContext {
            table: &f.table,
            standardized: &f.standardized,
            cell_areas: &f.areas,
            k,
            n_starts: 1,
            stop: StopRule::new(0.0, 30),
            keep_trace,
            cancel: None,
        }
    }

    #[test]
    fn initial_subset_is_distinct() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut s = initial_subset(20, 7, &mut rng);
            assert_eq!(s.len(), 7);
            s.sort_unstable();
            s.dedup();
            assert_eq!(s.len(), 7);
            assert!(s.iter().all(|&r| r < 20));
        }
    }

    #[test]
    fn relocation_snaps_to_member_nearest_the_mean() {
        let cells = [0.0, 1.0, 2.0, 10.0, 13.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| TargetCell { id: i as u64, x: 0.0, y: 0.0, values: vec![v] })
            .collect();
        let table = TargetTable::from_cells(cells).unwrap();
        let st = StandardizedTable::new(&table, &Criteria::new(vec![1.0]).unwrap()).unwrap();
        let a = assign(&st, &[0, 4]);
        // Cluster 0 = {0, 1, 2}, mean 1 → row 1.
        // Cluster 1 = {10, 13}, mean 11.5: both 1.5 away, first in table order wins.
        assert_eq!(relocate(&st, &a, 2).unwrap(), vec![1, 3]);
    }

    #[test]
    fn relocation_reports_empty_clusters() {
        let f = fixture(6, 1.0);
        let a = Assignment { slot: vec![0; 6], distance: vec![0.0; 6] };
        assert!(relocate(&f.standardized, &a, 2).is_err());
    }

    #[test]
    fn best_record_prefers_earliest_maximum() {
        let rec = |iteration, area| IterationRecord {
            restart: 0,
            iteration,
            subset: vec![],
            represented_km2: area,
            total_km2: 10.0,
            fraction: area / 10.0,
        };
        let records = vec![rec(1, 3.0), rec(2, 7.0), rec(3, 5.0), rec(4, 7.0)];
        assert_eq!(best_record(&records).unwrap().iteration, 2);
        assert!(best_record(&[]).is_none());
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let f = fixture(60, 0.8);
        let ctx = context(&f, 5, true);
        let a = run_restart(&ctx, 0, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = run_restart(&ctx, 0, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trace.len(), a.iterations);
    }

    #[test]
    fn every_subset_cell_is_a_target_cell() {
        let f = fixture(80, 0.5);
        let ctx = context(&f, 6, true);
        for seed in 0..10 {
            let out = run_restart(&ctx, 0, &mut StdRng::seed_from_u64(seed)).unwrap();
            for rec in &out.trace {
                assert_eq!(rec.subset.len(), 6);
                let mut ids = rec.subset.clone();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), 6, "duplicate subset cell at iteration {}", rec.iteration);
                assert!(rec.subset.iter().all(|&id| f.table.contains(id)));
            }
        }
    }

    #[test]
    fn winner_is_the_best_record_of_the_trace() {
        let f = fixture(50, 0.6);
        let ctx = context(&f, 4, true);
        let out = run_restart(&ctx, 2, &mut StdRng::seed_from_u64(5)).unwrap();
        let max = out.trace.iter().map(|r| r.represented_km2).fold(f64::MIN, f64::max);
        assert_eq!(out.best.represented_km2, max);
        assert_eq!(out.best.restart, 2);
        assert!(out.iterations <= 30);
    }

    #[test]
    fn trace_is_dropped_unless_requested() {
        let f = fixture(30, 1.0);
        let out = run_restart(&context(&f, 3, false), 0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(out.trace.is_empty());
        assert!(out.iterations >= 1);
    }

    #[test]
    fn cancelled_before_first_iteration_is_an_error() {
        let f = fixture(30, 1.0);
        let flag = AtomicBool::new(true);
        let mut ctx = context(&f, 3, false);
        ctx.cancel = Some(&flag);
        assert_eq!(
            run_restart(&ctx, 4, &mut StdRng::seed_from_u64(1)).unwrap_err(),
            KpointsError::Cancelled(4)
        );
    }
}
