//! Kpoints iterative solver.
//!
//! For every k: validate, then run `n_starts` independent restarts (in
//! parallel with the `threading` feature), reduce each restart's iteration
//! records to its best record, and reduce those to the k's result.
//!
//! Per-restart seeds are drawn from the caller's generator before any
//! restart runs, so results do not depend on thread scheduling.

pub mod config;
pub mod restart;
pub mod stopping;

use std::sync::atomic::AtomicBool;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distance::StandardizedTable;
use crate::error::{KpointsError, Result};
use crate::raster::RasterTemplate;
use crate::table::{CellId, TargetTable};

pub use config::{KList, KpointsConfig, RECOMMENDED_MIN_STARTS};
pub use restart::{IterationRecord, RestartOutcome};
pub use stopping::{StopReason, StopRule, STABILITY_WINDOW};

use restart::{run_restart, RestartContext};

/// A selected representative cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetCell {
    pub id: CellId,
    pub x: f64,
    pub y: f64,
}

/// A restart that contributed nothing, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartFailure {
    pub restart: usize,
    pub message: String,
}

/// How the restarts of one k ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub converged: usize,
    pub max_iter_reached: usize,
    pub cancelled: usize,
    pub failed: Vec<RestartFailure>,
}

/// Compact per-restart summary kept in every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartSummary {
    pub restart: usize,
    pub best_iteration: usize,
    pub represented_km2: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

/// Run settings echoed into each result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub criteria: Vec<f64>,
    pub klist: Vec<usize>,
    pub n_starts: usize,
    pub min_area: f64,
    pub iter: usize,
}

/// Best subset for one (k, criteria) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    pub k: usize,
    pub subset: Vec<SubsetCell>,
    pub represented_km2: f64,
    pub total_km2: f64,
    pub fraction: f64,
    /// Restart and iteration that produced the subset.
    pub restart: usize,
    pub iteration: usize,
    pub settings: RunSettings,
    pub restarts: Vec<RestartSummary>,
    pub diagnostics: RunDiagnostics,
    /// All iteration records of all restarts when `verify_stop` is set.
    pub trace: Vec<IterationRecord>,
}

impl SolverResult {
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// One result per requested k, in klist order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpointsRun {
    pub total_km2: f64,
    pub results: Vec<SolverResult>,
}

impl KpointsRun {
    pub fn for_k(&self, k: usize) -> Option<&SolverResult> {
        self.results.iter().find(|r| r.k == k)
    }
}

/// Best restart by represented area; the earliest restart on ties.
pub fn best_restart(outcomes: &[RestartOutcome]) -> Option<&RestartOutcome> {
    outcomes.iter().reduce(|best, o| {
        if o.best.represented_km2 > best.best.represented_km2 {
            o
        } else {
            best
        }
    })
}

/// Site selection over the target table.
pub struct Solver<'a> {
    table: &'a TargetTable,
    template: &'a RasterTemplate,
    config: &'a KpointsConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Solver<'a> {
    pub fn new(
        table: &'a TargetTable,
        template: &'a RasterTemplate,
        config: &'a KpointsConfig,
    ) -> Self {
        Self { table, template, config, cancel: None }
    }

    /// Stop all restarts at the next iteration boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run with the master generator seeded from `config.seed` (or entropy).
    pub fn run(&self) -> Result<KpointsRun> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(&mut rng)
    }

    /// Run with an injected master generator.
    pub fn run_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<KpointsRun> {
        let (criteria, ks) = self.config.validate(self.table)?;
        let cell_areas = self.template.cell_areas(self.table)?;
        let standardized = StandardizedTable::new(self.table, &criteria)?;
        let total_km2: f64 = cell_areas.iter().sum();
        info!(
            "{} target cells on a {} cell grid cover {:.2} of {:.2} km²",
            self.table.len(),
            self.template.n_cells(),
            total_km2,
            self.template.extent_area_km2()
        );

        let settings = RunSettings {
            criteria: criteria.as_slice().to_vec(),
            klist: ks.clone(),
            n_starts: self.config.n_starts,
            min_area: self.config.min_area,
            iter: self.config.iter,
        };

        let mut results = Vec::with_capacity(ks.len());
        for &k in &ks {
            let seeds: Vec<u64> = (0..self.config.n_starts).map(|_| rng.gen()).collect();
            let ctx = RestartContext {
                table: self.table,
                standardized: &standardized,
                cell_areas: &cell_areas,
                k,
                n_starts: self.config.n_starts,
                stop: StopRule::new(self.config.min_area, self.config.iter),
                keep_trace: self.config.verify_stop,
                cancel: self.cancel,
            };
            results.push(self.solve_k(&ctx, &seeds, settings.clone())?);
        }

        Ok(KpointsRun { total_km2, results })
    }

    fn solve_k(
        &self,
        ctx: &RestartContext<'_>,
        seeds: &[u64],
        settings: RunSettings,
    ) -> Result<SolverResult> {
        let run_one = |(restart, &seed): (usize, &u64)| {
            run_restart(ctx, restart, &mut StdRng::seed_from_u64(seed))
        };
        #[cfg(feature = "threading")]
        let attempts: Vec<Result<RestartOutcome>> =
            seeds.par_iter().enumerate().map(run_one).collect();
        #[cfg(not(feature = "threading"))]
        let attempts: Vec<Result<RestartOutcome>> =
            seeds.iter().enumerate().map(run_one).collect();

        let mut outcomes = Vec::with_capacity(attempts.len());
        let mut diagnostics = RunDiagnostics::default();
        for (restart, attempt) in attempts.into_iter().enumerate() {
            match attempt {
                Ok(outcome) => {
                    match outcome.stop_reason {
                        StopReason::Converged => diagnostics.converged += 1,
                        StopReason::MaxIterReached => diagnostics.max_iter_reached += 1,
                        StopReason::Cancelled => diagnostics.cancelled += 1,
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    warn!("k = {}: restart {} failed: {e}", ctx.k, restart + 1);
                    if matches!(e, KpointsError::Cancelled(_)) {
                        diagnostics.cancelled += 1;
                    }
                    diagnostics.failed.push(RestartFailure { restart, message: e.to_string() });
                }
            }
        }

        if diagnostics.max_iter_reached > 0 {
            warn!(
                "k = {}: {}/{} restarts hit iter = {} without a stable area; consider raising iter or min_area",
                ctx.k,
                diagnostics.max_iter_reached,
                seeds.len(),
                ctx.stop.max_iter
            );
        }

        let winner = best_restart(&outcomes).ok_or(KpointsError::AllRestartsFailed(seeds.len()))?;
        let (restart, best) = (winner.restart, winner.best.clone());
        info!(
            "k = {}: best restart {} iteration {} represents {:.2} of {:.2} km² ({:.2}%)",
            ctx.k,
            restart + 1,
            best.iteration,
            best.represented_km2,
            best.total_km2,
            best.fraction * 100.0
        );

        let subset = best
            .subset
            .iter()
            .filter_map(|&id| self.table.row_of(id))
            .map(|row| SubsetCell {
                id: self.table.id(row),
                x: self.table.x(row),
                y: self.table.y(row),
            })
            .collect();
        let restarts = outcomes
            .iter()
            .map(|o| RestartSummary {
                restart: o.restart,
                best_iteration: o.best.iteration,
                represented_km2: o.best.represented_km2,
                iterations: o.iterations,
                stop_reason: o.stop_reason,
            })
            .collect();
        let trace = outcomes.into_iter().flat_map(|o| o.trace).collect();

        Ok(SolverResult {
            k: ctx.k,
            subset,
            represented_km2: best.represented_km2,
            total_km2: best.total_km2,
            fraction: best.fraction,
            restart,
            iteration: best.iteration,
            settings,
            restarts,
            diagnostics,
            trace,
        })
    }
}

/// Run the solver once over `config.klist`.
pub fn kpoints(
    table: &TargetTable,
    template: &RasterTemplate,
    config: &KpointsConfig,
) -> Result<KpointsRun> {
    Solver::new(table, template, config).run()
}
