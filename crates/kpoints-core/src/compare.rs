//! Criteria comparison: run the solver over several criteria vectors at one
//! k, or one criteria vector over several k, and line up the covered areas.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raster::RasterTemplate;
use crate::solver::{KList, KpointsConfig, Solver};
use crate::table::TargetTable;

/// Covered area of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub criteria: Vec<f64>,
    pub k: usize,
    pub represented_km2: f64,
    pub fraction: f64,
}

impl ComparisonEntry {
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// Entries in request order plus the study area they share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub total_km2: f64,
    pub entries: Vec<ComparisonEntry>,
}

impl Comparison {
    /// Entry with the largest represented area (first on ties).
    pub fn best(&self) -> Option<&ComparisonEntry> {
        self.entries.iter().reduce(|best, e| {
            if e.represented_km2 > best.represented_km2 {
                e
            } else {
                best
            }
        })
    }
}

fn master_rng(base: &KpointsConfig) -> StdRng {
    match base.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Run `base` once per criteria vector, each at the fixed `k`.
/// Every configuration is validated before the first solver run.
pub fn compare_criteria(
    table: &TargetTable,
    template: &RasterTemplate,
    base: &KpointsConfig,
    criteria_list: &[Vec<f64>],
    k: usize,
) -> Result<Comparison> {
    compare_criteria_with_rng(table, template, base, criteria_list, k, &mut master_rng(base))
}

pub fn compare_criteria_with_rng<R: Rng + ?Sized>(
    table: &TargetTable,
    template: &RasterTemplate,
    base: &KpointsConfig,
    criteria_list: &[Vec<f64>],
    k: usize,
    rng: &mut R,
) -> Result<Comparison> {
    let configs: Vec<KpointsConfig> = criteria_list
        .iter()
        .map(|criteria| KpointsConfig {
            criteria: criteria.clone(),
            klist: KList::One(k),
            ..base.clone()
        })
        .collect();
    for config in &configs {
        config.validate(table)?;
    }
    template.validate()?;

    let mut total_km2 = 0.0;
    let mut entries = Vec::with_capacity(configs.len());
    for config in &configs {
        let run = Solver::new(table, template, config).run_with_rng(rng)?;
        total_km2 = run.total_km2;
        entries.extend(run.results.into_iter().map(|r| ComparisonEntry {
            criteria: config.criteria.clone(),
            k: r.k,
            represented_km2: r.represented_km2,
            fraction: r.fraction,
        }));
    }
    Ok(Comparison { total_km2, entries })
}

/// Run `base` (its criteria) once per k in `klist`.
pub fn compare_k(
    table: &TargetTable,
    template: &RasterTemplate,
    base: &KpointsConfig,
    klist: &[usize],
) -> Result<Comparison> {
    compare_k_with_rng(table, template, base, klist, &mut master_rng(base))
}

pub fn compare_k_with_rng<R: Rng + ?Sized>(
    table: &TargetTable,
    template: &RasterTemplate,
    base: &KpointsConfig,
    klist: &[usize],
    rng: &mut R,
) -> Result<Comparison> {
    let config = KpointsConfig { klist: KList::Many(klist.to_vec()), ..base.clone() };
    let run = Solver::new(table, template, &config).run_with_rng(rng)?;
    let entries = run
        .results
        .into_iter()
        .map(|r| ComparisonEntry {
            criteria: r.settings.criteria,
            k: r.k,
            represented_km2: r.represented_km2,
            fraction: r.fraction,
        })
        .collect();
    Ok(Comparison { total_km2: run.total_km2, entries })
}
