use log::warn;
use serde::{Deserialize, Serialize};

use crate::distance::Criteria;
use crate::error::{KpointsError, Result};
use crate::table::TargetTable;

/// Fewer restarts than this still run, with a warning.
pub const RECOMMENDED_MIN_STARTS: usize = 10;

/// One k or an ordered list of k values; each k gets its own restart loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KList {
    One(usize),
    Many(Vec<usize>),
}

impl KList {
    pub fn to_vec(&self) -> Vec<usize> {
        match self {
            KList::One(k) => vec![*k],
            KList::Many(ks) => ks.clone(),
        }
    }
}

impl From<usize> for KList {
    fn from(k: usize) -> Self {
        KList::One(k)
    }
}

impl From<Vec<usize>> for KList {
    fn from(ks: Vec<usize>) -> Self {
        KList::Many(ks)
    }
}

/// Run configuration, passed explicitly into every solver call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpointsConfig {
    /// Maximum allowable analogous difference per matching variable.
    pub criteria: Vec<f64>,
    pub klist: KList,
    #[serde(default = "default_n_starts")]
    pub n_starts: usize,
    /// Area-change threshold (km²) for the stability window.
    #[serde(default)]
    pub min_area: f64,
    /// Iteration cap per restart.
    #[serde(default = "default_iter")]
    pub iter: usize,
    #[serde(default = "default_subset_in_target")]
    pub subset_in_target: bool,
    /// Keep the full per-restart, per-iteration trace in the result.
    #[serde(default)]
    pub verify_stop: bool,
    /// Seed for the master random generator; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_n_starts() -> usize {
    RECOMMENDED_MIN_STARTS
}

fn default_iter() -> usize {
    50
}

fn default_subset_in_target() -> bool {
    true
}

impl KpointsConfig {
    pub fn new(criteria: Vec<f64>, klist: impl Into<KList>) -> Self {
        Self {
            criteria,
            klist: klist.into(),
            n_starts: default_n_starts(),
            min_area: 0.0,
            iter: default_iter(),
            subset_in_target: true,
            verify_stop: false,
            seed: None,
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Check every option against the table. Returns the validated criteria
    /// and the list of k values. No clustering happens before this passes.
    pub fn validate(&self, table: &TargetTable) -> Result<(Criteria, Vec<usize>)> {
        if !self.subset_in_target {
            return Err(KpointsError::ExternalSubsetUnsupported);
        }
        let criteria = Criteria::new(self.criteria.clone())?;
        criteria.check_dimensions(table.n_vars())?;

        if self.n_starts < 1 {
            return Err(KpointsError::NoStarts);
        }
        if self.iter < 1 {
            return Err(KpointsError::NoIterations);
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return Err(KpointsError::InvalidMinArea(self.min_area));
        }

        let ks = self.klist.to_vec();
        if ks.is_empty() {
            return Err(KpointsError::EmptyKList);
        }
        let n_cells = table.len();
        if let Some(&k) = ks.iter().find(|&&k| k == 0 || k >= n_cells) {
            return Err(KpointsError::InvalidK { k, n_cells });
        }

        if self.n_starts < RECOMMENDED_MIN_STARTS {
            warn!(
                "n_starts = {} is below the recommended {RECOMMENDED_MIN_STARTS}; \
                 the best restart may be far from the global optimum",
                self.n_starts
            );
        }
        Ok((criteria, ks))
    }
}
