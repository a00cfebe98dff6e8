//! Error taxonomy for site selection.
//!
//! Configuration errors are reported before any restart begins. Numerical
//! failures are scoped to a single restart and only surface as a run error
//! when every restart fails.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KpointsError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KpointsError {
    #[error(
        "criteria has {criteria} entries but the target table has {variables} matching variables"
    )]
    DimensionMismatch { criteria: usize, variables: usize },

    #[error("criterion {index} must be a finite value > 0, got {value}")]
    NonPositiveCriterion { index: usize, value: f64 },

    #[error("k = {k} is invalid: need 1 <= k < {n_cells} (number of target cells)")]
    InvalidK { k: usize, n_cells: usize },

    #[error("n_starts must be at least 1")]
    NoStarts,

    #[error("iter must be at least 1")]
    NoIterations,

    #[error("min_area must be a finite value >= 0 km², got {0}")]
    InvalidMinArea(f64),

    #[error("klist must contain at least one k")]
    EmptyKList,

    #[error("subset_in_target = false (subset cells outside the target table) is not supported")]
    ExternalSubsetUnsupported,

    #[error("invalid target table: {0}")]
    InvalidTable(String),

    #[error("invalid raster template: {0}")]
    InvalidTemplate(String),

    #[error("restart {restart}, iteration {iteration}: {message}")]
    Numerical {
        restart: usize,
        iteration: usize,
        message: String,
    },

    #[error("all {0} restarts failed")]
    AllRestartsFailed(usize),

    #[error("restart {0} was cancelled before completing an iteration")]
    Cancelled(usize),

    #[error("configuration parse error: {0}")]
    ConfigParse(String),

    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<serde_json::Error> for KpointsError {
    fn from(err: serde_json::Error) -> Self {
        KpointsError::ConfigParse(err.to_string())
    }
}

impl From<csv::Error> for KpointsError {
    fn from(err: csv::Error) -> Self {
        KpointsError::Csv(err.to_string())
    }
}

impl KpointsError {
    /// True for errors raised by up-front validation, before any clustering.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            KpointsError::DimensionMismatch { .. }
                | KpointsError::NonPositiveCriterion { .. }
                | KpointsError::InvalidK { .. }
                | KpointsError::NoStarts
                | KpointsError::NoIterations
                | KpointsError::InvalidMinArea(_)
                | KpointsError::EmptyKList
                | KpointsError::ExternalSubsetUnsupported
                | KpointsError::InvalidTable(_)
                | KpointsError::InvalidTemplate(_)
                | KpointsError::ConfigParse(_)
        )
    }
}
