use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{KpointsError, Result};

/// Stable identifier of a grid cell.
pub type CellId = u64;

/// One row of a target cell table as handed over by the tabular conversion step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCell {
    pub id: CellId,
    /// Cell centroid x (map units or degrees of longitude).
    pub x: f64,
    /// Cell centroid y (map units or degrees of latitude).
    pub y: f64,
    /// Matching-variable values, in criteria order.
    pub values: Vec<f64>,
}

/// Immutable table of candidate cells with their matching variables.
/// Variable values are stored row-major, `n_vars` per cell.
#[derive(Debug, Clone)]
pub struct TargetTable {
    variable_names: Vec<String>,
    ids: Vec<CellId>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    values: Vec<f64>,
    n_vars: usize,
    index: HashMap<CellId, usize>,
}

impl TargetTable {
    /// Build a table, rejecting empty input, ragged rows, duplicate ids and
    /// non-finite coordinates or values.
    pub fn new(variable_names: Vec<String>, cells: Vec<TargetCell>) -> Result<Self> {
        let n_vars = variable_names.len();
        if n_vars == 0 {
            return Err(KpointsError::InvalidTable("no matching variables".into()));
        }
        if cells.is_empty() {
            return Err(KpointsError::InvalidTable("no target cells".into()));
        }

        let mut ids = Vec::with_capacity(cells.len());
        let mut xs = Vec::with_capacity(cells.len());
        let mut ys = Vec::with_capacity(cells.len());
        let mut values = Vec::with_capacity(cells.len() * n_vars);
        let mut index = HashMap::with_capacity(cells.len());

        for (row, cell) in cells.into_iter().enumerate() {
            if cell.values.len() != n_vars {
                return Err(KpointsError::InvalidTable(format!(
                    "cell {} has {} values, expected {n_vars}",
                    cell.id,
                    cell.values.len()
                )));
            }
            if !cell.x.is_finite() || !cell.y.is_finite() {
                return Err(KpointsError::InvalidTable(format!(
                    "cell {} has non-finite coordinates",
                    cell.id
                )));
            }
            if let Some(col) = cell.values.iter().position(|v| !v.is_finite()) {
                return Err(KpointsError::InvalidTable(format!(
                    "cell {} is missing a value for '{}'",
                    cell.id, variable_names[col]
                )));
            }
            if index.insert(cell.id, row).is_some() {
                return Err(KpointsError::InvalidTable(format!("duplicate cell id {}", cell.id)));
            }
            ids.push(cell.id);
            xs.push(cell.x);
            ys.push(cell.y);
            values.extend_from_slice(&cell.values);
        }

        Ok(Self {
            variable_names,
            ids,
            xs,
            ys,
            values,
            n_vars,
            index,
        })
    }

    /// Convenience constructor naming variables `v1..vm`.
    pub fn from_cells(cells: Vec<TargetCell>) -> Result<Self> {
        let n_vars = cells.first().map_or(0, |c| c.values.len());
        let names = (1..=n_vars).map(|i| format!("v{i}")).collect();
        Self::new(names, cells)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    #[inline]
    pub fn id(&self, row: usize) -> CellId {
        self.ids[row]
    }

    #[inline]
    pub fn x(&self, row: usize) -> f64 {
        self.xs[row]
    }

    #[inline]
    pub fn y(&self, row: usize) -> f64 {
        self.ys[row]
    }

    /// Matching-variable values of one cell.
    #[inline]
    pub fn values(&self, row: usize) -> &[f64] {
        &self.values[row * self.n_vars..(row + 1) * self.n_vars]
    }

    /// All values, row-major.
    pub fn raw_values(&self) -> &[f64] {
        &self.values
    }

    /// Row of the cell with the given id.
    pub fn row_of(&self, id: CellId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.index.contains_key(&id)
    }
}
