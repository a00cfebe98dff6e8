//! Standardized Euclidean distance between cells.
//!
//! Each matching variable is divided by its criterion, so a distance of 1.0
//! means "as far apart as the criteria allow". Standardization is done once
//! per run; every later distance is a plain Euclidean norm over the scaled
//! values.

use serde::{Deserialize, Serialize};

use crate::error::{KpointsError, Result};
use crate::table::TargetTable;

/// Per-variable normalization divisors. All entries finite and > 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Criteria(Vec<f64>);

impl Criteria {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, &v)| !(v.is_finite() && v > 0.0))
        {
            return Err(KpointsError::NonPositiveCriterion { index, value });
        }
        Ok(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Fails with `DimensionMismatch` unless there is one criterion per variable.
    pub fn check_dimensions(&self, n_vars: usize) -> Result<()> {
        if self.0.len() != n_vars {
            return Err(KpointsError::DimensionMismatch {
                criteria: self.0.len(),
                variables: n_vars,
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<f64>> for Criteria {
    type Error = KpointsError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Criteria> for Vec<f64> {
    fn from(c: Criteria) -> Self {
        c.0
    }
}

/// `sqrt(Σ ((a_i − b_i) / c_i)²)`.
pub fn standardized_distance(criteria: &Criteria, a: &[f64], b: &[f64]) -> Result<f64> {
    criteria.check_dimensions(a.len())?;
    criteria.check_dimensions(b.len())?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .zip(criteria.as_slice())
        .map(|((x, y), c)| {
            let d = (x - y) / c;
            d * d
        })
        .sum();
    Ok(sum.sqrt())
}

/// Euclidean distance between two already-standardized vectors.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Target cell values divided by the criteria, row-major.
#[derive(Debug, Clone)]
pub struct StandardizedTable {
    data: Vec<f64>,
    n_vars: usize,
    n_cells: usize,
}

impl StandardizedTable {
    pub fn new(table: &TargetTable, criteria: &Criteria) -> Result<Self> {
        criteria.check_dimensions(table.n_vars())?;
        let c = criteria.as_slice();
        let data = table
            .raw_values()
            .chunks_exact(table.n_vars())
            .flat_map(|row| row.iter().zip(c).map(|(v, c)| v / c))
            .collect();
        Ok(Self {
            data,
            n_vars: table.n_vars(),
            n_cells: table.len(),
        })
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_vars..(i + 1) * self.n_vars]
    }

    /// Distance from a cell to an arbitrary point in standardized space.
    #[inline]
    pub fn distance_to(&self, i: usize, point: &[f64]) -> f64 {
        euclidean(self.row(i), point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TargetCell;
    use approx::assert_relative_eq;

    #[test]
    fn distance_scales_by_criteria() {
        let c = Criteria::new(vec![2.0, 0.5]).unwrap();
        // ((4-0)/2)² + ((1.5-0)/0.5)² = 4 + 9
        let d = standardized_distance(&c, &[4.0, 1.5], &[0.0, 0.0]).unwrap();
        assert_relative_eq!(d, 13f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn mismatched_lengths_are_fatal() {
        let c = Criteria::new(vec![1.0]).unwrap();
        let err = standardized_distance(&c, &[1.0, 2.0], &[0.0, 0.0]).unwrap_err();
        assert_eq!(err, KpointsError::DimensionMismatch { criteria: 1, variables: 2 });
    }

    #[test]
    fn zero_and_negative_criteria_are_rejected() {
        assert!(matches!(
            Criteria::new(vec![1.0, 0.0]),
            Err(KpointsError::NonPositiveCriterion { index: 1, .. })
        ));
        assert!(matches!(
            Criteria::new(vec![-3.0]),
            Err(KpointsError::NonPositiveCriterion { index: 0, .. })
        ));
        assert!(Criteria::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn criteria_deserialize_with_validation() {
        let ok: Criteria = serde_json::from_str("[1.5, 2.0]").unwrap();
        assert_eq!(ok.as_slice(), &[1.5, 2.0]);
        assert!(serde_json::from_str::<Criteria>("[1.5, 0.0]").is_err());
    }

    #[test]
    fn standardized_table_matches_pairwise_distance() {
        let table = TargetTable::from_cells(vec![
            TargetCell { id: 1, x: 0.0, y: 0.0, values: vec![0.0, 10.0] },
            TargetCell { id: 2, x: 1.0, y: 0.0, values: vec![3.0, 14.0] },
        ])
        .unwrap();
        let c = Criteria::new(vec![1.0, 2.0]).unwrap();
        let st = StandardizedTable::new(&table, &c).unwrap();
        let direct = standardized_distance(&c, table.values(0), table.values(1)).unwrap();
        assert_relative_eq!(st.distance_to(0, st.row(1)), direct, epsilon = 1e-12);
        assert_eq!(st.distance_to(1, st.row(1)), 0.0);
        assert_eq!(st.row(1), &[3.0, 7.0]);
    }
}
