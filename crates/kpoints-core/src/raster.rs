use serde::{Deserialize, Serialize};

use crate::error::{KpointsError, Result};
use crate::table::TargetTable;

/// Mean Earth radius in km, used for geographic cell areas.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// How template coordinates relate to ground distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinateSystem {
    /// Planar coordinates; every cell has the same area.
    Projected {
        #[serde(default = "default_metres_per_unit")]
        metres_per_unit: f64,
    },
    /// Longitude/latitude in degrees; cell area shrinks towards the poles.
    Geographic,
}

fn default_metres_per_unit() -> f64 {
    1.0
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        CoordinateSystem::Projected { metres_per_unit: 1.0 }
    }
}

/// Grid geometry of the study area. Read-only for the whole run; only area
/// accounting uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterTemplate {
    pub ncols: usize,
    pub nrows: usize,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    #[serde(default)]
    pub crs: CoordinateSystem,
}

impl RasterTemplate {
    pub fn projected(
        ncols: usize,
        nrows: usize,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    ) -> Self {
        Self {
            ncols,
            nrows,
            xmin,
            xmax,
            ymin,
            ymax,
            crs: CoordinateSystem::default(),
        }
    }

    pub fn geographic(
        ncols: usize,
        nrows: usize,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    ) -> Self {
        Self {
            crs: CoordinateSystem::Geographic,
            ..Self::projected(ncols, nrows, xmin, xmax, ymin, ymax)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ncols == 0 || self.nrows == 0 {
            return Err(KpointsError::InvalidTemplate("grid has no cells".into()));
        }
        let finite = [self.xmin, self.xmax, self.ymin, self.ymax].iter().all(|v| v.is_finite());
        if !finite || self.xmax <= self.xmin || self.ymax <= self.ymin {
            return Err(KpointsError::InvalidTemplate(format!(
                "degenerate extent x [{}, {}] y [{}, {}]",
                self.xmin, self.xmax, self.ymin, self.ymax
            )));
        }
        match self.crs {
            CoordinateSystem::Projected { metres_per_unit }
                if !(metres_per_unit > 0.0 && metres_per_unit.is_finite()) =>
            {
                Err(KpointsError::InvalidTemplate(format!(
                    "metres_per_unit must be > 0, got {metres_per_unit}"
                )))
            }
            CoordinateSystem::Geographic if self.ymin < -90.0 || self.ymax > 90.0 => Err(
                KpointsError::InvalidTemplate("latitude extent outside [-90, 90]".into()),
            ),
            _ => Ok(()),
        }
    }

    #[inline]
    pub fn xres(&self) -> f64 {
        (self.xmax - self.xmin) / self.ncols as f64
    }

    #[inline]
    pub fn yres(&self) -> f64 {
        (self.ymax - self.ymin) / self.nrows as f64
    }

    pub fn n_cells(&self) -> usize {
        self.ncols * self.nrows
    }

    /// Row-major index of the cell containing (x, y), or None outside the extent.
    /// Points on the max edges belong to the last row/column.
    pub fn cell_index(&self, x: f64, y: f64) -> Option<usize> {
        if x < self.xmin || x > self.xmax || y < self.ymin || y > self.ymax {
            return None;
        }
        let col = (((x - self.xmin) / self.xres()) as usize).min(self.ncols - 1);
        // Rows count down from the top edge.
        let row = (((self.ymax - y) / self.yres()) as usize).min(self.nrows - 1);
        Some(row * self.ncols + col)
    }

    /// Area in km² of a cell whose centroid lies at latitude/y = `y`.
    pub fn cell_area_km2(&self, y: f64) -> f64 {
        match self.crs {
            CoordinateSystem::Projected { metres_per_unit } => {
                self.xres() * self.yres() * metres_per_unit * metres_per_unit / 1.0e6
            }
            CoordinateSystem::Geographic => {
                let half = self.yres() / 2.0;
                let top = (y + half).clamp(-90.0, 90.0).to_radians();
                let bottom = (y - half).clamp(-90.0, 90.0).to_radians();
                EARTH_RADIUS_KM * EARTH_RADIUS_KM
                    * self.xres().to_radians()
                    * (top.sin() - bottom.sin()).abs()
            }
        }
    }

    /// Total area of the template grid in km².
    pub fn extent_area_km2(&self) -> f64 {
        (0..self.nrows)
            .map(|r| self.cell_area_km2(self.ymax - (r as f64 + 0.5) * self.yres()))
            .sum::<f64>()
            * self.ncols as f64
    }

    /// Per-cell area for every row of `table`, in table order.
    /// Fails if a cell centroid falls outside the template extent or shares
    /// a grid cell with another target cell.
    pub fn cell_areas(&self, table: &TargetTable) -> Result<Vec<f64>> {
        self.validate()?;
        if table.len() > self.n_cells() {
            return Err(KpointsError::InvalidTemplate(format!(
                "{} target cells do not fit a {}x{} grid",
                table.len(),
                self.ncols,
                self.nrows
            )));
        }
        let mut owner: Vec<Option<usize>> = vec![None; self.n_cells()];
        (0..table.len())
            .map(|i| {
                let (x, y) = (table.x(i), table.y(i));
                let Some(index) = self.cell_index(x, y) else {
                    return Err(KpointsError::InvalidTemplate(format!(
                        "cell {} at ({x}, {y}) lies outside the template extent",
                        table.id(i)
                    )));
                };
                if let Some(other) = owner[index].replace(i) {
                    return Err(KpointsError::InvalidTemplate(format!(
                        "cells {} and {} fall in the same grid cell",
                        table.id(other),
                        table.id(i)
                    )));
                }
                Ok(self.cell_area_km2(y))
            })
            .collect()
    }
}
