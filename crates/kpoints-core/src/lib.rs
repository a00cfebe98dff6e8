//! Representative site selection over gridded study areas.
//!
//! Picks k "subset cells" out of a table of target cells so that as much of
//! the study area as possible lies within a standardized distance of 1.0 of
//! its nearest subset cell. The solver is a k-means variant whose centroid
//! step snaps to the nearest real target cell, run with random restarts and
//! stopped once the represented area is stable.
//!
//! ```text
//! Solver::run()
//!   ├─ KpointsConfig::validate()      (solver/config.rs)
//!   ├─ RasterTemplate::cell_areas()   (raster.rs)
//!   ├─ StandardizedTable::new()       (distance.rs)
//!   └─ per k, per restart             (solver/restart.rs)
//!        ├─ assign()                  (assign.rs)
//!        ├─ account()                 (area.rs)
//!        ├─ relocate()
//!        └─ StopRule::check()         (solver/stopping.rs)
//! ```

pub mod area;
pub mod assign;
pub mod compare;
pub mod distance;
pub mod error;
pub mod raster;
pub mod report;
pub mod solver;
pub mod table;
pub mod tabular;

pub use area::{AreaSummary, MATCH_THRESHOLD};
pub use compare::{compare_criteria, compare_k, Comparison, ComparisonEntry};
pub use distance::{standardized_distance, Criteria, StandardizedTable};
pub use error::{KpointsError, Result};
pub use raster::{CoordinateSystem, RasterTemplate};
pub use solver::{kpoints, KList, KpointsConfig, KpointsRun, Solver, SolverResult, SubsetCell};
pub use table::{CellId, TargetCell, TargetTable};
