use approx::assert_relative_eq;
use kpoints_core::solver::restart::best_record;
use kpoints_core::solver::{IterationRecord, StopReason, StopRule};
use kpoints_core::{
    kpoints, CoordinateSystem, KList, KpointsConfig, KpointsError, RasterTemplate, Solver,
    TargetCell, TargetTable,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Four 1 km cells centred on (0,0), (1,0), (0,1), (1,1) in km.
fn four_cells() -> (TargetTable, RasterTemplate) {
    let coords = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
    let values = [0.0, 1.0, 10.0, 11.0];
    let cells = coords
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (&(x, y), v))| TargetCell { id: i as u64, x, y, values: vec![v] })
        .collect();
    let table = TargetTable::from_cells(cells).unwrap();
    let mut template = RasterTemplate::projected(2, 2, -0.5, 1.5, -0.5, 1.5);
    template.crs = CoordinateSystem::Projected { metres_per_unit: 1000.0 };
    (table, template)
}

/// Same criterion for each of the table's `n_vars` matching variables.
fn config(table: &TargetTable, criterion: f64, k: impl Into<KList>) -> KpointsConfig {
    KpointsConfig {
        n_starts: 10,
        iter: 20,
        seed: Some(2024),
        verify_stop: true,
        ..KpointsConfig::new(vec![criterion; table.n_vars()], k)
    }
}

/// 12x12 grid, two smooth matching variables, 1 km² cells.
fn gradient_grid() -> (TargetTable, RasterTemplate) {
    let n = 12;
    let cells = (0..n * n)
        .map(|i| {
            let (r, c) = (i / n, i % n);
            TargetCell {
                id: i as u64 + 1,
                x: c as f64 + 0.5,
                y: r as f64 + 0.5,
                values: vec![c as f64 * 1.3, (r as f64 * 0.9).sin() * 4.0 + r as f64 * 0.5],
            }
        })
        .collect();
    let table = TargetTable::from_cells(cells).unwrap();
    let mut template = RasterTemplate::projected(n, n, 0.0, n as f64, 0.0, n as f64);
    template.crs = CoordinateSystem::Projected { metres_per_unit: 1000.0 };
    (table, template)
}

#[test]
fn two_well_separated_clusters_are_fully_represented() {
    let (table, template) = four_cells();
    let run = kpoints(&table, &template, &config(&table, 1.0, 2)).unwrap();
    let result = &run.results[0];

    assert_relative_eq!(run.total_km2, 4.0, epsilon = 1e-9);
    assert_relative_eq!(result.represented_km2, result.total_km2, epsilon = 1e-9);

    let mut ids: Vec<u64> = result.subset.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    assert!(ids[0] <= 1, "one subset cell from the low cluster, got {ids:?}");
    assert!(ids[1] >= 2, "one subset cell from the high cluster, got {ids:?}");
}

#[test]
fn strict_criteria_only_represent_the_subset_cells() {
    let (table, template) = four_cells();
    let run = kpoints(&table, &template, &config(&table, 0.1, 2)).unwrap();
    let result = &run.results[0];
    assert!(result.represented_km2 < result.total_km2);
    assert_relative_eq!(result.represented_km2, 2.0, epsilon = 1e-9);
}

#[test]
fn invalid_configurations_are_rejected_up_front() {
    let (table, template) = four_cells();
    for criteria in [0.0, -1.0] {
        let err = kpoints(&table, &template, &config(&table, criteria, 2)).unwrap_err();
        assert!(matches!(err, KpointsError::NonPositiveCriterion { .. }));
    }
    for k in [4, 5] {
        let err = kpoints(&table, &template, &config(&table, 1.0, k)).unwrap_err();
        assert_eq!(err, KpointsError::InvalidK { k, n_cells: 4 });
    }
    let mut no_starts = config(&table, 1.0, 2);
    no_starts.n_starts = 0;
    assert_eq!(kpoints(&table, &template, &no_starts).unwrap_err(), KpointsError::NoStarts);
}

#[test]
fn injected_generator_makes_runs_reproducible() {
    let (table, template) = gradient_grid();
    let cfg = KpointsConfig { seed: None, ..config(&table, 2.0, 6) };
    let solver = Solver::new(&table, &template, &cfg);
    let a = solver.run_with_rng(&mut StdRng::seed_from_u64(77)).unwrap();
    let b = solver.run_with_rng(&mut StdRng::seed_from_u64(77)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn subset_cells_are_always_real_target_cells() {
    let (table, template) = gradient_grid();
    let run = kpoints(&table, &template, &config(&table, 1.5, 7)).unwrap();
    let result = &run.results[0];
    assert!(!result.trace.is_empty());
    for record in &result.trace {
        assert_eq!(record.subset.len(), 7);
        assert!(record.subset.iter().all(|&id| table.contains(id)));
        assert!(record.represented_km2 <= record.total_km2);
    }
    for cell in &result.subset {
        let row = table.row_of(cell.id).unwrap();
        assert_eq!((table.x(row), table.y(row)), (cell.x, cell.y));
    }
}

#[test]
fn mean_restart_coverage_grows_with_k() {
    let (table, template) = gradient_grid();
    let cfg = KpointsConfig {
        n_starts: 30,
        verify_stop: false,
        ..config(&table, 2.0, vec![1, 2, 4, 8, 16])
    };
    let run = kpoints(&table, &template, &cfg).unwrap();
    let means: Vec<f64> = run
        .results
        .iter()
        .map(|r| {
            let total: f64 = r.restarts.iter().map(|s| s.represented_km2).sum();
            total / r.restarts.len() as f64
        })
        .collect();
    let tolerance = 0.05 * run.total_km2;
    for pair in means.windows(2) {
        assert!(pair[1] + tolerance >= pair[0], "coverage by k dropped: {means:?}");
    }
    assert!(means[4] > means[0]);
}

#[test]
fn stability_window_stops_at_iteration_nine() {
    let min_area = 3.0;
    let mut areas = Vec::new();
    let mut area = 0.0;
    for _ in 0..4 {
        area += min_area + 1.0;
        areas.push(area);
    }
    areas.extend([area; 10]);

    let rule = StopRule::new(min_area, 50);
    let stop = (1..=areas.len()).find_map(|n| rule.check(&areas[..n]).map(|r| (n, r)));
    assert_eq!(stop, Some((9, StopReason::Converged)));

    // The plateau starts at iteration 4; that earliest maximum is the winner.
    let records: Vec<IterationRecord> = areas[..9]
        .iter()
        .enumerate()
        .map(|(i, &a)| IterationRecord {
            restart: 0,
            iteration: i + 1,
            subset: vec![1, 2],
            represented_km2: a,
            total_km2: 100.0,
            fraction: a / 100.0,
        })
        .collect();
    let best = best_record(&records).unwrap();
    assert_eq!(best.iteration, 4);
    assert_relative_eq!(best.represented_km2, 4.0 * (min_area + 1.0));

    let rule = StopRule::new(min_area, 8);
    assert_eq!(rule.check(&areas[..8]), Some(StopReason::MaxIterReached));
}

#[test]
fn restarts_report_how_they_ended() {
    let (table, template) = gradient_grid();
    let cfg = KpointsConfig { iter: 5, min_area: 0.0, ..config(&table, 1.0, 10) };
    let run = kpoints(&table, &template, &cfg).unwrap();
    let r = &run.results[0];
    assert_eq!(r.restarts.len(), 10);
    assert_eq!(r.diagnostics.converged + r.diagnostics.max_iter_reached, 10);
    assert!(r.diagnostics.failed.is_empty());
    for s in &r.restarts {
        assert!(s.iterations <= 5);
        if s.stop_reason == StopReason::MaxIterReached {
            assert_eq!(s.iterations, 5);
        }
    }
}
