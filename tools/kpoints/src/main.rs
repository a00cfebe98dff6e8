//! Select representative subset cells from a target-cell CSV.
//! Reads `id,x,y,<vars>` cells, a raster template JSON and a run config JSON;
//! writes one subset CSV per k, coverage.csv, result.json and, with
//! `verify_stop`, one trace CSV per k.

use anyhow::{Context, Result};
use clap::Parser;
use kpoints_core::report::{coverage_rows, trace_rows};
use kpoints_core::{tabular, KpointsConfig, KpointsRun, RasterTemplate, Solver};
use log::info;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "kpoints", about = "Pick k representative sites that maximise represented area")]
struct Args {
    /// Target-cell CSV with columns id,x,y followed by the matching variables.
    #[arg(short, long)]
    cells: PathBuf,

    /// Raster template JSON describing the grid the cells come from.
    #[arg(short, long)]
    template: PathBuf,

    /// Run configuration JSON (criteria, klist, n_starts, ...).
    #[arg(long)]
    config: PathBuf,

    /// Output directory.
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Override the configured seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured number of restarts.
    #[arg(long)]
    n_starts: Option<usize>,
}

// ── Inputs ────────────────────────────────────────────────────────────────────

fn load_config(path: &Path, args: &Args) -> Result<KpointsConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut config = KpointsConfig::from_json(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(n) = args.n_starts {
        config.n_starts = n;
    }
    Ok(config)
}

fn load_template(path: &Path) -> Result<RasterTemplate> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing template {}", path.display()))
}

// ── Outputs ───────────────────────────────────────────────────────────────────

fn write_outputs(run: &KpointsRun, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    for result in &run.results {
        let path = out_dir.join(format!("subset_k{}.csv", result.k));
        tabular::write_subset(BufWriter::new(File::create(&path)?), &result.subset)
            .with_context(|| format!("writing {}", path.display()))?;

        if !result.trace.is_empty() {
            let path = out_dir.join(format!("trace_k{}.csv", result.k));
            tabular::write_rows(BufWriter::new(File::create(&path)?), &trace_rows(result))
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    let path = out_dir.join("coverage.csv");
    tabular::write_rows(BufWriter::new(File::create(&path)?), &coverage_rows(run))
        .with_context(|| format!("writing {}", path.display()))?;

    let path = out_dir.join("result.json");
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), run)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args.config, &args)?;
    let template = load_template(&args.template)?;
    let file = File::open(&args.cells)
        .with_context(|| format!("opening {}", args.cells.display()))?;
    let table = tabular::read_target_table(file)
        .with_context(|| format!("reading target cells {}", args.cells.display()))?;
    info!(
        "{} target cells, {} matching variables, klist {:?}",
        table.len(),
        table.n_vars(),
        config.klist.to_vec()
    );

    let run = Solver::new(&table, &template, &config).run()?;
    for r in &run.results {
        info!(
            "k = {:>3}: {:.2} / {:.2} km² represented ({:.1}%)",
            r.k,
            r.represented_km2,
            r.total_km2,
            r.percent()
        );
    }

    write_outputs(&run, &args.output)?;
    info!("wrote results to {}", args.output.display());
    Ok(())
}
