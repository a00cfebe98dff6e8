//! Compare represented area across criteria vectors at one k, or across
//! several k for the configured criteria. Writes comparison.csv and
//! comparison.json.

use anyhow::{bail, Context, Result};
use clap::Parser;
use kpoints_core::report::comparison_rows;
use kpoints_core::{
    compare_criteria, compare_k, tabular, Comparison, KpointsConfig, RasterTemplate,
};
use log::info;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug)]
#[command(name = "compare_criteria", about = "Compare represented area across criteria or k")]
struct Args {
    /// Target-cell CSV with columns id,x,y followed by the matching variables.
    #[arg(short, long)]
    cells: PathBuf,

    /// Raster template JSON.
    #[arg(short, long)]
    template: PathBuf,

    /// Base run configuration JSON; its criteria are used by --klist.
    #[arg(long)]
    config: PathBuf,

    /// JSON file holding a list of criteria vectors, e.g. [[1,2],[0.5,1]].
    #[arg(long, requires = "k", conflicts_with = "klist")]
    criteria: Option<PathBuf>,

    /// k used for every criteria vector.
    #[arg(short, long)]
    k: Option<usize>,

    /// Compare the configured criteria over these k values instead.
    #[arg(long, value_delimiter = ',')]
    klist: Option<Vec<usize>>,

    /// Output directory.
    #[arg(short, long, default_value = "out")]
    output: PathBuf,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_comparison(cmp: &Comparison, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join("comparison.csv");
    tabular::write_rows(BufWriter::new(File::create(&path)?), &comparison_rows(cmp))
        .with_context(|| format!("writing {}", path.display()))?;
    let path = out_dir.join("comparison.json");
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), cmp)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let base: KpointsConfig = read_json(&args.config)?;
    let template: RasterTemplate = read_json(&args.template)?;
    let file = File::open(&args.cells)
        .with_context(|| format!("opening {}", args.cells.display()))?;
    let table = tabular::read_target_table(file)
        .with_context(|| format!("reading target cells {}", args.cells.display()))?;

    let cmp = match (&args.criteria, args.k, &args.klist) {
        (Some(path), Some(k), None) => {
            let list: Vec<Vec<f64>> = read_json(path)?;
            info!("comparing {} criteria vectors at k = {k}", list.len());
            compare_criteria(&table, &template, &base, &list, k)?
        }
        (None, _, Some(klist)) => {
            info!("comparing k = {klist:?} at criteria {:?}", base.criteria);
            compare_k(&table, &template, &base, klist)?
        }
        _ => bail!("pass either --criteria with --k, or --klist"),
    };

    for row in comparison_rows(&cmp) {
        info!("[{}] k = {:>3}: {:.1}%", row.criteria, row.k, row.percent);
    }
    if let Some(best) = cmp.best() {
        info!("best: criteria {:?} at k = {} ({:.1}%)", best.criteria, best.k, best.percent());
    }

    write_comparison(&cmp, &args.output)?;
    Ok(())
}
