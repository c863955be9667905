use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Cli;
use crate::data::aggregate::{AggregateResult, HistogramBin, SURVIVAL_BINS, survival_histogram};
use crate::data::filter::FilterSelection;
use crate::data::loader;
use crate::state::recompute;

// ---------------------------------------------------------------------------
// Headless mode: one recompute, printed as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Report<'a> {
    source: &'a Path,
    dataset_records: usize,
    selection: &'a FilterSelection,
    aggregates: &'a AggregateResult,
    survival_histogram: Vec<HistogramBin>,
}

/// Load the configured file, apply the command-line filters and write the
/// metrics to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let path = cli
        .data_path()
        .context("no data file given (pass a path or set CRASH_DASH_DATA)")?;
    let dataset =
        loader::load(&path).with_context(|| format!("loading {}", path.display()))?;

    let selection = cli.selection(&dataset);
    let snapshot = recompute(&dataset, &selection);
    log::info!(
        "{} of {} records match the selection",
        snapshot.visible_indices.len(),
        dataset.len()
    );

    let report = Report {
        source: &path,
        dataset_records: dataset.len(),
        selection: &selection,
        survival_histogram: survival_histogram(
            &snapshot.aggregates.survival_rates,
            SURVIVAL_BINS,
        ),
        aggregates: &snapshot.aggregates,
    };
    serde_json::to_writer_pretty(&mut *out, &report).context("writing summary")?;
    writeln!(out).context("writing summary")?;
    Ok(())
}
