//! Import and consolidation command handlers.
//!
//! A run that aborts a tier still prints its summary and writes its report
//! before returning an error, so the process exits non-zero with the partial
//! results on disk.

use std::path::Path;

use anyhow::Context;
use partsync_catalog::{HttpCatalog, MemoryCatalog};
use partsync_core::{AliasTable, AppConfig};
use partsync_reconcile::{
    collections_for, consolidate_variants, Pipeline, PipelineConfig, RunReport,
};
use partsync_source::{load_wipers, SourceFormat, WiperLayout, WiperVehicle};

use crate::ImportKind;

pub(crate) fn source_format(kind: ImportKind, layout: WiperLayout) -> SourceFormat {
    match kind {
        ImportKind::Brands => SourceFormat::BrandsJson,
        ImportKind::Models => SourceFormat::ModelsJson,
        ImportKind::Products => SourceFormat::ProductsJson,
        ImportKind::Wipers => SourceFormat::WipersCsv(layout),
    }
}

/// Builtin aliases, overlaid with `PARTSYNC_ALIASES_PATH` when set.
pub(crate) fn load_aliases(config: &AppConfig) -> anyhow::Result<AliasTable> {
    match &config.aliases_path {
        Some(path) => AliasTable::load(path)
            .with_context(|| format!("failed to load alias table {}", path.display())),
        None => Ok(AliasTable::builtin()),
    }
}

pub(crate) fn write_report(report: &RunReport, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write run report to {}", path.display()))?;
    tracing::info!(path = %path.display(), "run report written");
    Ok(())
}

/// Load a source file and reconcile it against the catalog.
///
/// With `dry_run`, every collection the run touches is first copied from the
/// live catalog into memory and the writes go there instead.
///
/// # Errors
///
/// Returns an error if the source file cannot be loaded, the catalog client
/// cannot be built, the dry-run snapshot cannot be fetched, the report cannot
/// be written, or any tier was aborted.
pub(crate) async fn run_import(
    config: &AppConfig,
    kind: ImportKind,
    path: &Path,
    layout: WiperLayout,
    dry_run: bool,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let format = source_format(kind, layout);
    let batch = partsync_source::load(format, path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if batch.record_count() == 0 {
        println!(
            "{}: no usable records ({} dropped); nothing to import",
            path.display(),
            batch.dropped().len()
        );
        return Ok(());
    }

    let aliases = load_aliases(config)?;
    let catalog = HttpCatalog::from_config(config)?;
    let pipeline_config = PipelineConfig::from_config(config, dry_run);
    let source = path.display().to_string();

    let report = if dry_run {
        let snapshot = MemoryCatalog::snapshot_of(
            &catalog,
            &collections_for(&batch),
            config.page_size,
            config.batch_delay_ms,
        )
        .await
        .context("failed to snapshot the catalog for a dry run")?;
        Pipeline::new(&snapshot, &aliases, pipeline_config)
            .run(source, batch)
            .await
    } else {
        Pipeline::new(&catalog, &aliases, pipeline_config)
            .run(source, batch)
            .await
    };

    for line in report.summary_lines() {
        println!("{line}");
    }
    if let Some(report_path) = report_path {
        write_report(&report, report_path)?;
    }

    if report.aborted() {
        anyhow::bail!("import aborted; see the tier summary above");
    }
    Ok(())
}

/// Merge drive-side variants of a wipers sheet and return the merged
/// vehicles with the number of rows folded away.
///
/// # Errors
///
/// Returns an error if the sheet cannot be loaded.
pub(crate) fn consolidate_file(
    path: &Path,
    layout: WiperLayout,
) -> anyhow::Result<(Vec<WiperVehicle>, usize)> {
    let loaded =
        load_wipers(path, layout).with_context(|| format!("failed to load {}", path.display()))?;
    for row in &loaded.dropped {
        tracing::warn!(line = row.line, reason = %row.reason, "dropped wipers row");
    }
    Ok(consolidate_variants(loaded.records))
}

/// # Errors
///
/// Returns an error if the sheet cannot be loaded or the output cannot be
/// written.
pub(crate) fn run_consolidate_wipers(
    path: &Path,
    layout: WiperLayout,
    out: &Path,
) -> anyhow::Result<()> {
    let (vehicles, consolidated) = consolidate_file(path, layout)?;
    let json = serde_json::to_string_pretty(&vehicles).context("failed to serialize vehicles")?;
    std::fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "consolidated {consolidated} variant rows; wrote {} vehicles to {}",
        vehicles.len(),
        out.display()
    );
    Ok(())
}
