use partsync_catalog::HttpCatalog;
use partsync_core::AppConfig;
use partsync_reconcile::{prune_models, PruneReport};

pub(crate) fn summary_lines(report: &PruneReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.groups.len() + 4);
    lines.push(format!(
        "duplicate model groups: {}{}",
        report.groups.len(),
        if report.applied { "" } else { " (listing only; pass --apply to delete)" }
    ));
    for group in &report.groups {
        let brand = group
            .brand
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let duplicates: Vec<String> = group.duplicates.iter().map(ToString::to_string).collect();
        lines.push(format!(
            "  brand={brand} name={} keep={} duplicates=[{}]",
            group.name,
            group.kept,
            duplicates.join(", ")
        ));
    }
    if !report.referenced.is_empty() {
        lines.push(format!(
            "  still referenced by products (relink manually): {:?}",
            report.referenced
        ));
    }
    if report.applied {
        lines.push(format!("  deleted: {}", report.deleted.len()));
    }
    for error in &report.errors {
        lines.push(format!("  error: {error}"));
    }
    lines
}

/// # Errors
///
/// Returns an error if the catalog client cannot be built, any collection
/// cannot be fetched completely, or a delete failed.
pub(crate) async fn run_prune_models(config: &AppConfig, apply: bool) -> anyhow::Result<()> {
    let catalog = HttpCatalog::from_config(config)?;
    let report = prune_models(&catalog, config.page_size, config.batch_delay_ms, apply).await?;

    for line in summary_lines(&report) {
        println!("{line}");
    }
    if !report.errors.is_empty() {
        anyhow::bail!("{} duplicate model deletes failed", report.errors.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use partsync_reconcile::DuplicateGroup;

    use super::*;

    #[test]
    fn listing_mentions_apply_flag() {
        let report = PruneReport {
            applied: false,
            groups: vec![DuplicateGroup {
                brand: Some(5),
                name: "golf".to_owned(),
                kept: 10,
                duplicates: vec![11, 12],
            }],
            referenced: vec![11],
            ..PruneReport::default()
        };

        let lines = summary_lines(&report);
        assert!(lines[0].contains("--apply"));
        assert_eq!(lines[1], "  brand=5 name=golf keep=10 duplicates=[11, 12]");
        assert!(lines[2].contains("[11]"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn applied_run_reports_deletes_and_errors() {
        let report = PruneReport {
            applied: true,
            deleted: vec![12],
            errors: vec!["model 13: injected failure".to_owned()],
            ..PruneReport::default()
        };

        let lines = summary_lines(&report);
        assert_eq!(lines[0], "duplicate model groups: 0");
        assert!(lines.contains(&"  deleted: 1".to_owned()));
        assert!(lines.contains(&"  error: model 13: injected failure".to_owned()));
    }
}
