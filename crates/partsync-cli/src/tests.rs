use super::*;

#[test]
fn parses_import_command() {
    let cli = Cli::try_parse_from(["partsync", "import", "models", "data/models.json"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Import {
            kind: ImportKind::Models,
            ref path,
            dry_run: false,
            report: None,
            layout: WiperLayout::PerfectVision2025_05,
        } if path == &PathBuf::from("data/models.json")
    ));
}

#[test]
fn parses_import_dry_run_with_report() {
    let cli = Cli::try_parse_from([
        "partsync",
        "import",
        "wipers",
        "wipers.csv",
        "--dry-run",
        "--report",
        "out/report.json",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Import {
            kind: ImportKind::Wipers,
            dry_run: true,
            report: Some(ref r),
            ..
        } if r == &PathBuf::from("out/report.json")
    ));
}

#[test]
fn rejects_unknown_import_kind() {
    assert!(Cli::try_parse_from(["partsync", "import", "tyres", "tyres.json"]).is_err());
}

#[test]
fn rejects_unknown_wipers_layout() {
    let result = Cli::try_parse_from([
        "partsync",
        "import",
        "wipers",
        "wipers.csv",
        "--layout",
        "perfectvision-2019",
    ]);
    assert!(result.is_err());
}

#[test]
fn consolidate_requires_out() {
    assert!(Cli::try_parse_from(["partsync", "consolidate-wipers", "wipers.csv"]).is_err());

    let cli = Cli::try_parse_from([
        "partsync",
        "consolidate-wipers",
        "wipers.csv",
        "--out",
        "wipers.json",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::ConsolidateWipers { ref out, .. } if out == &PathBuf::from("wipers.json")
    ));
}

#[test]
fn prune_models_lists_by_default() {
    let cli = Cli::try_parse_from(["partsync", "prune-models"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::PruneModels { apply: false }));

    let cli = Cli::try_parse_from(["partsync", "prune-models", "--apply"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::PruneModels { apply: true }));
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["partsync"]).is_err());
}
