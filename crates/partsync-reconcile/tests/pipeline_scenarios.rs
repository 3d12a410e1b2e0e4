//! End-to-end import scenarios against the in-memory catalog.

use partsync_catalog::MemoryCatalog;
use partsync_core::{AliasTable, Collection, ProductLine};
use partsync_reconcile::{ExecutorConfig, Pipeline, PipelineConfig, RunReport, Tier};
use partsync_source::{
    parse_brands, parse_models, parse_products, Loaded, SourceBatch, StandardRefs, WiperRefs,
    WiperVehicle,
};
use serde_json::{json, Value};

fn config(batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        page_size: 100,
        request_delay_ms: 0,
        executor: ExecutorConfig {
            batch_size,
            batch_delay_ms: 0,
            publish: false,
        },
        dry_run: false,
    }
}

async fn run(catalog: &MemoryCatalog, batch: SourceBatch) -> RunReport {
    let aliases = AliasTable::builtin();
    Pipeline::new(catalog, &aliases, config(50)).run("test", batch).await
}

fn with_volkswagen() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog.seed(
        Collection::Brands,
        vec![json!({ "id": 5, "name": "Volkswagen", "slug": "volkswagen" })],
    );
    catalog
}

fn models_batch(content: &str) -> SourceBatch {
    SourceBatch::Models(parse_models(content).unwrap())
}

const GOLF: &str = r#"[{ "name": "Golf", "brandSlug": "volkswagen",
    "startDate": "01/01/2010", "endDate": "01/01/2015" }]"#;

fn find<'a>(entries: &'a [Value], field: &str, value: &str) -> &'a Value {
    entries
        .iter()
        .find(|e| e[field] == value)
        .unwrap_or_else(|| panic!("no entry with {field} = {value} in {entries:?}"))
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_model_is_created_under_its_brand() {
    let catalog = with_volkswagen();
    let report = run(&catalog, models_batch(GOLF)).await;

    let counts = report.counts(Tier::Models);
    assert_eq!((counts.created, counts.skipped, counts.errors), (1, 0, 0));
    let models = catalog.entries(Collection::Models);
    let golf = find(&models, "slug", "golf");
    assert_eq!(golf["brand"], 5);
    assert_eq!(golf["startDate"], "2010-01-01");
    assert_eq!(golf["endDate"], "2015-01-01");
    assert!(!report.aborted());
}

#[tokio::test]
async fn existing_model_is_skipped() {
    let catalog = with_volkswagen();
    catalog.seed(
        Collection::Models,
        vec![json!({
            "id": 10, "name": "Golf", "slug": "golf", "brand": 5,
            "startDate": "2010-01-01", "endDate": "2015-01-01"
        })],
    );

    let report = run(&catalog, models_batch(GOLF)).await;
    let counts = report.counts(Tier::Models);
    assert_eq!((counts.created, counts.skipped, counts.errors), (0, 1, 0));
    assert_eq!(catalog.write_requests(Collection::Models), 0);
}

#[tokio::test]
async fn undated_catalog_model_is_left_undated() {
    let catalog = with_volkswagen();
    catalog.seed(
        Collection::Models,
        vec![json!({ "id": 10, "name": "Golf", "slug": "golf", "brand": 5 })],
    );

    let report = run(&catalog, models_batch(GOLF)).await;
    let counts = report.counts(Tier::Models);
    assert_eq!((counts.created, counts.updated, counts.skipped), (0, 0, 1));
    assert_eq!(catalog.write_requests(Collection::Models), 0);
}

#[tokio::test]
async fn model_name_shared_with_another_brand_is_created_under_brand_slug() {
    let catalog = MemoryCatalog::new();
    catalog.seed(
        Collection::Brands,
        vec![
            json!({ "id": 1, "name": "Fiat", "slug": "fiat" }),
            json!({ "id": 2, "name": "Abarth", "slug": "abarth" }),
        ],
    );
    catalog.seed(
        Collection::Models,
        vec![json!({ "id": 10, "name": "500", "slug": "500", "brand": 1 })],
    );
    let batch = r#"[{ "name": "500", "brandSlug": "abarth" }]"#;

    let report = run(&catalog, models_batch(batch)).await;
    assert_eq!(report.counts(Tier::Models).created, 1);
    let models = catalog.entries(Collection::Models);
    assert_eq!(find(&models, "slug", "abarth-500")["brand"], 2);

    let rerun = run(&catalog, models_batch(batch)).await;
    assert_eq!(rerun.counts(Tier::Models).skipped, 1);
    assert_eq!(catalog.entries(Collection::Models).len(), 2);
}

#[tokio::test]
async fn unknown_brand_is_an_error_and_nothing_is_written() {
    let catalog = with_volkswagen();
    let report = run(
        &catalog,
        models_batch(r#"[{ "name": "Golf", "brandSlug": "unknownbrand" }]"#),
    )
    .await;

    let counts = report.counts(Tier::Models);
    assert_eq!((counts.created, counts.skipped, counts.errors), (0, 0, 1));
    assert_eq!(catalog.write_requests(Collection::Models), 0);
    assert_eq!(report.sample_errors.len(), 1);
    assert!(report.sample_errors[0].contains("Golf [golf]"));
    assert!(!report.aborted());
}

#[tokio::test]
async fn same_normalized_name_creates_one_model() {
    let catalog = with_volkswagen();
    let report = run(
        &catalog,
        models_batch(
            r#"[{ "name": "Golf", "brandSlug": "volkswagen" },
                { "name": "  GOLF ", "brandSlug": "VOLKSWAGEN" }]"#,
        ),
    )
    .await;

    assert_eq!(report.counts(Tier::Models).created, 1);
    assert_eq!(catalog.entries(Collection::Models).len(), 1);
}

#[tokio::test]
async fn failing_first_batch_aborts_the_tier() {
    let catalog = with_volkswagen();
    catalog.fail_writes(Collection::Models, 500);
    let aliases = AliasTable::builtin();

    let report = Pipeline::new(&catalog, &aliases, config(1))
        .run(
            "test",
            models_batch(
                r#"[{ "name": "Golf", "brandSlug": "volkswagen" },
                    { "name": "Polo", "brandSlug": "volkswagen" },
                    { "name": "Up", "brandSlug": "volkswagen" }]"#,
            ),
        )
        .await;

    let counts = report.counts(Tier::Models);
    assert_eq!((counts.errors, counts.not_sent, counts.total), (1, 2, 3));
    assert!(report.is_aborted(Tier::Models));
    assert_eq!(catalog.write_requests(Collection::Models), 1);
}

// ---------------------------------------------------------------------------
// Brands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accented_brand_matches_existing_catalog_brand() {
    let catalog = MemoryCatalog::new();
    catalog.seed(
        Collection::Brands,
        vec![json!({ "id": 3, "name": "CITROEN", "slug": "citroen" })],
    );

    let batch = SourceBatch::Brands(parse_brands(r#"[{ "name": "CITROËN" }]"#).unwrap());
    let report = run(&catalog, batch).await;

    assert_eq!(report.counts(Tier::Brands).created, 0);
    assert_eq!(report.counts(Tier::Brands).skipped, 1);
    assert_eq!(catalog.write_requests(Collection::Brands), 0);
}

#[tokio::test]
async fn brand_index_reads_every_page() {
    let catalog = MemoryCatalog::new();
    let existing = (1..=250)
        .map(|i| json!({ "id": i, "name": format!("Brand {i}"), "slug": format!("brand-{i}") }))
        .collect();
    catalog.seed(Collection::Brands, existing);

    let batch = SourceBatch::Brands(
        parse_brands(r#"[{ "name": "Brand 250" }, { "name": "Kia" }]"#).unwrap(),
    );
    let report = run(&catalog, batch).await;

    assert_eq!(catalog.list_requests(Collection::Brands), 3);
    let counts = report.counts(Tier::Brands);
    assert_eq!((counts.created, counts.skipped), (1, 1));
    assert_eq!(catalog.entries(Collection::Brands).len(), 251);
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[tokio::test]
async fn products_create_missing_positions_first() {
    let catalog = with_volkswagen();
    catalog.seed(
        Collection::Models,
        vec![json!({ "id": 10, "name": "Golf", "slug": "golf", "brand": 5 })],
    );
    let batch = SourceBatch::Products(
        parse_products(
            r#"[{ "ref": "H7 (x2)", "brand": "VOLKSWAGEN", "model": "Golf",
                 "position": "Feu de croisement", "category": "eclairage", "line": "lights" }]"#,
        )
        .unwrap(),
    );

    let report = run(&catalog, batch).await;

    assert_eq!(report.counts(Tier::Positions).created, 1);
    assert_eq!(report.counts(Tier::Products).created, 1);
    let positions = catalog.entries(Collection::Positions);
    let position = find(&positions, "slug", "feu-de-croisement");
    let products = catalog.entries(Collection::Products(ProductLine::Lights));
    assert_eq!(products[0]["ref"], "H7");
    assert_eq!(products[0]["model"], 10);
    assert_eq!(products[0]["position"], position["id"]);
}

#[tokio::test]
async fn same_position_name_in_two_categories_stays_apart() {
    let catalog = with_volkswagen();
    catalog.seed(
        Collection::Models,
        vec![json!({ "id": 10, "name": "Golf", "slug": "golf", "brand": 5 })],
    );
    let batch = SourceBatch::Products(
        parse_products(
            r#"[{ "ref": "P21W", "brand": "VOLKSWAGEN", "model": "Golf",
                  "position": "Arriere", "category": "eclairage", "line": "lights" },
                { "ref": "W5W", "brand": "VOLKSWAGEN", "model": "Golf",
                  "position": "Arriere", "category": "signalisation", "line": "lights" }]"#,
        )
        .unwrap(),
    );

    let report = run(&catalog, batch).await;

    assert_eq!(report.counts(Tier::Positions).created, 2);
    let positions = catalog.entries(Collection::Positions);
    let lighting = find(&positions, "category", "eclairage");
    let signalling = find(&positions, "category", "signalisation");
    assert_ne!(lighting["id"], signalling["id"]);
    let products = catalog.entries(Collection::Products(ProductLine::Lights));
    assert_eq!(find(&products, "ref", "P21W")["position"], lighting["id"]);
    assert_eq!(find(&products, "ref", "W5W")["position"], signalling["id"]);
}

// ---------------------------------------------------------------------------
// Wipers
// ---------------------------------------------------------------------------

fn vehicle(direction: &str) -> WiperVehicle {
    WiperVehicle {
        line: 6,
        source_id: format!("X-{direction}"),
        brand: "TESLA".to_owned(),
        model: "TESLA MODEL X".to_owned(),
        picto1: None,
        picto2: None,
        direction: direction.to_owned(),
        start_date: None,
        end_date: None,
        wipers: WiperRefs {
            standard: StandardRefs {
                cote_conducteur: Some("VS35".to_owned()),
                ..StandardRefs::default()
            },
            ..WiperRefs::default()
        },
        notes: None,
    }
}

fn wipers_batch(records: Vec<WiperVehicle>) -> SourceBatch {
    SourceBatch::Wipers(Loaded {
        records,
        dropped: Vec::new(),
    })
}

#[tokio::test]
async fn drive_variants_become_one_product() {
    let catalog = MemoryCatalog::new();
    let report = run(&catalog, wipers_batch(vec![vehicle("LHD"), vehicle("RHD")])).await;

    assert_eq!(report.consolidated, 1);
    assert_eq!(report.counts(Tier::Brands).created, 1);
    assert_eq!(report.counts(Tier::Models).created, 1);
    assert_eq!(report.counts(Tier::Positions).created, 8);
    assert_eq!(report.counts(Tier::Products).created, 1);
    assert!(report.sample_errors.is_empty(), "{:?}", report.sample_errors);

    let brands = catalog.entries(Collection::Brands);
    let models = catalog.entries(Collection::Models);
    let positions = catalog.entries(Collection::Positions);
    let products = catalog.entries(Collection::Products(ProductLine::Wipers));

    let tesla = find(&brands, "slug", "tesla");
    let model_x = find(&models, "slug", "model-x");
    assert_eq!(model_x["name"], "MODEL X");
    assert_eq!(model_x["brand"], tesla["id"]);

    let slot = find(&positions, "slug", "cote-conducteur-standard");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["ref"], "VS35");
    assert_eq!(products[0]["direction"], "LHD/RHD");
    assert_eq!(products[0]["category"], "standard");
    assert_eq!(products[0]["brand"], tesla["id"]);
    assert_eq!(products[0]["model"], model_x["id"]);
    assert_eq!(products[0]["position"], slot["id"]);
}

#[tokio::test]
async fn rerunning_wipers_import_writes_nothing_new() {
    let catalog = MemoryCatalog::new();
    run(&catalog, wipers_batch(vec![vehicle("LHD"), vehicle("RHD")])).await;
    let report = run(&catalog, wipers_batch(vec![vehicle("LHD"), vehicle("RHD")])).await;

    assert_eq!(report.totals().created, 0);
    assert_eq!(report.totals().updated, 0);
    assert_eq!(catalog.entries(Collection::Products(ProductLine::Wipers)).len(), 1);
}

#[tokio::test]
async fn brand_index_failure_aborts_dependent_tiers_only() {
    let catalog = MemoryCatalog::new();
    catalog.fail_lists(Collection::Brands, 503);

    let report = run(&catalog, wipers_batch(vec![vehicle("LHD")])).await;

    assert!(report.aborted());
    assert!(report.is_aborted(Tier::Brands));
    assert!(report.is_aborted(Tier::Models));
    assert!(report.is_aborted(Tier::Products));
    assert!(!report.is_aborted(Tier::Positions));
    assert_eq!(report.counts(Tier::Positions).created, 8);
    assert_eq!(catalog.write_requests(Collection::Brands), 0);
    assert_eq!(catalog.write_requests(Collection::Models), 0);
    assert_eq!(catalog.write_requests(Collection::Products(ProductLine::Wipers)), 0);
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dry_run_against_snapshot_leaves_live_catalog_untouched() {
    let live = with_volkswagen();
    let collections = [Collection::Brands, Collection::Models];
    let snapshot = MemoryCatalog::snapshot_of(&live, &collections, 100, 0)
        .await
        .unwrap();

    let aliases = AliasTable::builtin();
    let mut dry = config(50);
    dry.dry_run = true;
    let report = Pipeline::new(&snapshot, &aliases, dry)
        .run("test", models_batch(GOLF))
        .await;

    assert!(report.dry_run);
    assert_eq!(report.counts(Tier::Models).created, 1);
    assert!(live.entries(Collection::Models).is_empty());
    assert_eq!(live.write_requests(Collection::Models), 0);
}
