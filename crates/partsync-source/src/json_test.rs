use chrono::NaiveDate;

use super::*;

// -----------------------------------------------------------------------
// brands
// -----------------------------------------------------------------------

#[test]
fn brands_default_to_active() {
    let loaded = parse_brands(r#"[{"name": "PEUGEOT"}, {"name": "Lada", "active": false}]"#).unwrap();
    assert!(loaded.dropped.is_empty());
    assert_eq!(loaded.records.len(), 2);
    assert!(loaded.records[0].active);
    assert!(!loaded.records[1].active);
}

#[test]
fn brands_drop_blank_and_unslugifiable_names() {
    let loaded = parse_brands(r#"[{"name": "  "}, {"name": "???"}, {"name": "KIA"}]"#).unwrap();
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.dropped.len(), 2);
    assert_eq!(loaded.dropped[0].line, 1);
    assert_eq!(loaded.dropped[0].reason, "empty name");
    assert_eq!(loaded.dropped[1].line, 2);
    assert!(loaded.dropped[1].reason.contains("no slug characters"));
}

#[test]
fn brands_not_an_array_is_fatal() {
    let err = parse_brands(r#"{"name": "KIA"}"#).unwrap_err();
    assert!(matches!(err, SourceError::Json { ref context, .. } if context == "brands"));
}

// -----------------------------------------------------------------------
// models
// -----------------------------------------------------------------------

#[test]
fn models_parse_day_month_year_dates() {
    let loaded = parse_models(
        r#"[{"name": "Golf", "brandSlug": "volkswagen",
             "startDate": "01/01/2010", "endDate": "01/01/2015"}]"#,
    )
    .unwrap();
    assert!(loaded.dropped.is_empty());
    let golf = &loaded.records[0];
    assert_eq!(golf.name, "Golf");
    assert_eq!(golf.brand_slug, "volkswagen");
    assert_eq!(golf.model_slug, None);
    assert_eq!(golf.start_date, NaiveDate::from_ymd_opt(2010, 1, 1));
    assert_eq!(golf.end_date, NaiveDate::from_ymd_opt(2015, 1, 1));
}

#[test]
fn models_drop_invalid_dates_and_missing_parent() {
    let loaded = parse_models(
        r#"[
            {"name": "Golf", "brandSlug": "volkswagen", "startDate": "2010-01-01"},
            {"name": "Polo"},
            {"name": "Up", "brandSlug": "volkswagen", "endDate": ""}
        ]"#,
    )
    .unwrap();
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.records[0].name, "Up");
    assert_eq!(loaded.records[0].end_date, None);
    assert_eq!(
        loaded.dropped,
        vec![
            DroppedRow::new(1, "invalid date '2010-01-01'"),
            DroppedRow::new(2, "missing parent slug"),
        ]
    );
}

#[test]
fn models_drop_wrongly_typed_elements() {
    let loaded = parse_models(r#"[42, {"name": "Golf", "brandSlug": "vw"}]"#).unwrap();
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.dropped[0].line, 1);
    assert!(loaded.dropped[0].reason.starts_with("malformed record"));
}

// -----------------------------------------------------------------------
// products
// -----------------------------------------------------------------------

#[test]
fn products_strip_reference_suffix_and_read_line() {
    let loaded = parse_products(
        r#"[{"ref": "H7 (x2)", "brand": "RENAULT", "model": "CLIO IV",
             "position": "Feux de croisement", "category": "halogen",
             "line": "lights", "description": "55W"}]"#,
    )
    .unwrap();
    assert!(loaded.dropped.is_empty());
    let product = &loaded.records[0];
    assert_eq!(product.reference, "H7");
    assert_eq!(product.line, ProductLine::Lights);
    assert_eq!(product.description.as_deref(), Some("55W"));
}

#[test]
fn products_drop_unknown_line_and_missing_ref() {
    let loaded = parse_products(
        r#"[
            {"ref": "X1", "brand": "B", "model": "M", "position": "P", "category": "c", "line": "tyres"},
            {"brand": "B", "model": "M", "position": "P", "category": "c", "line": "filter"}
        ]"#,
    )
    .unwrap();
    assert!(loaded.records.is_empty());
    assert!(loaded.dropped[0].reason.starts_with("malformed record"));
    assert_eq!(loaded.dropped[1].reason, "missing ref");
}

#[test]
fn load_missing_file_is_io_error() {
    let err = load_brands(Path::new("/nonexistent/brands.json")).unwrap_err();
    assert!(matches!(err, SourceError::Io { .. }));
}
