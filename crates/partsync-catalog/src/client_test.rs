use serde_json::json;

use super::*;

fn client() -> HttpCatalog {
    HttpCatalog::new("http://catalog.test:1337/", None, 5, 0, 0).unwrap()
}

#[test]
fn collection_url_without_query() {
    let url = client()
        .collection_url(Collection::Brands, None, &[])
        .unwrap();
    assert_eq!(url.as_str(), "http://catalog.test:1337/api/brands");
}

#[test]
fn collection_url_with_id() {
    let url = client()
        .collection_url(
            Collection::Products(partsync_core::ProductLine::Wipers),
            Some(42),
            &[],
        )
        .unwrap();
    assert_eq!(url.as_str(), "http://catalog.test:1337/api/wipers-products/42");
}

#[test]
fn collection_url_encodes_pagination_pairs() {
    let url = client()
        .collection_url(
            Collection::Models,
            None,
            &[
                ("pagination[page]", "2".to_owned()),
                ("pagination[pageSize]", "100".to_owned()),
            ],
        )
        .unwrap();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("pagination[page]".to_owned(), "2".to_owned()),
            ("pagination[pageSize]".to_owned(), "100".to_owned()),
        ]
    );
}

#[test]
fn populated_url_requests_product_relations() {
    let url = client()
        .populated_url(
            Collection::Products(partsync_core::ProductLine::Lights),
            Some(7),
            &[],
        )
        .unwrap();
    assert_eq!(
        url.as_str(),
        "http://catalog.test:1337/api/lights-products/7?populate%5B0%5D=brand&populate%5B1%5D=model&populate%5B2%5D=position"
    );
}

#[test]
fn populated_url_leaves_relationless_collections_alone() {
    let url = client()
        .populated_url(Collection::Brands, None, &[])
        .unwrap();
    assert_eq!(url.as_str(), "http://catalog.test:1337/api/brands");
}

#[test]
fn new_rejects_invalid_base_url() {
    let result = HttpCatalog::new("not a url", None, 5, 0, 0);
    assert!(
        matches!(result, Err(CatalogError::InvalidBaseUrl { .. })),
        "expected InvalidBaseUrl"
    );
}

#[test]
fn flatten_entry_lifts_attributes() {
    let flat = flatten_entry(json!({
        "id": 3,
        "attributes": { "name": "Golf", "slug": "golf" }
    }));
    assert_eq!(flat, json!({ "id": 3, "name": "Golf", "slug": "golf" }));
}

#[test]
fn flatten_entry_keeps_flat_entries() {
    let entry = json!({ "id": 3, "name": "Golf" });
    assert_eq!(flatten_entry(entry.clone()), entry);
}

#[test]
fn error_message_reads_envelope() {
    let body = r#"{"data":null,"error":{"status":400,"name":"ValidationError","message":"This attribute must be unique"}}"#;
    assert_eq!(
        error_message(body),
        "ValidationError: This attribute must be unique"
    );
}

#[test]
fn error_message_falls_back_to_raw_body() {
    assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
}
