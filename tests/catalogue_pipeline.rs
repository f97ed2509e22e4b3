//! End-to-end tests over the router: scripted spreadsheet rows in, JSON and
//! rendered HTML out.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use catalogue::app::{router, AppState};
use catalogue::sheets::{FetchError, RowSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

type Scripted = Result<Vec<Vec<String>>, FetchError>;

/// Row source that replays a fixed script of fetch outcomes.
struct ScriptedSource {
    responses: Mutex<VecDeque<Scripted>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Scripted>) -> Self {
        ScriptedSource {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl RowSource for ScriptedSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, FetchError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("row source called more times than scripted")
    }
}

fn app_with(responses: Vec<Scripted>) -> Router {
    let source = Arc::new(ScriptedSource::new(responses));
    let state = AppState::new(source, Duration::from_secs(3600)).expect("template should compile");
    router(Arc::new(state))
}

fn sheet_row(barcode: &str, category: &str, name: &str, status: &str) -> Vec<String> {
    [
        barcode, category, "Sub", "Type", "SUP-1", name, "", "500g", "12", "10.00", "1.50", "Yes",
        "10%", "0%", status,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn api_read_returns_the_mapped_catalogue_as_json() {
    let app = app_with(vec![Ok(vec![
        sheet_row("1001", "Drinks", "Lemon Fizz", "In stock"),
        sheet_row("1002", "Pantry", "Plain Flour", "Out of stock"),
    ])]);

    let (status, body) = get(&app, "/api/read").await;
    assert_eq!(status, StatusCode::OK);

    let products: serde_json::Value = serde_json::from_str(&body).unwrap();
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["barcode"], "1001");
    assert_eq!(products[0]["subCategory"], "Sub");
    assert_eq!(products[0]["ctnCost"], 10.0);
    assert_eq!(products[1]["status"], "Out of stock");

    // Second call is served from the cache; the script holds no second
    // response, so a refetch would panic the source.
    let (status, _) = get(&app, "/api/read").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_read_empty_catalogue_is_200_with_empty_array() {
    let app = app_with(vec![Ok(Vec::new())]);

    let (status, body) = get(&app, "/api/read").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), "[]");
}

#[tokio::test]
async fn api_read_failure_is_502_with_a_tagged_error() {
    let app = app_with(vec![Err(FetchError::Upstream(
        "HTTP 500: backend unavailable".to_string(),
    ))]);

    let (status, body) = get(&app, "/api/read").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let error: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("backend unavailable"));
}

#[tokio::test]
async fn empty_catalogue_page_renders_page_1_of_0() {
    let app = app_with(vec![Ok(Vec::new())]);

    let (status, body) = get(&app, "/catalogue").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Page 1 of 0"));
    assert!(!body.contains("product-card"));
    assert!(!body.contains("error-banner"));
}

#[tokio::test]
async fn failed_fetch_renders_an_error_banner_not_an_empty_grid() {
    let app = app_with(vec![Err(FetchError::Upstream(
        "HTTP 500: backend unavailable".to_string(),
    ))]);

    let (status, body) = get(&app, "/catalogue").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Could not load the catalogue"));
    assert!(!body.contains("product-card"));
}

#[tokio::test]
async fn catalogue_page_paginates_fourteen_products_across_two_pages() {
    let rows: Vec<Vec<String>> = (1..=14)
        .map(|i| sheet_row(&format!("b{i:02}"), "Pantry", &format!("Item {i:02}"), "In stock"))
        .collect();
    let app = app_with(vec![Ok(rows)]);

    let (_, page1) = get(&app, "/catalogue").await;
    assert!(page1.contains("Page 1 of 2"));
    assert!(page1.contains("Item 01"));
    assert!(page1.contains("Item 12"));
    assert!(!page1.contains("Item 13"));

    let (_, page2) = get(&app, "/catalogue?page=2").await;
    assert!(page2.contains("Page 2 of 2"));
    assert!(page2.contains("Item 13"));
    assert!(page2.contains("Item 14"));
    assert!(!page2.contains("Item 12"));

    let (_, page3) = get(&app, "/catalogue?page=3").await;
    assert!(page3.contains("Page 3 of 2"));
    assert!(!page3.contains("Item 01"));
    assert!(!page3.contains("Item 14"));
}

#[tokio::test]
async fn search_filters_cards_case_insensitively() {
    let app = app_with(vec![Ok(vec![
        sheet_row("1", "Pantry", "Blue Widget", "In stock"),
        sheet_row("2", "Pantry", "Gadget", "In stock"),
        sheet_row("3", "Pantry", "WIDGET Pro", "In stock"),
    ])]);

    let (_, body) = get(&app, "/catalogue?search=widget").await;
    assert!(body.contains("Blue Widget"));
    assert!(body.contains("WIDGET Pro"));
    assert!(!body.contains("Gadget"));
    assert!(body.contains("Page 1 of 1"));
}

#[tokio::test]
async fn repeated_query_parameters_use_the_first_occurrence() {
    let app = app_with(vec![Ok(vec![
        sheet_row("1", "Drinks", "Cola", "In stock"),
        sheet_row("2", "Pantry", "Flour", "In stock"),
    ])]);

    let (_, body) = get(&app, "/catalogue?category=Drinks&category=Pantry").await;
    assert!(body.contains("Cola"));
    assert!(!body.contains("data-barcode=\"2\""));
}

#[tokio::test]
async fn malformed_page_parameter_falls_back_to_page_one() {
    let app = app_with(vec![Ok(vec![sheet_row("1", "Drinks", "Cola", "In stock")])]);

    let (status, body) = get(&app, "/catalogue?page=banana").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Page 1 of 1"));
    assert!(body.contains("Cola"));
}

#[tokio::test]
async fn refresh_purges_the_cache_and_the_next_read_refetches() {
    let app = app_with(vec![
        Ok(vec![sheet_row("1", "Drinks", "Before Refresh", "In stock")]),
        Ok(vec![sheet_row("1", "Drinks", "After Refresh", "In stock")]),
    ]);

    let (_, body) = get(&app, "/api/read").await;
    assert!(body.contains("Before Refresh"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "/api/read").await;
    assert!(body.contains("After Refresh"));
}

#[tokio::test]
async fn root_redirects_to_the_catalogue() {
    let app = app_with(vec![]);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/catalogue");
}
