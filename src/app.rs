use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::cache::{ProductCache, PRODUCTS_KEY};
use crate::catalogue::{
    distinct_categories, filter_products, first_param, paginate, parse_page, total_pages,
    FilterOptions, PAGE_SIZE,
};
use crate::config::Config;
use crate::product::Product;
use crate::sheets::{fetch_products, RowSource, SheetsClient};

/// Statuses offered by the filter bar dropdown.
const STATUS_OPTIONS: [&str; 2] = ["In stock", "Out of stock"];

/// External host serving product thumbnails by image id.
const THUMBNAIL_URL: &str = "https://drive.google.com/thumbnail";

/// Shared application state: the cache, the row source behind it, and the
/// compiled page templates.
pub struct AppState {
    cache: ProductCache,
    source: Arc<dyn RowSource>,
    templates: Handlebars<'static>,
}

impl AppState {
    /// Build the state, compiling the catalogue template
    ///
    /// # Arguments
    /// * `source` - Row source the cache populates from
    /// * `cache_ttl` - How long a fetched catalogue stays valid
    ///
    /// # Errors
    /// * Returns a template error if the embedded catalogue template fails
    ///   to compile
    pub fn new(
        source: Arc<dyn RowSource>,
        cache_ttl: Duration,
    ) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string("catalogue", include_str!("templates/catalogue.hbs"))?;

        Ok(AppState {
            cache: ProductCache::new(cache_ttl),
            source,
            templates,
        })
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/catalogue") }))
        .route("/catalogue", get(catalogue_page))
        .route("/api/read", get(read_products))
        .route("/api/refresh", post(refresh_products))
        .nest_service("/static", ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server
///
/// Builds the Sheets client and state from configuration, then serves until
/// interrupted.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = Arc::new(SheetsClient::new(&config)?);
    let state = Arc::new(AppState::new(source, config.cache_ttl)?);

    let app = router(state);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// Cached catalogue lookup shared by the API and the page handler.
async fn load_catalogue(state: &AppState) -> Result<Vec<Product>, crate::sheets::FetchError> {
    let source = Arc::clone(&state.source);
    state
        .cache
        .get_or_populate(PRODUCTS_KEY, || async move {
            fetch_products(source.as_ref()).await
        })
        .await
}

/// `GET /api/read` - the full product list as JSON
///
/// Returns `200` with the array (empty for an empty catalogue) or `502`
/// with an error body when retrieval failed, so consumers can tell the two
/// apart.
async fn read_products(State(state): State<Arc<AppState>>) -> Response {
    match load_catalogue(&state).await {
        Ok(products) => Json(products).into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

/// `POST /api/refresh` - purge the cached catalogue
async fn refresh_products(State(state): State<Arc<AppState>>) -> StatusCode {
    state.cache.invalidate(PRODUCTS_KEY);
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct SelectOption {
    value: String,
    selected: bool,
}

#[derive(Serialize)]
struct ProductCard {
    barcode: String,
    name: String,
    category_line: String,
    price: String,
    size: String,
    status: String,
    in_stock: bool,
    image_url: Option<String>,
}

#[derive(Serialize)]
struct CatalogueView {
    products: Vec<ProductCard>,
    categories: Vec<SelectOption>,
    statuses: Vec<SelectOption>,
    search: String,
    page: usize,
    total_pages: usize,
    total_count: usize,
    has_prev: bool,
    has_next: bool,
    prev_url: String,
    next_url: String,
    fetch_failed: bool,
    error: String,
}

/// `GET /catalogue` - the server-rendered product grid
///
/// Filter and page state arrive purely through the query string; repeated
/// parameters use their first occurrence and malformed values are treated
/// as absent. A failed retrieval renders an error banner instead of an
/// empty grid.
async fn catalogue_page(
    Query(params): Query<Vec<(String, String)>>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let page = parse_page(first_param(&params, "page"));
    let filters = FilterOptions {
        category: first_param(&params, "category").map(str::to_string),
        status: first_param(&params, "status").map(str::to_string),
        search: first_param(&params, "search").map(str::to_string),
    };

    let view = match load_catalogue(&state).await {
        Ok(all_products) => {
            let filtered = filter_products(&all_products, &filters);
            let page_products = paginate(&filtered, page, PAGE_SIZE);
            build_view(&all_products, &filtered, page_products, page, &filters)
        }
        Err(err) => error_view(page, &filters, &err.to_string()),
    };

    match state.templates.render("catalogue", &view) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            log::error!("failed to render catalogue page: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

fn build_view(
    all_products: &[Product],
    filtered: &[Product],
    page_products: &[Product],
    page: usize,
    filters: &FilterOptions,
) -> CatalogueView {
    let total_count = filtered.len();
    let pages = total_pages(total_count, PAGE_SIZE);

    CatalogueView {
        products: page_products.iter().map(product_card).collect(),
        categories: select_options(distinct_categories(all_products), filters.category.as_deref()),
        statuses: select_options(
            STATUS_OPTIONS.iter().map(|s| s.to_string()).collect(),
            filters.status.as_deref(),
        ),
        search: filters.search.clone().unwrap_or_default(),
        page,
        total_pages: pages,
        total_count,
        has_prev: page > 1,
        has_next: page < pages,
        prev_url: page_url(filters, page.saturating_sub(1).max(1)),
        next_url: page_url(filters, page + 1),
        fetch_failed: false,
        error: String::new(),
    }
}

fn error_view(page: usize, filters: &FilterOptions, message: &str) -> CatalogueView {
    CatalogueView {
        products: Vec::new(),
        categories: select_options(Vec::new(), filters.category.as_deref()),
        statuses: select_options(
            STATUS_OPTIONS.iter().map(|s| s.to_string()).collect(),
            filters.status.as_deref(),
        ),
        search: filters.search.clone().unwrap_or_default(),
        page,
        total_pages: 0,
        total_count: 0,
        has_prev: false,
        has_next: false,
        prev_url: page_url(filters, 1),
        next_url: page_url(filters, 1),
        fetch_failed: true,
        error: message.to_string(),
    }
}

fn product_card(product: &Product) -> ProductCard {
    ProductCard {
        barcode: product.barcode.clone(),
        name: product.name.clone(),
        category_line: format!("{} / {}", product.category, product.sub_category),
        price: format!("{:.2}", product.ctn_cost),
        size: product.size.clone(),
        status: product.status.clone(),
        in_stock: product.status == "In stock",
        image_url: product
            .image_id
            .as_ref()
            .map(|id| format!("{THUMBNAIL_URL}?id={}&sz=w400", urlencoding::encode(id))),
    }
}

fn select_options(values: Vec<String>, current: Option<&str>) -> Vec<SelectOption> {
    values
        .into_iter()
        .map(|value| SelectOption {
            selected: Some(value.as_str()) == current,
            value,
        })
        .collect()
}

// Pagination links keep the active filters and only change the page.
fn page_url(filters: &FilterOptions, page: usize) -> String {
    let mut url = format!("/catalogue?page={page}");
    for (key, value) in [
        ("category", &filters.category),
        ("status", &filters.status),
        ("search", &filters.search),
    ] {
        if let Some(value) = value {
            url.push_str(&format!("&{key}={}", urlencoding::encode(value)));
        }
    }
    url
}
