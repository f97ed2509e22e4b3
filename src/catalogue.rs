use crate::product::Product;
use serde::{Deserialize, Serialize};

/// Number of product cards per catalogue page.
pub const PAGE_SIZE: usize = 12;

/// Filter constraints parsed from the catalogue query string
///
/// Every field is optional; an unset field skips its predicate entirely.
/// The three predicates are independent, so the order they are applied in
/// never changes the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Exact category match
    pub category: Option<String>,

    /// Exact status match (e.g. "In stock" / "Out of stock")
    pub status: Option<String>,

    /// Case-insensitive substring match on the product name
    pub search: Option<String>,
}

impl FilterOptions {
    /// Whether a product passes every set predicate
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self
            .category
            .as_ref()
            .map_or(true, |c| &product.category == c);
        let status_ok = self.status.as_ref().map_or(true, |s| &product.status == s);
        let search_ok = self
            .search
            .as_ref()
            .map_or(true, |q| product.name.to_lowercase().contains(&q.to_lowercase()));

        category_ok && status_ok && search_ok
    }
}

/// Apply the filter predicates to the full product list
///
/// # Arguments
/// * `products` - The full (unfiltered) product list
/// * `filters` - Constraints to apply; unset fields match everything
///
/// # Returns
/// * `Vec<Product>` - Products passing all set predicates, in input order
pub fn filter_products(products: &[Product], filters: &FilterOptions) -> Vec<Product> {
    products
        .iter()
        .filter(|p| filters.matches(p))
        .cloned()
        .collect()
}

/// Slice one page out of a (filtered) product list
///
/// Plain contiguous slicing: page 1 covers indices `0..PAGE_SIZE`, page 2
/// the next `PAGE_SIZE`, and so on. Out-of-range pages yield an empty slice
/// rather than an error.
///
/// # Arguments
/// * `products` - The filtered list to slice
/// * `page` - 1-based page number (0 is treated as 1)
/// * `page_size` - Items per page
///
/// # Returns
/// * `&[Product]` - The page's worth of products, possibly empty
pub fn paginate(products: &[Product], page: usize, page_size: usize) -> &[Product] {
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size);
    if start >= products.len() {
        return &[];
    }
    let end = (start + page_size).min(products.len());
    &products[start..end]
}

/// Total pages a filtered list of `count` items spans
///
/// Zero items means zero pages; the pagination controls render "Page 1 of 0"
/// in that case.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size)
}

/// Parse the `page` query parameter, defaulting anything malformed to 1
///
/// Non-numeric input, zero, and negative values all behave as page 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&p| p >= 1)
        .unwrap_or(1)
}

/// First occurrence of a query parameter, ignoring later duplicates
///
/// The filter bar only ever emits one value per key, but a hand-edited URL
/// may repeat a parameter; the first one wins. Empty values count as absent.
pub fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Distinct categories across the full list, sorted, for the filter dropdown
pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = products
        .iter()
        .map(|p| p.category.clone())
        .filter(|c| !c.is_empty())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}
