/*!
# Catalogue Web Application

A catalogue browsing web application backed by a Google Sheet, built in Rust.

## Overview

The product "database" is a spreadsheet maintained by hand. This application
reads it through the Google Sheets API, normalizes the rows into typed
records, and serves a paginated, filterable product grid plus a JSON read
endpoint. Data flows strictly one way:

spreadsheet → mapped records → cached list → filtered/paginated subset → rendered cards

## Architecture

### Data pipeline
- **Row Mapper** - converts raw spreadsheet rows (ordered cell strings from
  `Product_Database!A2:O`) into typed `Product` records, coercing the money
  columns with a safe `0.0` default and rejecting over-wide rows as a schema
  mismatch
- **Retrieval Service** - authenticates with service-account credentials,
  fetches the fixed range, and retries quota errors a bounded number of
  times with exponential backoff; every failure is a tagged error so an
  empty catalogue is distinguishable from a broken fetch
- **Result Cache** - an explicit time-boxed cache (one hour by default) over
  the retrieval service, with a tag-based purge endpoint

### Presentation
- **Filter/Paginate Engine** - conjunction of category/status/search
  predicates, then a plain contiguous slice of 12 cards per page; filtering
  always precedes pagination
- **Catalogue page** - server-rendered with Handlebars; a small client
  script rewrites the query string on filter changes (debouncing the search
  box at 300 ms) and triggers navigation

## Modules

- **product**: Product record and the row mapper
- **sheets**: Google Sheets client and the retry policy
- **cache**: time-boxed product list cache
- **catalogue**: filter predicates and pagination
- **config**: environment-based process configuration
- **app**: routing and handlers

## REST API Endpoints

- `GET /api/read` - the full product list as JSON
- `POST /api/refresh` - purges the cached catalogue
- `GET /catalogue` - the rendered product grid
  (`?page=&category=&status=&search=`)
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod cache;
pub mod catalogue;
pub mod config;
pub mod product;
pub mod sheets;

/// Re-export the core types to make the crate easier to use
pub use cache::ProductCache;
pub use catalogue::FilterOptions;
pub use config::Config;
pub use product::Product;
pub use sheets::{FetchError, RowSource, SheetsClient};
