use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of columns a catalogue row may carry (spreadsheet range `A2:O`).
pub const SHEET_COLUMNS: usize = 15;

/// A single catalogue entry, mapped from one spreadsheet row
///
/// Field order mirrors the spreadsheet columns A through O. Records are
/// created fresh on every retrieval and never mutated afterwards. The JSON
/// representation uses camelCase names so the API output matches what the
/// catalogue page and any existing consumers expect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Barcode (unique identifier, used as the card key in the grid)
    pub barcode: String,

    /// Top-level category, matched exactly when filtering
    pub category: String,

    /// Sub-category, display only
    pub sub_category: String,

    /// Product type label
    pub product_type: String,

    /// Identifier of the supplying vendor
    pub supplier_id: String,

    /// Display name, searched case-insensitively
    pub name: String,

    /// Optional image identifier for the external thumbnail host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    /// Pack size label (free text, e.g. "500ml")
    pub size: String,

    /// Carton quantity label (string-typed in the sheet, kept as-is)
    pub ctn_qty: String,

    /// Carton cost; `0.0` when the cell is missing or unparseable
    pub ctn_cost: f64,

    /// Recommended retail price; `0.0` when missing or unparseable
    pub rrp: f64,

    /// GST applicability label
    pub gst: String,

    /// GST rate label
    pub gst_rate: String,

    /// Discount rate label
    pub discount_rate: String,

    /// Availability label, matched exactly (e.g. "In stock")
    pub status: String,
}

/// A row wider than the catalogue schema allows
///
/// Raised once at ingestion instead of silently truncating the row, so a
/// misconfigured range or a reshaped sheet fails loudly with the offending
/// row number rather than producing partially-empty records.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("schema mismatch: row {row} has {cells} cells, expected at most {SHEET_COLUMNS}")]
pub struct RowShapeError {
    /// 1-based data row number (row 1 is the first row below the header)
    pub row: usize,

    /// Number of cells the offending row actually carries
    pub cells: usize,
}

/// Map one spreadsheet row onto a [`Product`]
///
/// Missing trailing cells become empty strings (`image_id` becomes `None`);
/// the numeric columns fall back to `0.0`. Total for any row of at most
/// [`SHEET_COLUMNS`] cells.
///
/// # Arguments
/// * `row` - Ordered cell values for one data row
///
/// # Returns
/// * `Product` - The typed record
pub fn map_row(row: &[String]) -> Product {
    let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

    Product {
        barcode: cell(0),
        category: cell(1),
        sub_category: cell(2),
        product_type: cell(3),
        supplier_id: cell(4),
        name: cell(5),
        image_id: row.get(6).filter(|v| !v.is_empty()).cloned(),
        size: cell(7),
        ctn_qty: cell(8),
        ctn_cost: parse_money(&cell(9)),
        rrp: parse_money(&cell(10)),
        gst: cell(11),
        gst_rate: cell(12),
        discount_rate: cell(13),
        status: cell(14),
    }
}

/// Map a full sheet of rows onto products, validating the row shape
///
/// # Arguments
/// * `rows` - All data rows, header excluded, in sheet order
///
/// # Returns
/// * `Result<Vec<Product>, RowShapeError>` - One product per row, or a
///   schema mismatch naming the first over-wide row
///
/// # Errors
/// * Returns [`RowShapeError`] if any row has more than [`SHEET_COLUMNS`]
///   cells
pub fn map_rows(rows: &[Vec<String>]) -> Result<Vec<Product>, RowShapeError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() > SHEET_COLUMNS {
                return Err(RowShapeError {
                    row: i + 1,
                    cells: row.len(),
                });
            }
            Ok(map_row(row))
        })
        .collect()
}

// Numeric coercion for the money columns. The sheet is hand-edited, so cells
// occasionally hold "" or trailing text ("12.5 kg"); the longest numeric
// prefix wins and anything with no such prefix becomes 0.0.
fn parse_money(raw: &str) -> f64 {
    let raw = raw.trim();
    (1..=raw.len())
        .rev()
        .filter(|&end| raw.is_char_boundary(end))
        .find_map(|end| raw[..end].parse().ok())
        .unwrap_or(0.0)
}
