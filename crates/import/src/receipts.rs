//! Append-only ledger of itemised warehouse receipt lines.
//!
//! The file is produced by an external collector one receipt at a time and is
//! later read back through [`SourceProfile::costco`](crate::SourceProfile::costco).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use tally_core::Money;
use thiserror::Error;

pub const RECEIPTS_FILE_NAME: &str = "costco_transactions.csv";

const SUMMARY_LABELS: &[&str] = &["SUBTOTAL", "TAX", "TOTAL", "TOTAL TAX"];

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// One row of the receipt ledger. Field order is the on-disk column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub date: NaiveDate,
    pub barcode: String,
    pub description: String,
    /// Two fraction digits, negative for refunds; empty when the receipt cell was blank.
    pub amount: String,
}

impl ReceiptLine {
    /// Builds a ledger row from raw receipt cells. Summary rows and rows
    /// without a description yield `None`.
    pub fn from_cells(date: NaiveDate, barcode: &str, description: &str, amount_cell: &str) -> Option<Self> {
        let description = description.trim();
        if description.is_empty() || is_summary_row(description) {
            return None;
        }
        Some(Self {
            date,
            barcode: barcode.trim().to_string(),
            description: description.to_string(),
            amount: receipt_amount(amount_cell),
        })
    }
}

pub fn is_summary_row(description: &str) -> bool {
    let upper = description.trim().to_uppercase();
    SUMMARY_LABELS.contains(&upper.as_str())
}

/// Normalises a receipt price cell: drops the `N`/`Y` tax flags and
/// whitespace, reads a trailing `-` as a refund, and renders two fraction
/// digits. Unreadable values become `0.00`; blank cells stay blank.
pub fn receipt_amount(cell: &str) -> String {
    if cell.trim().is_empty() {
        return String::new();
    }
    let cleaned: String = cell
        .chars()
        .filter(|c| !matches!(c, 'N' | 'Y') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<Money>() {
        Ok(amount) => format!("{:.2}", amount.as_decimal()),
        Err(_) => "0.00".to_string(),
    }
}

/// Appends `lines` to the ledger at `path`, writing the header only when the
/// file is created. Returns the number of rows written.
pub fn append_receipt_lines(path: &Path, lines: &[ReceiptLine]) -> Result<usize, ReceiptError> {
    if lines.is_empty() {
        return Ok(0);
    }

    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);

    for line in lines {
        writer.serialize(line)?;
    }
    writer.flush()?;

    tracing::info!(count = lines.len(), path = %path.display(), "receipt lines appended");
    Ok(lines.len())
}
