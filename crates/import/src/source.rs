use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tally_core::{CanonicalTransaction, Money, SourceFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

/// How the signed amount of a row is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmountColumns {
    Single { column: String },
    /// Spend and credit live in separate columns. Credits already carry a
    /// minus sign, so the two are added.
    DebitCredit { debit: String, credit: String },
}

/// Column layout and filtering rules for one statement export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProfile {
    pub format: SourceFormat,
    /// Exact file name this profile claims inside the input folder.
    pub file_name: String,
    pub date_column: String,
    pub description_column: String,
    pub amount: AmountColumns,
    #[serde(default = "default_multiplier")]
    pub amount_multiplier: i32,
    /// Case-insensitive substrings; a matching description drops the row.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    #[serde(default)]
    pub description_prefix: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_multiplier() -> i32 {
    1
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl SourceProfile {
    /// Citi card export: separate Debit/Credit columns. Costco purchases are
    /// dropped because the itemised receipt file already covers them.
    pub fn citi() -> Self {
        Self {
            format: SourceFormat::Citi,
            file_name: "Year to date.CSV".to_string(),
            date_column: "Date".to_string(),
            description_column: "Description".to_string(),
            amount: AmountColumns::DebitCredit {
                debit: "Debit".to_string(),
                credit: "Credit".to_string(),
            },
            amount_multiplier: 1,
            skip_patterns: vec!["costco".to_string()],
            description_prefix: None,
            date_format: "%m/%d/%Y".to_string(),
            delimiter: default_delimiter(),
        }
    }

    /// Smartly card export: charges are negative in the file.
    pub fn smartly() -> Self {
        Self {
            format: SourceFormat::Smartly,
            file_name: "Credit Card - 1604_01-01-2025_08-29-2025.csv".to_string(),
            date_column: "Date".to_string(),
            description_column: "Name".to_string(),
            amount: AmountColumns::Single {
                column: "Amount".to_string(),
            },
            amount_multiplier: -1,
            skip_patterns: vec!["costco".to_string()],
            description_prefix: None,
            date_format: "%m/%d/%Y".to_string(),
            delimiter: default_delimiter(),
        }
    }

    /// Itemised Costco receipt lines (see [`crate::receipts`]).
    pub fn costco() -> Self {
        Self {
            format: SourceFormat::Costco,
            file_name: crate::receipts::RECEIPTS_FILE_NAME.to_string(),
            date_column: "date".to_string(),
            description_column: "description".to_string(),
            amount: AmountColumns::Single {
                column: "amount".to_string(),
            },
            amount_multiplier: 1,
            skip_patterns: Vec::new(),
            description_prefix: Some("COSTCO-".to_string()),
            date_format: default_date_format(),
            delimiter: default_delimiter(),
        }
    }

    pub fn builtin() -> Vec<SourceProfile> {
        vec![Self::citi(), Self::smartly(), Self::costco()]
    }

    pub fn should_skip(&self, description: &str) -> bool {
        let lower = description.to_lowercase();
        self.skip_patterns
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
    }

    pub fn parse_file(&self, path: &Path) -> Result<Vec<CanonicalTransaction>, SourceError> {
        let file = File::open(path)?;
        self.parse_reader(file)
    }

    pub fn parse_reader<R: Read>(&self, data: R) -> Result<Vec<CanonicalTransaction>, SourceError> {
        let delimiter = self.delimiter.as_bytes().first().copied().unwrap_or(b',');
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(data);

        let headers = reader.headers()?.clone();
        let columns = ResolvedColumns::resolve(&headers, self)?;

        let mut transactions = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // Header is line 1.
            let line = idx + 2;
            match self.extract(&record, &columns) {
                Some(tx) => transactions.push(tx),
                None => tracing::debug!(line, format = %self.format, "row skipped"),
            }
        }

        Ok(transactions)
    }

    fn extract(&self, record: &StringRecord, columns: &ResolvedColumns) -> Option<CanonicalTransaction> {
        let description = field(record, columns.description)?;
        if self.should_skip(description) {
            return None;
        }

        let date = parse_date(field(record, columns.date)?, &self.date_format)?;

        let amount = match columns.amount {
            ResolvedAmount::Single(col) => field(record, col)?.parse::<Money>().ok()?,
            ResolvedAmount::DebitCredit { debit, credit } => {
                let debit = field(record, debit).map(str::parse::<Money>).transpose().ok()?;
                let credit = field(record, credit).map(str::parse::<Money>).transpose().ok()?;
                match (debit, credit) {
                    (None, None) => return None,
                    (d, c) => d.unwrap_or_default().checked_add(c.unwrap_or_default())?,
                }
            }
        };

        let raw_description = match &self.description_prefix {
            Some(prefix) => format!("{prefix}{description}"),
            None => description.to_string(),
        };

        Some(CanonicalTransaction::new(
            date,
            raw_description,
            amount.checked_scaled(self.amount_multiplier)?,
            self.format.clone(),
        ))
    }
}

struct ResolvedColumns {
    date: usize,
    description: usize,
    amount: ResolvedAmount,
}

enum ResolvedAmount {
    Single(usize),
    DebitCredit { debit: usize, credit: usize },
}

impl ResolvedColumns {
    fn resolve(headers: &StringRecord, profile: &SourceProfile) -> Result<Self, SourceError> {
        let find = |name: &str| -> Result<usize, SourceError> {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| SourceError::MissingColumn(name.to_string()))
        };

        let amount = match &profile.amount {
            AmountColumns::Single { column } => ResolvedAmount::Single(find(column)?),
            AmountColumns::DebitCredit { debit, credit } => ResolvedAmount::DebitCredit {
                debit: find(debit)?,
                credit: find(credit)?,
            },
        };

        Ok(Self {
            date: find(&profile.date_column)?,
            description: find(&profile.description_column)?,
            amount,
        })
    }
}

/// Trimmed, non-blank field value.
fn field(record: &StringRecord, col: usize) -> Option<&str> {
    record.get(col).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str, format: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Some(date);
    }

    for fmt in &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}
