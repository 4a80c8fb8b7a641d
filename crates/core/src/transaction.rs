use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::period::PeriodKey;

/// Which statement layout a transaction was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Citi,
    Smartly,
    Costco,
    Custom(String),
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Citi => write!(f, "citi"),
            SourceFormat::Smartly => write!(f, "smartly"),
            SourceFormat::Costco => write!(f, "costco"),
            SourceFormat::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A statement row mapped onto the shared schema, before any enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub date: NaiveDate,
    pub raw_description: String,
    pub amount: Money,
    pub source_format: SourceFormat,
}

impl CanonicalTransaction {
    pub fn new(
        date: NaiveDate,
        raw_description: impl Into<String>,
        amount: Money,
        source_format: SourceFormat,
    ) -> Self {
        CanonicalTransaction {
            date,
            raw_description: raw_description.into(),
            amount,
            source_format,
        }
    }

    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::from_date(self.date)
    }
}

/// A canonical transaction with its cleaned merchant name, category, and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedTransaction {
    #[serde(rename = "transaction_date")]
    pub date: NaiveDate,
    pub raw_description: String,
    pub description: String,
    pub amount: Money,
    pub category: String,
    #[serde(rename = "year_month")]
    pub period_key: PeriodKey,
    #[serde(skip)]
    pub source_format: SourceFormat,
}

impl EnrichedTransaction {
    pub fn enrich(tx: CanonicalTransaction, description: String, category: String) -> Self {
        let period_key = tx.period_key();
        EnrichedTransaction {
            date: tx.date,
            raw_description: tx.raw_description,
            description,
            amount: tx.amount,
            category,
            period_key,
            source_format: tx.source_format,
        }
    }

    pub fn year_month(&self) -> String {
        self.period_key.to_string()
    }
}
