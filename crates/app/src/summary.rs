use std::collections::BTreeMap;
use std::fmt;
use tally_core::{EnrichedTransaction, Money};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    /// `None` once the running sum no longer fits.
    pub total: Option<Money>,
}

/// Per-category counts and totals, largest count first, ties by name.
pub fn by_category(transactions: &[EnrichedTransaction]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, (usize, Option<Money>)> = BTreeMap::new();
    for t in transactions {
        let entry = totals
            .entry(t.category.as_str())
            .or_insert((0, Some(Money::default())));
        entry.0 += 1;
        entry.1 = entry.1.and_then(|sum| sum.checked_add(t.amount));
    }

    let mut rows: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (count, total))| CategoryTotal {
            category: category.to_string(),
            count,
            total,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

pub struct Report<'a>(pub &'a [CategoryTotal]);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .0
            .iter()
            .map(|r| r.category.chars().count())
            .max()
            .unwrap_or(0);
        for row in self.0 {
            let total = row
                .total
                .map_or_else(|| "overflow".to_string(), |t| t.to_string());
            writeln!(f, "  {:<width$}  {:>5}  {:>12}", row.category, row.count, total)?;
        }
        Ok(())
    }
}
