use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tally_core::{CanonicalTransaction, EnrichedTransaction};
use thiserror::Error;

use crate::classifier::CategoryClassifier;
use crate::merchant;
use crate::oracle::ClassificationOracle;
use crate::source::SourceProfile;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input folder '{0}' does not exist")]
    MissingFolder(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No registered CSV files found in '{folder}' (available: {available:?})")]
    NoMatchingFiles {
        folder: PathBuf,
        available: Vec<String>,
    },
    #[error("No transactions were read from any input file")]
    NoData,
}

/// Counts gathered while loading the input folder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// `(file name, transactions read)` per successfully parsed file.
    pub parsed: Vec<(String, usize)>,
    /// `(file name, error)` per file that could not be parsed.
    pub failed: Vec<(String, String)>,
}

/// Orchestrates: discover files → parse per profile → merge → sort by date →
/// normalize merchant → categorize.
pub struct Pipeline {
    profiles: Vec<SourceProfile>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(SourceProfile::builtin())
    }
}

impl Pipeline {
    pub fn new(profiles: Vec<SourceProfile>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[SourceProfile] {
        &self.profiles
    }

    /// Files in `folder` claimed by a profile, in file-name order. When two
    /// profiles claim the same name the first one wins.
    pub fn discover<'a>(&'a self, folder: &Path) -> Result<Vec<(PathBuf, &'a SourceProfile)>, PipelineError> {
        if !folder.is_dir() {
            return Err(PipelineError::MissingFolder(folder.to_path_buf()));
        }

        let mut available = BTreeMap::new();
        for entry in std::fs::read_dir(folder)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                available.insert(name.to_string(), entry.path());
            }
        }

        let matched: Vec<(PathBuf, &SourceProfile)> = available
            .iter()
            .filter_map(|(name, path)| {
                self.profiles
                    .iter()
                    .find(|p| p.file_name == *name)
                    .map(|p| (path.clone(), p))
            })
            .collect();

        if matched.is_empty() {
            return Err(PipelineError::NoMatchingFiles {
                folder: folder.to_path_buf(),
                available: available.into_keys().collect(),
            });
        }
        Ok(matched)
    }

    /// Parses every claimed file and returns the merged transactions sorted by
    /// date. A file that fails to parse is logged and skipped.
    pub fn load(&self, folder: &Path) -> Result<(Vec<CanonicalTransaction>, LoadReport), PipelineError> {
        let files = self.discover(folder)?;
        tracing::info!(count = files.len(), folder = %folder.display(), "processing registered CSV files");

        let mut report = LoadReport::default();
        let mut all = Vec::new();
        for (path, profile) in files {
            let name = profile.file_name.clone();
            match profile.parse_file(&path) {
                Ok(txs) => {
                    tracing::info!(file = %name, format = %profile.format, count = txs.len(), "parsed transactions");
                    report.parsed.push((name, txs.len()));
                    all.extend(txs);
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "skipping file");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        if all.is_empty() {
            return Err(PipelineError::NoData);
        }

        // Stable, so same-day rows keep file order.
        all.sort_by_key(|tx| tx.date);
        Ok((all, report))
    }

    /// Normalizes and categorizes already-loaded transactions, in order.
    pub fn enrich<O: ClassificationOracle>(
        transactions: Vec<CanonicalTransaction>,
        classifier: &mut CategoryClassifier<O>,
    ) -> Vec<EnrichedTransaction> {
        transactions
            .into_iter()
            .map(|tx| {
                let description = merchant::normalize(&tx.raw_description);
                let category = classifier.categorize(&description, tx.amount);
                EnrichedTransaction::enrich(tx, description, category)
            })
            .collect()
    }

    pub fn run<O: ClassificationOracle>(
        &self,
        folder: &Path,
        classifier: &mut CategoryClassifier<O>,
    ) -> Result<Vec<EnrichedTransaction>, PipelineError> {
        let (transactions, _) = self.load(folder)?;
        let enriched = Self::enrich(transactions, classifier);
        tracing::info!(count = enriched.len(), learned = classifier.learned(), "categorized transactions");
        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::AcceptDefault;
    use crate::rules::RuleSet;
    use chrono::NaiveDate;
    use std::fs;
    use tally_core::{Money, SourceFormat};

    const CITI: &str = "Year to date.CSV";
    const SMARTLY: &str = "Credit Card - 1604_01-01-2025_08-29-2025.csv";
    const COSTCO: &str = "costco_transactions.csv";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::default();
        let result = pipeline.discover(&dir.path().join("absent"));
        assert!(matches!(result, Err(PipelineError::MissingFolder(_))));
    }

    #[test]
    fn no_registered_files_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("random.csv"), "a,b\n1,2\n").unwrap();
        match Pipeline::default().discover(dir.path()) {
            Err(PipelineError::NoMatchingFiles { available, .. }) => {
                assert_eq!(available, ["random.csv"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn discover_ignores_unregistered_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(COSTCO), "date,barcode,description,amount\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        let pipeline = Pipeline::default();
        let files = pipeline.discover(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1.format, SourceFormat::Costco);
    }

    #[test]
    fn broken_file_is_skipped_others_processed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CITI), "Date,Memo\n03/01/2025,x\n").unwrap();
        fs::write(
            dir.path().join(SMARTLY),
            "Date,Name,Amount\n01/09/2025,STARBUCKS #1234 SEATTLE WA,-5.75\n",
        )
        .unwrap();

        let (txs, report) = Pipeline::default().load(dir.path()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(report.parsed, [(SMARTLY.to_string(), 1)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, CITI);
    }

    #[test]
    fn all_files_failing_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CITI), "Date,Memo\n03/01/2025,x\n").unwrap();
        let result = Pipeline::default().load(dir.path());
        assert!(matches!(result, Err(PipelineError::NoData)));
    }

    #[test]
    fn everything_skipped_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SMARTLY),
            "Date,Name,Amount\n01/09/2025,COSTCO WHSE #0001,-150.00\n",
        )
        .unwrap();
        let result = Pipeline::default().load(dir.path());
        assert!(matches!(result, Err(PipelineError::NoData)));
    }

    #[test]
    fn merged_rows_sorted_by_date() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CITI),
            "Date,Description,Debit,Credit\n03/05/2025,SAFEWAY 1234,40.00,\n01/15/2025,QFC #5812,12.00,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(COSTCO),
            "date,barcode,description,amount\n2025-02-11,2113,KS PAPER TOWEL,22.99\n",
        )
        .unwrap();

        let (txs, _) = Pipeline::default().load(dir.path()).unwrap();
        let dates: Vec<NaiveDate> = txs.iter().map(|t| t.date).collect();
        assert_eq!(dates, [date(2025, 1, 15), date(2025, 2, 11), date(2025, 3, 5)]);
    }

    #[test]
    fn run_enriches_in_date_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CITI),
            "Date,Description,Debit,Credit\n03/01/2025,TST* Dough Zone 2xxx,32.50,\n02/01/2025,AMAZON MKTPL*AB12,19.99,\n",
        )
        .unwrap();

        let rules = RuleSet::new("Other")
            .with_category("Food", ["dough zone"])
            .with_category("Shopping", ["amazon"]);
        let mut classifier = CategoryClassifier::new(rules, AcceptDefault);
        let enriched = Pipeline::default().run(dir.path(), &mut classifier).unwrap();

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].description, "AMAZON");
        assert_eq!(enriched[0].category, "Shopping");
        assert_eq!(enriched[0].year_month(), "2025-02");
        assert_eq!(enriched[1].raw_description, "TST* Dough Zone 2xxx");
        assert_eq!(enriched[1].description, "Dough Zone");
        assert_eq!(enriched[1].amount, Money::from_cents(3250));
        assert_eq!(enriched[1].category, "Food");
        assert_eq!(enriched[1].year_month(), "2025-03");
    }
}
