use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tally_core::Money;

use crate::oracle::{ClassificationOracle, Decision, DEFAULT_CHOICES};
use crate::rules::{learned_keyword, RuleSet};

/// Fixed category for large purchases from one tagged source, applied before
/// any keyword rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighValueOverride {
    /// Lower-case prefix the merchant name must start with.
    pub source_tag: String,
    /// Amounts strictly above this trigger the override.
    pub threshold: Money,
    pub category: String,
}

impl Default for HighValueOverride {
    fn default() -> Self {
        Self {
            source_tag: "costco-".to_string(),
            threshold: Money::from_cents(100_00),
            category: "Shopping".to_string(),
        }
    }
}

impl HighValueOverride {
    pub fn applies(&self, merchant: &str, amount: Money) -> bool {
        !self.source_tag.is_empty()
            && merchant.to_lowercase().starts_with(&self.source_tag.to_lowercase())
            && amount > self.threshold
    }
}

/// Assigns categories from a [`RuleSet`], asking an oracle about merchants no
/// rule covers and remembering the answer as a new keyword.
pub struct CategoryClassifier<O: ClassificationOracle> {
    rules: RuleSet,
    store: Option<PathBuf>,
    oracle: O,
    choices: Vec<String>,
    high_value: Option<HighValueOverride>,
    learned: usize,
}

impl<O: ClassificationOracle> CategoryClassifier<O> {
    /// In-memory classifier with the default choices and override.
    pub fn new(rules: RuleSet, oracle: O) -> Self {
        Self {
            rules,
            store: None,
            oracle,
            choices: DEFAULT_CHOICES.iter().map(|c| c.to_string()).collect(),
            high_value: Some(HighValueOverride::default()),
            learned: 0,
        }
    }

    /// Persist the rule set to `path` after every learned keyword.
    pub fn with_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = Some(path.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_high_value_override(mut self, high_value: Option<HighValueOverride>) -> Self {
        self.high_value = high_value;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Keywords learned since construction.
    pub fn learned(&self) -> usize {
        self.learned
    }

    /// Category from the override or the keyword rules alone, without side effects.
    pub fn match_rules(&self, merchant: &str, amount: Money) -> Option<&str> {
        if let Some(high_value) = &self.high_value {
            if high_value.applies(merchant, amount) {
                return Some(high_value.category.as_str());
            }
        }
        self.rules.find_category(merchant)
    }

    /// Category for `merchant`. On a miss the oracle decides; a selection is
    /// learned and persisted before returning, a cancellation yields the
    /// default category.
    pub fn categorize(&mut self, merchant: &str, amount: Money) -> String {
        if let Some(category) = self.match_rules(merchant, amount) {
            return category.to_string();
        }

        match self.oracle.resolve(merchant, amount, &self.choices) {
            Decision::Selected(category) if !category.trim().is_empty() => {
                self.learn(merchant, &category);
                category
            }
            Decision::Selected(_) => {
                tracing::warn!(merchant, "blank category selected, using default");
                self.rules.default_category().to_string()
            }
            Decision::Cancelled => {
                tracing::info!(merchant, "no category chosen, using default");
                self.rules.default_category().to_string()
            }
        }
    }

    /// Remembers a keyword derived from `merchant` under `category` and
    /// persists the rule set when it changed. A failed write is logged and
    /// the in-memory rule is kept.
    pub fn learn(&mut self, merchant: &str, category: &str) -> Option<String> {
        if category.trim().is_empty() {
            return None;
        }
        let keyword = learned_keyword(merchant);
        if !self.rules.add_keyword(category, keyword.clone()) {
            return None;
        }
        self.learned += 1;
        tracing::info!(%keyword, category, "learned categorization keyword");

        if let Some(path) = &self.store {
            match self.rules.save(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "rule store updated"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to persist rule store")
                }
            }
        }
        Some(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{AcceptDefault, ScriptedOracle};

    fn rules() -> RuleSet {
        RuleSet::new("Other")
            .with_category("Food", ["starbucks", "dough zone"])
            .with_category("Shopping", ["amazon"])
            .with_category("Other", Vec::<String>::new())
    }

    fn usd(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    // ── rule path ─────────────────────────────────────────────────────────────

    #[test]
    fn rule_match_does_not_ask_oracle() {
        let mut classifier = CategoryClassifier::new(rules(), ScriptedOracle::selecting(["Travel"]));
        assert_eq!(classifier.categorize("STARBUCKS", usd(575)), "Food");
        assert_eq!(classifier.categorize("STARBUCKS", usd(575)), "Food");
        assert!(classifier.oracle().asked.is_empty());
        assert_eq!(classifier.rules(), &rules());
    }

    #[test]
    fn high_value_source_tag_overrides_rules() {
        let rules = rules().with_category("Groceries", ["costco"]);
        let mut classifier = CategoryClassifier::new(rules, AcceptDefault);
        assert_eq!(classifier.categorize("Costco-Kirkland Tv", usd(499_99)), "Shopping");
        assert_eq!(classifier.categorize("Costco-Ks Paper", usd(22_99)), "Groceries");
    }

    #[test]
    fn high_value_threshold_is_strict() {
        let high_value = HighValueOverride::default();
        assert!(!high_value.applies("Costco-Eggs", usd(100_00)));
        assert!(high_value.applies("Costco-Eggs", usd(100_01)));
        assert!(!high_value.applies("Eggs Costco-", usd(500_00)));
    }

    #[test]
    fn override_can_be_disabled() {
        let mut classifier =
            CategoryClassifier::new(rules(), AcceptDefault).with_high_value_override(None);
        assert_eq!(classifier.categorize("Costco-Kirkland Tv", usd(499_99)), "Other");
    }

    // ── learning path ─────────────────────────────────────────────────────────

    #[test]
    fn unmatched_merchant_learns_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        rules().save(&path).unwrap();

        let mut classifier = CategoryClassifier::new(rules(), ScriptedOracle::selecting(["Shopping"]))
            .with_store(&path);

        assert_eq!(classifier.categorize("Blue Bottle", usd(650)), "Shopping");
        assert_eq!(classifier.learned(), 1);

        let on_disk = RuleSet::load(&path).unwrap();
        assert_eq!(on_disk.keywords("Shopping").unwrap(), ["amazon", "blue bottle"]);
        assert_eq!(&on_disk, classifier.rules());

        // Second identical transaction is covered by the learned rule.
        assert_eq!(classifier.categorize("Blue Bottle", usd(650)), "Shopping");
        assert_eq!(classifier.oracle().asked.len(), 1);
    }

    #[test]
    fn cancelled_prompt_uses_default_without_mutation() {
        let mut classifier = CategoryClassifier::new(rules(), AcceptDefault);
        assert_eq!(classifier.categorize("Blue Bottle", usd(650)), "Other");
        assert_eq!(classifier.rules(), &rules());
        assert_eq!(classifier.learned(), 0);
    }

    #[test]
    fn blank_selection_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        let mut classifier = CategoryClassifier::new(rules(), ScriptedOracle::selecting(["", "  "]))
            .with_store(&path);

        assert_eq!(classifier.categorize("Blue Bottle", usd(650)), "Other");
        assert_eq!(classifier.categorize("Blue Bottle", usd(650)), "Other");
        assert_eq!(classifier.rules(), &rules());
        assert_eq!(classifier.learned(), 0);
        assert!(!path.exists());
        assert_eq!(classifier.learn("Blue Bottle", ""), None);
    }

    #[test]
    fn selection_of_unknown_category_appends_it() {
        let mut classifier = CategoryClassifier::new(rules(), ScriptedOracle::selecting(["Healthcare"]));
        assert_eq!(classifier.categorize("Zoom Dental", usd(120_00)), "Healthcare");
        let names: Vec<&str> = classifier.rules().categories().map(|(n, _)| n).collect();
        assert_eq!(names, ["Food", "Shopping", "Other", "Healthcare"]);
    }

    #[test]
    fn learning_same_keyword_twice_is_noop() {
        let mut classifier = CategoryClassifier::new(rules(), AcceptDefault);
        assert_eq!(classifier.learn("Blue Bottle", "Food").as_deref(), Some("blue bottle"));
        let snapshot = classifier.rules().clone();
        assert_eq!(classifier.learn("Blue Bottle", "Food"), None);
        assert_eq!(classifier.rules(), &snapshot);
        assert_eq!(classifier.learned(), 1);
    }

    #[test]
    fn persistence_failure_keeps_learned_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("rules.toml");
        let mut classifier = CategoryClassifier::new(rules(), ScriptedOracle::selecting(["Travel"]))
            .with_store(&path);

        assert_eq!(classifier.categorize("Alaska Air", usd(230_00)), "Travel");
        assert!(!path.exists());
        assert_eq!(classifier.categorize("Alaska Air", usd(230_00)), "Travel");
        assert_eq!(classifier.oracle().asked.len(), 1);
    }

    #[test]
    fn deterministic_for_fixed_rules() {
        let classifier = CategoryClassifier::new(rules(), AcceptDefault);
        for (merchant, cents) in [("STARBUCKS", 575), ("AMAZON", 2_000), ("Dough Zone", 3_250)] {
            assert_eq!(
                classifier.match_rules(merchant, usd(cents)),
                classifier.match_rules(merchant, usd(cents))
            );
        }
    }
}
