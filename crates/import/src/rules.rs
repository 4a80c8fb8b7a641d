use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::util::PROCESSOR_PREFIXES;

const FALLBACK_CATEGORY: &str = "Other";

const KEYWORD_STOP_WORDS: &[&str] = &["inc", "llc", "com", "www", "phone", "number"];

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse rule store: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize rule store: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Keyword rules keyed by category. Category order is significant: the first
/// category with a matching keyword wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default = "fallback_category")]
    default_category: String,
    #[serde(default, with = "ordered_categories")]
    categories: Vec<(String, Vec<String>)>,
}

fn fallback_category() -> String {
    FALLBACK_CATEGORY.to_string()
}

impl RuleSet {
    pub fn new(default_category: impl Into<String>) -> Self {
        let mut rules = Self {
            default_category: default_category.into(),
            categories: Vec::new(),
        };
        rules.normalize();
        rules
    }

    /// Rules used when no store exists yet.
    pub fn starter() -> Self {
        Self::new(FALLBACK_CATEGORY)
            .with_category("Food", ["restaurant", "cafe", "food"])
            .with_category("Transportation", ["uber", "lyft", "gas", "parking"])
            .with_category("Shopping", ["amazon", "store"])
            .with_category(FALLBACK_CATEGORY, Vec::<String>::new())
    }

    /// Rules used when the store exists but cannot be read.
    pub fn minimal() -> Self {
        Self::new(FALLBACK_CATEGORY).with_category(FALLBACK_CATEGORY, Vec::<String>::new())
    }

    /// Appends `keywords` to `category`, creating it at the end when absent.
    pub fn with_category<I, S>(mut self, category: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_category(category);
        for keyword in keywords {
            self.add_keyword(category, keyword);
        }
        self
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(name, keywords)| (name.as_str(), keywords.as_slice()))
    }

    pub fn keywords(&self, category: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, keywords)| keywords.as_slice())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// First category, in stored order, with a keyword that is a
    /// case-insensitive substring of `text`.
    pub fn find_category(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.categories
            .iter()
            .find(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
            })
            .map(|(name, _)| name.as_str())
    }

    /// Appends `keyword` to `category` unless already present. Returns
    /// whether the rule set changed.
    pub fn add_keyword(&mut self, category: &str, keyword: impl Into<String>) -> bool {
        let keyword = keyword.into();
        if keyword.trim().is_empty() || category.trim().is_empty() {
            return false;
        }
        let idx = self.ensure_category(category);
        let keywords = &mut self.categories[idx].1;
        if keywords.contains(&keyword) {
            return false;
        }
        keywords.push(keyword);
        true
    }

    fn ensure_category(&mut self, category: &str) -> usize {
        match self.categories.iter().position(|(name, _)| name == category) {
            Some(idx) => idx,
            None => {
                self.categories.push((category.to_string(), Vec::new()));
                self.categories.len() - 1
            }
        }
    }

    /// Drops duplicate and blank keywords (keeping first occurrences) and
    /// repairs a blank default category.
    fn normalize(&mut self) {
        if self.default_category.trim().is_empty() {
            self.default_category = fallback_category();
        }
        for (_, keywords) in &mut self.categories {
            let mut seen = Vec::with_capacity(keywords.len());
            keywords.retain(|k| {
                if k.trim().is_empty() || seen.contains(k) {
                    false
                } else {
                    seen.push(k.clone());
                    true
                }
            });
        }
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RulesError> {
        let mut rules: RuleSet = toml::from_str(toml_content)?;
        rules.normalize();
        Ok(rules)
    }

    pub fn to_toml(&self) -> Result<String, RulesError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Loads the store at `path`. A missing store yields [`RuleSet::starter`];
    /// an unreadable one yields [`RuleSet::minimal`].
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(rules) => {
                tracing::info!(path = %path.display(), categories = rules.len(), "loaded categorization rules");
                rules
            }
            Err(RulesError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "rule store not found, using starter rules");
                Self::starter()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "rule store unreadable, using minimal rules");
                Self::minimal()
            }
        }
    }

    /// Rewrites the whole store. The new content goes to a sibling temp file
    /// first and is renamed over `path`, so readers never see a partial file.
    pub fn save(&self, path: &Path) -> Result<(), RulesError> {
        let content = self.to_toml()?;
        let tmp = path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Derives the keyword to remember for an unmatched merchant: processor
/// prefix removed, up to two meaningful words from the first three, lower-cased.
/// The result is always a substring of the lower-cased merchant.
pub fn learned_keyword(merchant: &str) -> String {
    let mut cleaned = merchant;
    for prefix in PROCESSOR_PREFIXES {
        let head = cleaned.get(..prefix.len());
        if head.is_some_and(|h| h.eq_ignore_ascii_case(prefix)) {
            cleaned = cleaned[prefix.len()..].trim();
            break;
        }
    }

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let meaningful: Vec<String> = words
        .iter()
        .take(3)
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .map(|w| w.to_lowercase())
        .filter(|w| !KEYWORD_STOP_WORDS.contains(&w.as_str()))
        .take(2)
        .collect();

    if let Some(first) = meaningful.first() {
        let joined = meaningful.join(" ");
        // Words separated by a skipped token would never match again.
        return if cleaned.to_lowercase().contains(&joined) {
            joined
        } else {
            first.clone()
        };
    }

    match words.first() {
        Some(first) => first.to_lowercase(),
        None => merchant.to_lowercase().chars().take(10).collect(),
    }
}

/// Serializes `Vec<(name, keywords)>` as a map in stored order.
mod ordered_categories {
    use super::*;

    pub fn serialize<S: Serializer>(
        categories: &[(String, Vec<String>)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for (name, keywords) in categories {
            map.serialize_entry(name, keywords)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, Vec<String>)>, D::Error> {
        deserializer.deserialize_map(OrderedVisitor)
    }

    struct OrderedVisitor;

    impl<'de> Visitor<'de> for OrderedVisitor {
        type Value = Vec<(String, Vec<String>)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of category names to keyword lists")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut categories: Vec<(String, Vec<String>)> = Vec::new();
            while let Some((name, keywords)) = access.next_entry::<String, Vec<String>>()? {
                match categories.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, existing)) => existing.extend(keywords),
                    None => categories.push((name, keywords)),
                }
            }
            Ok(categories)
        }
    }
}
