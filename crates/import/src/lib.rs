pub mod classifier;
pub mod merchant;
pub mod oracle;
pub mod pipeline;
pub mod receipts;
pub mod rules;
pub mod source;
pub(crate) mod util;

pub use classifier::{CategoryClassifier, HighValueOverride};
pub use merchant::normalize;
pub use oracle::{
    AcceptDefault, ClassificationOracle, Decision, LineInput, PromptEvent, PromptInput,
    PromptOracle, ScriptedOracle, DEFAULT_CHOICES,
};
pub use pipeline::{LoadReport, Pipeline, PipelineError};
pub use receipts::{append_receipt_lines, ReceiptError, ReceiptLine, RECEIPTS_FILE_NAME};
pub use rules::{learned_keyword, RuleSet, RulesError};
pub use source::{AmountColumns, SourceError, SourceProfile};

pub mod import {
    use crate::*;
    use std::path::Path;
    use tally_core::EnrichedTransaction;

    pub fn load_rules(path: &Path) -> RuleSet {
        RuleSet::load_or_default(path)
    }

    /// Classifier that persists learned keywords back to `rules_path`.
    pub fn create_classifier<O: ClassificationOracle>(rules_path: &Path, oracle: O) -> CategoryClassifier<O> {
        CategoryClassifier::new(load_rules(rules_path), oracle).with_store(rules_path)
    }

    pub fn process_folder<O: ClassificationOracle>(
        folder: &Path,
        profiles: Vec<SourceProfile>,
        classifier: &mut CategoryClassifier<O>,
    ) -> Result<Vec<EnrichedTransaction>, PipelineError> {
        Pipeline::new(profiles).run(folder, classifier)
    }
}
