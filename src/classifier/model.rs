//! Toy multinomial Naive Bayes text model for severity prediction.
//!
//! Term-frequency features over lowercase alphanumeric tokens with Laplace
//! smoothing. The trained counts are persisted as JSON and reloaded on
//! startup. This is a coarse heuristic, not a calibrated model.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::bug::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    class_labels: Vec<String>,
    class_doc_counts: Vec<f64>,
    class_word_counts: Vec<BTreeMap<String, f64>>,
    class_total_words: Vec<f64>,
    vocabulary: BTreeSet<String>,
}

impl NaiveBayesModel {
    /// Train from labeled example sentences.
    pub fn train(examples: &[(&str, Severity)]) -> Self {
        let class_labels: Vec<String> = Severity::ALL
            .iter()
            .map(|tier| tier.as_str().to_string())
            .collect();
        let mut class_doc_counts = vec![0.0; class_labels.len()];
        let mut class_word_counts: Vec<BTreeMap<String, f64>> =
            vec![BTreeMap::new(); class_labels.len()];
        let mut class_total_words = vec![0.0; class_labels.len()];
        let mut vocabulary = BTreeSet::new();

        for (text, tier) in examples {
            let class = Severity::ALL
                .iter()
                .position(|t| t == tier)
                .unwrap_or_default();
            class_doc_counts[class] += 1.0;
            for token in tokenize(text) {
                *class_word_counts[class].entry(token.clone()).or_insert(0.0) += 1.0;
                class_total_words[class] += 1.0;
                vocabulary.insert(token);
            }
        }

        Self {
            class_labels,
            class_doc_counts,
            class_word_counts,
            class_total_words,
            vocabulary,
        }
    }

    /// Predict the severity tier for a message. `None` only when the model
    /// carries no training data.
    pub fn predict(&self, message: &str) -> Option<Severity> {
        let total_docs: f64 = self.class_doc_counts.iter().sum();
        if total_docs == 0.0 || self.class_labels.is_empty() {
            return None;
        }

        let tokens = tokenize(message);
        let vocab_size = self.vocabulary.len() as f64;

        let mut best: Option<(usize, f64)> = None;
        for class in 0..self.class_labels.len() {
            let docs = self.class_doc_counts[class];
            if docs == 0.0 {
                continue;
            }
            let mut score = (docs / total_docs).ln();
            for token in &tokens {
                let count = self.class_word_counts[class]
                    .get(token)
                    .copied()
                    .unwrap_or(0.0);
                score +=
                    ((count + 1.0) / (self.class_total_words[class] + vocab_size)).ln();
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((class, score));
            }
        }

        let (class, _) = best?;
        Severity::parse_label(&self.class_labels[class])
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

/// Lowercase alphanumeric tokens, everything else is a separator.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TRAINING_EXAMPLES;

    #[test]
    fn tokenizer_lowercases_and_splits() {
        assert_eq!(
            tokenize("Buffer overflow, in string-handling!"),
            vec!["buffer", "overflow", "in", "string", "handling"]
        );
        assert!(tokenize("--- ---").is_empty());
    }

    #[test]
    fn predicts_trained_tiers() {
        let model = NaiveBayesModel::train(TRAINING_EXAMPLES);
        assert_eq!(
            model.predict("Segmentation fault when accessing null pointer"),
            Some(Severity::Critical)
        );
        assert_eq!(
            model.predict("Inconsistent whitespace in indentation"),
            Some(Severity::Low)
        );
    }

    #[test]
    fn predict_is_total_for_unseen_text() {
        let model = NaiveBayesModel::train(TRAINING_EXAMPLES);
        assert!(model.predict("completely unrelated gibberish zzzz").is_some());
        assert!(model.predict("").is_some());
    }

    #[test]
    fn untrained_model_predicts_nothing() {
        let model = NaiveBayesModel::train(&[]);
        assert_eq!(model.predict("anything"), None);
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = NaiveBayesModel::train(TRAINING_EXAMPLES);
        model.save(&path).unwrap();

        let reloaded = NaiveBayesModel::load(&path).unwrap();
        assert_eq!(
            reloaded.predict("Memory leak in allocation routine"),
            model.predict("Memory leak in allocation routine")
        );
    }
}
