// Heuristic Classifier
// Keyword-set membership labelling: strength, then weakness, then improvement

use serde::{Deserialize, Serialize};

use crate::models::{ClassifiedFeedback, FeedbackCategory, Sentence};

const STRENGTH_KEYWORDS: &[&str] = &[
    "outperforms",
    "significant improvement",
    "robust",
    "effective",
    "state-of-the-art",
    "novel approach",
    "high accuracy",
    "consistent performance",
    "experimentally validated",
    "strong results",
    "superior performance",
];

const WEAKNESS_KEYWORDS: &[&str] = &[
    "small dataset",
    "limited dataset",
    "lacks validation",
    "not compared",
    "no comparison",
    "unclear",
    "insufficient",
    "poor performance",
    "overfitting",
    "lack of generalization",
    "limited scope",
    "not statistically significant",
];

const IMPROVEMENT_KEYWORDS: &[&str] = &[
    "future work",
    "can be improved",
    "should consider",
    "can be extended",
    "requires further study",
    "needs improvement",
    "can be optimized",
    "future extension",
    "should be explored",
];

/// The three keyword sets. Loaded from config, defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSets {
    pub strength: Vec<String>,
    pub weakness: Vec<String>,
    pub improvement: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            strength: owned(STRENGTH_KEYWORDS),
            weakness: owned(WEAKNESS_KEYWORDS),
            improvement: owned(IMPROVEMENT_KEYWORDS),
        }
    }
}

/// Loose substring classifier. No tokenization, so "not robust" still reads as a strength.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    // (category, lower-cased keywords) in priority order
    rules: Vec<(FeedbackCategory, Vec<String>)>,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(&KeywordSets::default())
    }
}

impl HeuristicClassifier {
    pub fn new(keywords: &KeywordSets) -> Self {
        let lower = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            rules: vec![
                (FeedbackCategory::Strength, lower(&keywords.strength)),
                (FeedbackCategory::Weakness, lower(&keywords.weakness)),
                (FeedbackCategory::Improvement, lower(&keywords.improvement)),
            ],
        }
    }

    pub fn classify_sentence(&self, text: &str) -> Option<FeedbackCategory> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, words)| words.iter().any(|w| lowered.contains(w.as_str())))
            .map(|(category, _)| *category)
    }

    /// Order-preserving, pairwise disjoint split. Unmatched sentences are dropped.
    pub fn classify(&self, sentences: &[Sentence]) -> ClassifiedFeedback {
        let mut feedback = ClassifiedFeedback::default();
        for sentence in sentences {
            if let Some(category) = self.classify_sentence(&sentence.text) {
                feedback.push(category, sentence.clone());
            }
        }
        feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionName;
    use crate::services::text_processor::normalize_extracted_text;

    fn sentence(text: &str) -> Sentence {
        Sentence {
            text: text.to_string(),
            section: SectionName::Results,
        }
    }

    #[test]
    fn test_default_set_sizes() {
        let sets = KeywordSets::default();
        assert_eq!(sets.strength.len(), 11);
        assert_eq!(sets.weakness.len(), 12);
        assert_eq!(sets.improvement.len(), 9);
    }

    #[test]
    fn test_priority_order() {
        let classifier = HeuristicClassifier::default();
        assert_eq!(
            classifier.classify_sentence("The method is ROBUST but uses a small dataset."),
            Some(FeedbackCategory::Strength)
        );
        assert_eq!(
            classifier.classify_sentence("Overfitting is left for future work."),
            Some(FeedbackCategory::Weakness)
        );
        assert_eq!(
            classifier.classify_sentence("This should be explored further."),
            Some(FeedbackCategory::Improvement)
        );
        assert_eq!(classifier.classify_sentence("Nothing to see in this line."), None);
    }

    #[test]
    fn test_loose_matching_false_positive() {
        let classifier = HeuristicClassifier::default();
        assert_eq!(
            classifier.classify_sentence("The model is not robust to noise."),
            Some(FeedbackCategory::Strength)
        );
    }

    #[test]
    fn test_line_broken_compound_keyword_still_matches() {
        let text = normalize_extracted_text("Our model achieves state-of-the-\nart accuracy on every benchmark.");
        assert_eq!(
            HeuristicClassifier::default().classify_sentence(&text),
            Some(FeedbackCategory::Strength)
        );
    }

    #[test]
    fn test_classify_is_disjoint_and_order_preserving() {
        let classifier = HeuristicClassifier::default();
        let sentences = vec![
            sentence("Our approach outperforms prior baselines."),
            sentence("Evaluation uses a limited dataset only."),
            sentence("Neutral description of the setup."),
            sentence("An effective and fast training scheme."),
            sentence("The pipeline can be optimized further."),
        ];
        let feedback = classifier.classify(&sentences);

        assert_eq!(
            feedback.texts(FeedbackCategory::Strength),
            vec![
                "Our approach outperforms prior baselines.",
                "An effective and fast training scheme."
            ]
        );
        assert_eq!(feedback.weaknesses.len(), 1);
        assert_eq!(feedback.improvements.len(), 1);
        assert_eq!(feedback.total(), 4);
    }

    #[test]
    fn test_injected_keywords() {
        let sets = KeywordSets {
            strength: vec!["Elegant".to_string()],
            weakness: vec![],
            improvement: vec![],
        };
        let classifier = HeuristicClassifier::new(&sets);
        assert_eq!(
            classifier.classify_sentence("An elegant proof of the bound."),
            Some(FeedbackCategory::Strength)
        );
        assert_eq!(classifier.classify_sentence("It outperforms everything."), None);
    }
}
