// Sentence Extractor
// Candidate sentences per section, with short/noise fragments filtered out

use crate::models::{DocumentSections, Sentence};
use crate::services::sentence_segmenter::SentenceBoundaryDetector;

/// Sentences must be strictly longer than this after trimming (Unicode scalar count).
pub const MIN_SENTENCE_CHARS: usize = 15;

pub fn is_candidate(sentence: &str) -> bool {
    sentence.trim().chars().count() > MIN_SENTENCE_CHARS
}

/// Ordered candidate sentences of one section. Empty input yields an empty list.
pub async fn extract_sentences(
    detector: &dyn SentenceBoundaryDetector,
    section_text: &str,
) -> Vec<String> {
    if section_text.trim().is_empty() {
        return Vec::new();
    }
    detector
        .segment(section_text)
        .await
        .into_iter()
        .filter(|s| is_candidate(s))
        .map(|s| s.trim().to_string())
        .collect()
}

/// Candidate sentences across all sections, in section traversal order.
pub async fn extract_document_sentences(
    detector: &dyn SentenceBoundaryDetector,
    sections: &DocumentSections,
) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    for section in sections.iter() {
        for text in extract_sentences(detector, &section.raw_text).await {
            sentences.push(Sentence {
                text,
                section: section.name,
            });
        }
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionName;
    use crate::services::review::classifier::HeuristicClassifier;
    use crate::services::sentence_segmenter::RuleSentenceSplitter;

    #[test]
    fn test_length_boundary() {
        assert!(!is_candidate("exactly 15 char"));
        assert!(is_candidate("exactly 16 chars"));
        assert!(!is_candidate("   padded short   "));
        // 16 scalars, more bytes
        assert!(is_candidate("éééééééééééééééé"));
    }

    #[tokio::test]
    async fn test_extract_filters_short_fragments() {
        let sentences = extract_sentences(
            &RuleSentenceSplitter,
            "Too short. This sentence is definitely long enough.",
        )
        .await;
        assert_eq!(sentences, vec!["This sentence is definitely long enough."]);
    }

    #[tokio::test]
    async fn test_inch_mark_does_not_merge_feedback() {
        let text = "Samples were cut to 5\" wide strips for testing. Our method outperforms all baselines. We evaluate on a small dataset only.";
        let texts = extract_sentences(&RuleSentenceSplitter, text).await;
        assert_eq!(texts.len(), 3);

        let sentences: Vec<Sentence> = texts
            .into_iter()
            .map(|text| Sentence {
                text,
                section: SectionName::Methodology,
            })
            .collect();
        let feedback = HeuristicClassifier::default().classify(&sentences);
        assert_eq!(feedback.strengths.len(), 1);
        assert_eq!(feedback.weaknesses.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_empty_section() {
        assert!(extract_sentences(&RuleSentenceSplitter, "").await.is_empty());
    }

    #[tokio::test]
    async fn test_document_order_follows_sections() {
        let mut sections = DocumentSections::default();
        sections.set(SectionName::Results, "Results show strong results overall.");
        sections.set(SectionName::Abstract, "Abstract text describing the work.");

        let sentences = extract_document_sentences(&RuleSentenceSplitter, &sections).await;
        let order: Vec<SectionName> = sentences.iter().map(|s| s.section).collect();
        assert_eq!(order, vec![SectionName::Abstract, SectionName::Results]);
    }
}
