// PaperLens Data Models
// Review pipeline value types shared by services, exports and the CLI

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============ Sections ============

/// Logical section of a paper. Declaration order is the traversal order used
/// when sentences are accumulated across sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionName {
    Abstract,
    Introduction,
    Methodology,
    Results,
    Conclusion,
}

impl SectionName {
    pub const ALL: [SectionName; 5] = [
        SectionName::Abstract,
        SectionName::Introduction,
        SectionName::Methodology,
        SectionName::Results,
        SectionName::Conclusion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::Abstract => "abstract",
            SectionName::Introduction => "introduction",
            SectionName::Methodology => "methodology",
            SectionName::Results => "results",
            SectionName::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: SectionName,
    pub raw_text: String,
}

/// All five sections of one document, always present and always in traversal order.
/// Unmatched sections hold an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSections {
    sections: Vec<Section>,
}

impl Default for DocumentSections {
    fn default() -> Self {
        Self {
            sections: SectionName::ALL
                .iter()
                .map(|name| Section {
                    name: *name,
                    raw_text: String::new(),
                })
                .collect(),
        }
    }
}

impl DocumentSections {
    pub fn set(&mut self, name: SectionName, text: impl Into<String>) {
        if let Some(section) = self.sections.iter_mut().find(|s| s.name == name) {
            section.raw_text = text.into();
        }
    }

    pub fn get(&self, name: SectionName) -> &str {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.raw_text.as_str())
            .unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn matched_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| !s.raw_text.trim().is_empty())
            .count()
    }
}

// ============ Sentences & Feedback ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub text: String,
    pub section: SectionName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Strength,
    Weakness,
    Improvement,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 3] = [
        FeedbackCategory::Strength,
        FeedbackCategory::Weakness,
        FeedbackCategory::Improvement,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FeedbackCategory::Strength => "Strength",
            FeedbackCategory::Weakness => "Weakness",
            FeedbackCategory::Improvement => "Improvement",
        }
    }
}

/// Output of the heuristic classifier. Each list is an order-preserving
/// subsequence of the extracted sentences and no sentence appears twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedFeedback {
    pub strengths: Vec<Sentence>,
    pub weaknesses: Vec<Sentence>,
    pub improvements: Vec<Sentence>,
}

impl ClassifiedFeedback {
    pub fn push(&mut self, category: FeedbackCategory, sentence: Sentence) {
        match category {
            FeedbackCategory::Strength => self.strengths.push(sentence),
            FeedbackCategory::Weakness => self.weaknesses.push(sentence),
            FeedbackCategory::Improvement => self.improvements.push(sentence),
        }
    }

    pub fn list(&self, category: FeedbackCategory) -> &[Sentence] {
        match category {
            FeedbackCategory::Strength => &self.strengths,
            FeedbackCategory::Weakness => &self.weaknesses,
            FeedbackCategory::Improvement => &self.improvements,
        }
    }

    pub fn texts(&self, category: FeedbackCategory) -> Vec<String> {
        self.list(category).iter().map(|s| s.text.clone()).collect()
    }

    pub fn total(&self) -> usize {
        self.strengths.len() + self.weaknesses.len() + self.improvements.len()
    }
}

// ============ Scoring ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accept,
    WeakAccept,
    Reject,
    RejectPlagiarism,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::WeakAccept => "WEAK ACCEPT",
            Verdict::Reject => "REJECT",
            Verdict::RejectPlagiarism => "REJECT (PLAGIARISM)",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub raw_score: f64,
    pub confidence: f64,
    pub verdict: Verdict,
}

// ============ Plagiarism ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlagiarismRisk {
    Low,
    Medium,
    High,
    Unavailable,
}

impl PlagiarismRisk {
    /// Parse an oracle risk label. Unknown labels map to `Unavailable`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "LOW" => Self::Low,
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            _ => Self::Unavailable,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlagiarismRisk::Low => "LOW",
            PlagiarismRisk::Medium => "MEDIUM",
            PlagiarismRisk::High => "HIGH",
            PlagiarismRisk::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Where a plagiarism reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlagiarismSource {
    Oracle,
    Simulated,
    Unavailable,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismResult {
    pub percent: u8,
    pub originality: u8,
    pub risk: PlagiarismRisk,
    pub source: PlagiarismSource,
}

impl PlagiarismResult {
    pub fn unavailable() -> Self {
        Self {
            percent: 0,
            originality: 100,
            risk: PlagiarismRisk::Unavailable,
            source: PlagiarismSource::Unavailable,
        }
    }

    pub fn skipped() -> Self {
        Self {
            source: PlagiarismSource::Skipped,
            ..Self::unavailable()
        }
    }
}

// ============ Enrichment ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionCritique {
    pub summary: String,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Quality score, 1-10.
    pub score: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methodology: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Folded in from the methodology section critique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methodology_section_score: Option<u8>,
    /// Folded in from the results section critique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_section_score: Option<u8>,
}

impl Scorecard {
    pub fn is_empty(&self) -> bool {
        self.originality.is_none()
            && self.methodology.is_none()
            && self.clarity.is_none()
            && self.significance.is_none()
            && self.recommendation.is_none()
            && self.reason.is_none()
            && self.methodology_section_score.is_none()
            && self.results_section_score.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub rewritten_strengths: Vec<String>,
    pub rewritten_weaknesses: Vec<String>,
    pub rewritten_improvements: Vec<String>,
    #[serde(default)]
    pub section_critiques: BTreeMap<SectionName, SectionCritique>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorecard: Option<Scorecard>,
}

impl EnrichmentResult {
    pub fn rewritten(&self, category: FeedbackCategory) -> &[String] {
        match category {
            FeedbackCategory::Strength => &self.rewritten_strengths,
            FeedbackCategory::Weakness => &self.rewritten_weaknesses,
            FeedbackCategory::Improvement => &self.rewritten_improvements,
        }
    }
}

// ============ Review Request / Result ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOptions {
    #[serde(default = "default_true")]
    pub enrich: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_true")]
    pub check_plagiarism: bool,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            enrich: true,
            model: default_model(),
            check_plagiarism: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMeta {
    pub request_id: String,
    pub generated_at: String,
    pub runtime_ms: i64,
    pub enriched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub sentence_counts: BTreeMap<SectionName, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub score: ScoreResult,
    pub plagiarism: PlagiarismResult,
    #[serde(flatten)]
    pub feedback: ClassifiedFeedback,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentResult>,
    pub report: String,
    pub meta: ReviewMeta,
}

impl ReviewResult {
    pub fn verdict(&self) -> Verdict {
        self.score.verdict
    }

    /// Rewritten texts for a category when enrichment ran, originals otherwise.
    pub fn rewritten(&self, category: FeedbackCategory) -> Vec<String> {
        match &self.enrichment {
            Some(enrichment) => enrichment.rewritten(category).to_vec(),
            None => self.feedback.texts(category),
        }
    }
}

// ============ Default Value Functions ============

pub const DEFAULT_MODEL: &str = "llama3.1:8b";

fn default_true() -> bool { true }
fn default_model() -> String { DEFAULT_MODEL.to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_sections_default_has_all_names_in_order() {
        let sections = DocumentSections::default();
        let names: Vec<SectionName> = sections.iter().map(|s| s.name).collect();
        assert_eq!(names, SectionName::ALL.to_vec());
        assert_eq!(sections.get(SectionName::Results), "");
        assert_eq!(sections.matched_count(), 0);
    }

    #[test]
    fn test_risk_from_label() {
        assert_eq!(PlagiarismRisk::from_label("high"), PlagiarismRisk::High);
        assert_eq!(PlagiarismRisk::from_label(" Medium "), PlagiarismRisk::Medium);
        assert_eq!(PlagiarismRisk::from_label("MISSING_LIB"), PlagiarismRisk::Unavailable);
    }

    #[test]
    fn test_review_result_serializes_section_keys_and_verdict() {
        let mut counts = BTreeMap::new();
        counts.insert(SectionName::Abstract, 2);
        let result = ReviewResult {
            score: ScoreResult {
                raw_score: 1.0,
                confidence: 0.55,
                verdict: Verdict::WeakAccept,
            },
            plagiarism: PlagiarismResult::unavailable(),
            feedback: ClassifiedFeedback::default(),
            enrichment: None,
            report: String::new(),
            meta: ReviewMeta {
                request_id: "r1".to_string(),
                generated_at: "now".to_string(),
                runtime_ms: 3,
                enriched: false,
                model: None,
                sentence_counts: counts,
            },
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["score"]["verdict"], "WEAK_ACCEPT");
        assert_eq!(json["plagiarism"]["risk"], "UNAVAILABLE");
        assert_eq!(json["meta"]["sentenceCounts"]["abstract"], 2);
        assert!(json["strengths"].as_array().unwrap().is_empty());
        assert!(json.get("enrichment").is_none());
    }
}
