// Section Segmenter
// Splits raw paper text into the five named sections via boundary markers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::{DocumentSections, SectionName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentationStrategy {
    /// Each section pattern runs against the whole text. Sections may overlap or leave gaps.
    #[default]
    #[serde(rename = "independent")]
    IndependentPatterns,
    /// Opening markers are located in document order; sections never overlap.
    #[serde(rename = "linear")]
    LinearScan,
}

fn section_patterns() -> &'static [(SectionName, Regex); 5] {
    static RE: OnceLock<[(SectionName, Regex); 5]> = OnceLock::new();
    RE.get_or_init(|| {
        let build = |p: &str| Regex::new(p).expect("section regex");
        [
            (
                SectionName::Abstract,
                build(r"(?is)abstract(.*?)(introduction|1\.)"),
            ),
            (
                SectionName::Introduction,
                build(r"(?is)(introduction|1\.)(.*?)(methodology|methods|2\.)"),
            ),
            (
                SectionName::Methodology,
                build(r"(?is)(methodology|methods|2\.)(.*?)(results|3\.)"),
            ),
            (
                SectionName::Results,
                build(r"(?is)(results|3\.)(.*?)(conclusion|4\.)"),
            ),
            (SectionName::Conclusion, build(r"(?is)(conclusion|4\.)(.*)")),
        ]
    })
}

fn opening_markers() -> &'static [(SectionName, Regex); 5] {
    static RE: OnceLock<[(SectionName, Regex); 5]> = OnceLock::new();
    RE.get_or_init(|| {
        let build = |p: &str| Regex::new(p).expect("marker regex");
        [
            (SectionName::Abstract, build(r"(?i)abstract")),
            (SectionName::Introduction, build(r"(?i)introduction|1\.")),
            (SectionName::Methodology, build(r"(?i)methodology|methods|2\.")),
            (SectionName::Results, build(r"(?i)results|3\.")),
            (SectionName::Conclusion, build(r"(?i)conclusion|4\.")),
        ]
    })
}

/// Segment `text` into the five sections. Total: unmatched sections are empty strings.
pub fn segment_sections(text: &str, strategy: SegmentationStrategy) -> DocumentSections {
    match strategy {
        SegmentationStrategy::IndependentPatterns => segment_independent(text),
        SegmentationStrategy::LinearScan => segment_linear(text),
    }
}

fn segment_independent(text: &str) -> DocumentSections {
    let mut sections = DocumentSections::default();
    for (name, re) in section_patterns().iter() {
        if let Some(m) = re.find(text) {
            sections.set(*name, m.as_str().trim());
        }
    }
    sections
}

fn segment_linear(text: &str) -> DocumentSections {
    let mut starts: Vec<(SectionName, usize)> = Vec::new();
    let mut cursor = 0usize;
    for (name, re) in opening_markers().iter() {
        if let Some(m) = re.find_at(text, cursor) {
            starts.push((*name, m.start()));
            cursor = m.end();
        }
    }

    let mut sections = DocumentSections::default();
    for (idx, (name, start)) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).map(|(_, s)| *s).unwrap_or(text.len());
        sections.set(*name, text[*start..end].trim());
    }
    sections
}
