// Report Assembler
// Plain-text review report with fixed section ordering

use std::fmt::Write as _;

use crate::models::{
    ClassifiedFeedback, EnrichmentResult, FeedbackCategory, PlagiarismResult, ScoreResult,
    Scorecard, SectionCritique, SectionName,
};
use std::collections::BTreeMap;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Items shown per list.
    pub max_items: usize,
    pub include_improvements: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_items: 5,
            include_improvements: true,
        }
    }
}

/// Render the report. Uses rewritten lists when enrichment ran, originals otherwise.
pub fn render_report(
    feedback: &ClassifiedFeedback,
    enrichment: Option<&EnrichmentResult>,
    score: &ScoreResult,
    plagiarism: &PlagiarismResult,
    options: &ReportOptions,
) -> String {
    let list = |category: FeedbackCategory| -> Vec<String> {
        match enrichment {
            Some(e) => e.rewritten(category).to_vec(),
            None => feedback.texts(category),
        }
    };

    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "AUTOMATED RESEARCH PAPER REVIEW REPORT");
    let _ = writeln!(out, "{}", heavy);

    if let Some(e) = enrichment {
        if e.scorecard.is_some() || !e.section_critiques.is_empty() {
            write_scorecard(&mut out, e.scorecard.as_ref(), &e.section_critiques);
        }
    }

    write_list(
        &mut out,
        "STRENGTHS",
        &list(FeedbackCategory::Strength),
        options.max_items,
        "No significant strengths detected.",
    );
    write_list(
        &mut out,
        "WEAKNESSES",
        &list(FeedbackCategory::Weakness),
        options.max_items,
        "No major weaknesses detected.",
    );
    if options.include_improvements {
        write_list(
            &mut out,
            "SUGGESTED IMPROVEMENTS",
            &list(FeedbackCategory::Improvement),
            options.max_items,
            "No major improvements suggested.",
        );
    }

    let _ = writeln!(out, "\n{}", light);
    let _ = writeln!(out, "FINAL VERDICT: {}", score.verdict);
    let _ = writeln!(out, "CONFIDENCE SCORE: {:.2}", score.confidence);
    let _ = writeln!(
        out,
        "PLAGIARISM: {}% (originality {}%, risk {})",
        plagiarism.percent,
        plagiarism.originality,
        plagiarism.risk.label()
    );
    let _ = writeln!(out, "{}", light);
    out
}

fn write_list(out: &mut String, title: &str, items: &[String], max_items: usize, empty: &str) {
    let _ = writeln!(out, "\n{}:", title);
    if items.is_empty() {
        let _ = writeln!(out, "{}", empty);
        return;
    }
    for (idx, item) in items.iter().take(max_items).enumerate() {
        let _ = writeln!(out, "{}. {}", idx + 1, item);
    }
}

fn score_or_na(score: Option<u8>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{}/10", s))
}

fn write_scorecard(
    out: &mut String,
    scorecard: Option<&Scorecard>,
    critiques: &BTreeMap<SectionName, SectionCritique>,
) {
    let _ = writeln!(out, "\nSCORECARD:");
    match scorecard {
        Some(card) => {
            let _ = writeln!(out, "Originality: {}", score_or_na(card.originality));
            let _ = writeln!(out, "Methodology: {}", score_or_na(card.methodology));
            let _ = writeln!(out, "Clarity: {}", score_or_na(card.clarity));
            let _ = writeln!(out, "Significance: {}", score_or_na(card.significance));
            let _ = writeln!(
                out,
                "Recommendation: {}",
                card.recommendation.as_deref().unwrap_or("n/a")
            );
            let _ = writeln!(out, "Reason: {}", card.reason.as_deref().unwrap_or("n/a"));
        }
        None => {
            let _ = writeln!(out, "No scorecard available.");
        }
    }

    if critiques.is_empty() {
        let _ = writeln!(out, "No section critiques available.");
        return;
    }
    for (name, critique) in critiques {
        let summary = if critique.summary.is_empty() {
            "no summary"
        } else {
            critique.summary.as_str()
        };
        let _ = writeln!(out, "{} section: {}/10 - {}", capitalize(name.as_str()), critique.score, summary);
        for weakness in &critique.weaknesses {
            let _ = writeln!(out, "  - {}", weakness);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
