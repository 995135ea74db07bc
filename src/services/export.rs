// Export Service
// Text, CSV and JSON exports of a finished review

use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::models::{FeedbackCategory, ReviewResult};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which feedback texts to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackVariant {
    Original,
    /// Rewritten texts; falls back to originals when enrichment did not run.
    Rewritten,
}

fn feedback_texts(result: &ReviewResult, variant: FeedbackVariant, category: FeedbackCategory) -> Vec<String> {
    match variant {
        FeedbackVariant::Original => result.feedback.texts(category),
        FeedbackVariant::Rewritten => result.rewritten(category),
    }
}

/// Full, unabridged text report with a metadata header.
pub fn build_text_report(result: &ReviewResult, file_label: &str, variant: FeedbackVariant) -> String {
    let rule = "=".repeat(60);
    let mut out = format!("PAPERLENS ANALYSIS REPORT\n{}\n\n", rule);
    out.push_str(&format!(
        "FILE: {}\nVERDICT: {}\nCONFIDENCE: {:.0}%\nRAW SCORE: {:.2}\nTIMESTAMP: {}\n\n",
        file_label,
        result.score.verdict,
        result.score.confidence * 100.0,
        result.score.raw_score,
        result.meta.generated_at
    ));

    for (title, category) in [
        ("STRENGTHS", FeedbackCategory::Strength),
        ("WEAKNESSES", FeedbackCategory::Weakness),
        ("IMPROVEMENTS", FeedbackCategory::Improvement),
    ] {
        let items = feedback_texts(result, variant, category);
        out.push_str(&format!("{} ({}):\n", title, items.len()));
        for (idx, item) in items.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, item));
        }
        out.push('\n');
    }

    out.push_str(&format!("{}\nGenerated by PaperLens\n", rule));
    out
}

/// `Type,Feedback` rows: strengths, then weaknesses, then improvements.
pub fn write_csv<W: Write>(
    result: &ReviewResult,
    variant: FeedbackVariant,
    writer: W,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Type", "Feedback"])?;
    for category in FeedbackCategory::ALL {
        for item in feedback_texts(result, variant, category) {
            wtr.write_record([category.label(), item.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_text_report(
    result: &ReviewResult,
    file_label: &str,
    variant: FeedbackVariant,
    path: &Path,
) -> Result<(), ExportError> {
    fs::write(path, build_text_report(result, file_label, variant))?;
    Ok(())
}

pub fn save_csv(result: &ReviewResult, variant: FeedbackVariant, path: &Path) -> Result<(), ExportError> {
    let file = fs::File::create(path)?;
    write_csv(result, variant, file)
}

pub fn save_json(result: &ReviewResult, path: &Path) -> Result<(), ExportError> {
    let content = serde_json::to_string_pretty(result)?;
    fs::write(path, content)?;
    Ok(())
}
