// Scorer
// Weighted counts -> raw score -> confidence -> verdict, plus the plagiarism override

use crate::models::{ClassifiedFeedback, PlagiarismResult, ScoreResult, Verdict};

const STRENGTH_WEIGHT: f64 = 1.0;
const WEAKNESS_WEIGHT: f64 = 1.2;
const IMPROVEMENT_WEIGHT: f64 = 0.5;

/// Confidence strictly above this is ACCEPT.
pub const ACCEPT_THRESHOLD: f64 = 0.65;
/// Confidence strictly above this (and not above ACCEPT_THRESHOLD) is WEAK ACCEPT.
pub const WEAK_ACCEPT_THRESHOLD: f64 = 0.45;
/// Plagiarism percent strictly above this forces REJECT (PLAGIARISM).
pub const AUTO_REJECT_PLAGIARISM_PERCENT: u8 = 40;

pub fn raw_score(strengths: usize, weaknesses: usize, improvements: usize) -> f64 {
    STRENGTH_WEIGHT * strengths as f64
        - WEAKNESS_WEIGHT * weaknesses as f64
        - IMPROVEMENT_WEIGHT * improvements as f64
}

pub fn confidence_from_raw(raw: f64) -> f64 {
    ((raw + 10.0) / 20.0).clamp(0.0, 1.0)
}

pub fn verdict_for(confidence: f64) -> Verdict {
    if confidence > ACCEPT_THRESHOLD {
        Verdict::Accept
    } else if confidence > WEAK_ACCEPT_THRESHOLD {
        Verdict::WeakAccept
    } else {
        Verdict::Reject
    }
}

pub fn score_counts(strengths: usize, weaknesses: usize, improvements: usize) -> ScoreResult {
    let raw = raw_score(strengths, weaknesses, improvements);
    let confidence = confidence_from_raw(raw);
    ScoreResult {
        raw_score: raw,
        confidence,
        verdict: verdict_for(confidence),
    }
}

pub fn score_feedback(feedback: &ClassifiedFeedback) -> ScoreResult {
    score_counts(
        feedback.strengths.len(),
        feedback.weaknesses.len(),
        feedback.improvements.len(),
    )
}

/// Force REJECT (PLAGIARISM) when the reading is above the auto-reject threshold.
/// Score and confidence are left as computed.
pub fn apply_plagiarism_override(score: ScoreResult, plagiarism: &PlagiarismResult) -> ScoreResult {
    if plagiarism.percent > AUTO_REJECT_PLAGIARISM_PERCENT {
        ScoreResult {
            verdict: Verdict::RejectPlagiarism,
            ..score
        }
    } else {
        score
    }
}
