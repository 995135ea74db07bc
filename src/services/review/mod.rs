// Review Module
// Paper review pipeline organized into stage submodules:
// - sections: boundary-marker section segmentation
// - sentences: candidate sentence extraction per section
// - classifier: keyword-set strength / weakness / improvement labelling
// - scoring: raw score, confidence, verdict and plagiarism override
// - plagiarism: oracle seam and never-failing checker
// - enrichment: rewrites, section critiques and scorecard via the generation service
// - report: plain-text report assembly
// - pipeline: orchestration and the guarded entry point

pub mod fallback;
pub mod sections;
pub mod sentences;
pub mod classifier;
pub mod scoring;
pub mod plagiarism;
pub mod enrichment;
pub mod report;
pub mod pipeline;

pub use classifier::{HeuristicClassifier, KeywordSets};
pub use enrichment::{EnrichmentOrchestrator, EnrichmentSettings};
pub use fallback::{bounded, with_fallback, CallFailure};
pub use pipeline::{review, ReviewError, ReviewPipeline};
pub use plagiarism::{
    FallbackMode, OracleReading, PhraseSearchOracle, PlagiarismBackend, PlagiarismChecker,
    PlagiarismError, PlagiarismOracle, ServiceOracle,
};
pub use report::{render_report, ReportOptions};
pub use scoring::{
    apply_plagiarism_override, score_counts, score_feedback, ACCEPT_THRESHOLD,
    AUTO_REJECT_PLAGIARISM_PERCENT, WEAK_ACCEPT_THRESHOLD,
};
pub use sections::{segment_sections, SegmentationStrategy};
pub use sentences::{extract_document_sentences, extract_sentences};
