// Review Pipeline
// extract -> segment -> sentences -> classify -> score, then plagiarism || enrichment -> report

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::classifier::HeuristicClassifier;
use super::enrichment::{EnrichmentOrchestrator, EnrichmentSettings};
use super::plagiarism::PlagiarismChecker;
use super::report::{render_report, ReportOptions};
use super::scoring::{apply_plagiarism_override, score_feedback};
use super::sections::{segment_sections, SegmentationStrategy};
use super::sentences::extract_document_sentences;
use crate::models::{PlagiarismResult, ReviewMeta, ReviewOptions, ReviewResult};
use crate::services::config_store::{AppConfig, GenerationConfig};
use crate::services::document::{DocumentExtractor, ExtractionError, FileExtractor};
use crate::services::providers::{GenerationService, OllamaClient};
use crate::services::sentence_segmenter::{detector_from_config, SentenceBoundaryDetector};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Document extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Internal pipeline error: {0}")]
    Internal(String),
}

/// One pipeline can serve many reviews; each review owns all of its state.
pub struct ReviewPipeline {
    extractor: Arc<dyn DocumentExtractor>,
    detector: Arc<dyn SentenceBoundaryDetector>,
    enrichment: EnrichmentOrchestrator,
    plagiarism: PlagiarismChecker,
    classifier: HeuristicClassifier,
    generation: GenerationConfig,
    segmentation: SegmentationStrategy,
    report: ReportOptions,
}

impl ReviewPipeline {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        detector: Arc<dyn SentenceBoundaryDetector>,
        generator: Arc<dyn GenerationService>,
        plagiarism: PlagiarismChecker,
    ) -> Self {
        Self {
            extractor,
            detector,
            enrichment: EnrichmentOrchestrator::new(generator),
            plagiarism,
            classifier: HeuristicClassifier::default(),
            generation: GenerationConfig::default(),
            segmentation: SegmentationStrategy::default(),
            report: ReportOptions::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(FileExtractor),
            detector_from_config(&config.segmenter),
            Arc::new(OllamaClient::new(&config.generation.base_url)),
            PlagiarismChecker::from_config(&config.plagiarism),
        )
        .with_classifier(HeuristicClassifier::new(&config.keywords))
        .with_generation_config(config.generation.clone())
        .with_segmentation(config.review.segmentation)
        .with_report_options(ReportOptions {
            max_items: config.review.report_items,
            include_improvements: config.review.include_improvements,
        })
    }

    pub fn with_classifier(mut self, classifier: HeuristicClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_segmentation(mut self, segmentation: SegmentationStrategy) -> Self {
        self.segmentation = segmentation;
        self
    }

    pub fn with_report_options(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }

    /// Review a document on disk. Only extraction failures are fatal.
    pub async fn review(
        &self,
        path: &Path,
        options: &ReviewOptions,
    ) -> Result<ReviewResult, ReviewError> {
        let started = Instant::now();
        info!("[PIPELINE] review start path={} enrich={}", path.display(), options.enrich);
        let text = self.extractor.extract(path).await?;
        Ok(self.review_from(&text, options, started).await)
    }

    /// Review already-extracted text. Never fails.
    pub async fn review_text(&self, text: &str, options: &ReviewOptions) -> ReviewResult {
        self.review_from(text, options, Instant::now()).await
    }

    /// Run the review on its own task so a panic surfaces as `ReviewError::Internal`.
    /// Dropping the returned future aborts the task.
    pub async fn review_guarded(
        self: Arc<Self>,
        path: PathBuf,
        options: ReviewOptions,
    ) -> Result<ReviewResult, ReviewError> {
        let mut task = AbortOnDrop(tokio::spawn(async move {
            self.review(&path, &options).await
        }));

        match (&mut task.0).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                error!("[PIPELINE] review task panicked");
                Err(ReviewError::Internal("review task panicked".to_string()))
            }
            Err(e) => Err(ReviewError::Internal(e.to_string())),
        }
    }

    async fn review_from(&self, text: &str, options: &ReviewOptions, started: Instant) -> ReviewResult {
        let sections = segment_sections(text, self.segmentation);
        let sentences = extract_document_sentences(self.detector.as_ref(), &sections).await;

        let mut sentence_counts = BTreeMap::new();
        for section in sections.iter() {
            sentence_counts.insert(section.name, 0usize);
        }
        for sentence in &sentences {
            *sentence_counts.entry(sentence.section).or_insert(0) += 1;
        }

        let feedback = self.classifier.classify(&sentences);
        let base_score = score_feedback(&feedback);
        info!(
            "[PIPELINE] sections={} sentences={} strengths={} weaknesses={} improvements={} raw_score={:.2}",
            sections.matched_count(),
            sentences.len(),
            feedback.strengths.len(),
            feedback.weaknesses.len(),
            feedback.improvements.len(),
            base_score.raw_score
        );

        let settings = EnrichmentSettings::from_config(&self.generation, &options.model);
        let (plagiarism, enrichment) = tokio::join!(
            async {
                if options.check_plagiarism {
                    self.plagiarism.check(text).await
                } else {
                    PlagiarismResult::skipped()
                }
            },
            async {
                if options.enrich {
                    Some(self.enrichment.enrich(&feedback, &sections, &settings).await)
                } else {
                    None
                }
            },
        );

        let score = apply_plagiarism_override(base_score, &plagiarism);
        let report = render_report(&feedback, enrichment.as_ref(), &score, &plagiarism, &self.report);
        let runtime_ms = started.elapsed().as_millis() as i64;

        info!(
            "[PIPELINE] review done verdict={} confidence={:.2} plagiarism={} elapsed_ms={}",
            score.verdict, score.confidence, plagiarism.percent, runtime_ms
        );

        ReviewResult {
            score,
            plagiarism,
            feedback,
            enrichment,
            report,
            meta: ReviewMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                runtime_ms,
                enriched: options.enrich,
                model: options.enrich.then(|| options.model.clone()),
                sentence_counts,
            },
        }
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Review a document with the stored configuration and environment overrides.
/// An empty `model_id` selects the configured default model.
pub async fn review(
    document_path: impl AsRef<Path>,
    enrich: bool,
    model_id: &str,
) -> Result<ReviewResult, ReviewError> {
    let config = AppConfig::load_effective();
    let model = if model_id.trim().is_empty() {
        config.generation.default_model.clone()
    } else {
        model_id.trim().to_string()
    };
    let options = ReviewOptions {
        enrich,
        model,
        check_plagiarism: config.plagiarism.enabled,
    };
    let pipeline = Arc::new(ReviewPipeline::from_config(&config));
    pipeline
        .review_guarded(document_path.as_ref().to_path_buf(), options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackCategory, PlagiarismRisk, PlagiarismSource, SectionName, Verdict};
    use crate::services::providers::{GenerationError, GenerationOutput, GenerationRequest};
    use crate::services::review::plagiarism::{
        FallbackMode, OracleReading, PlagiarismError, PlagiarismOracle,
    };
    use crate::services::sentence_segmenter::RuleSentenceSplitter;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    const PAPER: &str = "Abstract\nOur method outperforms all prior baselines on the benchmark.\n\
Introduction\nPrior work is described here in detail.\n\
Methodology\nWe train on a small dataset of labelled images.\n\
Results\nAccuracy numbers are reported in the table below.\n\
Conclusion\nWe summarise the findings of this study.";

    struct FakeExtractor {
        text: Option<&'static str>,
        panic: bool,
    }

    #[async_trait]
    impl DocumentExtractor for FakeExtractor {
        async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
            if self.panic {
                panic!("extractor exploded");
            }
            self.text
                .map(str::to_string)
                .ok_or_else(|| ExtractionError::Empty(path.to_path_buf()))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl GenerationService for FailingGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationOutput, GenerationError> {
            Err(GenerationError::MissingContent)
        }
    }

    struct FixedOracle(u8);

    #[async_trait]
    impl PlagiarismOracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn check(&self, _text: &str) -> Result<OracleReading, PlagiarismError> {
            Ok(OracleReading {
                percent: json!(self.0),
                originality: serde_json::Value::Null,
                risk: json!(if self.0 > 40 { "HIGH" } else { "LOW" }),
            })
        }
    }

    fn pipeline(text: Option<&'static str>, percent: u8) -> ReviewPipeline {
        ReviewPipeline::new(
            Arc::new(FakeExtractor { text, panic: false }),
            Arc::new(RuleSentenceSplitter),
            Arc::new(FailingGenerator),
            PlagiarismChecker::new(
                Some(Arc::new(FixedOracle(percent))),
                Duration::from_secs(2),
                1500,
                FallbackMode::Neutral,
            ),
        )
    }

    fn options(enrich: bool) -> ReviewOptions {
        ReviewOptions {
            enrich,
            model: "test-model".to_string(),
            check_plagiarism: true,
        }
    }

    #[tokio::test]
    async fn test_one_strength_one_weakness_is_weak_accept() {
        let result = pipeline(Some(PAPER), 0)
            .review(Path::new("paper.pdf"), &options(false))
            .await
            .unwrap();

        assert_eq!(result.feedback.strengths.len(), 1);
        assert_eq!(result.feedback.weaknesses.len(), 1);
        assert!(result.feedback.improvements.is_empty());
        assert!((result.score.raw_score - (-0.2)).abs() < 1e-9);
        assert!((result.score.confidence - 0.49).abs() < 1e-9);
        assert_eq!(result.verdict(), Verdict::WeakAccept);
        assert_eq!(result.plagiarism.percent, 0);
        assert_eq!(result.plagiarism.originality, 100);
        assert_eq!(result.feedback.strengths[0].section, SectionName::Abstract);
        assert_eq!(result.feedback.weaknesses[0].section, SectionName::Methodology);
        assert_eq!(result.meta.sentence_counts[&SectionName::Results], 1);
        assert!(result.report.contains("FINAL VERDICT: WEAK ACCEPT"));
    }

    #[tokio::test]
    async fn test_high_plagiarism_forces_reject() {
        let result = pipeline(Some(PAPER), 55)
            .review(Path::new("paper.pdf"), &options(false))
            .await
            .unwrap();

        assert_eq!(result.verdict(), Verdict::RejectPlagiarism);
        assert_eq!(result.plagiarism.risk, PlagiarismRisk::High);
        assert!((result.score.confidence - 0.49).abs() < 1e-9);
        assert!(result.report.contains("REJECT (PLAGIARISM)"));
    }

    #[tokio::test]
    async fn test_enrichment_off_uses_originals() {
        let result = pipeline(Some(PAPER), 0).review_text(PAPER, &options(false)).await;

        assert!(result.enrichment.is_none());
        assert!(!result.meta.enriched);
        assert!(result.meta.model.is_none());
        assert_eq!(
            result.rewritten(FeedbackCategory::Strength),
            result.feedback.texts(FeedbackCategory::Strength)
        );
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_gracefully() {
        let result = pipeline(Some(PAPER), 0).review_text(PAPER, &options(true)).await;

        let enrichment = result.enrichment.as_ref().expect("enrichment ran");
        assert_eq!(
            enrichment.rewritten_strengths,
            result.feedback.texts(FeedbackCategory::Strength)
        );
        assert_eq!(
            enrichment.rewritten_weaknesses,
            result.feedback.texts(FeedbackCategory::Weakness)
        );
        assert!(enrichment.section_critiques.is_empty());
        assert!(enrichment.scorecard.is_none());
        assert_eq!(result.verdict(), Verdict::WeakAccept);
        assert_eq!(result.meta.model.as_deref(), Some("test-model"));
    }

    #[tokio::test]
    async fn test_plagiarism_skipped_when_disabled() {
        let mut opts = options(false);
        opts.check_plagiarism = false;
        let result = pipeline(Some(PAPER), 90).review_text(PAPER, &opts).await;

        assert_eq!(result.plagiarism.source, PlagiarismSource::Skipped);
        assert_eq!(result.verdict(), Verdict::WeakAccept);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal() {
        let err = pipeline(None, 0)
            .review(Path::new("missing.pdf"), &options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_guarded_review_contains_panics() {
        let pipeline = Arc::new(ReviewPipeline::new(
            Arc::new(FakeExtractor { text: None, panic: true }),
            Arc::new(RuleSentenceSplitter),
            Arc::new(FailingGenerator),
            PlagiarismChecker::new(None, Duration::from_secs(1), 1500, FallbackMode::Neutral),
        ));

        let err = pipeline
            .review_guarded(PathBuf::from("paper.pdf"), options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Internal(_)));
    }

    #[tokio::test]
    async fn test_meta_is_fresh_per_review() {
        let p = pipeline(Some(PAPER), 0);
        let a = p.review_text(PAPER, &options(false)).await;
        let b = p.review_text(PAPER, &options(false)).await;
        assert_ne!(a.meta.request_id, b.meta.request_id);
        assert_eq!(a.score, b.score);
    }
}
