// Enrichment Orchestrator
// Sentence rewriting, section critiques and the overall scorecard via the generation service.
// Every call degrades on its own; nothing here returns an error.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::fallback::with_fallback;
use crate::models::{
    ClassifiedFeedback, DocumentSections, EnrichmentResult, FeedbackCategory, Scorecard,
    SectionCritique, SectionName,
};
use crate::services::config_store::GenerationConfig;
use crate::services::providers::{parse_structured, GenerationRequest, GenerationService};
use crate::services::text_processor::truncate_chars;

/// Sections shorter than this (trimmed, Unicode scalars) are not critiqued.
const CRITIQUE_MIN_CHARS: usize = 50;
const CRITIQUE_MAX_WEAKNESSES: usize = 2;
const PROMPT_SECTION_MAX_CHARS: usize = 6000;

const REWRITE_PROMPT: &str = "You are an academic writing assistant. Rewrite the following \
reviewer-style sentence into clear, concise, and original academic English suitable for a \
peer-review comment. Keep meaning but avoid copying exact wording.\n\nInput: {text}\n\nRewritten:";

const CRITIQUE_SYSTEM_PROMPT: &str = r#"You are an experienced peer reviewer for a scientific venue.
Critique one section of a research paper.

Return JSON only, with exactly these keys:
- summary: one or two sentences describing what the section does
- weaknesses: an array of at most two short strings
- score: an integer from 1 (very poor) to 10 (excellent)"#;

const SCORECARD_SYSTEM_PROMPT: &str = r#"You are an experienced peer reviewer for a scientific venue.
Given the abstract and conclusion of a paper, rate it.

Return JSON only, with exactly these keys:
- originality, methodology, clarity, significance: integers from 1 to 10
- recommendation: one of "accept", "weak accept", "reject"
- reason: one sentence justifying the recommendation"#;

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub model: String,
    pub timeout: Duration,
    pub rewrite_temperature: f64,
    pub critique_temperature: f64,
    pub max_tokens: Option<u32>,
    /// Rewrites per category; later items pass through unchanged.
    pub rewrite_cap: usize,
    pub max_concurrency: usize,
}

impl EnrichmentSettings {
    pub fn from_config(config: &GenerationConfig, model: &str) -> Self {
        Self {
            model: model.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            rewrite_temperature: config.rewrite_temperature,
            critique_temperature: config.critique_temperature,
            max_tokens: config.max_tokens,
            rewrite_cap: config.rewrite_cap,
            max_concurrency: config.max_concurrency.max(1),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CritiqueJudgment {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    weaknesses: Vec<Value>,
    #[serde(default)]
    score: Value,
}

#[derive(Debug, Deserialize)]
struct ScorecardJudgment {
    #[serde(default)]
    originality: Value,
    #[serde(default)]
    methodology: Value,
    #[serde(default)]
    clarity: Value,
    #[serde(default)]
    significance: Value,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

pub struct EnrichmentOrchestrator {
    service: Arc<dyn GenerationService>,
}

impl EnrichmentOrchestrator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Run rewrite, critique and scorecard concurrently and merge what settles.
    pub async fn enrich(
        &self,
        feedback: &ClassifiedFeedback,
        sections: &DocumentSections,
        settings: &EnrichmentSettings,
    ) -> EnrichmentResult {
        let started = Instant::now();

        let (rewrites, critiques, scorecard) = tokio::join!(
            self.rewrite_feedback(feedback, settings),
            self.critique_sections(sections, settings),
            self.build_scorecard(sections, settings),
        );

        let mut scorecard = scorecard.unwrap_or_default();
        scorecard.methodology_section_score =
            critiques.get(&SectionName::Methodology).map(|c| c.score);
        scorecard.results_section_score = critiques.get(&SectionName::Results).map(|c| c.score);

        let [rewritten_strengths, rewritten_weaknesses, rewritten_improvements] = rewrites;
        info!(
            "[ENRICHMENT] done model={} critiques={} scorecard={} elapsed_ms={}",
            settings.model,
            critiques.len(),
            !scorecard.is_empty(),
            started.elapsed().as_millis()
        );

        EnrichmentResult {
            rewritten_strengths,
            rewritten_weaknesses,
            rewritten_improvements,
            section_critiques: critiques,
            scorecard: (!scorecard.is_empty()).then_some(scorecard),
        }
    }

    /// Rewritten lists in `FeedbackCategory::ALL` order, each positionally aligned
    /// with the originals.
    pub async fn rewrite_feedback(
        &self,
        feedback: &ClassifiedFeedback,
        settings: &EnrichmentSettings,
    ) -> [Vec<String>; 3] {
        let started = Instant::now();
        let mut lists = FeedbackCategory::ALL.map(|category| feedback.texts(category));

        let semaphore = Arc::new(Semaphore::new(settings.max_concurrency));
        let mut join_set: JoinSet<(usize, usize, Option<String>)> = JoinSet::new();
        let mut tasks = 0usize;

        for (slot, list) in lists.iter().enumerate() {
            for (position, original) in list.iter().take(settings.rewrite_cap).enumerate() {
                let service = self.service.clone();
                let semaphore = semaphore.clone();
                let request = GenerationRequest::new(
                    settings.model.as_str(),
                    REWRITE_PROMPT.replace("{text}", original),
                )
                .with_temperature(settings.rewrite_temperature)
                .with_max_tokens(settings.max_tokens)
                .with_timeout(settings.timeout);
                let timeout = settings.timeout;
                tasks += 1;

                join_set.spawn(async move {
                    let rewritten = rewrite_one(service, semaphore.as_ref(), request, timeout).await;
                    (slot, position, rewritten)
                });
            }
        }

        let mut rewritten_count = 0usize;
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((slot, position, Some(text))) => {
                    lists[slot][position] = text;
                    rewritten_count += 1;
                }
                Ok((_, _, None)) => {}
                Err(e) => warn!("[ENRICHMENT] rewrite task failed: {}", e),
            }
        }

        info!(
            "[ENRICHMENT] rewrites settled ok={}/{} elapsed_ms={}",
            rewritten_count,
            tasks,
            started.elapsed().as_millis()
        );
        lists
    }

    /// Critiques for methodology and results. Missing or unparseable ones are absent.
    pub async fn critique_sections(
        &self,
        sections: &DocumentSections,
        settings: &EnrichmentSettings,
    ) -> BTreeMap<SectionName, SectionCritique> {
        let (methodology, results) = tokio::join!(
            self.critique_section(SectionName::Methodology, sections.get(SectionName::Methodology), settings),
            self.critique_section(SectionName::Results, sections.get(SectionName::Results), settings),
        );

        let mut critiques = BTreeMap::new();
        if let Some(c) = methodology {
            critiques.insert(SectionName::Methodology, c);
        }
        if let Some(c) = results {
            critiques.insert(SectionName::Results, c);
        }
        critiques
    }

    async fn critique_section(
        &self,
        name: SectionName,
        text: &str,
        settings: &EnrichmentSettings,
    ) -> Option<SectionCritique> {
        let text = text.trim();
        if text.chars().count() < CRITIQUE_MIN_CHARS {
            debug!("[ENRICHMENT] skip critique section={} (too short)", name);
            return None;
        }

        let prompt = format!(
            "Section: {}\n\n{}",
            name,
            truncate_chars(text, PROMPT_SECTION_MAX_CHARS)
        );
        let request = GenerationRequest::new(settings.model.as_str(), prompt)
            .with_system(CRITIQUE_SYSTEM_PROMPT)
            .structured()
            .with_temperature(settings.critique_temperature)
            .with_max_tokens(settings.max_tokens)
            .with_timeout(settings.timeout);

        let content = self
            .generate_or_none(&format!("critique section={}", name), &request, settings.timeout)
            .await?;

        match parse_structured::<CritiqueJudgment>(&content) {
            Ok(judgment) => {
                let critique = critique_from_judgment(judgment);
                if critique.is_none() {
                    warn!("[ENRICHMENT] critique section={} has no usable score", name);
                }
                critique
            }
            Err(e) => {
                warn!("[ENRICHMENT] critique section={} parse failed: {}", name, e);
                None
            }
        }
    }

    /// Scorecard over abstract + conclusion. Skipped when both are empty.
    pub async fn build_scorecard(
        &self,
        sections: &DocumentSections,
        settings: &EnrichmentSettings,
    ) -> Option<Scorecard> {
        let abstract_text = sections.get(SectionName::Abstract).trim();
        let conclusion = sections.get(SectionName::Conclusion).trim();
        if abstract_text.is_empty() && conclusion.is_empty() {
            debug!("[ENRICHMENT] skip scorecard (no abstract or conclusion)");
            return None;
        }

        let prompt = format!(
            "Abstract:\n{}\n\nConclusion:\n{}",
            truncate_chars(abstract_text, PROMPT_SECTION_MAX_CHARS / 2),
            truncate_chars(conclusion, PROMPT_SECTION_MAX_CHARS / 2)
        );
        let request = GenerationRequest::new(settings.model.as_str(), prompt)
            .with_system(SCORECARD_SYSTEM_PROMPT)
            .structured()
            .with_temperature(settings.critique_temperature)
            .with_max_tokens(settings.max_tokens)
            .with_timeout(settings.timeout);

        let content = self
            .generate_or_none("scorecard", &request, settings.timeout)
            .await?;

        match parse_structured::<ScorecardJudgment>(&content) {
            Ok(judgment) => {
                let scorecard = scorecard_from_judgment(judgment);
                (!scorecard.is_empty()).then_some(scorecard)
            }
            Err(e) => {
                warn!("[ENRICHMENT] scorecard parse failed: {}", e);
                None
            }
        }
    }

    async fn generate_or_none(
        &self,
        label: &str,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> Option<String> {
        with_fallback(
            label,
            timeout,
            async {
                self.service.generate(request).await.map(|o| {
                    debug!("[ENRICHMENT] {} latency_ms={}", label, o.latency_ms);
                    Some(o.content)
                })
            },
            None,
        )
        .await
    }
}

async fn rewrite_one(
    service: Arc<dyn GenerationService>,
    semaphore: &Semaphore,
    request: GenerationRequest,
    timeout: Duration,
) -> Option<String> {
    // Permit is held for the request only
    let _permit = semaphore.acquire().await.ok()?;
    let label = format!("rewrite model={}", request.model);
    let content = with_fallback(
        &label,
        timeout,
        async {
            service.generate(&request).await.map(|o| {
                debug!("[ENRICHMENT] rewrite latency_ms={}", o.latency_ms);
                Some(o.content)
            })
        },
        None,
    )
    .await?;

    let cleaned = clean_rewrite(&content);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn preamble_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:(?:here\s+is|here's)\s+(?:the|a|my)?\s*(?:rewritten|revised|rephrased)\s+(?:text|sentence|version|comment)?[^:\n]*:|rewritten(?:\s+sentence)?\s*:|rewrite\s*:)\s*",
        )
        .expect("preamble regex")
    })
}

/// Strip assistant preambles and wrapping quotes from a rewrite.
pub fn clean_rewrite(content: &str) -> String {
    let stripped = preamble_re().replace(content.trim(), "");
    let mut text = stripped.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()].trim();
        }
    }
    text.to_string()
}

/// 1..=10 from a number, "7" or "7/10". Anything else is unusable.
fn coerce_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.split('/').next()?.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(1.0, 10.0) as u8)
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn critique_from_judgment(judgment: CritiqueJudgment) -> Option<SectionCritique> {
    let score = coerce_score(&judgment.score)?;
    let weaknesses = judgment
        .weaknesses
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .take(CRITIQUE_MAX_WEAKNESSES)
        .map(str::to_string)
        .collect();
    Some(SectionCritique {
        summary: non_empty(judgment.summary).unwrap_or_default(),
        weaknesses,
        score,
    })
}

fn scorecard_from_judgment(judgment: ScorecardJudgment) -> Scorecard {
    Scorecard {
        originality: coerce_score(&judgment.originality),
        methodology: coerce_score(&judgment.methodology),
        clarity: coerce_score(&judgment.clarity),
        significance: coerce_score(&judgment.significance),
        recommendation: non_empty(judgment.recommendation),
        reason: non_empty(judgment.reason),
        methodology_section_score: None,
        results_section_score: None,
    }
}
