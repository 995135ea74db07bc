// Plagiarism Adapter
// Oracle seam, loose normalization of readings, and fallback-wrapped checking

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::fallback::with_fallback;
use crate::models::{PlagiarismResult, PlagiarismRisk, PlagiarismSource};
use crate::services::config_store::PlagiarismConfig;
use crate::services::text_processor::{split_sentences, truncate_chars};

const PHRASE_MIN_WORDS: usize = 10;
const PHRASE_MAX_SAMPLES: usize = 3;

#[derive(Error, Debug)]
pub enum PlagiarismError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlagiarismBackend {
    #[default]
    Service,
    PhraseSearch,
}

/// What the checker returns when the oracle is missing or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// 0 / 100 / UNAVAILABLE
    #[default]
    Neutral,
    /// Deterministic hash-derived reading in 5..=20
    Simulated,
}

/// Raw oracle output, loosely typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OracleReading {
    pub percent: Value,
    pub originality: Value,
    pub risk: Value,
}

#[async_trait]
pub trait PlagiarismOracle: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self, text: &str) -> Result<OracleReading, PlagiarismError>;
}

/// Integer percentage from a number, a numeric string or a "55%" string.
pub fn coerce_percent(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

pub fn normalize_reading(reading: &OracleReading) -> PlagiarismResult {
    let percent = coerce_percent(&reading.percent).unwrap_or(0);
    let originality = coerce_percent(&reading.originality).unwrap_or(100 - percent);
    let risk = reading
        .risk
        .as_str()
        .map(PlagiarismRisk::from_label)
        .unwrap_or(PlagiarismRisk::Unavailable);

    PlagiarismResult {
        percent,
        originality,
        risk,
        source: PlagiarismSource::Oracle,
    }
}

/// Stable pseudo-reading for demos without an oracle.
pub fn simulated_reading(text: &str) -> PlagiarismResult {
    let digest = Sha256::digest(text.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let percent = 5 + (u64::from_be_bytes(prefix) % 16) as u8;
    PlagiarismResult {
        percent,
        originality: 100 - percent,
        risk: if percent > 15 {
            PlagiarismRisk::Medium
        } else {
            PlagiarismRisk::Low
        },
        source: PlagiarismSource::Simulated,
    }
}

// ============ Service Oracle ============

/// POSTs `{"text": ...}` to a JSON plagiarism endpoint.
pub struct ServiceOracle {
    client: Client,
    endpoint: String,
}

impl ServiceOracle {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl PlagiarismOracle for ServiceOracle {
    fn name(&self) -> &str {
        "service"
    }

    async fn check(&self, text: &str) -> Result<OracleReading, PlagiarismError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlagiarismError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| PlagiarismError::InvalidResponse(e.to_string()))?;
        reading_from_body(&data)
    }
}

fn reading_from_body(data: &Value) -> Result<OracleReading, PlagiarismError> {
    if !data.is_object() {
        return Err(PlagiarismError::InvalidResponse("expected a JSON object".to_string()));
    }
    let pick = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| data.get(*k).filter(|v| !v.is_null()).cloned())
            .unwrap_or(Value::Null)
    };
    let reading = OracleReading {
        percent: pick(&["percent", "plagiarism", "plagiarism_percent"]),
        originality: pick(&["originality", "originality_percent"]),
        risk: pick(&["risk", "risk_level"]),
    };
    if reading.percent.is_null() && reading.risk.is_null() {
        return Err(PlagiarismError::InvalidResponse(
            "response has neither percent nor risk".to_string(),
        ));
    }
    Ok(reading)
}

// ============ Phrase Search Oracle ============

/// Searches a few exact phrases from the text and reports the hit ratio.
pub struct PhraseSearchOracle {
    client: Client,
    search_url: String,
    delay: Duration,
}

impl PhraseSearchOracle {
    pub fn new(search_url: &str, delay: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            search_url: search_url.to_string(),
            delay,
        }
    }

    async fn phrase_found(&self, phrase: &str) -> Result<bool, PlagiarismError> {
        let query = format!("\"{}\"", phrase);
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlagiarismError::ApiError {
                status: status.as_u16(),
                message: format!("search failed for phrase of {} chars", phrase.len()),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| PlagiarismError::InvalidResponse(e.to_string()))?;
        Ok(count_hits(&data) > 0)
    }
}

#[async_trait]
impl PlagiarismOracle for PhraseSearchOracle {
    fn name(&self) -> &str {
        "phrase_search"
    }

    async fn check(&self, text: &str) -> Result<OracleReading, PlagiarismError> {
        let samples = sample_phrases(text);
        if samples.is_empty() {
            return Ok(OracleReading {
                percent: json!(0),
                originality: json!(100),
                risk: json!("LOW"),
            });
        }

        let mut hits = 0usize;
        for (idx, phrase) in samples.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.delay).await;
            }
            if self.phrase_found(phrase).await? {
                hits += 1;
            }
        }

        let percent = phrase_percent(hits, samples.len());
        let risk = if percent > 50 {
            "HIGH"
        } else if percent > 0 {
            "MEDIUM"
        } else {
            "LOW"
        };
        info!(
            "[PLAGIARISM] phrase search hits={}/{} percent={}",
            hits,
            samples.len(),
            percent
        );

        Ok(OracleReading {
            percent: json!(percent),
            originality: json!(100 - percent),
            risk: json!(risk),
        })
    }
}

/// Share of sampled phrases found verbatim, truncated toward zero.
fn phrase_percent(hits: usize, samples: usize) -> u8 {
    if samples == 0 {
        return 0;
    }
    (hits.min(samples) * 100 / samples) as u8
}

/// Up to three evenly spaced sentences with more than ten words.
pub fn sample_phrases(text: &str) -> Vec<String> {
    let eligible: Vec<String> = split_sentences(text)
        .into_iter()
        .filter(|s| s.split_whitespace().count() > PHRASE_MIN_WORDS)
        .collect();

    if eligible.len() <= PHRASE_MAX_SAMPLES {
        return eligible;
    }
    (0..PHRASE_MAX_SAMPLES)
        .map(|i| eligible[i * eligible.len() / PHRASE_MAX_SAMPLES].clone())
        .collect()
}

/// Result count from common search response shapes.
fn count_hits(data: &Value) -> u64 {
    for key in ["total", "hits", "count", "totalResults"] {
        match data.get(key) {
            Some(Value::Number(n)) => return n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => return s.trim().parse().unwrap_or(0),
            Some(Value::Array(items)) => return items.len() as u64,
            _ => {}
        }
    }
    for key in ["results", "items", "organic_results"] {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            return items.len() as u64;
        }
    }
    0
}

// ============ Checker ============

/// Never fails: any oracle error or timeout yields the configured fallback.
pub struct PlagiarismChecker {
    oracle: Option<Arc<dyn PlagiarismOracle>>,
    timeout: Duration,
    max_chars: usize,
    fallback: FallbackMode,
}

impl PlagiarismChecker {
    pub fn new(
        oracle: Option<Arc<dyn PlagiarismOracle>>,
        timeout: Duration,
        max_chars: usize,
        fallback: FallbackMode,
    ) -> Self {
        Self {
            oracle,
            timeout,
            max_chars,
            fallback,
        }
    }

    pub fn from_config(config: &PlagiarismConfig) -> Self {
        let oracle: Option<Arc<dyn PlagiarismOracle>> = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|endpoint| -> Arc<dyn PlagiarismOracle> {
                match config.backend {
                    PlagiarismBackend::Service => Arc::new(ServiceOracle::new(endpoint)),
                    PlagiarismBackend::PhraseSearch => Arc::new(PhraseSearchOracle::new(
                        endpoint,
                        Duration::from_millis(config.search_delay_ms),
                    )),
                }
            });
        Self::new(
            oracle,
            Duration::from_secs(config.timeout_secs),
            config.max_chars,
            config.fallback,
        )
    }

    pub async fn check(&self, text: &str) -> PlagiarismResult {
        let truncated = truncate_chars(text, self.max_chars);
        let fallback = match self.fallback {
            FallbackMode::Neutral => PlagiarismResult::unavailable(),
            FallbackMode::Simulated => simulated_reading(truncated),
        };

        let Some(oracle) = self.oracle.as_ref() else {
            info!("[PLAGIARISM] no oracle configured, source={:?}", fallback.source);
            return fallback;
        };

        let label = format!("plagiarism oracle={}", oracle.name());
        let result = with_fallback(
            &label,
            self.timeout,
            async { oracle.check(truncated).await.map(|r| normalize_reading(&r)) },
            fallback,
        )
        .await;

        if result.source == PlagiarismSource::Oracle {
            info!(
                "[PLAGIARISM] oracle={} percent={} risk={}",
                oracle.name(),
                result.percent,
                result.risk.label()
            );
        } else {
            warn!("[PLAGIARISM] using fallback reading source={:?}", result.source);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeOracle {
        reading: Result<OracleReading, String>,
        delay: Duration,
        seen_chars: Mutex<Option<usize>>,
    }

    impl FakeOracle {
        fn ok(reading: OracleReading) -> Self {
            Self {
                reading: Ok(reading),
                delay: Duration::ZERO,
                seen_chars: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PlagiarismOracle for FakeOracle {
        fn name(&self) -> &str {
            "fake"
        }

        async fn check(&self, text: &str) -> Result<OracleReading, PlagiarismError> {
            *self.seen_chars.lock().unwrap() = Some(text.chars().count());
            tokio::time::sleep(self.delay).await;
            self.reading
                .clone()
                .map_err(PlagiarismError::InvalidResponse)
        }
    }

    fn checker(oracle: Arc<dyn PlagiarismOracle>, fallback: FallbackMode) -> PlagiarismChecker {
        PlagiarismChecker::new(Some(oracle), Duration::from_millis(200), 1500, fallback)
    }

    #[test]
    fn test_coerce_percent() {
        assert_eq!(coerce_percent(&json!(55)), Some(55));
        assert_eq!(coerce_percent(&json!(12.6)), Some(13));
        assert_eq!(coerce_percent(&json!("55%")), Some(55));
        assert_eq!(coerce_percent(&json!(" 7 ")), Some(7));
        assert_eq!(coerce_percent(&json!(250)), Some(100));
        assert_eq!(coerce_percent(&json!("n/a")), None);
        assert_eq!(coerce_percent(&Value::Null), None);
    }

    #[test]
    fn test_normalize_reading_defaults() {
        let result = normalize_reading(&OracleReading {
            percent: json!("55%"),
            originality: Value::Null,
            risk: json!("high"),
        });
        assert_eq!(result.percent, 55);
        assert_eq!(result.originality, 45);
        assert_eq!(result.risk, PlagiarismRisk::High);

        let garbage = normalize_reading(&OracleReading {
            percent: json!("??"),
            originality: json!("??"),
            risk: json!("SEVERE"),
        });
        assert_eq!(garbage.percent, 0);
        assert_eq!(garbage.originality, 100);
        assert_eq!(garbage.risk, PlagiarismRisk::Unavailable);
    }

    #[test]
    fn test_simulated_reading_is_deterministic_and_bounded() {
        let a = simulated_reading("some paper text");
        let b = simulated_reading("some paper text");
        assert_eq!(a, b);
        assert!((5..=20).contains(&a.percent));
        assert_eq!(a.originality, 100 - a.percent);
        let expected = if a.percent > 15 {
            PlagiarismRisk::Medium
        } else {
            PlagiarismRisk::Low
        };
        assert_eq!(a.risk, expected);
    }

    #[test]
    fn test_simulated_reading_is_pinned() {
        assert_eq!(simulated_reading("some paper text").percent, 15);
        assert_eq!(simulated_reading("text").percent, 14);
        assert_eq!(simulated_reading("text").risk, PlagiarismRisk::Low);
    }

    #[test]
    fn test_phrase_percent_truncates() {
        assert_eq!(phrase_percent(2, 3), 66);
        assert_eq!(phrase_percent(1, 3), 33);
        assert_eq!(phrase_percent(3, 3), 100);
        assert_eq!(phrase_percent(0, 0), 0);
    }

    #[test]
    fn test_reading_from_body() {
        let reading = reading_from_body(&json!({"plagiarism": 12, "risk": "LOW"})).unwrap();
        assert_eq!(reading.percent, json!(12));
        assert!(reading.originality.is_null());
        assert!(reading_from_body(&json!({"status": "ok"})).is_err());
        assert!(reading_from_body(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_sample_phrases_and_hits() {
        let long = "This particular sentence clearly has well over ten words in it today.";
        let text = format!("Short one. {long} {long} {long} {long}");
        let samples = sample_phrases(&text);
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.split_whitespace().count() > 10));

        assert_eq!(count_hits(&json!({"total": 4})), 4);
        assert_eq!(count_hits(&json!({"results": [1, 2]})), 2);
        assert_eq!(count_hits(&json!({})), 0);
    }

    #[tokio::test]
    async fn test_checker_uses_oracle_reading() {
        let oracle = Arc::new(FakeOracle::ok(OracleReading {
            percent: json!(55),
            originality: json!(45),
            risk: json!("HIGH"),
        }));
        let result = checker(oracle, FallbackMode::Neutral).check("text").await;
        assert_eq!(result.percent, 55);
        assert_eq!(result.source, PlagiarismSource::Oracle);
    }

    #[tokio::test]
    async fn test_checker_truncates_input() {
        let oracle = Arc::new(FakeOracle::ok(OracleReading::default()));
        let text = "x".repeat(4000);
        checker(oracle.clone(), FallbackMode::Neutral).check(&text).await;
        assert_eq!(*oracle.seen_chars.lock().unwrap(), Some(1500));
    }

    #[tokio::test]
    async fn test_checker_failure_falls_back_to_neutral() {
        let oracle = Arc::new(FakeOracle {
            reading: Err("quota".to_string()),
            delay: Duration::ZERO,
            seen_chars: Mutex::new(None),
        });
        let result = checker(oracle, FallbackMode::Neutral).check("text").await;
        assert_eq!(result, PlagiarismResult::unavailable());
    }

    #[tokio::test]
    async fn test_checker_timeout_falls_back_to_simulated() {
        let oracle = Arc::new(FakeOracle {
            reading: Ok(OracleReading::default()),
            delay: Duration::from_secs(5),
            seen_chars: Mutex::new(None),
        });
        let result = checker(oracle, FallbackMode::Simulated).check("text").await;
        assert_eq!(result, simulated_reading("text"));
    }

    #[tokio::test]
    async fn test_unreachable_service_oracle() {
        let checker = PlagiarismChecker::new(
            Some(Arc::new(ServiceOracle::new("http://127.0.0.1:9/check"))),
            Duration::from_secs(3),
            1500,
            FallbackMode::Neutral,
        );
        assert_eq!(checker.check("text").await, PlagiarismResult::unavailable());
    }

    #[tokio::test]
    async fn test_no_oracle_configured() {
        let checker = PlagiarismChecker::from_config(&PlagiarismConfig::default());
        assert_eq!(checker.check("text").await, PlagiarismResult::unavailable());
    }
}
