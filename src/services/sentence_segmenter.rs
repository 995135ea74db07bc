// Sentence Segmenter Service
// Sentence boundary detection: local rules, or a remote segmenter service with rule fallback

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::services::config_store::SegmenterConfig;
use crate::services::text_processor::split_sentences;

/// Ordered sentence segmentation. Infallible to callers.
#[async_trait]
pub trait SentenceBoundaryDetector: Send + Sync {
    async fn segment(&self, text: &str) -> Vec<String>;
}

/// Local splitter backed by `text_processor::split_sentences`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleSentenceSplitter;

#[async_trait]
impl SentenceBoundaryDetector for RuleSentenceSplitter {
    async fn segment(&self, text: &str) -> Vec<String> {
        split_sentences(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentenceResult {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    sentences: Vec<SentenceResult>,
}

/// Client for an external sentence segmentation service (`POST /segment`).
pub struct SegmenterServiceClient {
    base_url: String,
    client: Client,
    fallback: RuleSentenceSplitter,
}

impl SegmenterServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            fallback: RuleSentenceSplitter,
        }
    }

    pub async fn segment_sentences(&self, text: &str) -> Result<Vec<String>, String> {
        let url = format!("{}/segment", self.base_url);
        let request = SegmentRequest { text, language: "en" };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to call segmenter service: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Segmenter service returned error: {}", response.status()));
        }

        let result: SegmentResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        Ok(result
            .sentences
            .into_iter()
            .map(|s| s.text.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

#[async_trait]
impl SentenceBoundaryDetector for SegmenterServiceClient {
    async fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.segment_sentences(text).await {
            Ok(sentences) => {
                debug!("[SEGMENTER] service returned {} sentences", sentences.len());
                sentences
            }
            Err(e) => {
                warn!("[SEGMENTER] service unavailable, using local rules: {}", e);
                self.fallback.segment(text).await
            }
        }
    }
}

/// Service-backed detector when a URL is configured, local rules otherwise.
pub fn detector_from_config(config: &SegmenterConfig) -> Arc<dyn SentenceBoundaryDetector> {
    match config.service_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Arc::new(SegmenterServiceClient::new(
            url,
            Duration::from_secs(config.timeout_secs),
        )),
        None => Arc::new(RuleSentenceSplitter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_trims_base_url() {
        let client = SegmenterServiceClient::new("http://127.0.0.1:8788/", Duration::from_secs(1));
        assert_eq!(client.base_url, "http://127.0.0.1:8788");
    }

    #[tokio::test]
    async fn test_sentence_fallback_when_service_unavailable() {
        let client = SegmenterServiceClient::new("http://127.0.0.1:9", Duration::from_secs(2));
        let sentences = client
            .segment("The first sentence is here. The second sentence follows.")
            .await;
        assert_eq!(
            sentences,
            vec!["The first sentence is here.", "The second sentence follows."]
        );
    }

    #[tokio::test]
    async fn test_empty_text_yields_nothing() {
        let client = SegmenterServiceClient::new("http://127.0.0.1:9", Duration::from_secs(2));
        assert!(client.segment("  ").await.is_empty());
        assert!(RuleSentenceSplitter.segment("").await.is_empty());
    }

    #[tokio::test]
    async fn test_detector_from_config() {
        let local = detector_from_config(&SegmenterConfig::default());
        assert_eq!(local.segment("One sentence here. Two.").await.len(), 2);

        let remote = detector_from_config(&SegmenterConfig {
            service_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 2,
        });
        assert_eq!(remote.segment("One sentence here. Two.").await.len(), 2);
    }
}
