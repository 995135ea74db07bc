// Configuration Storage Service
// Handles config file read/write, version backup and environment overrides

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::DEFAULT_MODEL;
use crate::services::review::classifier::KeywordSets;
use crate::services::review::plagiarism::{FallbackMode, PlagiarismBackend};
use crate::services::review::sections::SegmentationStrategy;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub plagiarism: PlagiarismConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub keywords: KeywordSets,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            generation: GenerationConfig::default(),
            plagiarism: PlagiarismConfig::default(),
            segmenter: SegmenterConfig::default(),
            review: ReviewConfig::default(),
            keywords: KeywordSets::default(),
        }
    }
}

impl AppConfig {
    /// Apply `PAPERLENS_*` environment overrides on top of the stored values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_value("PAPERLENS_OLLAMA_URL") {
            self.generation.base_url = url;
        }
        if let Some(model) = env_value("PAPERLENS_MODEL") {
            self.generation.default_model = model;
        }
        if let Some(url) = env_value("PAPERLENS_SEGMENTER_URL") {
            self.segmenter.service_url = Some(url);
        }
        if let Some(url) = env_value("PAPERLENS_PLAGIARISM_URL") {
            self.plagiarism.endpoint = Some(url);
        }
    }

    /// Load the stored config (or defaults) and apply environment overrides.
    /// A broken config file is logged and replaced by defaults.
    pub fn load_effective() -> Self {
        let mut config = match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir).load().unwrap_or_else(|e| {
                warn!("[CONFIG] falling back to defaults: {}", e);
                AppConfig::default()
            }),
            None => AppConfig::default(),
        };
        config.apply_env_overrides();
        config
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_rewrite_temperature")]
    pub rewrite_temperature: f64,
    #[serde(default = "default_critique_temperature")]
    pub critique_temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Rewrites per category; later items pass through unchanged.
    #[serde(default = "default_rewrite_cap")]
    pub rewrite_cap: usize,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            default_model: default_model(),
            timeout_secs: default_generation_timeout(),
            rewrite_temperature: default_rewrite_temperature(),
            critique_temperature: default_critique_temperature(),
            max_tokens: None,
            rewrite_cap: default_rewrite_cap(),
            max_concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: PlagiarismBackend,
    pub endpoint: Option<String>,
    #[serde(default = "default_plagiarism_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default)]
    pub fallback: FallbackMode,
    #[serde(default = "default_search_delay")]
    pub search_delay_ms: u64,
}

impl Default for PlagiarismConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: PlagiarismBackend::default(),
            endpoint: None,
            timeout_secs: default_plagiarism_timeout(),
            max_chars: default_max_chars(),
            fallback: FallbackMode::default(),
            search_delay_ms: default_search_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmenterConfig {
    pub service_url: Option<String>,
    #[serde(default = "default_segmenter_timeout")]
    pub timeout_secs: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout_secs: default_segmenter_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfig {
    #[serde(default = "default_true")]
    pub enrich: bool,
    #[serde(default)]
    pub segmentation: SegmentationStrategy,
    #[serde(default = "default_true")]
    pub include_improvements: bool,
    #[serde(default = "default_report_items")]
    pub report_items: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enrich: true,
            segmentation: SegmentationStrategy::default(),
            include_improvements: true,
            report_items: default_report_items(),
        }
    }
}

fn default_version() -> String { "1.0.0".to_string() }
fn default_true() -> bool { true }
fn default_ollama_url() -> String { DEFAULT_OLLAMA_URL.to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_generation_timeout() -> u64 { 30 }
fn default_rewrite_temperature() -> f64 { 0.15 }
fn default_critique_temperature() -> f64 { 0.2 }
fn default_rewrite_cap() -> usize { 3 }
fn default_concurrency() -> usize { 4 }
fn default_plagiarism_timeout() -> u64 { 20 }
fn default_max_chars() -> usize { 1500 }
fn default_search_delay() -> u64 { 2000 }
fn default_segmenter_timeout() -> u64 { 30 }
fn default_report_items() -> usize { 5 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("paperlens"))
    }

    /// Store in the default config directory.
    pub fn open_default() -> Result<Self, String> {
        Self::default_config_dir()
            .map(Self::new)
            .ok_or_else(|| "No config directory available on this platform".to_string())
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file, defaults when absent
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration, backing up the previous file first
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Write a default config. Returns false when one exists and `force` is unset.
    pub fn init(&self, force: bool) -> Result<bool, String> {
        if self.config_file.exists() && !force {
            return Ok(false);
        }
        self.save(&AppConfig::default())?;
        Ok(true)
    }

    /// Load, modify and save the stored config.
    pub fn update(&self, apply: impl FnOnce(&mut AppConfig)) -> Result<AppConfig, String> {
        let mut config = self.load()?;
        apply(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first; the timestamped name breaks mtime ties
        entries.sort_by_key(|e| {
            let modified = e
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            (modified, e.file_name())
        });

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}
