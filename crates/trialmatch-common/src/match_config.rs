//! Matching run configuration.
//!
//! Everything a caller can tune about a run: where the registry lives, how
//! wide the search fan-out is, the tier thresholds and which knowledge base
//! to use. Every field has a default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::TrialMatchError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// ClinicalTrials.gov v2 API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Studies per page, capped at 1000 by the API.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between page requests.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Overall statuses kept by the search; empty keeps everything.
    #[serde(default = "default_statuses")]
    pub relevant_statuses: Vec<String>,

    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
}

fn default_base_url() -> String { "https://clinicaltrials.gov/api/v2".to_string() }
fn default_page_size() -> usize { 1000 }
fn default_timeout_secs() -> u64 { 30 }
fn default_page_delay_ms() -> u64 { 100 }
fn default_statuses() -> Vec<String> {
    vec!["RECRUITING".to_string(), "NOT_YET_RECRUITING".to_string()]
}
fn default_allowed_hosts() -> Vec<String> {
    crate::sandbox::DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            page_delay_ms: default_page_delay_ms(),
            relevant_statuses: default_statuses(),
            allowed_hosts: default_allowed_hosts(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

// ── Search fan-out ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Strategies in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Wall-clock budget for collection. None waits for every strategy.
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Per-priority result caps attached to each strategy. None is uncapped.
    #[serde(default)]
    pub high_priority_cap: Option<usize>,
    #[serde(default)]
    pub medium_priority_cap: Option<usize>,
    #[serde(default)]
    pub low_priority_cap: Option<usize>,
}

fn default_concurrency() -> usize { 4 }
fn default_max_rate_limit_retries() -> u32 { 3 }
fn default_initial_backoff_ms() -> u64 { 500 }
fn default_max_backoff_ms() -> u64 { 8_000 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            deadline_secs: None,
            high_priority_cap: None,
            medium_priority_cap: None,
            low_priority_cap: None,
        }
    }
}

impl SearchConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

// ── Ranking ───────────────────────────────────────────────────────────────────

/// Category cut-offs: `high > good > possible`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub high: u32,
    pub good: u32,
    pub possible: u32,
}

impl CategoryThresholds {
    pub const fn standard() -> Self {
        Self { high: 75, good: 60, possible: 45 }
    }

    pub const fn conservative() -> Self {
        Self { high: 85, good: 65, possible: 40 }
    }

    /// Named preset lookup: "standard" or "conservative".
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard"     => Some(Self::standard()),
            "conservative" => Some(Self::conservative()),
            _              => None,
        }
    }

    pub fn validate(&self) -> Result<(), TrialMatchError> {
        if self.high > self.good && self.good > self.possible && self.high <= 100 {
            Ok(())
        } else {
            Err(TrialMatchError::Config(format!(
                "category thresholds must satisfy 100 >= high > good > possible, got {}/{}/{}",
                self.high, self.good, self.possible
            )))
        }
    }
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self::standard()
    }
}

/// Minimum totals for the qualitative match levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelThresholds {
    pub excellent: u32,
    pub very_good: u32,
    pub good: u32,
    pub possible: u32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self { excellent: 85, very_good: 70, good: 55, possible: 35 }
    }
}

impl LevelThresholds {
    pub fn validate(&self) -> Result<(), TrialMatchError> {
        if self.excellent > self.very_good && self.very_good > self.good && self.good > self.possible {
            Ok(())
        } else {
            Err(TrialMatchError::Config(
                "level thresholds must be strictly descending from excellent to possible".to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub categories: CategoryThresholds,

    #[serde(default)]
    pub levels: LevelThresholds,

    /// Top trials enriched with a detail fetch.
    #[serde(default = "default_detail_top_n")]
    pub detail_top_n: usize,
}

fn default_detail_top_n() -> usize { 15 }

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            categories: CategoryThresholds::default(),
            levels: LevelThresholds::default(),
            detail_top_n: default_detail_top_n(),
        }
    }
}

// ── Knowledge base ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// YAML, TOML or JSON knowledge base. None uses the built-in tables.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), TrialMatchError> {
        self.ranking.categories.validate()?;
        self.ranking.levels.validate()?;
        if self.search.concurrency == 0 {
            return Err(TrialMatchError::Config("search.concurrency must be at least 1".to_string()));
        }
        if self.registry.page_size == 0 || self.registry.page_size > 1000 {
            return Err(TrialMatchError::Config(format!(
                "registry.page_size must be within 1..=1000, got {}",
                self.registry.page_size
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TrialMatchError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
