//! Trial pool collection.
//!
//! Runs every search strategy against a registry with bounded concurrency and
//! merges the results as they complete:
//!   1. Fan out, at most `concurrency` strategies in flight
//!   2. Retry rate-limited strategies with exponential backoff
//!   3. Degrade any other failure to an empty result, recorded in the report
//!   4. Stop at the deadline; unfinished strategies are reported as timed out
//!
//! The merge itself is single-threaded (`Aggregator`), so only the order of
//! the pool depends on completion order, never its identifier set.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::pin;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use trialmatch_common::match_config::SearchConfig;
use trialmatch_common::TrialRecord;

use crate::dedup::Aggregator;
use crate::sources::{RegistryError, TrialRegistry};
use crate::strategy::{Priority, SearchStrategy};

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FanOutConfig {
    pub concurrency: usize,
    pub max_rate_limit_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Measured from the start of collection.
    pub deadline: Option<Duration>,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for FanOutConfig {
    fn from(cfg: &SearchConfig) -> Self {
        Self {
            concurrency: cfg.concurrency.max(1),
            max_rate_limit_retries: cfg.max_rate_limit_retries,
            initial_backoff: cfg.initial_backoff(),
            max_backoff: cfg.max_backoff(),
            deadline: cfg.deadline(),
        }
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyStatus {
    Completed { returned: usize, new: usize },
    Failed { error: String },
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub query: String,
    pub priority: Priority,
    pub status: StrategyStatus,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

#[derive(Debug, Default)]
pub struct TrialPool {
    /// Unique trials, first-seen order.
    pub trials: Vec<TrialRecord>,
    /// One entry per strategy, in strategy order.
    pub reports: Vec<StrategyReport>,
    pub duplicates: usize,
}

impl TrialPool {
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| matches!(r.status, StrategyStatus::Failed { .. })).count()
    }

    pub fn timed_out(&self) -> usize {
        self.reports.iter().filter(|r| r.status == StrategyStatus::TimedOut).count()
    }
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

struct StrategyOutcome {
    result: Result<Vec<TrialRecord>, RegistryError>,
    attempts: u32,
    elapsed: Duration,
}

async fn run_strategy(
    registry: &dyn TrialRegistry,
    strategy: &SearchStrategy,
    cfg: &FanOutConfig,
) -> StrategyOutcome {
    let started = Instant::now();
    let mut backoff = cfg.initial_backoff.min(cfg.max_backoff);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match registry.search(&strategy.query, strategy.max_results).await {
            Err(RegistryError::RateLimited { retry_after }) if attempts <= cfg.max_rate_limit_retries => {
                let wait = retry_after.unwrap_or(backoff).min(cfg.max_backoff);
                warn!(
                    query = %strategy.query,
                    attempt = attempts,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                backoff = next_backoff(backoff, cfg.max_backoff);
            }
            result => {
                return StrategyOutcome { result, attempts, elapsed: started.elapsed() };
            }
        }
    }
}

/// Run all strategies and merge their results into a deduplicated pool.
///
/// Never fails: registry errors are logged and reported per strategy, and an
/// empty pool is a valid outcome.
#[instrument(skip_all, fields(registry = registry.name(), strategies = strategies.len()))]
pub async fn collect_trial_pool(
    registry: &dyn TrialRegistry,
    strategies: &[SearchStrategy],
    cfg: &FanOutConfig,
) -> TrialPool {
    let deadline = cfg.deadline.map(|d| Instant::now() + d);
    let mut aggregator = Aggregator::new();
    let mut reports: Vec<Option<StrategyReport>> = vec![None; strategies.len()];

    let mut pending = pin!(stream::iter(strategies.iter().enumerate())
        .map(|(idx, strategy)| async move { (idx, run_strategy(registry, strategy, cfg).await) })
        .buffer_unordered(cfg.concurrency.max(1)));

    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, pending.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("Search deadline reached, keeping partial results");
                    break;
                }
            },
            None => pending.next().await,
        };
        let Some((idx, outcome)) = next else { break };
        let strategy = &strategies[idx];

        let status = match outcome.result {
            Ok(trials) => {
                let returned = trials.len();
                let new = aggregator.extend(trials);
                debug!(query = %strategy.query, returned, new, "Strategy complete");
                StrategyStatus::Completed { returned, new }
            }
            Err(e) => {
                warn!(query = %strategy.query, attempts = outcome.attempts, "Strategy failed: {}", e);
                StrategyStatus::Failed { error: e.to_string() }
            }
        };

        reports[idx] = Some(StrategyReport {
            query: strategy.query.clone(),
            priority: strategy.priority,
            status,
            attempts: outcome.attempts,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        });
    }

    let reports: Vec<StrategyReport> = reports
        .into_iter()
        .zip(strategies)
        .map(|(report, strategy)| {
            report.unwrap_or_else(|| StrategyReport {
                query: strategy.query.clone(),
                priority: strategy.priority,
                status: StrategyStatus::TimedOut,
                attempts: 0,
                elapsed_ms: 0,
            })
        })
        .collect();

    let duplicates = aggregator.duplicates();
    let trials = aggregator.finish();
    let pool = TrialPool { trials, reports, duplicates };

    info!(
        n = pool.trials.len(),
        duplicates,
        failed = pool.failed(),
        timed_out = pool.timed_out(),
        "Trial pool collected"
    );
    pool
}

/// Fetch full records for `nct_ids` with the same bounded fan-out.
/// Missing or failed fetches are simply absent from the result.
#[instrument(skip_all, fields(n = nct_ids.len()))]
pub async fn fetch_details_bounded(
    registry: &dyn TrialRegistry,
    nct_ids: &[String],
    cfg: &FanOutConfig,
) -> HashMap<String, TrialRecord> {
    let deadline = cfg.deadline.map(|d| Instant::now() + d);
    let mut details = HashMap::new();

    let mut pending = pin!(stream::iter(nct_ids)
        .map(|id| async move { (id, registry.fetch_details(id).await) })
        .buffer_unordered(cfg.concurrency.max(1)));

    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, pending.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("Detail deadline reached");
                    break;
                }
            },
            None => pending.next().await,
        };
        let Some((id, result)) = next else { break };
        match result {
            Ok(Some(record)) => {
                details.insert(id.clone(), record);
            }
            Ok(None) => debug!(nct_id = %id, "No details available"),
            Err(e) => warn!(nct_id = %id, "Detail fetch failed: {}", e),
        }
    }

    debug!(fetched = details.len(), "Detail enrichment complete");
    details
}
