//! End-to-end matching run.
//!
//! This module:
//! 1. Builds search strategies from the profile
//! 2. Collects a deduplicated trial pool from the registry
//! 3. Gates every trial
//! 4. Scores and ranks the eligible ones (total desc, then NCT id)
//! 5. Enriches the top N with a detail fetch
//! 6. Buckets the ranked list and assembles the report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};
use uuid::Uuid;

use trialmatch_common::match_config::LevelThresholds;
use trialmatch_common::{CategoryThresholds, KnowledgeBase, MatchConfig, PatientProfile, TrialMatchError, TrialRecord};
use trialmatch_registry::pipeline::{collect_trial_pool, fetch_details_bounded, FanOutConfig, StrategyReport};
use trialmatch_registry::strategy::build_search_strategies;
use trialmatch_registry::TrialRegistry;

use crate::categorize::{categorize, CategorizedTrials};
use crate::gate::{EligibilityGate, Gate};
use crate::scorer::{score_trial, ScoredTrial};
use crate::summary::PatientSummary;

const DATA_SOURCE: &str = "clinicaltrials.gov_v2";

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStatistics {
    /// Unique trials in the pool, before gating.
    pub total_trials_searched: usize,
    pub duplicates_dropped: usize,
    pub total_qualified_matches: usize,
    pub high_priority_matches: usize,
    pub good_matches: usize,
    pub possible_matches: usize,
    pub low_matches: usize,
    /// Enriched trials that came back with at least one site.
    pub detailed_info_available: usize,
    pub rejections_by_gate: BTreeMap<Gate, usize>,
    pub strategies_run: usize,
    pub strategies_failed: usize,
    pub strategies_timed_out: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub engine_version: &'static str,
    pub knowledge_base_version: String,
    pub registry: String,
    pub data_source: &'static str,
    pub category_thresholds: CategoryThresholds,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub patient_summary: PatientSummary,
    pub search_statistics: SearchStatistics,
    pub strategies: Vec<StrategyReport>,
    pub results_by_category: CategorizedTrials,
    pub metadata: ReportMetadata,
}

/// Score eligible trials and sort them, best first. Ties go to the lower
/// NCT id so the order never depends on registry completion order.
pub fn rank(
    eligible: Vec<TrialRecord>,
    profile: &PatientProfile,
    kb: &KnowledgeBase,
    levels: &LevelThresholds,
) -> Vec<ScoredTrial> {
    let mut scored: Vec<ScoredTrial> = eligible
        .into_iter()
        .map(|t| score_trial(t, profile, kb, levels))
        .collect();
    scored.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.nct_id().cmp(b.nct_id())));
    scored
}

/// Merge detail records into the first `top_n` trials. Returns how many of
/// the enriched trials now list at least one site.
pub async fn enrich_top(
    registry: &dyn TrialRegistry,
    ranked: &mut [ScoredTrial],
    top_n: usize,
    fan_out: &FanOutConfig,
) -> usize {
    let n = top_n.min(ranked.len());
    let top = &mut ranked[..n];
    if top.is_empty() {
        return 0;
    }
    let ids: Vec<String> = top.iter().map(|s| s.trial.nct_id.clone()).collect();
    let details = fetch_details_bounded(registry, &ids, fan_out).await;

    for scored in top.iter_mut() {
        if let Some(d) = details.get(&scored.trial.nct_id) {
            scored.trial.merge_details(d);
        }
    }
    top.iter().filter(|s| !s.trial.locations.is_empty()).count()
}

/// Run one full match for `profile` against `registry`.
///
/// Registry failures never fail the run; they show up in the strategy
/// reports. Only an invalid configuration is an error.
#[instrument(skip_all, fields(registry = registry.name(), cancers = profile.cancer_types.len()))]
pub async fn match_patient(
    profile: &PatientProfile,
    registry: &dyn TrialRegistry,
    kb: &KnowledgeBase,
    cfg: &MatchConfig,
) -> Result<MatchReport, TrialMatchError> {
    cfg.validate()?;
    let run_id = Uuid::new_v4();
    let fan_out = FanOutConfig::from(&cfg.search);

    let strategies = build_search_strategies(profile, kb, &cfg.search);
    info!(%run_id, n = strategies.len(), "Starting match run");

    let pool = collect_trial_pool(registry, &strategies, &fan_out).await;
    let total_trials_searched = pool.trials.len();
    let (failed, timed_out, duplicates) = (pool.failed(), pool.timed_out(), pool.duplicates);

    let gated = EligibilityGate::new(profile, kb).filter(pool.trials);
    let mut ranked = rank(gated.eligible, profile, kb, &cfg.ranking.levels);
    let qualified = ranked.len();

    let detailed = enrich_top(registry, &mut ranked, cfg.ranking.detail_top_n, &fan_out).await;
    let buckets = categorize(ranked, &cfg.ranking.categories);

    let search_statistics = SearchStatistics {
        total_trials_searched,
        duplicates_dropped: duplicates,
        total_qualified_matches: qualified,
        high_priority_matches: buckets.high_priority.len(),
        good_matches: buckets.good_matches.len(),
        possible_matches: buckets.possible_matches.len(),
        low_matches: buckets.low_matches.len(),
        detailed_info_available: detailed,
        rejections_by_gate: gated.rejections,
        strategies_run: strategies.len(),
        strategies_failed: failed,
        strategies_timed_out: timed_out,
    };

    info!(
        %run_id,
        searched = total_trials_searched,
        qualified,
        high = search_statistics.high_priority_matches,
        "Match run complete"
    );

    Ok(MatchReport {
        run_id,
        generated_at: Utc::now(),
        patient_summary: PatientSummary::new(profile, kb),
        search_statistics,
        strategies: pool.reports,
        results_by_category: buckets,
        metadata: ReportMetadata {
            engine_version: env!("CARGO_PKG_VERSION"),
            knowledge_base_version: kb.version.clone(),
            registry: registry.name().to_string(),
            data_source: DATA_SOURCE,
            category_thresholds: cfg.ranking.categories,
        },
    })
}
