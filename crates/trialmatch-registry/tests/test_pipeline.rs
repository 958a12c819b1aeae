//! Fan-out collection against a scripted registry.

use pretty_assertions::assert_eq;
use std::time::Duration;

use trialmatch_registry::pipeline::{collect_trial_pool, fetch_details_bounded, FanOutConfig, StrategyStatus};
use trialmatch_registry::strategy::{Priority, SearchStrategy};
use trialmatch_test_utils::{assert_same_ids, ids, MockRegistry, TrialBuilder};

fn strategy(query: &str) -> SearchStrategy {
    SearchStrategy { query: query.to_string(), priority: Priority::High, max_results: None }
}

fn fan_out() -> FanOutConfig {
    FanOutConfig {
        concurrency: 4,
        max_rate_limit_retries: 3,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(1),
        deadline: None,
    }
}

fn trial(id: &str, title: &str) -> trialmatch_common::TrialRecord {
    TrialBuilder::new(id).brief_title(title).build()
}

#[tokio::test]
async fn test_duplicates_across_strategies_merged() {
    let registry = MockRegistry::new()
        .with("EGFR lung cancer", vec![trial("NCT00000001", "first"), trial("NCT00000002", "b")])
        .with("EGFR mutation", vec![trial("NCT00000001", "second"), trial("NCT00000003", "c")]);
    let strategies = vec![strategy("EGFR lung cancer"), strategy("EGFR mutation")];

    let pool = collect_trial_pool(&registry, &strategies, &FanOutConfig { concurrency: 1, ..fan_out() }).await;

    assert_eq!(pool.trials.len(), 3);
    assert_eq!(pool.duplicates, 1);
    let first = pool.trials.iter().find(|t| t.nct_id == "NCT00000001").unwrap();
    assert_eq!(first.brief_title, "first");
    assert_eq!(pool.reports[0].status, StrategyStatus::Completed { returned: 2, new: 2 });
    assert_eq!(pool.reports[1].status, StrategyStatus::Completed { returned: 2, new: 1 });
}

#[tokio::test]
async fn test_failed_strategy_degrades_to_empty() {
    let registry = MockRegistry::new()
        .with("lung cancer", vec![trial("NCT00000004", "kept")])
        .with_failure("EGFR positive", 503);
    let strategies = vec![strategy("EGFR positive"), strategy("lung cancer")];

    let pool = collect_trial_pool(&registry, &strategies, &fan_out()).await;

    assert_eq!(pool.trials.len(), 1);
    assert_eq!(pool.failed(), 1);
    assert!(matches!(pool.reports[0].status, StrategyStatus::Failed { .. }));
    assert_eq!(pool.reports[0].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retried_with_backoff() {
    let registry = MockRegistry::new()
        .with("EGFR mutation", vec![trial("NCT00000005", "x")])
        .with_rate_limit("EGFR mutation", 2, None);

    let pool = collect_trial_pool(&registry, &[strategy("EGFR mutation")], &fan_out()).await;

    assert_eq!(registry.call_count("EGFR mutation"), 3);
    assert_eq!(pool.reports[0].attempts, 3);
    assert_eq!(pool.reports[0].status, StrategyStatus::Completed { returned: 1, new: 1 });
    // 100ms + 200ms of backoff
    assert!(pool.reports[0].elapsed_ms >= 300);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_bounded() {
    let registry = MockRegistry::new()
        .with_rate_limit("EGFR mutation", 10, Some(Duration::from_secs(30)));

    let pool = collect_trial_pool(&registry, &[strategy("EGFR mutation")], &fan_out()).await;

    assert_eq!(registry.call_count("EGFR mutation"), 4);
    assert!(matches!(pool.reports[0].status, StrategyStatus::Failed { .. }));
    assert!(pool.trials.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_keeps_partial_results() {
    let registry = MockRegistry::new()
        .with("fast", vec![trial("NCT00000006", "fast")])
        .with("slow", vec![trial("NCT00000007", "slow")])
        .with_delay("slow", Duration::from_secs(10));
    let cfg = FanOutConfig { deadline: Some(Duration::from_secs(1)), ..fan_out() };

    let pool = collect_trial_pool(&registry, &[strategy("slow"), strategy("fast")], &cfg).await;

    assert_eq!(pool.trials.len(), 1);
    assert_eq!(pool.trials[0].nct_id, "NCT00000006");
    assert_eq!(pool.reports[0].status, StrategyStatus::TimedOut);
    assert_eq!(pool.timed_out(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_identifier_set_independent_of_completion_order() {
    let build = |slow_first: bool| {
        let (a, b) = if slow_first { (5, 0) } else { (0, 5) };
        MockRegistry::new()
            .with("a", vec![trial("NCT00000001", "a1"), trial("NCT00000002", "a2")])
            .with("b", vec![trial("NCT00000002", "b2"), trial("NCT00000003", "b3")])
            .with_delay("a", Duration::from_millis(a))
            .with_delay("b", Duration::from_millis(b))
    };
    let strategies = vec![strategy("a"), strategy("b")];

    let one = collect_trial_pool(&build(true), &strategies, &fan_out()).await;
    let two = collect_trial_pool(&build(false), &strategies, &fan_out()).await;

    assert_same_ids(&one.trials, &two.trials);
    assert_eq!(ids(&one.trials).len(), 3);
}

#[tokio::test]
async fn test_empty_strategy_list() {
    let pool = collect_trial_pool(&MockRegistry::new(), &[], &fan_out()).await;
    assert!(pool.trials.is_empty());
    assert!(pool.reports.is_empty());
}

#[tokio::test]
async fn test_fetch_details_bounded_skips_missing() {
    let registry = MockRegistry::new()
        .with_details(TrialBuilder::new("NCT00000008").summary("details").build());
    let wanted = vec!["NCT00000008".to_string(), "NCT00000009".to_string()];

    let details = fetch_details_bounded(&registry, &wanted, &fan_out()).await;

    assert_eq!(details.len(), 1);
    assert_eq!(details["NCT00000008"].brief_summary, "details");
}
