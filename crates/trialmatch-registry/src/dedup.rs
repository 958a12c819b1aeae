//! Deduplication of registry results.
//!
//! Trials are keyed solely by NCT identifier, trimmed of surrounding
//! whitespace. The first occurrence wins and later copies are dropped whole,
//! even when their fields differ. Records without an identifier are discarded.
//! Failed strategies never reach the aggregator; the pipeline records them in
//! its strategy reports instead.

use std::collections::HashSet;
use tracing::debug;

use trialmatch_common::TrialRecord;

/// Incremental merger, fed one strategy result at a time.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashSet<String>,
    trials: Vec<TrialRecord>,
    duplicates: usize,
    missing_id: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Returns true when it was new.
    pub fn push(&mut self, mut trial: TrialRecord) -> bool {
        if trial.nct_id.trim().len() != trial.nct_id.len() {
            trial.nct_id = trial.nct_id.trim().to_string();
        }
        if trial.nct_id.is_empty() {
            self.missing_id += 1;
            return false;
        }
        if !self.seen.insert(trial.nct_id.clone()) {
            self.duplicates += 1;
            return false;
        }
        self.trials.push(trial);
        true
    }

    /// Add every record of one result list. Returns how many were new.
    pub fn extend<I: IntoIterator<Item = TrialRecord>>(&mut self, trials: I) -> usize {
        trials.into_iter().map(|t| self.push(t)).filter(|added| *added).count()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn contains(&self, nct_id: &str) -> bool {
        self.seen.contains(nct_id.trim())
    }

    /// Unique trials in first-seen order.
    pub fn finish(self) -> Vec<TrialRecord> {
        debug!(
            unique = self.trials.len(),
            duplicates = self.duplicates,
            missing_id = self.missing_id,
            "Deduplication complete"
        );
        self.trials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn trial(id: &str, title: &str) -> TrialRecord {
        TrialRecord { nct_id: id.into(), brief_title: title.into(), ..Default::default() }
    }

    fn merged(batches: Vec<Vec<TrialRecord>>) -> Vec<TrialRecord> {
        let mut agg = Aggregator::new();
        for batch in batches {
            agg.extend(batch);
        }
        agg.finish()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let out = merged(vec![
            vec![trial("NCT00000001", "first")],
            vec![trial("NCT00000001", "second"), trial("NCT00000002", "other")],
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].brief_title, "first");
        assert_eq!(out[1].nct_id, "NCT00000002");
    }

    #[test]
    fn test_missing_ids_skipped() {
        let out = merged(vec![vec![trial("", "no id"), trial("   ", "blank"), trial("NCT00000003", "kept")]]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].nct_id, "NCT00000003");
    }

    #[test]
    fn test_padded_id_normalised_once() {
        let mut agg = Aggregator::new();
        assert!(agg.push(trial(" NCT00000004 ", "padded")));
        assert!(!agg.push(trial("NCT00000004", "plain")));
        assert!(agg.contains("NCT00000004"));
        let out = agg.finish();
        assert_eq!(out[0].nct_id, "NCT00000004");
        assert_eq!(out[0].brief_title, "padded");
    }

    #[test]
    fn test_idempotent() {
        let once = merged(vec![vec![
            trial("NCT00000001", "a"),
            trial("NCT00000002", "b"),
            trial("NCT00000001", "c"),
        ]]);
        let twice = merged(vec![once.clone()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_id_set_independent_of_order() {
        let a = vec![trial("NCT00000001", "a"), trial("NCT00000002", "b")];
        let b = vec![trial("NCT00000002", "b2"), trial("NCT00000003", "c")];
        let ids = |v: Vec<TrialRecord>| v.into_iter().map(|t| t.nct_id).collect::<BTreeSet<_>>();
        assert_eq!(
            ids(merged(vec![a.clone(), b.clone()])),
            ids(merged(vec![b, a])),
        );
    }

    #[test]
    fn test_aggregator_counts() {
        let mut agg = Aggregator::new();
        assert_eq!(agg.extend(vec![trial("NCT00000001", "a"), trial("NCT00000001", "a")]), 1);
        assert!(agg.contains("NCT00000001"));
        assert_eq!(agg.duplicates(), 1);
        assert_eq!(agg.len(), 1);
    }
}
