//! Bucketing of scored trials by category thresholds.

use serde::{Deserialize, Serialize};

use trialmatch_common::CategoryThresholds;

use crate::scorer::ScoredTrial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HighPriority,
    GoodMatch,
    PossibleMatch,
    LowMatch,
}

impl Category {
    pub fn for_total(total: u32, thresholds: &CategoryThresholds) -> Self {
        if total >= thresholds.high {
            Category::HighPriority
        } else if total >= thresholds.good {
            Category::GoodMatch
        } else if total >= thresholds.possible {
            Category::PossibleMatch
        } else {
            Category::LowMatch
        }
    }
}

/// Four disjoint buckets; every input trial lands in exactly one.
/// Input order is preserved within each bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorizedTrials {
    pub high_priority: Vec<ScoredTrial>,
    pub good_matches: Vec<ScoredTrial>,
    pub possible_matches: Vec<ScoredTrial>,
    pub low_matches: Vec<ScoredTrial>,
}

impl CategorizedTrials {
    pub fn len(&self) -> usize {
        self.high_priority.len() + self.good_matches.len() + self.possible_matches.len() + self.low_matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket(&self, category: Category) -> &[ScoredTrial] {
        match category {
            Category::HighPriority  => &self.high_priority,
            Category::GoodMatch     => &self.good_matches,
            Category::PossibleMatch => &self.possible_matches,
            Category::LowMatch      => &self.low_matches,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredTrial> {
        self.high_priority
            .iter()
            .chain(&self.good_matches)
            .chain(&self.possible_matches)
            .chain(&self.low_matches)
    }
}

pub fn categorize(scored: Vec<ScoredTrial>, thresholds: &CategoryThresholds) -> CategorizedTrials {
    let mut out = CategorizedTrials::default();
    for trial in scored {
        let bucket = match Category::for_total(trial.total(), thresholds) {
            Category::HighPriority  => &mut out.high_priority,
            Category::GoodMatch     => &mut out.good_matches,
            Category::PossibleMatch => &mut out.possible_matches,
            Category::LowMatch      => &mut out.low_matches,
        };
        bucket.push(trial);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::ScoreBreakdown;
    use crate::weights::MatchLevel;
    use trialmatch_common::TrialRecord;

    fn scored(id: &str, total: u32) -> ScoredTrial {
        let trial = TrialRecord { nct_id: id.into(), ..Default::default() };
        ScoredTrial {
            url: trial.url(),
            trial,
            breakdown: ScoreBreakdown { factors: Vec::new(), total, level: MatchLevel::Limited },
            risk_flags: Vec::new(),
        }
    }

    #[test]
    fn test_standard_boundaries() {
        let t = CategoryThresholds::standard();
        let out = categorize(
            vec![scored("a", 75), scored("b", 74), scored("c", 60), scored("d", 45), scored("e", 44)],
            &t,
        );
        assert_eq!(out.high_priority.len(), 1);
        assert_eq!(out.good_matches.len(), 2);
        assert_eq!(out.possible_matches.len(), 1);
        assert_eq!(out.low_matches[0].nct_id(), "e");
    }

    #[test]
    fn test_partition_complete_and_disjoint() {
        let input: Vec<ScoredTrial> = (0..=100).step_by(7).map(|s| scored(&format!("t{s}"), s)).collect();
        let n = input.len();
        let out = categorize(input, &CategoryThresholds::conservative());
        assert_eq!(out.len(), n);
        let mut ids: Vec<&str> = out.iter().map(|t| t.nct_id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), n);
    }

    #[test]
    fn test_conservative_preset_moves_trials_down() {
        let out = categorize(vec![scored("a", 80)], &CategoryThresholds::conservative());
        assert_eq!(out.bucket(Category::GoodMatch).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(categorize(Vec::new(), &CategoryThresholds::default()).is_empty());
    }
}
