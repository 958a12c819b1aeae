//! Scoring factors, their point ceilings, and the qualitative match levels.

use serde::{Deserialize, Serialize};
use std::fmt;

use trialmatch_common::match_config::LevelThresholds;

/// The nine scored factors, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    CancerType,
    GeneMutation,
    Metastasis,
    PerformanceStatus,
    TreatmentStage,
    Age,
    Sex,
    HealthSafety,
    Participation,
}

impl Factor {
    pub const ALL: [Factor; 9] = [
        Factor::CancerType,
        Factor::GeneMutation,
        Factor::Metastasis,
        Factor::PerformanceStatus,
        Factor::TreatmentStage,
        Factor::Age,
        Factor::Sex,
        Factor::HealthSafety,
        Factor::Participation,
    ];

    /// Point ceiling for the factor. Treatment stage includes surgery.
    pub fn max_points(&self) -> u32 {
        match self {
            Factor::CancerType        => 25,
            Factor::GeneMutation      => 20,
            Factor::Metastasis        => 10,
            Factor::PerformanceStatus => 10,
            Factor::TreatmentStage    => 10,
            Factor::Age               => 5,
            Factor::Sex               => 5,
            Factor::HealthSafety      => 5,
            Factor::Participation     => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Factor::CancerType        => "Cancer type",
            Factor::GeneMutation      => "Gene mutation",
            Factor::Metastasis        => "Metastasis",
            Factor::PerformanceStatus => "Performance status",
            Factor::TreatmentStage    => "Treatment stage",
            Factor::Age               => "Age",
            Factor::Sex               => "Sex",
            Factor::HealthSafety      => "Health safety",
            Factor::Participation     => "Participation",
        }
    }

    /// Sum of every factor ceiling.
    pub fn total_max() -> u32 {
        Self::ALL.iter().map(Factor::max_points).sum()
    }
}

/// Qualitative reading of a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchLevel {
    Limited,
    Possible,
    Good,
    #[serde(rename = "Very Good")]
    VeryGood,
    Excellent,
}

impl MatchLevel {
    pub fn from_total(total: u32, levels: &LevelThresholds) -> Self {
        if total >= levels.excellent {
            MatchLevel::Excellent
        } else if total >= levels.very_good {
            MatchLevel::VeryGood
        } else if total >= levels.good {
            MatchLevel::Good
        } else if total >= levels.possible {
            MatchLevel::Possible
        } else {
            MatchLevel::Limited
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchLevel::Excellent => "Excellent",
            MatchLevel::VeryGood  => "Very Good",
            MatchLevel::Good      => "Good",
            MatchLevel::Possible  => "Possible",
            MatchLevel::Limited   => "Limited",
        }
    }
}

impl fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_ceilings() {
        // Scores are clamped to 100; the ceilings leave headroom below that.
        assert_eq!(Factor::total_max(), 95);
        assert_eq!(Factor::CancerType.max_points(), 25);
    }

    #[test]
    fn test_level_boundaries() {
        let levels = LevelThresholds::default();
        assert_eq!(MatchLevel::from_total(85, &levels), MatchLevel::Excellent);
        assert_eq!(MatchLevel::from_total(84, &levels), MatchLevel::VeryGood);
        assert_eq!(MatchLevel::from_total(55, &levels), MatchLevel::Good);
        assert_eq!(MatchLevel::from_total(35, &levels), MatchLevel::Possible);
        assert_eq!(MatchLevel::from_total(0, &levels), MatchLevel::Limited);
    }

    #[test]
    fn test_custom_levels() {
        let levels = LevelThresholds { excellent: 95, ..Default::default() };
        assert_eq!(MatchLevel::from_total(90, &levels), MatchLevel::VeryGood);
    }

    #[test]
    fn test_level_serialises_display_name() {
        let json = serde_json::to_value(MatchLevel::VeryGood).unwrap();
        assert_eq!(json, serde_json::json!("Very Good"));
    }
}
