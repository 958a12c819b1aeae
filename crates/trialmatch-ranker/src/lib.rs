//! trialmatch-ranker — eligibility gating, scoring and categorisation of
//! registry trials against one patient profile.

pub mod criteria;
pub mod gate;
pub mod weights;
pub mod scorer;
pub mod categorize;
pub mod summary;
pub mod matcher;

pub use categorize::{categorize, CategorizedTrials};
pub use gate::{EligibilityDecision, EligibilityGate, Gate, GateOutcome};
pub use matcher::{match_patient, MatchReport, SearchStatistics};
pub use scorer::{score_trial, FactorScore, ScoreBreakdown, ScoredTrial};
pub use summary::{PatientSummary, TreatmentReadiness};
pub use weights::{Factor, MatchLevel};
