//! trialmatch-common — Shared types, errors, and configuration used across all trialmatch crates.

pub mod error;
pub mod profile;
pub mod trial;
pub mod knowledge;
pub mod match_config;
pub mod sandbox;

// Re-export commonly used types
pub use error::{Result, TrialMatchError};
pub use knowledge::KnowledgeBase;
pub use match_config::{CategoryThresholds, LevelThresholds, MatchConfig};
pub use profile::{AgeGroup, PatientProfile, PerformanceStatus, Sex};
pub use trial::{SexRestriction, StudyType, TrialRecord};
