//! trialmatch-registry — Trial discovery.
//!
//! - Search strategy generation from a patient profile
//! - Registry clients (ClinicalTrials.gov v2) behind the `TrialRegistry` trait
//! - Registry payload parsing into `TrialRecord`
//! - Bounded, deadline-aware fan-out with rate-limit retry
//! - Deduplication by NCT identifier

pub mod sources;
pub mod models;
pub mod strategy;
pub mod dedup;
pub mod pipeline;

pub use dedup::Aggregator;
pub use pipeline::{collect_trial_pool, fetch_details_bounded, FanOutConfig, StrategyReport, StrategyStatus, TrialPool};
pub use sources::{RegistryError, TrialRegistry};
pub use strategy::{build_search_strategies, Priority, SearchStrategy};
