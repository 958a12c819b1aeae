//! Shared fixtures for trialmatch tests.
//!
//! - `TrialBuilder` for terse `TrialRecord` construction
//! - Sample patient profiles
//! - `MockRegistry`, a scripted `TrialRegistry`

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use trialmatch_common::profile::{AgeGroup, PatientProfile, PerformanceStatus, Sex};
use trialmatch_common::trial::{Intervention, SexRestriction, StudyType, TrialLocation, TrialRecord};
use trialmatch_registry::sources::{RegistryError, TrialRegistry};

// ── Trial builder ─────────────────────────────────────────────────────────────

pub struct TrialBuilder {
    trial: TrialRecord,
}

impl TrialBuilder {
    /// Interventional, recruiting, open to all sexes.
    pub fn new(nct_id: &str) -> Self {
        Self {
            trial: TrialRecord {
                nct_id: nct_id.to_string(),
                overall_status: "RECRUITING".to_string(),
                study_type: StudyType::Interventional,
                ..Default::default()
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.trial.official_title = title.to_string();
        self
    }

    pub fn brief_title(mut self, title: &str) -> Self {
        self.trial.brief_title = title.to_string();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.trial.brief_summary = summary.to_string();
        self
    }

    pub fn inclusion(mut self, text: &str) -> Self {
        self.trial.inclusion_criteria = text.to_string();
        self
    }

    pub fn exclusion(mut self, text: &str) -> Self {
        self.trial.exclusion_criteria = text.to_string();
        self
    }

    pub fn ages(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.trial.minimum_age = min.map(str::to_string);
        self.trial.maximum_age = max.map(str::to_string);
        self
    }

    pub fn sex(mut self, sex: SexRestriction) -> Self {
        self.trial.sex = sex;
        self
    }

    pub fn study_type(mut self, study_type: StudyType) -> Self {
        self.trial.study_type = study_type;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.trial.overall_status = status.to_string();
        self
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.trial.phases.push(phase.to_string());
        self
    }

    pub fn intervention(mut self, kind: &str, name: &str) -> Self {
        self.trial.interventions.push(Intervention { name: name.to_string(), kind: kind.to_string() });
        self
    }

    pub fn outcome(mut self, measure: &str) -> Self {
        self.trial.primary_outcomes.push(measure.to_string());
        self
    }

    pub fn location(mut self, facility: &str, city: &str) -> Self {
        self.trial.locations.push(TrialLocation {
            facility: facility.to_string(),
            city: city.to_string(),
            ..Default::default()
        });
        self
    }

    pub fn build(self) -> TrialRecord {
        self.trial
    }
}

// ── Sample data ───────────────────────────────────────────────────────────────

/// Male, 40-64, EGFR-mutant lung cancer, ECOG 1, no surgery, fully consenting.
pub fn egfr_lung_profile() -> PatientProfile {
    PatientProfile {
        sex: Sex::Male,
        age_group: AgeGroup::From40To64,
        diagnosed: true,
        cancer_types: vec!["lung cancer".to_string()],
        gene_mutation: "EGFR".to_string(),
        recent_surgery: Some(false),
        performance_status: PerformanceStatus::Known(1),
        willing_to_share_records: true,
        consent_data_collection: true,
        ..Default::default()
    }
}

/// A trial every gate lets `egfr_lung_profile` through.
pub fn egfr_lung_trial(nct_id: &str) -> TrialRecord {
    TrialBuilder::new(nct_id)
        .title("Osimertinib in EGFR-Mutant Lung Cancer")
        .inclusion("Histologically confirmed NSCLC with EGFR mutation. ECOG ≤ 1.")
        .exclusion("Prior EGFR TKI therapy.")
        .ages(Some("18 Years"), Some("99 Years"))
        .phase("PHASE2")
        .intervention("DRUG", "Osimertinib")
        .build()
}

pub fn female_only_trial(nct_id: &str) -> TrialRecord {
    TrialBuilder::new(nct_id)
        .title("Adjuvant Therapy in Women With Lung Cancer")
        .inclusion("Female patients with lung cancer.")
        .sex(SexRestriction::Female)
        .build()
}

/// CT.gov-shaped study payload with the given id and title.
pub fn ctgov_study_json(nct_id: &str, title: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "protocolSection": {
            "identificationModule": {"nctId": nct_id, "briefTitle": title},
            "statusModule": {"overallStatus": status},
            "designModule": {"studyType": "INTERVENTIONAL", "phases": ["PHASE2"]},
            "eligibilityModule": {
                "eligibilityCriteria": "Inclusion Criteria:\n* Adults\n\nExclusion Criteria:\n* Pregnancy",
                "sex": "ALL",
                "minimumAge": "18 Years"
            }
        }
    })
}

pub fn ids(trials: &[TrialRecord]) -> BTreeSet<String> {
    trials.iter().map(|t| t.nct_id.clone()).collect()
}

/// Asserts both lists hold the same identifier set, ignoring order.
pub fn assert_same_ids(left: &[TrialRecord], right: &[TrialRecord]) {
    pretty_assertions::assert_eq!(ids(left), ids(right));
}

// ── Mock registry ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Scripted {
    Status(u16),
    RateLimited { times: u32, retry_after: Option<Duration> },
}

/// Scripted registry. Unknown queries return no trials.
#[derive(Default)]
pub struct MockRegistry {
    results: HashMap<String, Vec<TrialRecord>>,
    scripted: Mutex<HashMap<String, Scripted>>,
    delays: HashMap<String, Duration>,
    details: HashMap<String, TrialRecord>,
    calls: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, trials: Vec<TrialRecord>) -> Self {
        self.results.insert(query.to_string(), trials);
        self
    }

    /// Every search for `query` fails with this HTTP status.
    pub fn with_failure(self, query: &str, code: u16) -> Self {
        self.scripted_insert(query, Scripted::Status(code))
    }

    /// The first `times` searches for `query` are rate limited.
    pub fn with_rate_limit(self, query: &str, times: u32, retry_after: Option<Duration>) -> Self {
        self.scripted_insert(query, Scripted::RateLimited { times, retry_after })
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn with_details(mut self, record: TrialRecord) -> Self {
        self.details.insert(record.nct_id.clone(), record);
        self
    }

    fn scripted_insert(mut self, query: &str, s: Scripted) -> Self {
        if let Ok(map) = self.scripted.get_mut() {
            map.insert(query.to_string(), s);
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, query: &str) -> usize {
        self.calls().iter().filter(|q| q.as_str() == query).count()
    }

    fn next_scripted(&self, query: &str) -> Option<RegistryError> {
        let mut map = self.scripted.lock().ok()?;
        match map.get_mut(query)? {
            Scripted::Status(code) => Some(RegistryError::Status { code: *code, body: "scripted".to_string() }),
            Scripted::RateLimited { times, retry_after } if *times > 0 => {
                *times -= 1;
                Some(RegistryError::RateLimited { retry_after: *retry_after })
            }
            Scripted::RateLimited { .. } => None,
        }
    }
}

#[async_trait]
impl TrialRegistry for MockRegistry {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<TrialRecord>, RegistryError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.to_string());
        }
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(err) = self.next_scripted(query) {
            return Err(err);
        }

        let mut trials = self.results.get(query).cloned().unwrap_or_default();
        if let Some(max) = max_results {
            trials.truncate(max);
        }
        Ok(trials)
    }

    async fn fetch_details(&self, nct_id: &str) -> Result<Option<TrialRecord>, RegistryError> {
        Ok(self.details.get(nct_id).cloned())
    }
}
