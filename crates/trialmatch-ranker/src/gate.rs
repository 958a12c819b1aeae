//! Hard eligibility gates.
//!
//! Six checks run in a fixed order and the first failure wins:
//!   1. Cancer type
//!   2. Age
//!   3. Sex
//!   4. Performance status (ECOG)
//!   5. Serious exclusion (organ comorbidity, active infection)
//!   6. Interventional study
//!
//! The gate is conservative: when the trial text is silent it passes, so
//! the scorer rather than the gate decides how good a weak match is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use trialmatch_common::knowledge::mentions_symbol;
use trialmatch_common::{KnowledgeBase, PatientProfile, SexRestriction, StudyType, TrialRecord};

use crate::criteria;

/// Phrasings under which an exclusion names an organ-system condition.
const SEVERITY_FORMS: &[(&str, &str)] = &[
    ("severe ", ""),
    ("active ", ""),
    ("", " failure"),
    ("", " disease"),
    ("uncontrolled ", ""),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    CancerType,
    Age,
    Sex,
    PerformanceStatus,
    SeriousExclusion,
    Interventional,
}

impl Gate {
    pub const ALL: [Gate; 6] = [
        Gate::CancerType,
        Gate::Age,
        Gate::Sex,
        Gate::PerformanceStatus,
        Gate::SeriousExclusion,
        Gate::Interventional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::CancerType        => "cancer_type",
            Gate::Age               => "age",
            Gate::Sex               => "sex",
            Gate::PerformanceStatus => "performance_status",
            Gate::SeriousExclusion  => "serious_exclusion",
            Gate::Interventional    => "interventional",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityDecision {
    Eligible,
    Ineligible(Gate),
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityDecision::Eligible)
    }

    pub fn failed_gate(&self) -> Option<Gate> {
        match self {
            EligibilityDecision::Eligible      => None,
            EligibilityDecision::Ineligible(g) => Some(*g),
        }
    }
}

/// Result of gating a whole pool.
#[derive(Debug, Default)]
pub struct GateOutcome {
    pub eligible: Vec<TrialRecord>,
    pub rejections: BTreeMap<Gate, usize>,
}

impl GateOutcome {
    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

// ── Individual checks ─────────────────────────────────────────────────────────

pub fn passes_cancer_type(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> bool {
    let title = trial.title();
    let inclusion = trial.inclusion_criteria.as_str();

    if profile
        .cancer_labels()
        .any(|c| kb.mentions_cancer(title, c) || kb.mentions_cancer(inclusion, c))
    {
        return true;
    }

    if let Some(gene) = profile.gene_label() {
        let combined = format!("{title} {inclusion}");
        if kb.is_gene_focused(&combined, gene) {
            return true;
        }
        // Pan-gene trials: a gene-focused keyword anywhere, the gene in the criteria.
        let gene_keyword = kb
            .gene_focused_keywords
            .iter()
            .any(|k| combined.to_lowercase().contains(&k.to_lowercase()));
        if gene_keyword && mentions_symbol(inclusion, gene) {
            return true;
        }
    }

    if kb.is_pan_cancer(title) || kb.is_pan_cancer(inclusion) {
        return true;
    }

    let cancers: Vec<&str> = profile.cancer_labels().collect();
    match kb.foreign_cancer_in_title(title, cancers.iter().copied()) {
        Some(keyword) => {
            debug!(nct_id = %trial.nct_id, keyword, "Title targets a different cancer");
            false
        }
        None => true,
    }
}

pub fn passes_age(trial: &TrialRecord, profile: &PatientProfile) -> bool {
    match criteria::trial_age_range(trial) {
        Some(range) => criteria::ranges_overlap(profile.age_group.gate_range(), range),
        None        => true,
    }
}

pub fn passes_sex(trial: &TrialRecord, profile: &PatientProfile) -> bool {
    trial.sex == SexRestriction::All || trial.sex.as_str() == profile.sex.as_registry_str()
}

pub fn passes_performance_status(trial: &TrialRecord, profile: &PatientProfile) -> bool {
    let Some(code) = profile.performance_status.code() else {
        return true;
    };
    let inclusion = &trial.inclusion_criteria;

    if criteria::ecog_ceilings(inclusion).iter().any(|ceiling| code > *ceiling) {
        return false;
    }
    if criteria::excludes_ecog(&trial.exclusion_criteria, code) {
        return false;
    }
    code < 3 || criteria::admits_poor_performance(inclusion)
}

pub fn passes_serious_exclusion(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> bool {
    let exclusion = trial.exclusion_criteria.to_lowercase();

    let organ_excluded = profile.comorbidities.iter().any(|condition| {
        kb.organ_systems_for(condition).any(|group| {
            group.terms.iter().any(|term| {
                let term = term.to_lowercase();
                SEVERITY_FORMS
                    .iter()
                    .any(|(pre, post)| exclusion.contains(&format!("{pre}{term}{post}")))
            })
        })
    });
    if organ_excluded {
        return false;
    }

    !(profile.active_infection && kb.mentions_infection_exclusion(&exclusion))
}

pub fn passes_interventional(trial: &TrialRecord, kb: &KnowledgeBase) -> bool {
    match trial.study_type {
        StudyType::Interventional => return true,
        StudyType::Observational  => return false,
        StudyType::Unspecified    => {}
    }

    if trial.interventions.iter().any(|i| kb.is_therapeutic_intervention(&i.kind)) {
        return true;
    }
    let title = trial.title();
    if kb.is_observational_title(title) {
        return false;
    }
    if kb.is_interventional_title(title) {
        return true;
    }
    if trial.primary_outcomes.iter().any(|m| kb.is_therapeutic_endpoint(m)) {
        return true;
    }
    if trial.phases.iter().any(|p| kb.is_therapeutic_phase(p)) {
        return true;
    }
    true
}

// ── Gate ──────────────────────────────────────────────────────────────────────

/// Eligibility gate bound to one patient and knowledge base.
pub struct EligibilityGate<'a> {
    profile: &'a PatientProfile,
    kb: &'a KnowledgeBase,
}

impl<'a> EligibilityGate<'a> {
    pub fn new(profile: &'a PatientProfile, kb: &'a KnowledgeBase) -> Self {
        Self { profile, kb }
    }

    pub fn evaluate(&self, trial: &TrialRecord) -> EligibilityDecision {
        let p = self.profile;
        let failed = Gate::ALL.into_iter().find(|gate| !match gate {
            Gate::CancerType        => passes_cancer_type(trial, p, self.kb),
            Gate::Age               => passes_age(trial, p),
            Gate::Sex               => passes_sex(trial, p),
            Gate::PerformanceStatus => passes_performance_status(trial, p),
            Gate::SeriousExclusion  => passes_serious_exclusion(trial, p, self.kb),
            Gate::Interventional    => passes_interventional(trial, self.kb),
        });
        match failed {
            Some(gate) => EligibilityDecision::Ineligible(gate),
            None       => EligibilityDecision::Eligible,
        }
    }

    /// Gate every trial in the pool, keeping pool order.
    pub fn filter(&self, trials: Vec<TrialRecord>) -> GateOutcome {
        let mut outcome = GateOutcome::default();
        for trial in trials {
            match self.evaluate(&trial) {
                EligibilityDecision::Eligible => outcome.eligible.push(trial),
                EligibilityDecision::Ineligible(gate) => {
                    debug!(nct_id = %trial.nct_id, gate = %gate, "Trial rejected");
                    *outcome.rejections.entry(gate).or_default() += 1;
                }
            }
        }
        info!(
            eligible = outcome.eligible.len(),
            rejected = outcome.rejected(),
            "Eligibility gating complete"
        );
        outcome
    }
}
