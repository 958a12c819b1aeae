//! Patient summary attached to every match report.

use serde::{Deserialize, Serialize};

use trialmatch_common::{KnowledgeBase, PatientProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentReadiness {
    /// ECOG 0-1 and no active infection.
    High,
    /// ECOG 2.
    Moderate,
    /// Active infection needs resolving first.
    Delayed,
    Variable,
}

impl TreatmentReadiness {
    pub fn assess(profile: &PatientProfile) -> Self {
        match profile.performance_status.code() {
            Some(0..=1) if !profile.active_infection => TreatmentReadiness::High,
            Some(2)                                  => TreatmentReadiness::Moderate,
            _ if profile.active_infection            => TreatmentReadiness::Delayed,
            _                                        => TreatmentReadiness::Variable,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TreatmentReadiness::High     => "Good performance status, no major barriers",
            TreatmentReadiness::Moderate => "Some performance limitations",
            TreatmentReadiness::Delayed  => "Active infection needs resolution first",
            TreatmentReadiness::Variable => "Requires individual assessment",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    #[serde(flatten)]
    pub profile: PatientProfile,
    pub risk_factors: Vec<String>,
    pub treatment_readiness: TreatmentReadiness,
}

impl PatientSummary {
    pub fn new(profile: &PatientProfile, kb: &KnowledgeBase) -> Self {
        Self {
            profile: profile.clone(),
            risk_factors: risk_factors(profile, kb),
            treatment_readiness: TreatmentReadiness::assess(profile),
        }
    }
}

pub fn risk_factors(profile: &PatientProfile, kb: &KnowledgeBase) -> Vec<String> {
    let mut out = Vec::new();

    if profile.active_infection {
        out.push("Active infection - may affect trial eligibility".to_string());
    }
    for condition in &profile.comorbidities {
        if kb.organ_systems_for(condition).next().is_some() {
            out.push(format!("Comorbidity: {condition}"));
        }
    }
    if profile.performance_status.code().is_some_and(|c| c >= 3) {
        out.push("High ECOG score - may limit trial options".to_string());
    }
    if profile.gene_label().is_none() {
        out.push("No genetic testing information - may miss targeted therapy trials".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialmatch_common::PerformanceStatus;

    #[test]
    fn test_readiness() {
        let mut p = PatientProfile { performance_status: PerformanceStatus::Known(1), ..Default::default() };
        assert_eq!(TreatmentReadiness::assess(&p), TreatmentReadiness::High);
        p.active_infection = true;
        assert_eq!(TreatmentReadiness::assess(&p), TreatmentReadiness::Delayed);
        p.performance_status = PerformanceStatus::Known(2);
        assert_eq!(TreatmentReadiness::assess(&p), TreatmentReadiness::Moderate);
        p = PatientProfile::default();
        assert_eq!(TreatmentReadiness::assess(&p), TreatmentReadiness::Variable);
    }

    #[test]
    fn test_risk_factors() {
        let p = PatientProfile {
            active_infection: true,
            comorbidities: vec!["Congestive heart failure".into(), "Hypertension".into()],
            performance_status: PerformanceStatus::Known(3),
            ..Default::default()
        };
        let risks = risk_factors(&p, KnowledgeBase::builtin());
        assert_eq!(risks.len(), 4);
        assert_eq!(risks[1], "Comorbidity: Congestive heart failure");
    }

    #[test]
    fn test_summary_serialises_profile_inline() {
        let p = PatientProfile { gene_mutation: "KRAS".into(), ..Default::default() };
        let json = serde_json::to_value(PatientSummary::new(&p, KnowledgeBase::builtin())).unwrap();
        assert_eq!(json["gene_mutation"], "KRAS");
        assert_eq!(json["treatment_readiness"], "Variable");
        assert!(json["risk_factors"].as_array().unwrap().is_empty());
    }
}
