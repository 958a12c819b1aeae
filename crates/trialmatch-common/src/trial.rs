//! Normalised trial record.
//!
//! Registry payloads are parsed into this shape at the registry boundary
//! (`trialmatch-registry::models`). Every field has a safe default, so the
//! gate and scorer never have to deal with a missing module.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use regex::Regex;

const TRIAL_URL_BASE: &str = "https://clinicaltrials.gov/study";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyType {
    Interventional,
    Observational,
    #[default]
    Unspecified,
}

impl StudyType {
    pub fn from_registry(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "INTERVENTIONAL" => StudyType::Interventional,
            "OBSERVATIONAL"  => StudyType::Observational,
            _                => StudyType::Unspecified,
        }
    }
}

/// Sex restriction declared by a trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SexRestriction {
    #[default]
    All,
    Male,
    Female,
}

impl SexRestriction {
    /// Unrecognised values are read as unrestricted.
    pub fn from_registry(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "MALE"   => SexRestriction::Male,
            "FEMALE" => SexRestriction::Female,
            _        => SexRestriction::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SexRestriction::All    => "ALL",
            SexRestriction::Male   => "MALE",
            SexRestriction::Female => "FEMALE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub name: String,
    /// Registry intervention type, e.g. "DRUG", "BIOLOGICAL", "BEHAVIORAL".
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialContact {
    pub name: String,
    pub role: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLocation {
    pub facility: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip: String,
    pub status: String,
    pub geo: Option<GeoPoint>,
    pub contacts: Vec<TrialContact>,
}

/// One registry entry. Identity is `nct_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialRecord {
    pub nct_id: String,
    pub official_title: String,
    pub brief_title: String,
    pub brief_summary: String,
    pub overall_status: String,
    pub study_type: StudyType,
    pub phases: Vec<String>,
    pub conditions: Vec<String>,
    pub inclusion_criteria: String,
    pub exclusion_criteria: String,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
    pub sex: SexRestriction,
    pub interventions: Vec<Intervention>,
    pub primary_outcomes: Vec<String>,
    pub locations: Vec<TrialLocation>,
    pub central_contacts: Vec<TrialContact>,
}

impl TrialRecord {
    /// Official title, falling back to the brief title.
    pub fn title(&self) -> &str {
        if self.official_title.trim().is_empty() { &self.brief_title } else { &self.official_title }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", TRIAL_URL_BASE, self.nct_id)
    }

    /// Copies presentation data (summary, sites, contacts) from a detail fetch.
    /// Eligibility-relevant fields are left untouched.
    pub fn merge_details(&mut self, details: &TrialRecord) {
        if !details.brief_summary.is_empty() {
            self.brief_summary = details.brief_summary.clone();
        }
        if !details.locations.is_empty() {
            self.locations = details.locations.clone();
        }
        if !details.central_contacts.is_empty() {
            self.central_contacts = details.central_contacts.clone();
        }
        if self.overall_status.is_empty() {
            self.overall_status = details.overall_status.clone();
        }
    }
}

/// `NCT` followed by exactly eight digits.
pub fn is_valid_nct_id(nct_id: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^NCT\d{8}$").expect("static regex"))
        .is_match(nct_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nct_id_validation() {
        assert!(is_valid_nct_id("NCT04956640"));
        assert!(!is_valid_nct_id("NCT4956640"));
        assert!(!is_valid_nct_id("nct04956640"));
        assert!(!is_valid_nct_id(""));
    }

    #[test]
    fn test_title_fallback() {
        let t = TrialRecord { brief_title: "Short".into(), ..Default::default() };
        assert_eq!(t.title(), "Short");
        let t = TrialRecord { official_title: "Official".into(), brief_title: "Short".into(), ..Default::default() };
        assert_eq!(t.title(), "Official");
    }

    #[test]
    fn test_sex_restriction_defaults_to_all() {
        assert_eq!(SexRestriction::from_registry("female"), SexRestriction::Female);
        assert_eq!(SexRestriction::from_registry(""), SexRestriction::All);
        assert_eq!(SexRestriction::from_registry("BOTH"), SexRestriction::All);
    }

    #[test]
    fn test_merge_details_keeps_eligibility() {
        let mut base = TrialRecord {
            nct_id: "NCT00000001".into(),
            inclusion_criteria: "ecog ≤ 1".into(),
            ..Default::default()
        };
        let details = TrialRecord {
            nct_id: "NCT00000001".into(),
            inclusion_criteria: "different".into(),
            brief_summary: "Summary".into(),
            locations: vec![TrialLocation { facility: "Site A".into(), ..Default::default() }],
            ..Default::default()
        };
        base.merge_details(&details);
        assert_eq!(base.inclusion_criteria, "ecog ≤ 1");
        assert_eq!(base.brief_summary, "Summary");
        assert_eq!(base.locations.len(), 1);
    }
}
