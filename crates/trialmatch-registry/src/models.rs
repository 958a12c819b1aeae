//! ClinicalTrials.gov v2 payload models.
//!
//! Only the modules the matcher reads are modelled. Every module is decoded
//! leniently: a module with an unexpected shape decodes to its default rather
//! than rejecting the whole study. A study without a `protocolSection`
//! object is dropped here, at the boundary.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use tracing::{debug, warn};

use trialmatch_common::trial::{
    GeoPoint, Intervention, SexRestriction, StudyType, TrialContact, TrialLocation, TrialRecord,
};

/// Decode a field, falling back to its default when the payload shape is off.
fn lenient<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// ── Page envelope ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovPage {
    #[serde(default, deserialize_with = "lenient")]
    pub studies: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub next_page_token: Option<String>,
}

// ── Study ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovStudy {
    #[serde(default)]
    pub protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolSection {
    #[serde(deserialize_with = "lenient")]
    pub identification_module: IdentificationModule,
    #[serde(deserialize_with = "lenient")]
    pub status_module: StatusModule,
    #[serde(deserialize_with = "lenient")]
    pub description_module: DescriptionModule,
    #[serde(deserialize_with = "lenient")]
    pub conditions_module: ConditionsModule,
    #[serde(deserialize_with = "lenient")]
    pub design_module: DesignModule,
    #[serde(deserialize_with = "lenient")]
    pub arms_interventions_module: ArmsInterventionsModule,
    #[serde(deserialize_with = "lenient")]
    pub outcomes_module: OutcomesModule,
    #[serde(deserialize_with = "lenient")]
    pub eligibility_module: EligibilityModule,
    #[serde(deserialize_with = "lenient")]
    pub contacts_locations_module: ContactsLocationsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentificationModule {
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
    pub official_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusModule {
    pub overall_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptionModule {
    pub brief_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionsModule {
    pub conditions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignModule {
    pub study_type: Option<String>,
    pub phases: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArmsInterventionsModule {
    pub interventions: Vec<CtGovIntervention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CtGovIntervention {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutcomesModule {
    pub primary_outcomes: Vec<CtGovOutcome>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CtGovOutcome {
    pub measure: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityModule {
    /// Free-text block holding both inclusion and exclusion criteria.
    pub eligibility_criteria: Option<String>,
    /// Pre-split criteria, present in some mirrors and fixtures.
    pub inclusion_criteria: Option<String>,
    pub exclusion_criteria: Option<String>,
    pub sex: Option<String>,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactsLocationsModule {
    pub locations: Vec<CtGovLocation>,
    pub central_contacts: Vec<CtGovContact>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CtGovLocation {
    pub facility: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub geo_point: Option<CtGovGeoPoint>,
    pub contacts: Vec<CtGovContact>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CtGovGeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CtGovContact {
    pub name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ── Conversion ────────────────────────────────────────────────────────────────

fn clean(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

fn clean_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a combined eligibility block at its "Exclusion Criteria" header.
/// Returns (inclusion, exclusion); text without the header is all inclusion.
pub fn split_eligibility(text: &str) -> (String, String) {
    const HEADER: &str = "exclusion criteria";
    // ASCII lowering keeps byte offsets aligned with the original text.
    let lower = text.to_ascii_lowercase();
    match lower.find(HEADER) {
        Some(idx) => {
            let inclusion = text[..idx].trim();
            let exclusion = text[idx + HEADER.len()..]
                .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
                .trim_end();
            (inclusion.to_string(), exclusion.to_string())
        }
        None => (text.trim().to_string(), String::new()),
    }
}

fn to_contact(c: &CtGovContact) -> TrialContact {
    TrialContact {
        name: clean(c.name.as_deref()),
        role: clean(c.role.as_deref()),
        phone: clean(c.phone.as_deref()),
        email: clean(c.email.as_deref()),
    }
}

fn to_location(loc: &CtGovLocation) -> TrialLocation {
    TrialLocation {
        facility: clean(loc.facility.as_deref()),
        city: clean(loc.city.as_deref()),
        state: clean(loc.state.as_deref()),
        country: clean(loc.country.as_deref()),
        zip: clean(loc.zip.as_deref()),
        status: clean(loc.status.as_deref()),
        geo: loc.geo_point.map(|g| GeoPoint { lat: g.lat, lon: g.lon }),
        contacts: loc.contacts.iter().map(to_contact).collect(),
    }
}

pub fn from_ctgov_study(study: &CtGovStudy) -> TrialRecord {
    let p = &study.protocol_section;
    let id = &p.identification_module;
    let elig = &p.eligibility_module;

    let (inclusion, exclusion) = match (&elig.inclusion_criteria, &elig.exclusion_criteria) {
        (None, None) => split_eligibility(elig.eligibility_criteria.as_deref().unwrap_or_default()),
        (incl, excl) => (clean(incl.as_deref()), clean(excl.as_deref())),
    };

    TrialRecord {
        nct_id: clean(id.nct_id.as_deref()),
        official_title: clean(id.official_title.as_deref()),
        brief_title: clean(id.brief_title.as_deref()),
        brief_summary: clean(p.description_module.brief_summary.as_deref()),
        overall_status: clean(p.status_module.overall_status.as_deref()),
        study_type: StudyType::from_registry(p.design_module.study_type.as_deref().unwrap_or_default()),
        phases: clean_list(&p.design_module.phases),
        conditions: clean_list(&p.conditions_module.conditions),
        inclusion_criteria: inclusion,
        exclusion_criteria: exclusion,
        minimum_age: clean_opt(elig.minimum_age.as_deref()),
        maximum_age: clean_opt(elig.maximum_age.as_deref()),
        sex: SexRestriction::from_registry(elig.sex.as_deref().unwrap_or_default()),
        interventions: p
            .arms_interventions_module
            .interventions
            .iter()
            .map(|i| Intervention {
                name: clean(i.name.as_deref()),
                kind: clean(i.kind.as_deref()),
            })
            .collect(),
        primary_outcomes: p
            .outcomes_module
            .primary_outcomes
            .iter()
            .filter_map(|o| clean_opt(o.measure.as_deref()))
            .collect(),
        locations: p
            .contacts_locations_module
            .locations
            .iter()
            .map(to_location)
            .collect(),
        central_contacts: p
            .contacts_locations_module
            .central_contacts
            .iter()
            .map(to_contact)
            .collect(),
    }
}

/// Parse one raw study. None when the study has no usable protocol section.
pub fn parse_study(raw: &serde_json::Value) -> Option<TrialRecord> {
    if !raw.get("protocolSection").is_some_and(|p| p.is_object()) {
        warn!("Dropping study without a protocolSection object");
        return None;
    }
    match serde_json::from_value::<CtGovStudy>(raw.clone()) {
        Ok(study) => Some(from_ctgov_study(&study)),
        Err(e) => {
            warn!(error = %e, "Dropping undecodable study");
            None
        }
    }
}

pub fn parse_studies(raw: &[serde_json::Value]) -> Vec<TrialRecord> {
    let records: Vec<TrialRecord> = raw.iter().filter_map(parse_study).collect();
    debug!(raw = raw.len(), parsed = records.len(), "Parsed registry studies");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn egfr_study() -> serde_json::Value {
        json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT04000001",
                    "briefTitle": "Osimertinib in EGFR NSCLC",
                    "officialTitle": "A Phase 2 Study of Osimertinib in EGFR-Mutant Lung Cancer"
                },
                "statusModule": {"overallStatus": "RECRUITING"},
                "descriptionModule": {"briefSummary": "Tests osimertinib."},
                "conditionsModule": {"conditions": ["Lung Cancer", " "]},
                "designModule": {"studyType": "INTERVENTIONAL", "phases": ["PHASE2"]},
                "armsInterventionsModule": {
                    "interventions": [{"type": "DRUG", "name": "Osimertinib"}]
                },
                "outcomesModule": {"primaryOutcomes": [{"measure": "Objective response rate"}]},
                "eligibilityModule": {
                    "eligibilityCriteria": "Inclusion Criteria:\n* EGFR mutation\n* ECOG ≤ 1\n\nExclusion Criteria:\n* Active infection",
                    "sex": "ALL",
                    "minimumAge": "18 Years",
                    "maximumAge": "99 Years"
                },
                "contactsLocationsModule": {
                    "locations": [{
                        "facility": "Mass General",
                        "city": "Boston",
                        "state": "Massachusetts",
                        "country": "United States",
                        "geoPoint": {"lat": 42.36, "lon": -71.06},
                        "contacts": [{"name": "Study Nurse", "phone": "555-0100"}]
                    }],
                    "centralContacts": [{"name": "Trial Office", "email": "trials@example.org"}]
                }
            }
        })
    }

    #[test]
    fn test_from_study_full_payload() {
        let trial = parse_study(&egfr_study()).unwrap();
        assert_eq!(trial.nct_id, "NCT04000001");
        assert_eq!(trial.title(), "A Phase 2 Study of Osimertinib in EGFR-Mutant Lung Cancer");
        assert_eq!(trial.study_type, StudyType::Interventional);
        assert_eq!(trial.conditions, vec!["Lung Cancer"]);
        assert!(trial.inclusion_criteria.contains("ECOG ≤ 1"));
        assert!(!trial.inclusion_criteria.contains("Active infection"));
        assert_eq!(trial.exclusion_criteria, "* Active infection");
        assert_eq!(trial.minimum_age.as_deref(), Some("18 Years"));
        assert_eq!(trial.interventions[0].kind, "DRUG");
        assert_eq!(trial.primary_outcomes, vec!["Objective response rate"]);
        assert_eq!(trial.locations[0].geo.map(|g| g.lat), Some(42.36));
        assert_eq!(trial.central_contacts[0].email, "trials@example.org");
    }

    #[test]
    fn test_pre_split_criteria_take_precedence() {
        let trial = parse_study(&json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT00000002"},
                "eligibilityModule": {
                    "inclusionCriteria": "ecog 0-1",
                    "exclusionCriteria": "severe cardiac disease",
                    "eligibilityCriteria": "ignored"
                }
            }
        }))
        .unwrap();
        assert_eq!(trial.inclusion_criteria, "ecog 0-1");
        assert_eq!(trial.exclusion_criteria, "severe cardiac disease");
    }

    #[test]
    fn test_missing_protocol_section_dropped() {
        assert!(parse_study(&json!({"derivedSection": {}})).is_none());
        assert!(parse_study(&json!({"protocolSection": "oops"})).is_none());
    }

    #[test]
    fn test_empty_protocol_section_defaults() {
        let trial = parse_study(&json!({"protocolSection": {}})).unwrap();
        assert_eq!(trial, TrialRecord::default());
    }

    #[test]
    fn test_malformed_module_is_lenient() {
        let trial = parse_study(&json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT00000003", "briefTitle": "Still here"},
                "designModule": {"phases": "PHASE2"},
                "eligibilityModule": ["not", "an", "object"]
            }
        }))
        .unwrap();
        assert_eq!(trial.brief_title, "Still here");
        assert!(trial.phases.is_empty());
        assert_eq!(trial.sex, SexRestriction::All);
    }

    #[test]
    fn test_split_without_header() {
        let (incl, excl) = split_eligibility("  Adults with NSCLC  ");
        assert_eq!(incl, "Adults with NSCLC");
        assert!(excl.is_empty());
    }

    #[test]
    fn test_parse_studies_skips_bad_entries() {
        let raw = vec![egfr_study(), json!(null), json!({"protocolSection": {}})];
        assert_eq!(parse_studies(&raw).len(), 2);
    }

    #[test]
    fn test_page_envelope() {
        let page: CtGovPage = serde_json::from_value(json!({
            "studies": [egfr_study()],
            "nextPageToken": "abc"
        }))
        .unwrap();
        assert_eq!(page.studies.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));

        let last: CtGovPage = serde_json::from_value(json!({"studies": []})).unwrap();
        assert!(last.next_page_token.is_none());
    }
}
