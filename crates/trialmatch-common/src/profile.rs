//! Patient clinical profile: the immutable input to a matching run.
//!
//! Free-text answers are kept as labels; the enums below cover the fields
//! whose value set is closed (sex, age bracket, ECOG code). Labels that only
//! say "I don't know" are treated as absent by the accessor methods.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Answers that carry no information.
const UNKNOWN_LABELS: &[&str] = &[
    "unknown", "unclear", "not sure", "unsure", "not known", "n/a", "na", "none known",
];

fn is_unknown_label(label: &str) -> bool {
    let l = label.trim().to_lowercase();
    l.is_empty() || UNKNOWN_LABELS.contains(&l.as_str())
}

fn informative(label: &str) -> Option<&str> {
    if is_unknown_label(label) { None } else { Some(label.trim()) }
}

// ── Sex ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Sex {
    /// Registry vocabulary for this sex: "MALE", "FEMALE" or "ALL".
    pub fn as_registry_str(&self) -> &'static str {
        match self {
            Sex::Male        => "MALE",
            Sex::Female      => "FEMALE",
            Sex::Unspecified => "ALL",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male        => "male",
            Sex::Female      => "female",
            Sex::Unspecified => "unspecified",
        }
    }
}

impl From<String> for Sex {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "male" | "m" | "man"     => Sex::Male,
            "female" | "f" | "woman" => Sex::Female,
            _                        => Sex::Unspecified,
        }
    }
}

impl From<Sex> for String {
    fn from(sex: Sex) -> Self {
        sex.as_str().to_string()
    }
}

// ── Age bracket ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgeGroup {
    Under18,
    From18To39,
    From40To64,
    Over65,
    #[default]
    Unspecified,
}

impl AgeGroup {
    /// Range the age gate tests for overlap. Only the adult brackets narrow
    /// it; every other bracket overlaps any trial.
    pub fn gate_range(&self) -> (u32, u32) {
        match self {
            AgeGroup::From18To39 => (18, 39),
            AgeGroup::From40To64 => (40, 64),
            AgeGroup::Over65     => (65, 100),
            AgeGroup::Under18 | AgeGroup::Unspecified => (0, 150),
        }
    }

    /// Range the age score grades against the trial bounds.
    /// An unspecified bracket is scored as an adult.
    pub fn score_range(&self) -> (u32, u32) {
        match self {
            AgeGroup::Under18     => (0, 17),
            AgeGroup::From18To39  => (18, 39),
            AgeGroup::From40To64  => (40, 64),
            AgeGroup::Over65      => (65, 100),
            AgeGroup::Unspecified => (18, 100),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Under18     => "under 18",
            AgeGroup::From18To39  => "18-39",
            AgeGroup::From40To64  => "40-64",
            AgeGroup::Over65      => "65+",
            AgeGroup::Unspecified => "unspecified",
        }
    }
}

impl From<String> for AgeGroup {
    fn from(raw: String) -> Self {
        let l: String = raw.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
        match l.as_str() {
            "under18" | "<18" | "0-17" | "under-18" => AgeGroup::Under18,
            "18-39"                                 => AgeGroup::From18To39,
            "40-64"                                 => AgeGroup::From40To64,
            "65+" | "65andover" | "65-100" | ">=65" => AgeGroup::Over65,
            _                                       => AgeGroup::Unspecified,
        }
    }
}

impl From<AgeGroup> for String {
    fn from(group: AgeGroup) -> Self {
        group.as_str().to_string()
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Performance status ────────────────────────────────────────────────────────

/// ECOG performance status, 0 (fully active) to 4 (completely disabled).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum PerformanceStatus {
    Known(u8),
    #[default]
    Unknown,
}

impl PerformanceStatus {
    pub fn code(&self) -> Option<u8> {
        match self {
            PerformanceStatus::Known(c) => Some(*c),
            PerformanceStatus::Unknown  => None,
        }
    }

    /// Parses "0".."4", "3+", "≥3", ">=3", "ECOG 2". Anything else is Unknown.
    pub fn parse(raw: &str) -> Self {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.parse::<u8>() {
            Ok(code) if digits.len() == 1 => PerformanceStatus::Known(code.min(4)),
            _ => PerformanceStatus::Unknown,
        }
    }
}

impl From<PerformanceStatus> for String {
    fn from(ps: PerformanceStatus) -> Self {
        match ps {
            PerformanceStatus::Known(c) => c.to_string(),
            PerformanceStatus::Unknown  => "unknown".to_string(),
        }
    }
}

impl fmt::Display for PerformanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceStatus::Known(c) => write!(f, "{c}"),
            PerformanceStatus::Unknown  => f.write_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for PerformanceStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Label(String),
            Missing(Option<()>),
        }

        Ok(match Raw::deserialize(d)? {
            Raw::Code(c)    => PerformanceStatus::Known(c.min(4) as u8),
            Raw::Label(s)   => PerformanceStatus::parse(&s),
            Raw::Missing(_) => PerformanceStatus::Unknown,
        })
    }
}

// ── Profile ───────────────────────────────────────────────────────────────────

/// Questionnaire answers for one matching request. Never mutated after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientProfile {
    #[serde(alias = "gender")]
    pub sex: Sex,
    pub age_group: AgeGroup,
    pub diagnosed: bool,
    pub cancer_types: Vec<String>,
    /// Gene symbol, e.g. "EGFR". Empty or "unknown" when untested.
    pub gene_mutation: String,
    /// e.g. "no metastasis", "oligometastatic", "extensive metastasis"
    pub metastasis_status: String,
    pub recent_surgery: Option<bool>,
    #[serde(alias = "ecog_score", alias = "ecog")]
    pub performance_status: PerformanceStatus,
    /// e.g. "treatment-naive", "first-line", "second-line or later", "recurrent"
    pub treatment_stage: String,
    pub active_infection: bool,
    pub recent_drugs: Vec<String>,
    #[serde(alias = "health_conditions")]
    pub comorbidities: Vec<String>,
    #[serde(alias = "upload_reports")]
    pub willing_to_share_records: bool,
    pub consent_data_collection: bool,
}

impl PatientProfile {
    /// Declared cancer types, trimmed, empty entries skipped.
    pub fn cancer_labels(&self) -> impl Iterator<Item = &str> {
        self.cancer_types.iter().map(|c| c.trim()).filter(|c| !c.is_empty())
    }

    /// The first declared cancer type; scoring is anchored on it.
    pub fn primary_cancer(&self) -> Option<&str> {
        self.cancer_labels().next()
    }

    pub fn gene_label(&self) -> Option<&str> {
        informative(&self.gene_mutation)
    }

    pub fn metastasis_label(&self) -> Option<&str> {
        informative(&self.metastasis_status)
    }

    pub fn treatment_stage_label(&self) -> Option<&str> {
        informative(&self.treatment_stage)
    }
}
