//! Medical knowledge base.
//!
//! Static vocabulary used by the strategy builder, the eligibility gate and
//! the scorer: cancer synonyms, gene → drug mappings, keyword sets and term
//! groups. The tables are plain data. A compiled-in default is available via
//! [`KnowledgeBase::builtin`]; a replacement can be loaded from YAML, TOML or
//! JSON with [`KnowledgeBase::from_path`]. Sections missing from a file are
//! empty, so tests can load minimal fixtures.
//!
//! Lookups are case-insensitive. Table terms may be written in any case.

mod builtin;

pub use builtin::BUILTIN_VERSION;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::TrialMatchError;

/// Named set of interchangeable terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermGroup {
    pub name: String,
    pub terms: Vec<String>,
}

impl TermGroup {
    /// True when `text` (any case) mentions one of the group's terms.
    pub fn mentioned_in(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.terms.iter().any(|t| lower.contains(&t.to_lowercase()))
    }
}

/// Treatment-stage group: how a patient describes the stage, which trial
/// phrases target it, and the stage points awarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentStageGroup {
    pub stage: String,
    pub patient_terms: Vec<String>,
    pub trial_terms: Vec<String>,
    pub matched_points: u32,
    pub unmatched_points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBase {
    pub version: String,
    /// Cancer type → synonyms, ordered most-specific first.
    pub cancer_synonyms: BTreeMap<String, Vec<String>>,
    /// Gene symbol → targeted drugs.
    pub gene_drugs: BTreeMap<String, Vec<String>>,
    /// Cancer names whose presence in a title signals a different disease focus.
    pub excluded_cancer_types: Vec<String>,
    /// Basket / tumour-agnostic markers; any hit passes the cancer gate.
    pub pan_cancer_keywords: Vec<String>,
    /// Broad-eligibility phrases worth partial cancer points when scoring.
    pub broad_eligibility_keywords: Vec<String>,
    pub gene_focused_keywords: Vec<String>,
    pub molecular_profiling_keywords: Vec<String>,
    /// Infection exclusions that fail the serious-exclusion gate.
    pub infection_exclusion_phrases: Vec<String>,
    /// Narrower list the health-safety score treats as an explicit exclusion.
    pub infection_caution_phrases: Vec<String>,
    pub organ_systems: Vec<TermGroup>,
    pub comorbidity_groups: Vec<TermGroup>,
    pub treatment_stages: Vec<TreatmentStageGroup>,
    pub therapeutic_intervention_types: Vec<String>,
    pub interventional_title_keywords: Vec<String>,
    pub observational_title_keywords: Vec<String>,
    pub therapeutic_endpoints: Vec<String>,
    pub therapeutic_phases: Vec<String>,
    /// Indexed by ECOG code.
    pub performance_status_descriptions: Vec<String>,
}

impl KnowledgeBase {
    /// Shared instance of the compiled-in tables.
    pub fn builtin() -> &'static KnowledgeBase {
        static KB: OnceLock<KnowledgeBase> = OnceLock::new();
        KB.get_or_init(builtin::tables)
    }

    /// Load tables from a file; the format is chosen by extension
    /// (`.yaml`/`.yml`, `.toml` or `.json`).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrialMatchError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let kb: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml"         => toml::from_str(&content)?,
            "json"         => serde_json::from_str(&content)?,
            other => {
                return Err(TrialMatchError::KnowledgeBase(format!(
                    "unsupported knowledge base format '{}' for {}",
                    other,
                    path.display()
                )))
            }
        };
        kb.validate()?;

        debug!(
            path = %path.display(),
            version = %kb.version,
            cancers = kb.cancer_synonyms.len(),
            genes = kb.gene_drugs.len(),
            "Loaded knowledge base"
        );
        Ok(kb)
    }

    /// Rejects tables the scorer cannot use.
    pub fn validate(&self) -> Result<(), TrialMatchError> {
        for group in &self.treatment_stages {
            if group.matched_points > 6 || group.unmatched_points > 6 {
                return Err(TrialMatchError::KnowledgeBase(format!(
                    "treatment stage '{}' awards more than 6 points",
                    group.stage
                )));
            }
            if group.patient_terms.iter().any(|t| t.trim().is_empty()) {
                return Err(TrialMatchError::KnowledgeBase(format!(
                    "treatment stage '{}' has an empty patient term",
                    group.stage
                )));
            }
        }
        for group in self.organ_systems.iter().chain(&self.comorbidity_groups) {
            if group.terms.iter().any(|t| t.trim().is_empty()) {
                return Err(TrialMatchError::KnowledgeBase(format!(
                    "term group '{}' has an empty term",
                    group.name
                )));
            }
        }
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────────────────

    pub fn cancer_synonyms(&self, cancer: &str) -> &[String] {
        lookup(&self.cancer_synonyms, cancer)
    }

    pub fn gene_drugs(&self, gene: &str) -> &[String] {
        lookup(&self.gene_drugs, gene)
    }

    /// True when `text` contains the cancer name or one of its synonyms.
    pub fn mentions_cancer(&self, text: &str, cancer: &str) -> bool {
        let text = text.to_lowercase();
        let cancer = cancer.trim().to_lowercase();
        if !cancer.is_empty() && text.contains(&cancer) {
            return true;
        }
        self.cancer_synonyms(&cancer)
            .iter()
            .any(|s| text.contains(&s.to_lowercase()))
    }

    pub fn is_pan_cancer(&self, text: &str) -> bool {
        contains_any(text, &self.pan_cancer_keywords)
    }

    pub fn is_broad_eligibility(&self, text: &str) -> bool {
        contains_any(text, &self.broad_eligibility_keywords)
    }

    pub fn mentions_molecular_profiling(&self, text: &str) -> bool {
        contains_any(text, &self.molecular_profiling_keywords)
    }

    /// A gene-focused trial uses a gene-focused keyword and names the gene.
    pub fn is_gene_focused(&self, text: &str, gene: &str) -> bool {
        contains_any(text, &self.gene_focused_keywords) && mentions_symbol(text, gene)
    }

    pub fn mentions_infection_exclusion(&self, text: &str) -> bool {
        contains_any(text, &self.infection_exclusion_phrases)
    }

    pub fn mentions_infection_caution(&self, text: &str) -> bool {
        contains_any(text, &self.infection_caution_phrases)
    }

    /// Whether an excluded-cancer keyword refers to one of the patient's
    /// cancers: either string contains the other, or a synonym of the cancer
    /// contains the keyword.
    pub fn keyword_matches_cancer(&self, keyword: &str, cancer: &str) -> bool {
        let keyword = keyword.to_lowercase();
        let cancer = cancer.trim().to_lowercase();
        if cancer.is_empty() {
            return false;
        }
        keyword.contains(&cancer)
            || cancer.contains(&keyword)
            || self
                .cancer_synonyms(&cancer)
                .iter()
                .any(|s| s.to_lowercase().contains(&keyword))
    }

    /// First excluded-cancer keyword in `title` that matches none of
    /// `cancers`.
    pub fn foreign_cancer_in_title<'a, I>(&self, title: &str, cancers: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let title = title.to_lowercase();
        self.excluded_cancer_types
            .iter()
            .filter(|kw| title.contains(&kw.to_lowercase()))
            .find(|kw| {
                !cancers
                    .clone()
                    .into_iter()
                    .any(|c| self.keyword_matches_cancer(kw, c))
            })
            .map(String::as_str)
    }

    /// Organ-system groups a comorbidity label belongs to.
    pub fn organ_systems_for<'a>(&'a self, condition: &'a str) -> impl Iterator<Item = &'a TermGroup> + 'a {
        self.organ_systems.iter().filter(move |g| g.mentioned_in(condition))
    }

    pub fn comorbidity_groups_for<'a>(&'a self, condition: &'a str) -> impl Iterator<Item = &'a TermGroup> + 'a {
        self.comorbidity_groups.iter().filter(move |g| g.mentioned_in(condition))
    }

    /// Stage group whose patient vocabulary matches the label.
    pub fn treatment_stage_for(&self, label: &str) -> Option<&TreatmentStageGroup> {
        let label = label.to_lowercase();
        self.treatment_stages
            .iter()
            .find(|g| g.patient_terms.iter().any(|t| label.contains(&t.to_lowercase())))
    }

    pub fn is_therapeutic_intervention(&self, kind: &str) -> bool {
        let kind = kind.trim().to_lowercase().replace('_', " ");
        self.therapeutic_intervention_types
            .iter()
            .any(|t| t.to_lowercase() == kind)
    }

    pub fn is_observational_title(&self, title: &str) -> bool {
        contains_any(title, &self.observational_title_keywords)
    }

    pub fn is_interventional_title(&self, title: &str) -> bool {
        contains_any(title, &self.interventional_title_keywords)
    }

    pub fn is_therapeutic_endpoint(&self, measure: &str) -> bool {
        contains_any(measure, &self.therapeutic_endpoints)
    }

    pub fn is_therapeutic_phase(&self, phase: &str) -> bool {
        let phase = phase.trim();
        self.therapeutic_phases.iter().any(|p| p.eq_ignore_ascii_case(phase))
    }

    pub fn performance_status_description(&self, code: u8) -> Option<&str> {
        self.performance_status_descriptions
            .get(code as usize)
            .map(String::as_str)
    }
}

fn lookup<'a>(table: &'a BTreeMap<String, Vec<String>>, key: &str) -> &'a [String] {
    let key = key.trim();
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_slice())
        .unwrap_or(&[])
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords.iter().any(|k| text.contains(&k.to_lowercase()))
}

/// Case-insensitive whole-word search for a gene or drug symbol.
/// "MET" matches "MET amplification" but not "metastatic".
pub fn mentions_symbol(text: &str, symbol: &str) -> bool {
    let symbol = symbol.trim().to_lowercase();
    if symbol.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

    text.match_indices(&symbol).any(|(start, m)| {
        let before = text[..start].chars().next_back();
        let after = text[start + m.len()..].chars().next();
        !is_word(before) && !is_word(after)
    })
}
