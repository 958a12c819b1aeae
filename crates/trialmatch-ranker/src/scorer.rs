//! Match score computation.
//!
//! Nine independent factor scores, each clamped to its ceiling (see
//! `weights::Factor`), summed and clamped to [0, 100]:
//!
//!   total = clamp(Σ min(points_f, max_f), 0, 100)
//!
//! Only trials that passed every gate are scored. Missing text simply lands
//! in the fallback tier of each factor.

use serde::{Deserialize, Serialize};

use trialmatch_common::match_config::LevelThresholds;
use trialmatch_common::knowledge::mentions_symbol;
use trialmatch_common::{KnowledgeBase, PatientProfile, SexRestriction, TrialRecord};

use crate::criteria;
use crate::weights::{Factor, MatchLevel};

pub const RISK_AGE: &str = "Age restriction";
pub const RISK_SEX: &str = "Sex restriction";
pub const RISK_HEALTH: &str = "Health safety concerns";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub points: u32,
    pub max: u32,
    pub explanation: String,
}

impl FactorScore {
    fn new(factor: Factor, points: u32, explanation: impl Into<String>) -> Self {
        let max = factor.max_points();
        Self { factor, points: points.min(max), max, explanation: explanation.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// One entry per factor, in `Factor::ALL` order.
    pub factors: Vec<FactorScore>,
    pub total: u32,
    pub level: MatchLevel,
}

impl ScoreBreakdown {
    pub fn points(&self, factor: Factor) -> u32 {
        self.factors
            .iter()
            .find(|f| f.factor == factor)
            .map(|f| f.points)
            .unwrap_or(0)
    }
}

/// An eligible trial with its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTrial {
    pub trial: TrialRecord,
    pub breakdown: ScoreBreakdown,
    pub risk_flags: Vec<String>,
    pub url: String,
}

impl ScoredTrial {
    pub fn total(&self) -> u32 {
        self.breakdown.total
    }

    pub fn nct_id(&self) -> &str {
        &self.trial.nct_id
    }
}

/// Lower-cased text fields shared by the factor functions.
struct TrialText {
    title: String,
    inclusion: String,
    exclusion: String,
}

impl TrialText {
    fn of(trial: &TrialRecord) -> Self {
        Self {
            title: trial.title().to_lowercase(),
            inclusion: trial.inclusion_criteria.to_lowercase(),
            exclusion: trial.exclusion_criteria.to_lowercase(),
        }
    }
}

// ── Factors ───────────────────────────────────────────────────────────────────

/// Scored against the first declared cancer only.
pub fn score_cancer_type(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> FactorScore {
    let f = Factor::CancerType;
    let Some(primary) = profile.primary_cancer() else {
        return FactorScore::new(f, 5, "Cancer type needed for accurate matching");
    };
    let text = TrialText::of(trial);
    let cancer = primary.to_lowercase();

    if text.title.contains(&cancer) {
        return FactorScore::new(f, 25, format!("Trial designed for {primary}"));
    }
    if text.inclusion.contains(&cancer) {
        return FactorScore::new(f, 20, format!("{primary} named in the eligibility criteria"));
    }
    if let Some(synonym) = kb.cancer_synonyms(primary).iter().find(|s| {
        let s = s.to_lowercase();
        text.title.contains(&s) || text.inclusion.contains(&s)
    }) {
        return FactorScore::new(f, 15, format!("Trial includes {synonym}, matching {primary}"));
    }
    if kb.is_broad_eligibility(&text.title) || kb.is_broad_eligibility(&text.inclusion) {
        return FactorScore::new(f, 10, "Broad eligibility across cancer types");
    }
    FactorScore::new(f, 5, "Cancer type match unclear, needs eligibility review")
}

pub fn score_gene_mutation(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> FactorScore {
    let f = Factor::GeneMutation;
    let Some(gene) = profile.gene_label() else {
        return FactorScore::new(f, 5, "No genetic testing information");
    };
    let text = TrialText::of(trial);
    let symbol = gene.to_uppercase();

    if mentions_symbol(&text.title, gene) {
        return FactorScore::new(f, 20, format!("{symbol} targeted trial"));
    }
    if mentions_symbol(&text.inclusion, gene) {
        return FactorScore::new(f, 18, format!("Eligibility targets {symbol} alterations"));
    }
    let g = gene.to_lowercase();
    let patterns = [format!("{g} mutation"), format!("{g} positive"), format!("{g}+"), format!("{g} targeted")];
    if patterns.iter().any(|p| text.inclusion.contains(p.as_str())) {
        return FactorScore::new(f, 15, format!("Trial focuses on {symbol} alterations"));
    }
    if kb.mentions_molecular_profiling(&text.inclusion) {
        return FactorScore::new(f, 8, format!("Molecular profiling trial, {symbol} status relevant"));
    }
    FactorScore::new(f, 3, format!("Non-targeted trial, {symbol} status not a selection criterion"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetastasisClass {
    None,
    Oligo,
    Extensive,
}

fn classify_metastasis(label: &str) -> Option<MetastasisClass> {
    let l = label.to_lowercase();
    if l.contains("no metastasis") || l.contains("non-metastatic") {
        Some(MetastasisClass::None)
    } else if l.contains("oligometastatic") {
        Some(MetastasisClass::Oligo)
    } else if l.contains("extensive") {
        Some(MetastasisClass::Extensive)
    } else {
        None
    }
}

pub fn score_metastasis(trial: &TrialRecord, profile: &PatientProfile) -> FactorScore {
    let f = Factor::Metastasis;
    let inclusion = trial.inclusion_criteria.to_lowercase();
    let has = |k: &str| inclusion.contains(k);

    match profile.metastasis_label().and_then(classify_metastasis) {
        Some(MetastasisClass::None) if has("locally advanced") || has("non-metastatic") => {
            FactorScore::new(f, 10, "Trial designed for non-metastatic disease")
        }
        Some(MetastasisClass::None) => FactorScore::new(f, 7, "Non-metastatic status noted"),
        Some(MetastasisClass::Oligo) if has("oligometastatic") || has("limited metastases") => {
            FactorScore::new(f, 10, "Oligometastatic trial")
        }
        Some(MetastasisClass::Oligo) if has("metastatic") => {
            FactorScore::new(f, 8, "Metastatic trial suits oligometastatic disease")
        }
        Some(MetastasisClass::Oligo) => FactorScore::new(f, 6, "Limited metastatic disease noted"),
        Some(MetastasisClass::Extensive) if has("metastatic") || has("advanced") => {
            FactorScore::new(f, 10, "Trial designed for metastatic disease")
        }
        Some(MetastasisClass::Extensive) => FactorScore::new(f, 6, "Extensive metastatic disease noted"),
        None => FactorScore::new(f, 5, "Disease stage not classified"),
    }
}

pub fn score_performance_status(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> FactorScore {
    let f = Factor::PerformanceStatus;
    let Some(code) = profile.performance_status.code() else {
        return FactorScore::new(f, 5, "Performance status assessment needed");
    };
    let ceiling = criteria::ecog_ceiling(&trial.inclusion_criteria);
    let desc = kb
        .performance_status_description(code)
        .map(|d| format!("ECOG {code} ({d})"))
        .unwrap_or_else(|| format!("ECOG {code}"));

    let points = match (code, ceiling) {
        (0..=1, None)              => 10,
        (0..=1, Some(c)) if c >= 1 => 10,
        (0..=1, Some(0))           => 8,
        (0..=1, Some(_))           => 5,
        (2, None)                  => 8,
        (2, Some(c)) if c >= 2     => 8,
        (2, Some(_))               => 3,
        (_, Some(c)) if c >= 3     => 6,
        _                          => 2,
    };
    let verdict = match points {
        10 => "qualifies for most trials",
        8  => "acceptable",
        6  => "trial accepts higher scores",
        _  => "may limit eligibility",
    };
    FactorScore::new(f, points, format!("{desc}: {verdict}"))
}

/// Stage points (up to 6) plus surgery points (up to 4), capped at 10.
pub fn score_treatment_stage(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> FactorScore {
    let f = Factor::TreatmentStage;
    let inclusion = trial.inclusion_criteria.to_lowercase();
    let mut notes = Vec::new();

    let stage_points = match profile.treatment_stage_label().and_then(|l| kb.treatment_stage_for(l)) {
        Some(group) if group.trial_terms.iter().any(|t| inclusion.contains(&t.to_lowercase())) => {
            notes.push(format!("{} matches trial design", group.stage));
            group.matched_points
        }
        Some(group) => {
            notes.push(format!("{} noted", group.stage));
            group.unmatched_points
        }
        None => {
            notes.push("treatment stage to be determined".to_string());
            2
        }
    };

    let surgery_points = match profile.recent_surgery {
        Some(true) if inclusion.contains("recent surgery") || inclusion.contains("post-operative") => {
            notes.push("recent surgery matches trial design".to_string());
            4
        }
        Some(true) if inclusion.contains("surgery") => {
            notes.push("recent surgery timing may affect eligibility".to_string());
            2
        }
        Some(true) => {
            notes.push("recent surgery may need a washout period".to_string());
            1
        }
        Some(false) => {
            notes.push("no recent surgery".to_string());
            3
        }
        None => {
            notes.push("surgery history to be confirmed".to_string());
            2
        }
    };

    FactorScore::new(f, stage_points + surgery_points, notes.join(", "))
}

pub fn score_age(trial: &TrialRecord, profile: &PatientProfile) -> FactorScore {
    let f = Factor::Age;
    let Some(range) = criteria::trial_age_range(trial) else {
        return FactorScore::new(f, 5, "No age restrictions");
    };
    let patient = profile.age_group.score_range();
    let group = profile.age_group;

    if criteria::range_contains(range, patient) {
        FactorScore::new(f, 5, format!("{group} within trial age range"))
    } else if criteria::ranges_overlap(range, patient) {
        FactorScore::new(f, 3, format!("{group} partially overlaps trial age range"))
    } else {
        FactorScore::new(f, 0, format!("{group} outside trial age range ({}-{})", range.0, range.1))
    }
}

pub fn score_sex(trial: &TrialRecord, profile: &PatientProfile) -> FactorScore {
    let f = Factor::Sex;
    if trial.sex == SexRestriction::All {
        return FactorScore::new(f, 5, "Open to all sexes");
    }
    if trial.sex.as_str() == profile.sex.as_registry_str() {
        FactorScore::new(f, 5, format!("Trial includes {} patients", profile.sex.as_str()))
    } else {
        FactorScore::new(f, 0, format!("Trial restricted to {}", trial.sex.as_str().to_lowercase()))
    }
}

pub fn score_health_safety(trial: &TrialRecord, profile: &PatientProfile, kb: &KnowledgeBase) -> FactorScore {
    let f = Factor::HealthSafety;
    let TrialText { exclusion, .. } = TrialText::of(trial);
    let mut penalty = 0u32;
    let mut concerns = Vec::new();

    if profile.active_infection {
        if kb.mentions_infection_caution(&exclusion) {
            penalty += 3;
            concerns.push("active infection may need resolution".to_string());
        } else {
            penalty += 1;
            concerns.push("active infection noted".to_string());
        }
    }

    for condition in &profile.comorbidities {
        for group in kb.comorbidity_groups_for(condition) {
            if group.mentioned_in(&exclusion) {
                penalty += 2;
                concerns.push(format!("{condition} may affect eligibility"));
            } else {
                penalty += 1;
                concerns.push(format!("{condition} requires evaluation"));
            }
        }
    }

    let points = 5u32.saturating_sub(penalty);
    if concerns.is_empty() {
        FactorScore::new(f, points, "No major safety concerns")
    } else {
        FactorScore::new(f, points, concerns.join("; "))
    }
}

pub fn score_participation(profile: &PatientProfile) -> FactorScore {
    let f = Factor::Participation;
    let raw = if profile.willing_to_share_records { 3 } else { 0 }
        + if profile.consent_data_collection { 2 } else { 0 };
    match raw {
        4.. => FactorScore::new(f, 5, "Ready to share records and data"),
        2.. => FactorScore::new(f, 3, "Partially ready to participate"),
        _   => FactorScore::new(f, 1, "Participation readiness to be discussed"),
    }
}

// ── Composite ─────────────────────────────────────────────────────────────────

/// Score one eligible trial.
pub fn score_trial(
    trial: TrialRecord,
    profile: &PatientProfile,
    kb: &KnowledgeBase,
    levels: &LevelThresholds,
) -> ScoredTrial {
    let factors = vec![
        score_cancer_type(&trial, profile, kb),
        score_gene_mutation(&trial, profile, kb),
        score_metastasis(&trial, profile),
        score_performance_status(&trial, profile, kb),
        score_treatment_stage(&trial, profile, kb),
        score_age(&trial, profile),
        score_sex(&trial, profile),
        score_health_safety(&trial, profile, kb),
        score_participation(profile),
    ];

    let total = factors.iter().map(|f| f.points).sum::<u32>().min(100);
    let breakdown = ScoreBreakdown { level: MatchLevel::from_total(total, levels), factors, total };

    let mut risk_flags = Vec::new();
    if breakdown.points(Factor::Age) == 0 {
        risk_flags.push(RISK_AGE.to_string());
    }
    if breakdown.points(Factor::Sex) == 0 {
        risk_flags.push(RISK_SEX.to_string());
    }
    if breakdown.points(Factor::HealthSafety) < 3 {
        risk_flags.push(RISK_HEALTH.to_string());
    }

    ScoredTrial { url: trial.url(), trial, breakdown, risk_flags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialmatch_common::profile::{AgeGroup, PerformanceStatus, Sex};

    fn kb() -> &'static KnowledgeBase {
        KnowledgeBase::builtin()
    }

    fn trial(title: &str, inclusion: &str, exclusion: &str) -> TrialRecord {
        TrialRecord {
            nct_id: "NCT00000001".into(),
            official_title: title.into(),
            inclusion_criteria: inclusion.into(),
            exclusion_criteria: exclusion.into(),
            ..Default::default()
        }
    }

    fn profile() -> PatientProfile {
        PatientProfile {
            cancer_types: vec!["lung cancer".into()],
            gene_mutation: "EGFR".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cancer_tiers() {
        let p = profile();
        let pts = |t: &TrialRecord| score_cancer_type(t, &p, kb()).points;
        assert_eq!(pts(&trial("Lung Cancer Study", "", "")), 25);
        assert_eq!(pts(&trial("Study", "Patients with lung cancer", "")), 20);
        assert_eq!(pts(&trial("Osimertinib in NSCLC", "", "")), 15);
        assert_eq!(pts(&trial("Drug X in Solid Tumors", "", "")), 10);
        assert_eq!(pts(&trial("Drug X", "", "")), 5);
        assert_eq!(score_cancer_type(&trial("", "", ""), &PatientProfile::default(), kb()).points, 5);
    }

    #[test]
    fn test_gene_tiers() {
        let p = profile();
        let pts = |t: &TrialRecord| score_gene_mutation(t, &p, kb()).points;
        assert_eq!(pts(&trial("EGFR-Mutant NSCLC", "", "")), 20);
        assert_eq!(pts(&trial("Study", "Documented EGFR exon 19 deletion", "")), 18);
        assert_eq!(pts(&trial("Study", "Tumour biomarker testing required", "")), 8);
        assert_eq!(pts(&trial("Study", "Adults", "")), 3);
        assert_eq!(score_gene_mutation(&trial("EGFR", "", ""), &PatientProfile::default(), kb()).points, 5);
    }

    #[test]
    fn test_gene_symbol_needs_word_boundary() {
        let p = PatientProfile { gene_mutation: "MET".into(), ..profile() };
        let t = trial("Metastatic Disease Study", "Metastatic disease", "");
        assert_eq!(score_gene_mutation(&t, &p, kb()).points, 3);
    }

    #[test]
    fn test_metastasis_tiers() {
        let with = |status: &str, inclusion: &str| {
            let p = PatientProfile { metastasis_status: status.into(), ..profile() };
            score_metastasis(&trial("", inclusion, ""), &p).points
        };
        assert_eq!(with("no metastasis", "locally advanced disease"), 10);
        assert_eq!(with("no metastasis", ""), 7);
        assert_eq!(with("oligometastatic", "oligometastatic disease"), 10);
        assert_eq!(with("oligometastatic", "metastatic disease"), 8);
        assert_eq!(with("oligometastatic", ""), 6);
        assert_eq!(with("extensive metastasis", "advanced disease"), 10);
        assert_eq!(with("extensive metastasis", ""), 6);
        assert_eq!(with("unknown", "metastatic"), 5);
    }

    #[test]
    fn test_performance_status_grid() {
        let with = |code: PerformanceStatus, inclusion: &str| {
            let p = PatientProfile { performance_status: code, ..profile() };
            score_performance_status(&trial("", inclusion, ""), &p, kb()).points
        };
        assert_eq!(with(PerformanceStatus::Known(1), ""), 10);
        assert_eq!(with(PerformanceStatus::Known(1), "ECOG ≤ 0"), 8);
        assert_eq!(with(PerformanceStatus::Known(2), "ECOG <= 2"), 8);
        assert_eq!(with(PerformanceStatus::Known(2), "ECOG ≤ 1"), 3);
        assert_eq!(with(PerformanceStatus::Known(3), "ECOG ≤ 3"), 6);
        assert_eq!(with(PerformanceStatus::Known(4), ""), 2);
        assert_eq!(with(PerformanceStatus::Unknown, ""), 5);
    }

    #[test]
    fn test_performance_status_explanation_uses_description() {
        let p = PatientProfile { performance_status: PerformanceStatus::Known(0), ..profile() };
        let s = score_performance_status(&trial("", "", ""), &p, kb());
        assert!(s.explanation.contains("fully active"));
    }

    #[test]
    fn test_treatment_stage_and_surgery() {
        let with = |stage: &str, surgery: Option<bool>, inclusion: &str| {
            let p = PatientProfile { treatment_stage: stage.into(), recent_surgery: surgery, ..profile() };
            score_treatment_stage(&trial("", inclusion, ""), &p, kb()).points
        };
        assert_eq!(with("treatment-naive", Some(false), "untreated patients"), 9);
        assert_eq!(with("second-line or later", None, ""), 5);
        assert_eq!(with("first-line", Some(true), "post-operative adjuvant, first-line"), 10);
        assert_eq!(with("", Some(true), "prior surgery allowed"), 4);
        assert_eq!(with("palliative", Some(true), ""), 3);
    }

    #[test]
    fn test_age_and_sex() {
        let p = PatientProfile { age_group: AgeGroup::From40To64, sex: Sex::Male, ..profile() };
        let mut t = trial("", "", "");
        assert_eq!(score_age(&t, &p).points, 5);
        t.minimum_age = Some("50 Years".into());
        assert_eq!(score_age(&t, &p).points, 3);
        t.minimum_age = Some("70 Years".into());
        assert_eq!(score_age(&t, &p).points, 0);

        t.sex = SexRestriction::Male;
        assert_eq!(score_sex(&t, &p).points, 5);
        t.sex = SexRestriction::Female;
        assert_eq!(score_sex(&t, &p).points, 0);
    }

    #[test]
    fn test_age_score_bracket_defaults() {
        let mut t = trial("", "", "");
        t.minimum_age = Some("18 Years".into());
        t.maximum_age = Some("99 Years".into());

        let unspecified = PatientProfile { age_group: AgeGroup::Unspecified, ..profile() };
        assert_eq!(score_age(&t, &unspecified).points, 5);
        let minor = PatientProfile { age_group: AgeGroup::Under18, ..profile() };
        assert_eq!(score_age(&t, &minor).points, 0);
    }

    #[test]
    fn test_health_safety_infection_only_noted_for_broad_phrases() {
        let p = PatientProfile { active_infection: true, ..profile() };
        let t = trial("", "", "Serious infection within 4 weeks");
        assert_eq!(score_health_safety(&t, &p, kb()).points, 4);
        let t = trial("", "", "Uncontrolled infection");
        assert_eq!(score_health_safety(&t, &p, kb()).points, 2);
    }

    #[test]
    fn test_health_safety_floor() {
        let p = PatientProfile {
            active_infection: true,
            comorbidities: vec!["heart disease".into(), "pregnant".into()],
            ..profile()
        };
        let t = trial("", "", "Active infection. Cardiac disease. Pregnancy.");
        let s = score_health_safety(&t, &p, kb());
        assert_eq!(s.points, 0);

        let p = PatientProfile { active_infection: true, ..profile() };
        assert_eq!(score_health_safety(&trial("", "", ""), &p, kb()).points, 4);
    }

    #[test]
    fn test_participation_tiers() {
        let with = |share: bool, consent: bool| {
            let p = PatientProfile { willing_to_share_records: share, consent_data_collection: consent, ..profile() };
            score_participation(&p).points
        };
        assert_eq!(with(true, true), 5);
        assert_eq!(with(true, false), 3);
        assert_eq!(with(false, true), 3);
        assert_eq!(with(false, false), 1);
    }

    #[test]
    fn test_empty_trial_never_panics_and_stays_bounded() {
        let s = score_trial(TrialRecord::default(), &profile(), kb(), &LevelThresholds::default());
        assert_eq!(s.breakdown.points(Factor::CancerType), 5);
        assert_eq!(s.breakdown.points(Factor::GeneMutation), 3);
        assert_eq!(s.breakdown.factors.len(), 9);
        assert!(s.total() <= 100);
        assert!(s.breakdown.factors.iter().all(|f| f.points <= f.max));
    }

    #[test]
    fn test_risk_flags() {
        let p = PatientProfile {
            sex: Sex::Male,
            age_group: AgeGroup::Under18,
            active_infection: true,
            comorbidities: vec!["kidney disease".into()],
            ..profile()
        };
        let mut t = trial("", "", "Active infection; renal impairment");
        t.minimum_age = Some("18 Years".into());
        t.sex = SexRestriction::Female;
        let s = score_trial(t, &p, kb(), &LevelThresholds::default());
        assert_eq!(s.risk_flags, vec![RISK_AGE, RISK_SEX, RISK_HEALTH]);
    }
}
