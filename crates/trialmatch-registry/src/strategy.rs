//! Search strategy generation.
//!
//! A profile becomes an ordered list of independent registry queries, most
//! precise first:
//!   1. gene + each cancer type                  (High)
//!   2. gene mutation / positive / targeted      (High, High, Medium)
//!   3. each cancer type, with metastasis status (Medium)
//!   4. knowledge-base expansions                (Low, at most 8)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use trialmatch_common::match_config::SearchConfig;
use trialmatch_common::{KnowledgeBase, PatientProfile};

const SYNONYMS_PER_CANCER: usize = 3;
const DRUGS_PER_GENE: usize = 3;
const MAX_EXPANSIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn cap(&self, cfg: &SearchConfig) -> Option<usize> {
        match self {
            Priority::High   => cfg.high_priority_cap,
            Priority::Medium => cfg.medium_priority_cap,
            Priority::Low    => cfg.low_priority_cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub query: String,
    pub priority: Priority,
    /// None collects every page.
    pub max_results: Option<usize>,
}

struct StrategyList<'a> {
    cfg: &'a SearchConfig,
    seen: HashSet<String>,
    out: Vec<SearchStrategy>,
}

impl<'a> StrategyList<'a> {
    fn new(cfg: &'a SearchConfig) -> Self {
        Self { cfg, seen: HashSet::new(), out: Vec::new() }
    }

    /// Appends unless empty or already present verbatim.
    fn push(&mut self, query: String, priority: Priority) {
        let query = query.trim().to_string();
        if query.is_empty() || !self.seen.insert(query.clone()) {
            return;
        }
        self.out.push(SearchStrategy {
            max_results: priority.cap(self.cfg),
            query,
            priority,
        });
    }
}

/// Low-priority query terms: synonyms of each cancer, then drugs for the gene.
pub fn expansion_terms(cancers: &[&str], gene: Option<&str>, kb: &KnowledgeBase) -> Vec<String> {
    let synonyms = cancers
        .iter()
        .flat_map(|c| kb.cancer_synonyms(c).iter().take(SYNONYMS_PER_CANCER));
    let drugs = gene
        .map(|g| kb.gene_drugs(g))
        .unwrap_or_default()
        .iter()
        .take(DRUGS_PER_GENE);

    synonyms.chain(drugs).take(MAX_EXPANSIONS).cloned().collect()
}

pub fn build_search_strategies(
    profile: &PatientProfile,
    kb: &KnowledgeBase,
    cfg: &SearchConfig,
) -> Vec<SearchStrategy> {
    let cancers: Vec<&str> = profile.cancer_labels().collect();
    let gene = profile.gene_label();
    let metastasis = profile.metastasis_label();
    let mut list = StrategyList::new(cfg);

    if let Some(gene) = gene {
        for cancer in &cancers {
            list.push(format!("{gene} {cancer}"), Priority::High);
        }
        list.push(format!("{gene} mutation"), Priority::High);
        list.push(format!("{gene} positive"), Priority::High);
        list.push(format!("{gene} targeted therapy"), Priority::Medium);
    }

    for cancer in &cancers {
        list.push(cancer.to_string(), Priority::Medium);
        if let Some(m) = metastasis {
            list.push(format!("{cancer} {m}"), Priority::Medium);
        }
    }

    for term in expansion_terms(&cancers, gene, kb) {
        list.push(term, Priority::Low);
    }

    list.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialmatch_common::profile::PatientProfile;

    fn queries(strategies: &[SearchStrategy]) -> Vec<(&str, Priority)> {
        strategies.iter().map(|s| (s.query.as_str(), s.priority)).collect()
    }

    #[test]
    fn test_egfr_lung_strategy_order() {
        let profile = PatientProfile {
            cancer_types: vec!["lung cancer".into()],
            gene_mutation: "EGFR".into(),
            ..Default::default()
        };
        let s = build_search_strategies(&profile, KnowledgeBase::builtin(), &SearchConfig::default());
        assert_eq!(
            queries(&s),
            vec![
                ("EGFR lung cancer", Priority::High),
                ("EGFR mutation", Priority::High),
                ("EGFR positive", Priority::High),
                ("EGFR targeted therapy", Priority::Medium),
                ("lung cancer", Priority::Medium),
                ("NSCLC", Priority::Low),
                ("non-small cell lung cancer", Priority::Low),
                ("small cell lung cancer", Priority::Low),
                ("osimertinib", Priority::Low),
                ("gefitinib", Priority::Low),
                ("erlotinib", Priority::Low),
            ]
        );
    }

    #[test]
    fn test_metastasis_query_and_caps() {
        let profile = PatientProfile {
            cancer_types: vec!["breast cancer".into()],
            metastasis_status: "oligometastatic".into(),
            ..Default::default()
        };
        let cfg = SearchConfig { medium_priority_cap: Some(50), ..Default::default() };
        let s = build_search_strategies(&profile, KnowledgeBase::builtin(), &cfg);
        assert_eq!(s[0].query, "breast cancer");
        assert_eq!(s[1].query, "breast cancer oligometastatic");
        assert_eq!(s[1].max_results, Some(50));
        assert!(s[2..].iter().all(|x| x.priority == Priority::Low));
        assert_eq!(s[2].max_results, cfg.low_priority_cap);
    }

    #[test]
    fn test_expansions_capped_at_eight() {
        let kb = KnowledgeBase::builtin();
        let terms = expansion_terms(&["lung cancer", "breast cancer", "melanoma"], Some("EGFR"), kb);
        assert_eq!(terms.len(), 8);
        assert_eq!(terms[3], "mammary carcinoma");
    }

    #[test]
    fn test_no_duplicate_queries() {
        // "colon cancer" and "colorectal cancer" list each other as synonyms.
        let profile = PatientProfile {
            cancer_types: vec!["colon cancer".into(), "colorectal cancer".into()],
            ..Default::default()
        };
        let s = build_search_strategies(&profile, KnowledgeBase::builtin(), &SearchConfig::default());
        let mut seen = HashSet::new();
        assert!(s.iter().all(|x| seen.insert(x.query.clone())));
        assert_eq!(s.iter().filter(|x| x.query == "colorectal cancer").count(), 1);
        assert_eq!(s.iter().find(|x| x.query == "colorectal cancer").map(|x| x.priority), Some(Priority::Medium));
    }

    #[test]
    fn test_unknown_gene_and_empty_labels_skipped() {
        let profile = PatientProfile {
            cancer_types: vec!["  ".into()],
            gene_mutation: "unknown".into(),
            ..Default::default()
        };
        assert!(build_search_strategies(&profile, KnowledgeBase::builtin(), &SearchConfig::default()).is_empty());
    }
}
