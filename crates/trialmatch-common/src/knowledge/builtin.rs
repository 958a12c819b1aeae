//! Built-in medical vocabulary.
//!
//! Synonym and drug lists are ordered: the search strategy builder takes the
//! first few entries of each, so the most specific / most searched terms come
//! first.

use std::collections::BTreeMap;

use super::{KnowledgeBase, TermGroup, TreatmentStageGroup};

pub const BUILTIN_VERSION: &str = "builtin-2025.1";

// ── Cancer synonyms ───────────────────────────────────────────────────────────

const CANCER_SYNONYMS: &[(&str, &[&str])] = &[
    ("lung cancer", &[
        "NSCLC", "non-small cell lung cancer", "small cell lung cancer", "SCLC",
        "pulmonary carcinoma", "bronchogenic carcinoma", "pulmonary neoplasm",
        "lung adenocarcinoma", "lung squamous cell carcinoma", "large cell lung cancer",
    ]),
    ("breast cancer", &[
        "mammary carcinoma", "ductal carcinoma", "lobular carcinoma",
        "triple negative breast cancer", "TNBC", "HER2 positive breast cancer",
        "hormone receptor positive breast cancer", "invasive ductal carcinoma",
        "invasive lobular carcinoma", "inflammatory breast cancer",
    ]),
    ("colon cancer", &[
        "colorectal cancer", "CRC", "rectal cancer", "bowel cancer",
        "adenocarcinoma of colon", "sigmoid colon cancer", "cecal cancer",
    ]),
    ("colorectal cancer", &[
        "colon cancer", "rectal cancer", "CRC", "bowel cancer",
        "colorectal adenocarcinoma", "colorectal carcinoma",
    ]),
    ("liver cancer", &[
        "hepatocellular carcinoma", "HCC", "hepatic carcinoma",
        "primary liver cancer", "hepatoma", "liver cell carcinoma",
    ]),
    ("kidney cancer", &[
        "renal cell carcinoma", "RCC", "renal carcinoma", "nephrocarcinoma",
        "clear cell renal cell carcinoma", "papillary renal cell carcinoma",
    ]),
    ("stomach cancer", &[
        "gastric cancer", "gastric carcinoma", "gastric adenocarcinoma",
        "gastroesophageal junction cancer", "GEJ cancer",
    ]),
    ("pancreatic cancer", &[
        "pancreas cancer", "pancreatic adenocarcinoma", "PDAC",
        "pancreatic ductal adenocarcinoma", "pancreatic neuroendocrine tumor", "PNET",
    ]),
    ("prostate cancer", &[
        "prostatic carcinoma", "prostate adenocarcinoma", "PCa",
        "castration resistant prostate cancer", "CRPC", "metastatic prostate cancer",
    ]),
    ("ovarian cancer", &[
        "ovary cancer", "ovarian carcinoma", "epithelial ovarian cancer",
        "serous ovarian cancer", "mucinous ovarian cancer", "ovarian adenocarcinoma",
    ]),
    ("bladder cancer", &[
        "urothelial carcinoma", "transitional cell carcinoma", "TCC",
        "bladder carcinoma", "muscle invasive bladder cancer", "MIBC",
        "non-muscle invasive bladder cancer", "NMIBC",
    ]),
    ("head and neck cancer", &[
        "HNSCC", "head and neck squamous cell carcinoma", "oral cancer",
        "laryngeal cancer", "pharyngeal cancer", "nasopharyngeal cancer",
        "oropharyngeal cancer", "hypopharyngeal cancer",
    ]),
    ("brain cancer", &[
        "glioblastoma", "GBM", "glioma", "brain tumor", "CNS tumor",
        "astrocytoma", "oligodendroglioma", "meningioma", "brain metastases",
    ]),
    ("leukemia", &[
        "acute myeloid leukemia", "AML", "acute lymphoblastic leukemia", "ALL",
        "chronic myeloid leukemia", "CML", "chronic lymphocytic leukemia", "CLL",
        "acute promyelocytic leukemia", "APL", "hairy cell leukemia",
    ]),
    ("lymphoma", &[
        "hodgkin lymphoma", "non-hodgkin lymphoma", "NHL", "B-cell lymphoma",
        "T-cell lymphoma", "diffuse large B-cell lymphoma", "DLBCL",
        "follicular lymphoma", "mantle cell lymphoma", "marginal zone lymphoma",
    ]),
    ("myeloma", &[
        "multiple myeloma", "MM", "plasma cell myeloma", "plasmacytoma",
        "light chain myeloma", "non-secretory myeloma",
    ]),
    ("sarcoma", &[
        "soft tissue sarcoma", "bone sarcoma", "osteosarcoma", "liposarcoma",
        "leiomyosarcoma", "rhabdomyosarcoma", "synovial sarcoma", "fibrosarcoma",
        "angiosarcoma", "chondrosarcoma", "Ewing sarcoma", "GIST",
    ]),
    ("melanoma", &[
        "malignant melanoma", "cutaneous melanoma", "mucosal melanoma",
        "ocular melanoma", "uveal melanoma", "acral melanoma",
    ]),
    ("thyroid cancer", &[
        "papillary thyroid cancer", "follicular thyroid cancer", "medullary thyroid cancer",
        "anaplastic thyroid cancer", "differentiated thyroid cancer",
    ]),
    ("esophageal cancer", &[
        "esophagus cancer", "esophageal adenocarcinoma", "esophageal squamous cell carcinoma",
        "gastroesophageal junction cancer", "Barrett's adenocarcinoma",
    ]),
    ("cervical cancer", &[
        "cervix cancer", "cervical carcinoma", "cervical squamous cell carcinoma",
        "cervical adenocarcinoma", "HPV-related cervical cancer",
    ]),
    ("endometrial cancer", &[
        "uterine cancer", "endometrial carcinoma", "uterine corpus cancer",
        "endometrioid adenocarcinoma", "serous endometrial cancer",
    ]),
];

// ── Gene → targeted drugs ─────────────────────────────────────────────────────

const GENE_DRUGS: &[(&str, &[&str])] = &[
    // EGFR / ALK / BRAF / HER2
    ("EGFR", &["osimertinib", "gefitinib", "erlotinib", "afatinib", "dacomitinib",
               "necitumumab", "cetuximab", "panitumumab", "amivantamab"]),
    ("ALK", &["crizotinib", "alectinib", "ceritinib", "brigatinib", "lorlatinib"]),
    ("BRAF", &["vemurafenib", "dabrafenib", "trametinib", "cobimetinib",
               "encorafenib", "binimetinib"]),
    ("HER2", &["trastuzumab", "pertuzumab", "T-DM1", "trastuzumab emtansine",
               "lapatinib", "neratinib", "tucatinib", "margetuximab",
               "fam-trastuzumab deruxtecan"]),
    ("KRAS", &["sotorasib", "adagrasib", "KRAS G12C inhibitor", "AMG 510", "MRTX849"]),
    ("ROS1", &["crizotinib", "ceritinib", "lorlatinib", "entrectinib", "repotrectinib"]),
    ("MET", &["crizotinib", "cabozantinib", "tepotinib", "capmatinib", "savolitinib"]),
    ("RET", &["selpercatinib", "pralsetinib", "vandetanib", "cabozantinib"]),
    ("NTRK", &["larotrectinib", "entrectinib"]),
    ("TRK", &["larotrectinib", "entrectinib"]),
    // PI3K / AKT / mTOR
    ("PIK3CA", &["alpelisib", "inavolisib", "capivasertib", "ipatasertib"]),
    ("AKT", &["capivasertib", "ipatasertib"]),
    ("MTOR", &["everolimus", "temsirolimus"]),
    // DNA repair
    ("BRCA1", &["olaparib", "rucaparib", "niraparib", "talazoparib", "PARP inhibitor",
                "veliparib", "pamiparib"]),
    ("BRCA2", &["olaparib", "rucaparib", "niraparib", "talazoparib", "PARP inhibitor",
                "veliparib", "pamiparib"]),
    ("ATM", &["olaparib", "PARP inhibitor"]),
    // Immune checkpoints
    ("PD-L1", &["pembrolizumab", "nivolumab", "atezolizumab", "durvalumab", "avelumab",
                "cemiplimab", "dostarlimab"]),
    ("PD-1", &["pembrolizumab", "nivolumab", "cemiplimab", "dostarlimab", "retifanlimab"]),
    ("CTLA-4", &["ipilimumab", "tremelimumab"]),
    // Metabolic / kinase
    ("IDH1", &["ivosidenib", "olutasidenib"]),
    ("IDH2", &["enasidenib"]),
    ("FLT3", &["midostaurin", "gilteritinib", "sorafenib", "quizartinib"]),
    ("JAK2", &["ruxolitinib", "fedratinib", "pacritinib"]),
    ("BTK", &["ibrutinib", "acalabrutinib", "zanubrutinib"]),
    // FGFR
    ("FGFR", &["erdafitinib", "pemigatinib", "infigratinib", "futibatinib"]),
    ("FGFR1", &["erdafitinib", "pemigatinib", "infigratinib"]),
    ("FGFR2", &["pemigatinib", "infigratinib", "futibatinib"]),
    ("FGFR3", &["erdafitinib", "pemigatinib"]),
    // Cell cycle / angiogenesis
    ("CDK4", &["palbociclib", "ribociclib", "abemaciclib"]),
    ("CDK6", &["palbociclib", "ribociclib", "abemaciclib"]),
    ("VEGF", &["bevacizumab", "ramucirumab", "aflibercept"]),
    ("VEGFR", &["sunitinib", "sorafenib", "pazopanib", "axitinib", "cabozantinib"]),
    // Tumour suppressors / fusions
    ("TP53", &["APR-246", "PRIMA-1"]),
    ("RB1", &["CDK4/6 inhibitor"]),
    ("BCR-ABL", &["imatinib", "dasatinib", "nilotinib", "bosutinib", "ponatinib"]),
    ("EML4-ALK", &["crizotinib", "alectinib", "ceritinib", "brigatinib", "lorlatinib"]),
];

// ── Keyword sets ──────────────────────────────────────────────────────────────

const EXCLUDED_CANCER_TYPES: &[&str] = &[
    // Digestive
    "colorectal", "gastric", "esophageal", "pancreatic", "liver",
    "gallbladder", "cholangiocarcinoma", "bile duct",
    // Genitourinary
    "prostate", "bladder", "kidney", "renal", "ovarian", "cervical",
    "endometrial", "uterine", "testicular", "penile",
    // Haematological
    "leukemia", "lymphoma", "myeloma", "hodgkin", "non-hodgkin",
    "acute myeloid leukemia", "chronic lymphocytic leukemia",
    // Other solid tumours
    "breast", "head and neck", "brain", "glioblastoma", "mesothelioma",
    "thyroid", "sarcoma", "melanoma", "neuroendocrine", "carcinoid",
    // Paediatric
    "neuroblastoma", "wilms tumor", "rhabdomyosarcoma", "ewing sarcoma",
];

const PAN_CANCER_KEYWORDS: &[&str] = &[
    "solid tumor", "solid tumors", "advanced cancer", "metastatic cancer",
    "refractory cancer", "relapsed cancer", "any cancer type",
    "multiple cancer types", "pan-cancer", "tumor agnostic",
    "histology independent", "site agnostic", "basket trial",
    "umbrella trial", "precision medicine", "biomarker driven",
];

const BROAD_ELIGIBILITY_KEYWORDS: &[&str] = &[
    "solid tumor", "advanced cancer", "metastatic cancer", "any cancer",
];

const GENE_FOCUSED_KEYWORDS: &[&str] = &[
    "mutation", "positive", "amplification", "overexpression",
    "fusion", "rearrangement", "alteration", "variant",
    "biomarker", "targeted therapy", "precision oncology",
    "molecular profiling", "genetic testing", "companion diagnostic",
];

const MOLECULAR_PROFILING_KEYWORDS: &[&str] = &[
    "biomarker", "molecular profiling", "genetic testing", "mutation",
];

const INFECTION_EXCLUSION_PHRASES: &[&str] = &[
    "active infection", "ongoing infection", "uncontrolled infection",
    "systemic infection", "serious infection",
];

const INFECTION_CAUTION_PHRASES: &[&str] = &[
    "active infection", "ongoing infection", "uncontrolled infection",
];

// ── Study-design vocabulary ───────────────────────────────────────────────────

const THERAPEUTIC_INTERVENTION_TYPES: &[&str] = &[
    "drug", "biological", "radiation", "procedure",
    "device", "combination product", "genetic",
];

const INTERVENTIONAL_TITLE_KEYWORDS: &[&str] = &[
    "phase i", "phase ii", "phase iii", "phase 1", "phase 2", "phase 3",
    "randomized", "controlled", "versus", "vs", "compared",
    "treatment", "therapy", "drug", "medication", "chemotherapy",
    "immunotherapy", "targeted therapy", "radiation", "surgery",
    "combination", "monotherapy", "dose", "efficacy", "safety",
    "clinical trial", "therapeutic",
];

const OBSERVATIONAL_TITLE_KEYWORDS: &[&str] = &[
    "observational", "registry", "surveillance", "epidemiologic",
    "natural history", "retrospective", "prospective cohort",
    "case-control", "cross-sectional", "survey", "questionnaire",
    "biomarker study", "correlative", "companion study",
];

const THERAPEUTIC_ENDPOINTS: &[&str] = &[
    "response rate", "progression free survival", "overall survival",
    "complete response", "partial response", "disease control",
    "time to progression", "duration of response", "safety",
    "maximum tolerated dose", "dose limiting toxicity", "efficacy",
];

const THERAPEUTIC_PHASES: &[&str] = &["PHASE1", "PHASE2", "PHASE3", "PHASE4"];

// ── Term groups ───────────────────────────────────────────────────────────────

/// Organ systems whose severe disease is a common hard exclusion.
/// The group name is the canonical term looked for in exclusion phrases.
const ORGAN_SYSTEMS: &[(&str, &[&str])] = &[
    ("cardiac", &["cardiac", "heart", "cardiovascular"]),
    ("renal",   &["renal", "kidney"]),
    ("liver",   &["liver", "hepatic"]),
    ("lung",    &["lung", "pulmonary", "respiratory"]),
    ("brain",   &["brain", "cerebral", "cns"]),
];

const COMORBIDITY_GROUPS: &[(&str, &[&str])] = &[
    ("heart disease",               &["cardiac", "heart", "cardiovascular"]),
    ("active autoimmune disease",   &["autoimmune", "immune"]),
    ("severe liver/kidney dysfunction", &["liver", "hepatic", "renal", "kidney"]),
    ("pregnancy or nursing",        &["pregnancy", "pregnant", "nursing", "lactating"]),
];

const PERFORMANCE_STATUS_DESCRIPTIONS: &[&str] = &[
    "fully active, able to carry on all pre-disease performance",
    "restricted in physically strenuous activity but ambulatory",
    "ambulatory and capable of all selfcare but unable to work",
    "capable of only limited selfcare, confined to bed/chair >50% of time",
    "completely disabled, cannot carry on any selfcare",
];

fn treatment_stages() -> Vec<TreatmentStageGroup> {
    vec![
        TreatmentStageGroup {
            stage: "Treatment-naive".into(),
            patient_terms: strings(&["naive", "untreated", "not yet treated", "newly diagnosed", "new"]),
            trial_terms: strings(&["treatment-naive", "first-line", "untreated"]),
            matched_points: 6,
            unmatched_points: 4,
        },
        TreatmentStageGroup {
            stage: "First-line".into(),
            patient_terms: strings(&["first-line", "first line", "1st line", "frontline", "front-line"]),
            trial_terms: strings(&["first-line", "front-line"]),
            matched_points: 6,
            unmatched_points: 4,
        },
        TreatmentStageGroup {
            stage: "Second-line or later".into(),
            patient_terms: strings(&[
                "second-line", "second line", "2nd line", "third-line", "third line",
                "multi-line", "multiple lines", "later-line", "later line", "heavily pretreated",
            ]),
            trial_terms: strings(&["second-line", "previously treated", "refractory"]),
            matched_points: 6,
            unmatched_points: 3,
        },
        TreatmentStageGroup {
            stage: "Recurrent".into(),
            patient_terms: strings(&["recurrent", "recurrence", "relapse", "observation", "surveillance"]),
            trial_terms: strings(&["recurrent", "relapsed"]),
            matched_points: 5,
            unmatched_points: 3,
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn string_map(items: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    items.iter().map(|(k, v)| (k.to_string(), strings(v))).collect()
}

fn term_groups(items: &[(&str, &[&str])]) -> Vec<TermGroup> {
    items
        .iter()
        .map(|(name, terms)| TermGroup { name: name.to_string(), terms: strings(terms) })
        .collect()
}

/// Assemble the built-in knowledge base.
pub fn tables() -> KnowledgeBase {
    KnowledgeBase {
        version: BUILTIN_VERSION.to_string(),
        cancer_synonyms: string_map(CANCER_SYNONYMS),
        gene_drugs: string_map(GENE_DRUGS),
        excluded_cancer_types: strings(EXCLUDED_CANCER_TYPES),
        pan_cancer_keywords: strings(PAN_CANCER_KEYWORDS),
        broad_eligibility_keywords: strings(BROAD_ELIGIBILITY_KEYWORDS),
        gene_focused_keywords: strings(GENE_FOCUSED_KEYWORDS),
        molecular_profiling_keywords: strings(MOLECULAR_PROFILING_KEYWORDS),
        infection_exclusion_phrases: strings(INFECTION_EXCLUSION_PHRASES),
        infection_caution_phrases: strings(INFECTION_CAUTION_PHRASES),
        organ_systems: term_groups(ORGAN_SYSTEMS),
        comorbidity_groups: term_groups(COMORBIDITY_GROUPS),
        treatment_stages: treatment_stages(),
        therapeutic_intervention_types: strings(THERAPEUTIC_INTERVENTION_TYPES),
        interventional_title_keywords: strings(INTERVENTIONAL_TITLE_KEYWORDS),
        observational_title_keywords: strings(OBSERVATIONAL_TITLE_KEYWORDS),
        therapeutic_endpoints: strings(THERAPEUTIC_ENDPOINTS),
        therapeutic_phases: strings(THERAPEUTIC_PHASES),
        performance_status_descriptions: strings(PERFORMANCE_STATUS_DESCRIPTIONS),
    }
}
