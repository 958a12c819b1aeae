//! Free-text eligibility parsing.
//!
//! Registry criteria are prose. The helpers here pull out the two numeric
//! constraints the gate and scorer care about: age bounds and ECOG limits.
//! All patterns are case-insensitive and compiled once.

use regex::Regex;
use std::sync::OnceLock;

use trialmatch_common::TrialRecord;

/// Upper age bound used when a trial states none.
pub const MAX_AGE: u32 = 150;

// ── Age ───────────────────────────────────────────────────────────────────────

/// First integer embedded in an age string: "18 Years" → 18, "6 Months" → 6.
pub fn parse_age_years(raw: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
}

fn stated(bound: &Option<String>) -> Option<&str> {
    bound.as_deref().map(str::trim).filter(|b| !b.is_empty())
}

/// Inclusive age range of a trial, or None when it states neither bound.
/// An unparseable minimum reads as 0 and an unparseable maximum as 150.
pub fn trial_age_range(trial: &TrialRecord) -> Option<(u32, u32)> {
    let min = stated(&trial.minimum_age);
    let max = stated(&trial.maximum_age);
    if min.is_none() && max.is_none() {
        return None;
    }
    Some((
        min.and_then(parse_age_years).unwrap_or(0),
        max.and_then(parse_age_years).unwrap_or(MAX_AGE),
    ))
}

pub fn ranges_overlap(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// True when `inner` lies entirely within `outer`.
pub fn range_contains(outer: (u32, u32), inner: (u32, u32)) -> bool {
    outer.0 <= inner.0 && inner.1 <= outer.1
}

// ── ECOG ──────────────────────────────────────────────────────────────────────

fn ceiling_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?i)ecog.{0,15}[≤<=]\s*([0-3])").expect("static regex"),
            Regex::new(r"(?i)performance.{0,25}status.{0,15}[≤<=]\s*([0-3])").expect("static regex"),
            Regex::new(r"(?i)ecog.{0,15}(\d)\s*or\s*less").expect("static regex"),
        ]
    })
}

/// Exclusion floors, indexed by ECOG code.
fn floor_patterns() -> &'static [[Regex; 2]; 5] {
    static RE: OnceLock<[[Regex; 2]; 5]> = OnceLock::new();
    RE.get_or_init(|| {
        std::array::from_fn(|code| {
            [
                Regex::new(&format!(r"(?i)ecog.{{0,15}}[≥>=]\s*{code}")).expect("static regex"),
                Regex::new(&format!(r"(?i)performance.{{0,25}}status.{{0,15}}[≥>=]\s*{code}"))
                    .expect("static regex"),
            ]
        })
    })
}

fn first_capture(re: &Regex, text: &str) -> Option<u8> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// The ceiling used for scoring: the first `≤` limit found, ECOG wording
/// before "performance status" wording.
pub fn ecog_ceiling(inclusion: &str) -> Option<u8> {
    ceiling_patterns()[..2]
        .iter()
        .find_map(|re| first_capture(re, inclusion))
}

/// Every ceiling the gate checks, one per pattern that matches.
pub fn ecog_ceilings(inclusion: &str) -> Vec<u8> {
    ceiling_patterns()
        .iter()
        .filter_map(|re| first_capture(re, inclusion))
        .collect()
}

/// True when the exclusion text bars patients at `code` or above in a way
/// that names the code itself ("ECOG ≥ 2").
pub fn excludes_ecog(exclusion: &str, code: u8) -> bool {
    floor_patterns()
        .get(code as usize)
        .is_some_and(|pats| pats.iter().any(|re| re.is_match(exclusion)))
}

/// Inclusion text that explicitly admits ECOG 3 or 4.
pub fn admits_poor_performance(inclusion: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ecog.{0,15}[≤<=]\s*[3-4]").expect("static regex"))
        .is_match(inclusion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(min: Option<&str>, max: Option<&str>) -> TrialRecord {
        TrialRecord {
            minimum_age: min.map(str::to_string),
            maximum_age: max.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_age_years() {
        assert_eq!(parse_age_years("18 Years"), Some(18));
        assert_eq!(parse_age_years("up to 75 years"), Some(75));
        assert_eq!(parse_age_years("N/A"), None);
    }

    #[test]
    fn test_trial_age_range_defaults() {
        assert_eq!(trial_age_range(&trial(None, None)), None);
        assert_eq!(trial_age_range(&trial(Some(" "), None)), None);
        assert_eq!(trial_age_range(&trial(Some("18 Years"), None)), Some((18, 150)));
        assert_eq!(trial_age_range(&trial(None, Some("65 Years"))), Some((0, 65)));
        assert_eq!(trial_age_range(&trial(Some("adult"), Some("??"))), Some((0, 150)));
    }

    #[test]
    fn test_range_relations() {
        assert!(ranges_overlap((40, 64), (18, 50)));
        assert!(!ranges_overlap((0, 17), (18, 150)));
        assert!(range_contains((18, 99), (40, 64)));
        assert!(!range_contains((18, 50), (40, 64)));
    }

    #[test]
    fn test_ecog_ceiling_forms() {
        assert_eq!(ecog_ceiling("ECOG performance status ≤ 1"), Some(1));
        assert_eq!(ecog_ceiling("Performance status <= 2 (ECOG scale)"), Some(2));
        assert_eq!(ecog_ceiling("ECOG 0 or 1"), None);
        assert_eq!(ecog_ceilings("ECOG of 2 or less"), vec![2]);
        assert!(ecog_ceilings("No performance requirements").is_empty());
    }

    #[test]
    fn test_exclusion_floor() {
        assert!(excludes_ecog("ECOG >= 2", 2));
        assert!(excludes_ecog("Performance status ≥3", 3));
        assert!(!excludes_ecog("ECOG >= 2", 1));
        assert!(!excludes_ecog("ECOG >= 2", 9));
    }

    #[test]
    fn test_admits_poor_performance() {
        assert!(admits_poor_performance("ECOG ≤ 3"));
        assert!(!admits_poor_performance("ECOG ≤ 2"));
    }
}
