//! trialmatch — clinical trial matching for one patient profile.
//!
//! Usage: trialmatch <profile.json> [--preset standard|conservative]
//!
//! Searches ClinicalTrials.gov, gates and scores every trial found, and
//! writes the JSON match report to stdout (or `output.path`).

mod config;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trialmatch_common::{CategoryThresholds, KnowledgeBase, PatientProfile};
use trialmatch_ranker::match_patient;
use trialmatch_registry::sources::clinicaltrials::ClinicalTrialsClient;

struct Args {
    profile_path: String,
    preset: Option<CategoryThresholds>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut profile_path = None;
    let mut preset = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--preset" => {
                let name = args.next().context("--preset needs a value")?;
                preset = Some(
                    CategoryThresholds::preset(&name)
                        .with_context(|| format!("unknown preset '{name}'"))?,
                );
            }
            _ if profile_path.is_none() => profile_path = Some(arg),
            _ => bail!("unexpected argument '{arg}'"),
        }
    }

    let Some(profile_path) = profile_path else {
        bail!("usage: trialmatch <profile.json> [--preset standard|conservative]");
    };
    Ok(Args { profile_path, preset })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trialmatch=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("trialmatch {}", env!("CARGO_PKG_VERSION"));

    let args = parse_args(std::env::args().skip(1))?;
    let mut config = config::Config::load()?;
    if let Some(preset) = args.preset {
        config.matching.ranking.categories = preset;
    }

    let raw = std::fs::read_to_string(&args.profile_path)
        .with_context(|| format!("reading profile {}", args.profile_path))?;
    let profile: PatientProfile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing profile {}", args.profile_path))?;

    let loaded;
    let kb = match &config.matching.knowledge.path {
        Some(path) => {
            loaded = KnowledgeBase::from_path(path)?;
            &loaded
        }
        None => KnowledgeBase::builtin(),
    };
    info!(version = %kb.version, "Knowledge base ready");

    let client = ClinicalTrialsClient::from_config(&config.matching.registry)?;
    let report = match_patient(&profile, &client, kb, &config.matching).await?;

    let json = if config.output.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match &config.output.path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args_with_preset() {
        let a = parse_args(args(&["p.json", "--preset", "conservative"])).unwrap();
        assert_eq!(a.profile_path, "p.json");
        assert_eq!(a.preset, Some(CategoryThresholds::conservative()));
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["p.json", "--preset", "lenient"])).is_err());
        assert!(parse_args(args(&["a.json", "b.json"])).is_err());
    }
}
