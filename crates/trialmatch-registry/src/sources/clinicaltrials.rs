//! ClinicalTrials.gov v2 API client.
//!
//! API docs: https://clinicaltrials.gov/data-api/api
//! Search:   GET {base}/studies?query.term=...&pageSize=...&pageToken=...
//! Detail:   GET {base}/studies/{nctId}
//!
//! Search pages through `nextPageToken` until the registry is exhausted or
//! `max_results` relevant studies are collected, pausing briefly between
//! pages. Only studies whose overall status is in `relevant_statuses` are
//! kept. HTTP 429 surfaces as `RegistryError::RateLimited`; retrying is the
//! caller's decision.

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, instrument};

use trialmatch_common::match_config::RegistryConfig;
use trialmatch_common::sandbox::SandboxClient as Client;
use trialmatch_common::trial::is_valid_nct_id;
use trialmatch_common::{TrialMatchError, TrialRecord};

use super::{RegistryError, TrialRegistry};
use crate::models::{parse_studies, parse_study, CtGovPage};

pub struct ClinicalTrialsClient {
    client: Client,
    base_url: String,
    page_size: usize,
    page_delay: Duration,
    relevant_statuses: Vec<String>,
}

impl ClinicalTrialsClient {
    pub fn new() -> Result<Self, TrialMatchError> {
        Self::from_config(&RegistryConfig::default())
    }

    pub fn from_config(cfg: &RegistryConfig) -> Result<Self, TrialMatchError> {
        let client = Client::with_allowlist(
            cfg.allowed_hosts.iter().map(String::as_str),
            cfg.timeout(),
        )?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            page_size: cfg.page_size.clamp(1, 1000),
            page_delay: cfg.page_delay(),
            relevant_statuses: cfg.relevant_statuses.clone(),
        })
    }

    fn studies_url(&self) -> String {
        format!("{}/studies", self.base_url)
    }

    fn study_url(&self, nct_id: &str) -> String {
        format!("{}/studies/{}", self.base_url, nct_id)
    }

    async fn fetch_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<CtGovPage, RegistryError> {
        let mut params: Vec<(&str, String)> = vec![
            ("query.term", query.to_string()),
            ("pageSize",   self.page_size.to_string()),
            ("format",     "json".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let resp = self.client
            .get(&self.studies_url())?
            .query(&params)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map non-success responses to registry errors.
async fn check_status(resp: Response) -> Result<Response, RegistryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        return Err(RegistryError::RateLimited { retry_after });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RegistryError::Status { code: status.as_u16(), body })
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Keep trials whose overall status is listed. An empty list keeps all.
pub fn retain_relevant(trials: &mut Vec<TrialRecord>, statuses: &[String]) {
    if statuses.is_empty() {
        return;
    }
    trials.retain(|t| statuses.iter().any(|s| s.eq_ignore_ascii_case(&t.overall_status)));
}

#[async_trait]
impl TrialRegistry for ClinicalTrialsClient {
    fn name(&self) -> &str {
        "clinicaltrials.gov"
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<TrialRecord>, RegistryError> {
        let mut collected: Vec<TrialRecord> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(query, page_token.as_deref()).await?;
            pages += 1;
            if page.studies.is_empty() {
                break;
            }

            let mut trials = parse_studies(&page.studies);
            retain_relevant(&mut trials, &self.relevant_statuses);
            debug!(page = pages, raw = page.studies.len(), kept = trials.len(), "ClinicalTrials.gov page");
            collected.extend(trials);

            if let Some(max) = max_results {
                if collected.len() >= max {
                    collected.truncate(max);
                    break;
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
            tokio::time::sleep(self.page_delay).await;
        }

        info!(query, pages, n = collected.len(), "ClinicalTrials.gov search complete");
        Ok(collected)
    }

    #[instrument(skip(self))]
    async fn fetch_details(&self, nct_id: &str) -> Result<Option<TrialRecord>, RegistryError> {
        if !is_valid_nct_id(nct_id) {
            debug!(nct_id, "Skipping detail fetch for malformed identifier");
            return Ok(None);
        }

        let resp = self.client
            .get(&self.study_url(nct_id))?
            .query(&[("format", "json")])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;

        let raw: serde_json::Value = serde_json::from_str(&resp.text().await?)?;
        Ok(parse_study(&raw))
    }
}
