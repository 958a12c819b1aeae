use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::TrialMatchError;

/// Registry hosts reachable when no explicit allowlist is configured.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "clinicaltrials.gov",      // ClinicalTrials.gov v2 API
    "localhost",               // local registry mirror
    "127.0.0.1",               // Localhost alt
];

/// An HTTP client that only issues requests to approved registry hosts.
///
/// Patient-derived query strings leave the process through this client, so
/// every outgoing URL is checked against the allowlist before sending.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default registry allowlist and a 30s timeout.
    pub fn new() -> Result<Self, TrialMatchError> {
        Self::with_allowlist(DEFAULT_ALLOWED_HOSTS.iter().copied(), Duration::from_secs(30))
    }

    /// Creates a client restricted to `hosts` (exact hostnames, subdomains allowed).
    pub fn with_allowlist<'a, I>(hosts: I, timeout: Duration) -> Result<Self, TrialMatchError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let allowlist = hosts.into_iter().map(|h| h.trim().to_lowercase()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| TrialMatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_lowercase());
    }

    /// True when `url` parses and its host is listed, or is a subdomain of a
    /// listed host.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
            return false;
        };
        self.allowlist.iter().any(|allowed| {
            host == *allowed
                || host.strip_suffix(allowed.as_str()).is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// GET request builder for an allowlisted URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, TrialMatchError> {
        if !self.is_allowed(url) {
            return Err(TrialMatchError::Security(format!("host not in registry allowlist: {url}")));
        }
        Ok(self.client.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist_accepts_registry() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://clinicaltrials.gov/api/v2/studies"));
        assert!(client.is_allowed("https://www.clinicaltrials.gov/api/v2/studies/NCT00000001"));
    }

    #[test]
    fn test_rejects_unlisted_host() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://evil.example.com/collect?q=EGFR"));
        assert!(!client.is_allowed("not a url"));
        assert!(matches!(
            client.get("https://evil.example.com/"),
            Err(TrialMatchError::Security(_))
        ));
    }

    #[test]
    fn test_suffix_is_not_subdomain() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://fakeclinicaltrials.gov/api"));
    }

    #[test]
    fn test_allow_domain() {
        let mut client = SandboxClient::with_allowlist(["clinicaltrials.gov"], Duration::from_secs(5)).unwrap();
        assert!(!client.is_allowed("http://mirror.internal/api"));
        client.allow_domain("mirror.internal");
        assert!(client.is_allowed("http://mirror.internal/api"));
    }
}
