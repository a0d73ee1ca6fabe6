use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::LitweightError;

/// Default host for NCBI Entrez E-utilities.
pub const ENTREZ_HOST: &str = "eutils.ncbi.nlm.nih.gov";

/// An HTTP client that only allows requests to approved hosts.
/// Every outbound call of the engine goes through one of these.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client that may only reach the Entrez host, with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, LitweightError> {
        let mut allowlist = HashSet::new();
        allowlist.insert(ENTREZ_HOST.to_string());

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("litweight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LitweightError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, LitweightError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    fn check(&self, url: &str) -> Result<(), LitweightError> {
        if !self.is_allowed(url) {
            return Err(LitweightError::SecurityError(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(())
    }
}
