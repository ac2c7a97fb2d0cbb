use std::time::Duration;

use reqwest::Client;

use crate::error::{Error, Result};

/// Fetches the caller's public IP from a configured HTTP endpoint.
///
/// The full response body, trimmed of surrounding whitespace, is taken
/// verbatim as the IP string. No retries, no fallback endpoints.
#[derive(Debug, Clone)]
pub struct PublicIpFetcher {
    client: Client,
    endpoint: String,
}

impl PublicIpFetcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::init(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(Error::Network)?;

        let status = response.status();

        // Body is read before the status check; a failure response
        // keeps whatever the endpoint said.
        let body = response.text().await.map_err(Error::Parse)?;

        if !status.is_success() {
            return Err(Error::Response {
                status: status.to_string(),
                body,
            });
        }

        Ok(body.trim().to_string())
    }
}
