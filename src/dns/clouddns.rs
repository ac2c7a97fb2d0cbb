use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::provider::DnsProvider;
use crate::config::GoogleConfig;
use crate::error::{Error, Result};

const CLOUD_DNS_API_BASE: &str = "https://dns.googleapis.com";
const RECORD_TYPE: &str = "A";

/// Google Cloud DNS implementation of [`DnsProvider`].
///
/// Talks to the `dns/v1` REST surface for one resource record set. The
/// bearer token is read from the configured credentials file once, at
/// construction.
pub struct CloudDnsProvider {
    client: Client,
    base_url: String,
    token: String,
    project_id: String,
    managed_zone: String,
    record: String,
    ttl: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceRecordSet {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: u32,
    rrdatas: Vec<String>,
}

impl CloudDnsProvider {
    pub fn new(google: &GoogleConfig, timeout: Duration) -> Result<Self> {
        let token = std::fs::read_to_string(&google.credentials_path).map_err(|e| {
            Error::init(format!(
                "failed to read credentials file {}: {}",
                google.credentials_path, e
            ))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::init(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: CLOUD_DNS_API_BASE.to_string(),
            token: token.trim().to_string(),
            project_id: google.project_id.clone(),
            managed_zone: google.managed_zone.clone(),
            record: google.record.clone(),
            ttl: google.ttl,
        })
    }

    fn rrsets_url(&self) -> String {
        format!(
            "{}/dns/v1/projects/{}/managedZones/{}/rrsets",
            self.base_url, self.project_id, self.managed_zone
        )
    }

    fn record_url(&self) -> String {
        format!("{}/{}/{}", self.rrsets_url(), self.record, RECORD_TYPE)
    }

    fn record_set(&self, ip: &str) -> ResourceRecordSet {
        ResourceRecordSet {
            name: self.record.clone(),
            record_type: RECORD_TYPE.to_string(),
            ttl: self.ttl,
            rrdatas: vec![ip.to_string()],
        }
    }

    async fn check_response(&self, response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::provider_status(
            status.as_u16(),
            format!("Cloud DNS API error ({}): {}", status, body),
        ))
    }
}

#[async_trait]
impl DnsProvider for CloudDnsProvider {
    async fn exists(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.record_url())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::provider(format!("failed to look up DNS record: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        self.check_response(response).await?;
        Ok(true)
    }

    async fn create(&self, ip: &str) -> Result<()> {
        let response = self
            .client
            .post(self.rrsets_url())
            .bearer_auth(&self.token)
            .json(&self.record_set(ip))
            .send()
            .await
            .map_err(|e| Error::provider(format!("failed to create DNS record: {}", e)))?;

        self.check_response(response).await
    }

    async fn update(&self, ip: &str) -> Result<()> {
        let response = self
            .client
            .patch(self.record_url())
            .bearer_auth(&self.token)
            .json(&self.record_set(ip))
            .send()
            .await
            .map_err(|e| Error::provider(format!("failed to update DNS record: {}", e)))?;

        self.check_response(response).await
    }

    fn provider_name(&self) -> &'static str {
        "clouddns"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> CloudDnsProvider {
        CloudDnsProvider {
            client: Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap(),
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
            project_id: "my-project".to_string(),
            managed_zone: "example-zone".to_string(),
            record: "home.example.com.".to_string(),
            ttl: 300,
        }
    }

    const RECORD_PATH: &str =
        "/dns/v1/projects/my-project/managedZones/example-zone/rrsets/home.example.com./A";
    const RRSETS_PATH: &str = "/dns/v1/projects/my-project/managedZones/example-zone/rrsets";

    #[tokio::test]
    async fn test_exists_true() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORD_PATH))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "home.example.com.",
                "type": "A",
                "ttl": 300,
                "rrdatas": ["203.0.113.7"]
            })))
            .mount(&server)
            .await;

        assert!(provider(&server.uri()).exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_not_found_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORD_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("record not found"))
            .mount(&server)
            .await;

        let exists = provider(&server.uri()).exists().await.unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_exists_other_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORD_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).exists().await.unwrap_err();
        match err {
            Error::Provider { status, message } => {
                assert_eq!(status, Some(403));
                assert!(message.contains("permission denied"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_posts_record_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RRSETS_PATH))
            .and(bearer_token("test-token"))
            .and(body_json(serde_json::json!({
                "name": "home.example.com.",
                "type": "A",
                "ttl": 300,
                "rrdatas": ["203.0.113.7"]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server.uri()).create("203.0.113.7").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_patches_record_set() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(RECORD_PATH))
            .and(body_json(serde_json::json!({
                "name": "home.example.com.",
                "type": "A",
                "ttl": 300,
                "rrdatas": ["198.51.100.4"]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server.uri()).update("198.51.100.4").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(RECORD_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).update("198.51.100.4").await.unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(500), .. }));
    }
}
