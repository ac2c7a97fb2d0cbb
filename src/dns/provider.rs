use async_trait::async_trait;

use crate::error::Result;

/// Interface over the single externally-owned DNS record.
///
/// Implementations are fixed at construction to one
/// `(project, managed zone, record name, "A")` tuple.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Check whether the managed record exists.
    ///
    /// A provider "not found" answer is a normal negative result,
    /// `Ok(false)`, never an error.
    async fn exists(&self) -> Result<bool>;

    /// Create the record with the configured TTL and `ip` as its sole value.
    async fn create(&self, ip: &str) -> Result<()>;

    /// Replace the record's value with `ip`, keeping the configured TTL.
    async fn update(&self, ip: &str) -> Result<()>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
