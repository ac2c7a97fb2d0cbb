mod clouddns;
mod provider;

pub use clouddns::CloudDnsProvider;
pub use provider::DnsProvider;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::Result;

pub fn create_provider(settings: &Settings) -> Result<Arc<dyn DnsProvider>> {
    Ok(Arc::new(CloudDnsProvider::new(
        &settings.google,
        settings.timeout(),
    )?))
}
