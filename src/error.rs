use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the updater.
///
/// Callers branch on the variant, never on message text. A provider
/// "not found" answer is not represented here at all: `exists()` maps
/// it to `Ok(false)` before an error is ever constructed.
#[derive(Error, Debug)]
pub enum Error {
    /// Public IP endpoint could not be reached (transport failure).
    #[error("unable to fetch public IP address: {0}")]
    Network(#[source] reqwest::Error),

    /// Public IP endpoint answered with a non-success status.
    #[error("unable to fetch public IP address: {status} ({body})")]
    Response { status: String, body: String },

    /// Public IP response body could not be read.
    #[error("unable to read response body: {0}")]
    Parse(#[source] reqwest::Error),

    /// DNS provider call failed. `status` is the HTTP status when the
    /// provider answered, `None` on transport failure.
    #[error("DNS provider error: {message}")]
    Provider { status: Option<u16>, message: String },

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Startup-time construction failure (HTTP client, credentials).
    #[error("initialization error: {0}")]
    Init(String),
}

impl Error {
    /// Create a provider error for a transport-level failure.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status: None,
            message: message.into(),
        }
    }

    /// Create a provider error carrying the provider's HTTP status.
    pub fn provider_status(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn init(message: impl Into<String>) -> Self {
        Self::Init(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_is_inspectable() {
        let err = Error::provider_status(403, "permission denied");
        match err {
            Error::Provider { status, .. } => assert_eq!(status, Some(403)),
            _ => panic!("expected provider error"),
        }
    }

    #[test]
    fn response_error_carries_status_and_body() {
        let err = Error::Response {
            status: "503 Service Unavailable".to_string(),
            body: "try later".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("try later"));
    }
}
