use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::config::Settings;
use crate::error::Error;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of the most recent on-demand (HTTP-triggered) IP check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CurrentStatus {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outcome of the most recent scheduled reconciliation cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatestStatus {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(serialize_with = "humanize_duration")]
    pub duration: Duration,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Point-in-time copy of the whole store, suitable for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub current: CurrentStatus,
    #[serde(rename = "previousRun")]
    pub latest: LatestStatus,
    pub settings: Settings,
    #[serde(rename = "Version")]
    pub version: &'static str,
}

fn humanize_duration<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:?}", d))
}

#[derive(Debug, Default)]
struct Inner {
    current: CurrentStatus,
    latest: LatestStatus,
}

/// Shared status record, written by the reconciliation loop (`latest`)
/// and the status server (`current`), read by both.
///
/// One mutex guards the whole mutable state so a snapshot never mixes
/// sub-records from different moments. The lock is only ever held for
/// the copy or assignment, never across an await point.
#[derive(Clone)]
pub struct StatusStore {
    inner: Arc<Mutex<Inner>>,
    settings: Arc<Settings>,
}

impl StatusStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Record the outcome of a completed reconciliation cycle.
    pub fn record_latest(&self, started_at: Instant, ip: &str, err: Option<&Error>) {
        let latest = LatestStatus {
            ip: ip.to_string(),
            error: err.map(|e| e.to_string()),
            duration: started_at.elapsed(),
            timestamp: Some(Utc::now()),
        };

        let mut inner = self.inner.lock().unwrap();
        inner.latest = latest;
    }

    /// Record the outcome of an on-demand IP check.
    pub fn record_current(&self, ip: &str, err: Option<&Error>) {
        let current = CurrentStatus {
            ip: ip.to_string(),
            error: err.map(|e| e.to_string()),
            timestamp: Some(Utc::now()),
        };

        let mut inner = self.inner.lock().unwrap();
        inner.current = current;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock().unwrap();
        StatusSnapshot {
            current: inner.current.clone(),
            latest: inner.latest.clone(),
            settings: (*self.settings).clone(),
            version: VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StatusStore {
        let settings: Settings = toml::from_str(
            r#"
[google]
credentials_path = "/tmp/token"
managed_zone = "example-zone"
project_id = "my-project"
record = "home.example.com."

[updater]
"#,
        )
        .unwrap();
        StatusStore::new(settings)
    }

    #[test]
    fn test_record_latest_success_clears_error() {
        let store = store();
        let started = Instant::now();

        store.record_latest(started, "203.0.113.7", Some(&Error::provider("boom")));
        store.record_latest(started, "203.0.113.7", None);

        let snap = store.snapshot();
        assert_eq!(snap.latest.ip, "203.0.113.7");
        assert!(snap.latest.error.is_none());
        assert!(snap.latest.timestamp.is_some());
    }

    #[test]
    fn test_record_latest_duration_tracks_cycle() {
        let store = store();
        let started = Instant::now();
        std::thread::sleep(Duration::from_millis(10));
        store.record_latest(started, "203.0.113.7", None);

        let snap = store.snapshot();
        assert!(snap.latest.duration >= Duration::from_millis(10));
    }

    #[test]
    fn test_record_current_is_independent_of_latest() {
        let store = store();
        store.record_latest(Instant::now(), "203.0.113.7", None);
        store.record_current("198.51.100.4", Some(&Error::provider("fetch failed")));

        let snap = store.snapshot();
        assert_eq!(snap.latest.ip, "203.0.113.7");
        assert!(snap.latest.error.is_none());
        assert_eq!(snap.current.ip, "198.51.100.4");
        assert!(snap.current.error.is_some());
    }

    #[test]
    fn test_snapshot_serialization_shape() {
        let store = store();
        store.record_latest(Instant::now(), "203.0.113.7", None);
        store.record_current("203.0.113.7", None);

        let value = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(value["current"]["ip"], "203.0.113.7");
        assert_eq!(value["previousRun"]["ip"], "203.0.113.7");
        assert!(value["previousRun"]["duration"].is_string());
        assert_eq!(value["settings"]["google"]["project_id"], "my-project");
        assert_eq!(value["Version"], env!("CARGO_PKG_VERSION"));
        // Absent errors are omitted, not serialized as null.
        assert!(value["current"].get("error").is_none());
    }

    #[test]
    fn test_snapshot_consistent_under_concurrent_writers() {
        let store = store();
        let writer_latest = store.clone();
        let writer_current = store.clone();

        let t1 = std::thread::spawn(move || {
            for i in 0..1000 {
                let ip = format!("203.0.113.{}", i % 256);
                let err = Error::provider(format!("cycle {}", i));
                writer_latest.record_latest(Instant::now(), &ip, Some(&err));
            }
        });
        let t2 = std::thread::spawn(move || {
            for i in 0..1000 {
                let ip = format!("198.51.100.{}", i % 256);
                writer_current.record_current(&ip, None);
            }
        });

        for _ in 0..1000 {
            let snap = store.snapshot();
            // A latest written with an error always carries both fields
            // from the same write.
            if let Some(err) = &snap.latest.error {
                let cycle: u32 = err
                    .trim_start_matches("DNS provider error: cycle ")
                    .parse()
                    .unwrap();
                assert_eq!(snap.latest.ip, format!("203.0.113.{}", cycle % 256));
            }
        }

        t1.join().unwrap();
        t2.join().unwrap();
    }
}
