use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, trace};

use crate::dns::DnsProvider;
use crate::error::Result;
use crate::ip::PublicIpFetcher;
use crate::status::StatusStore;

/// Run the reconciliation loop: one cycle immediately, then one per
/// elapsed interval.
///
/// The stop signal is observed only between cycles; an in-flight cycle
/// always runs to completion. Cycle failures are recorded and logged,
/// never fatal.
pub async fn run(
    interval: Duration,
    fetcher: PublicIpFetcher,
    provider: Arc<dyn DnsProvider>,
    status: StatusStore,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        "Updater started. Reconciling every {} seconds",
        interval.as_secs()
    );

    run_cycle(&fetcher, provider.as_ref(), &status).await;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                run_cycle(&fetcher, provider.as_ref(), &status).await;
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Shutdown signal received, stopping updater");
                    break;
                }
            }
        }
    }
}

/// One reconciliation cycle: fetch the public IP, decide whether the
/// managed record must be created or updated, record the outcome.
pub async fn run_cycle(fetcher: &PublicIpFetcher, provider: &dyn DnsProvider, status: &StatusStore) {
    let started = Instant::now();
    let settings = status.settings();

    trace!("Retrieving public IP from {}", fetcher.endpoint());

    let ip = match fetcher.fetch().await {
        Ok(ip) => ip,
        Err(e) => {
            error!("Failed to get public IP: {}", e);
            status.record_latest(started, "", Some(&e));
            return;
        }
    };

    trace!(
        "Preparing to reconcile {} in zone {}",
        settings.google.record,
        settings.google.managed_zone
    );

    let exists = match provider.exists().await {
        Ok(exists) => exists,
        Err(e) => {
            error!("Failed to check if DNS record exists: {}", e);
            status.record_latest(started, &ip, Some(&e));
            return;
        }
    };

    if !exists {
        trace!(
            "DNS record {} does not exist, creating it",
            settings.google.record
        );

        match provider.create(&ip).await {
            Ok(()) => {
                debug!(
                    "Created DNS record {} -> {} (ttl {})",
                    settings.google.record, ip, settings.google.ttl
                );
                status.record_latest(started, &ip, None);
            }
            Err(e) => {
                error!("Failed to create DNS record: {}", e);
                status.record_latest(started, &ip, Some(&e));
            }
        }
        return;
    }

    // The record is rewritten every cycle, whether or not the IP changed.
    match provider.update(&ip).await {
        Ok(()) => {
            debug!(
                "Updated DNS record {} -> {} (ttl {})",
                settings.google.record, ip, settings.google.ttl
            );
            status.record_latest(started, &ip, None);
        }
        Err(e) => {
            error!("Failed to update DNS record: {}", e);
            status.record_latest(started, &ip, Some(&e));
        }
    }
}

pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| crate::error::Error::init(format!("failed to install handler: {}", e)))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| crate::error::Error::init(format!("failed to install handler: {}", e)))?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| crate::error::Error::init(format!("failed to install handler: {}", e)))?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
