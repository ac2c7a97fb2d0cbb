use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clouddnsd::server::{AppState, RequestEvent, OBSERVER_QUEUE_DEPTH};
use clouddnsd::{config::Settings, daemon, dns, ip::PublicIpFetcher, server, status::StatusStore};

#[derive(Parser)]
#[command(name = "clouddnsd")]
#[command(about = "Dynamic DNS updater - keeps a Cloud DNS A record pointed at the current public IP")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the updater loop and the status server
    Daemon,

    /// Check the current public IP and the managed DNS record
    Check,

    /// Show configuration file location and contents
    Config,
}

fn init_logging(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli);

    let log_level = settings
        .as_ref()
        .ok()
        .map(|s| s.logging.level.as_str())
        .unwrap_or("info");
    init_logging(log_level);

    match cli.command {
        Commands::Daemon => {
            let settings = settings.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to load settings: {}. Run 'clouddnsd config' to see the expected location and format.",
                    e
                )
            })?;
            info!("Starting clouddnsd daemon");
            run_daemon(settings).await?;
        }

        Commands::Check => {
            let settings = settings.map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
            check_status(settings).await?;
        }

        Commands::Config => {
            show_config(&cli, &settings.ok())?;
        }
    }

    Ok(())
}

async fn run_daemon(settings: Settings) -> Result<()> {
    // Startup failures are fatal; nothing below is retried.
    let provider = dns::create_provider(&settings)?;
    let fetcher = PublicIpFetcher::new(&settings.updater.public_ip_endpoint, settings.timeout())?;
    let status = StatusStore::new(settings.clone());

    debug!(
        "Managing record {} in zone {} via {}",
        settings.google.record,
        settings.google.managed_zone,
        provider.provider_name()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = daemon::wait_for_shutdown().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let (request_tx, mut request_rx) = mpsc::channel::<RequestEvent>(OBSERVER_QUEUE_DEPTH);
    let (error_tx, mut error_rx) = mpsc::channel::<String>(OBSERVER_QUEUE_DEPTH);

    // Request logging
    tokio::spawn(async move {
        while let Some(req) = request_rx.recv().await {
            // ignore favicon.ico requests
            if req.path.contains("/favicon.ico") {
                continue;
            }
            debug!("Received request: {} {}", req.method, req.path);
        }
    });

    // Error logging
    tokio::spawn(async move {
        while let Some(msg) = error_rx.recv().await {
            error!("{}", msg);
        }
    });

    tokio::spawn(daemon::run(
        settings.interval(),
        fetcher.clone(),
        provider,
        status.clone(),
        shutdown_rx.clone(),
    ));

    trace!("Starting server on {}", settings.server.address);

    let state = AppState::new(fetcher, status, request_tx, error_tx);
    server::serve(&settings.server.address, state, shutdown_rx).await?;

    Ok(())
}

async fn check_status(settings: Settings) -> Result<()> {
    println!("Checking public IP...\n");

    let fetcher = PublicIpFetcher::new(&settings.updater.public_ip_endpoint, settings.timeout())?;
    match fetcher.fetch().await {
        Ok(ip) => println!("Public IP: {}", ip),
        Err(e) => println!("Public IP: Error - {}", e),
    }

    println!("\nChecking DNS record...\n");

    let provider = dns::create_provider(&settings)?;
    match provider.exists().await {
        Ok(true) => println!(
            "{} ({}): present",
            settings.google.record, settings.google.managed_zone
        ),
        Ok(false) => println!(
            "{} ({}): absent",
            settings.google.record, settings.google.managed_zone
        ),
        Err(e) => println!(
            "{} ({}): Error - {}",
            settings.google.record, settings.google.managed_zone, e
        ),
    }

    Ok(())
}

fn show_config(cli: &Cli, settings: &Option<Settings>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Settings::config_path);

    println!("Configuration file location: {}\n", config_path.display());

    match settings {
        Some(s) => {
            println!("Current configuration:\n");
            println!("{}", toml::to_string_pretty(s)?);
        }
        None => {
            println!("Configuration file not found.");
            println!("\nCreate a configuration file at the location above.");
            println!("Example configuration:\n");
            println!(
                r#"[google]
credentials_path = "/etc/clouddnsd/token"
managed_zone = "example-zone"
project_id = "my-project"
record = "home.example.com."
ttl = 300

[logging]
level = "info"

[server]
address = "0.0.0.0:8080"

[updater]
interval_seconds = 300
public_ip_endpoint = "https://api.ipify.org"
timeout_seconds = 10
"#
            );
        }
    }

    Ok(())
}
