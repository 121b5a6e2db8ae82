//! `multiclient` command line.
//!
//! Loads a TOML configuration and drives a [`MultiClient`] from it:
//! one-shot health checks, single requests, or a long-running watch mode
//! with background checks and config hot reload.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use multiclient::config::{load_config, ConfigWatcher};
use multiclient::health::HealthMonitor;
use multiclient::observability::{init_logging, init_metrics};
use multiclient::request::descriptor::parse_method;
use multiclient::request::Discard;
use multiclient::{BodyType, CheckPolicy, MultiClient, MultiClientConfig, Payload, Shutdown};

#[derive(Parser)]
#[command(name = "multiclient")]
#[command(about = "Health-checked, load-balanced HTTP requests over an endpoint pool", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "multiclient.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the pool once and report the result
    Check {
        #[arg(short, long, value_enum, default_value_t = PolicyArg::All)]
        policy: PolicyArg,
        /// Require at least this many endpoints; overrides --policy
        #[arg(short, long)]
        min: Option<usize>,
    },
    /// Run the configured check and list healthy addresses as JSON
    Healthy,
    /// Send one request through the pool and print the response
    Request {
        method: String,
        path: String,
        /// Request body; parsed as JSON for json/form body types
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Keep the snapshot fresh and follow config changes until ctrl-c
    Watch,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    One,
    Quorum,
    All,
}

impl From<PolicyArg> for CheckPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::One => CheckPolicy::One,
            PolicyArg::Quorum => CheckPolicy::Quorum,
            PolicyArg::All => CheckPolicy::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.observability)?;

    tracing::info!(
        path = %cli.config.display(),
        addresses = config.addresses.len(),
        health_checks = config.health_check.enabled,
        retry_limit = config.retries.limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = Arc::new(MultiClient::from_config(&config)?);

    match cli.command {
        Commands::Check { policy, min } => {
            let result = match min {
                Some(n) => client.check_n(n).await,
                None => client.check(policy.into()).await,
            };
            print_json(&serde_json::json!({
                "ok": result.is_ok(),
                "error": result.err().map(|e| e.to_string()),
                "healthy": client.healthy_addresses().await,
            }))?;
        }
        Commands::Healthy => {
            if let Err(e) = client.check(config.health_check.policy).await {
                tracing::warn!(error = %e, "Health check did not meet policy");
            }
            print_json(&Value::from(client.healthy_addresses().await))?;
        }
        Commands::Request { method, path, data } => {
            if client.health_checks_enabled() {
                if let Err(e) = client.check(config.health_check.policy).await {
                    tracing::warn!(error = %e, "Health check did not meet policy");
                }
            }
            let method = parse_method(&method)?;
            let payload = payload_for(client.default_body_type(), data)?;
            let response = client
                .request(method, &path, payload, &mut Discard, &mut Discard, &[])
                .await?;

            eprintln!("{} {}", response.status(), response.url());
            println!("{}", response.text());
        }
        Commands::Watch => watch(client, &cli.config, config).await?,
    }

    Ok(())
}

async fn watch(
    client: Arc<MultiClient>,
    path: &std::path::Path,
    config: MultiClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();

    let monitor = tokio::spawn(HealthMonitor::new(client.clone()).run(shutdown.subscribe()));

    let watcher = ConfigWatcher::start(path, config)?;
    let reload_client = client.clone();
    let reload_signal = shutdown.subscribe();
    let reloader = tokio::spawn(async move { watcher.drive(&reload_client, reload_signal).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    let _ = monitor.await;
    let _ = reloader.await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn payload_for(body_type: BodyType, data: Option<String>) -> Result<Payload, serde_json::Error> {
    let Some(data) = data else {
        return Ok(Payload::Empty);
    };
    match body_type {
        BodyType::Json | BodyType::Form => Ok(Payload::Structured(serde_json::from_str(&data)?)),
        BodyType::Raw | BodyType::Xml => Ok(Payload::Text(data)),
    }
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
