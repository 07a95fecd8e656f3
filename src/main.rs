// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use axum::{routing::get, Router};
use kube::Client;
use kube_lease_manager::LeaseManagerBuilder;
use privatedns::constants::{
    DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_RETRY_PERIOD_SECS, METRICS_SERVER_BIND_ADDRESS,
    METRICS_SERVER_PATH, METRICS_SERVER_PORT, TOKIO_WORKER_THREADS,
};
use privatedns::controller::Controller;
use privatedns::dns::{CloudDns, DnsProvider};
use privatedns::gcp::GceMetadata;
use privatedns::metrics;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Multi-thread runtime with recognizable worker-thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("privatedns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Set up the tracing subscriber.
///
/// `RUST_LOG` controls filtering (default `info`); `RUST_LOG_FORMAT=json`
/// switches to JSON output for log aggregation.
fn initialize_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_output = std::env::var("RUST_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true);

    if json_output {
        builder.json().init();
    } else {
        builder.with_ansi(true).compact().init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "privatedns controller starting");
}

/// Controller configuration from the environment.
#[derive(Debug)]
struct ControllerConfig {
    /// Forward zone records are written to
    zone: String,
    /// Optional reverse zone for PTR records
    reverse_zone: Option<String>,
    /// GCP project; resolved from the metadata service when unset
    project: Option<String>,
    /// Restrict the resource watch to one namespace; empty means cluster-wide
    namespace: Option<String>,
}

/// Load controller configuration through an environment lookup.
fn load_controller_config_from(get: impl Fn(&str) -> Option<String>) -> Result<ControllerConfig> {
    let Some(zone) = get("PRIVATEDNS_ZONE").filter(|v| !v.is_empty()) else {
        bail!("PRIVATEDNS_ZONE must be set to the managed zone records are written to");
    };

    Ok(ControllerConfig {
        zone,
        reverse_zone: get("PRIVATEDNS_REVERSE_ZONE").filter(|v| !v.is_empty()),
        project: get("PRIVATEDNS_PROJECT").filter(|v| !v.is_empty()),
        namespace: get("PRIVATEDNS_NAMESPACE").filter(|v| !v.is_empty()),
    })
}

fn load_controller_config() -> Result<ControllerConfig> {
    load_controller_config_from(|name| std::env::var(name).ok())
}

/// Lease-based leader election settings.
struct LeaderElectionConfig {
    enabled: bool,
    lease_name: String,
    lease_namespace: String,
    identity: String,
    lease_duration: u64,
    retry_period: u64,
}

/// Load leader election configuration through an environment lookup.
fn load_leader_election_config_from(get: impl Fn(&str) -> Option<String>) -> LeaderElectionConfig {
    let enabled = get("PRIVATEDNS_ENABLE_LEADER_ELECTION")
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(true);

    let lease_name =
        get("PRIVATEDNS_LEASE_NAME").unwrap_or_else(|| "privatedns-leader".to_string());

    let lease_namespace = get("PRIVATEDNS_LEASE_NAMESPACE")
        .or_else(|| get("POD_NAMESPACE"))
        .unwrap_or_else(|| "kube-system".to_string());

    let lease_duration = get("PRIVATEDNS_LEASE_DURATION_SECONDS")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);

    let retry_period = get("PRIVATEDNS_LEASE_RETRY_PERIOD_SECONDS")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_RETRY_PERIOD_SECS);

    let identity = get("POD_NAME")
        .or_else(|| get("HOSTNAME"))
        .unwrap_or_else(|| format!("privatedns-{}", rand::random::<u32>()));

    LeaderElectionConfig {
        enabled,
        lease_name,
        lease_namespace,
        identity,
        lease_duration,
        retry_period,
    }
}

fn load_leader_election_config() -> LeaderElectionConfig {
    load_leader_election_config_from(|name| std::env::var(name).ok())
}

/// Serve the Prometheus registry over HTTP. Runs until the process exits.
async fn serve_metrics() -> Result<()> {
    let addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");

    let router = Router::new().route(
        METRICS_SERVER_PATH,
        get(|| async {
            metrics::gather_metrics().unwrap_or_else(|err| {
                error!(error = %err, "Metrics rendering failed");
                String::from("# metrics unavailable\n")
            })
        }),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind metrics endpoint on {addr}"))?;

    info!(address = %addr, path = METRICS_SERVER_PATH, "Serving metrics");
    axum::serve(listener, router).await?;
    Ok(())
}

/// Cancel `shutdown` when SIGINT or SIGTERM arrives.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let sigterm = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {e}");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for SIGINT: {e}");
                }
                info!("SIGINT received, shutting down");
            }
            () = sigterm => {
                info!("SIGTERM received, shutting down");
            }
        }

        shutdown.cancel();
    });
}

/// Run the controller until a shutdown signal arrives.
async fn run_controller(controller: Arc<Controller>) -> Result<()> {
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    controller.run(shutdown).await?;
    info!("Controller stopped cleanly");
    Ok(())
}

/// Run the controller gated behind a leader election lease.
async fn run_with_leader_election(
    client: Client,
    controller: Arc<Controller>,
    config: LeaderElectionConfig,
) -> Result<()> {
    info!(
        lease = %config.lease_name,
        namespace = %config.lease_namespace,
        identity = %config.identity,
        duration_secs = config.lease_duration,
        "Waiting for the leadership lease"
    );

    let lease_manager = LeaseManagerBuilder::new(client, &config.lease_name)
        .with_namespace(&config.lease_namespace)
        .with_identity(&config.identity)
        .with_duration(config.lease_duration)
        .with_grace(config.retry_period)
        .build()
        .await?;

    let (mut leader_rx, _lease_handle) = lease_manager.watch().await;

    while !*leader_rx.borrow_and_update() {
        leader_rx.changed().await?;
    }

    info!("Acquired leadership lease");

    // Step down (and let the orchestrator restart us) as soon as the lease
    // reports another holder.
    let demoted = async {
        loop {
            leader_rx.changed().await?;
            if !*leader_rx.borrow() {
                return Ok::<(), anyhow::Error>(());
            }
        }
    };

    tokio::select! {
        lost = demoted => {
            match lost {
                Ok(()) => {
                    warn!("Leadership lease lost to another replica");
                    bail!("Lost the leadership lease, stepping down")
                }
                Err(err) => bail!("Leadership lease watch closed unexpectedly: {err}"),
            }
        }
        result = run_controller(controller) => {
            result
        }
    }
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let config = load_controller_config()?;
    debug!(?config, "Loaded controller configuration");

    let metadata = Arc::new(GceMetadata::new());

    let project = match &config.project {
        Some(project) => project.clone(),
        None => metadata
            .project_id()
            .await
            .context("Failed to resolve GCP project")?,
    };
    info!(project = %project, zone = %config.zone, reverse_zone = ?config.reverse_zone, "DNS client configured");

    let cloud_dns = CloudDns::new(&project, metadata.clone());
    let provider = Arc::new(DnsProvider::new(
        Arc::new(cloud_dns),
        config.zone.clone(),
        config.reverse_zone.clone(),
    ));

    debug!("Connecting to the Kubernetes API");
    let client = Client::try_default().await?;

    let controller = Arc::new(Controller::new(
        client.clone(),
        provider,
        metadata,
        config.namespace.clone(),
    ));

    tokio::spawn(async {
        if let Err(err) = serve_metrics().await {
            error!(error = %err, "Metrics server exited");
        }
    });

    let leader_config = load_leader_election_config();
    if leader_config.enabled {
        run_with_leader_election(client, controller, leader_config).await
    } else {
        warn!("Leader election disabled, running as the sole writer");
        run_controller(controller).await
    }
}

#[cfg(test)]
mod main_tests;
