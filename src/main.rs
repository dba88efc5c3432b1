// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use cf_operator::{
    constants::{
        DEFAULT_MAX_RECONCILE_RATE, METRICS_SERVER_PORT, TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS,
    },
    context::{build_http_client, install_crypto_provider, Context, Settings},
    crd::{
        App, Domain, OrgMembers, OrgQuota, OrgRole, Organization, Route, ServiceCredentialBinding,
        ServiceInstance, ServiceRouteBinding, Space, SpaceMembers, SpaceQuota, SpaceRole,
    },
    duration::parse_duration,
    metrics,
    reconcilers::run_controller,
};
use clap::Parser;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Kubernetes operator reconciling Cloud Foundry resources.
#[derive(Parser, Debug)]
#[command(name = "cf-operator", version, about)]
struct Args {
    /// Requeue interval for resources that are Ready
    #[arg(long, default_value = "10m", value_parser = parse_duration)]
    sync_interval: Duration,

    /// Delay between two polls of a CF job or build
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    poll_interval: Duration,

    /// Upper bound of one reconcile
    #[arg(long, default_value = "1m", value_parser = parse_duration)]
    timeout: Duration,

    /// Upper bound of one ServiceInstance reconcile
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    service_instance_timeout: Duration,

    /// Concurrent reconciles per kind
    #[arg(long, default_value_t = DEFAULT_MAX_RECONCILE_RATE)]
    max_reconcile_rate: u16,

    /// Port serving Prometheus metrics
    #[arg(long, default_value_t = METRICS_SERVER_PORT)]
    metrics_port: u16,

    /// Only watch resources in this namespace
    #[arg(long)]
    namespace: Option<String>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            sync_interval: self.sync_interval,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
            service_instance_timeout: self.service_instance_timeout,
            max_reconcile_rate: self.max_reconcile_rate,
            namespace: self.namespace.clone().filter(|ns| !ns.is_empty()),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_tracing() {
    // RUST_LOG selects the level (default info), RUST_LOG_FORMAT=json|text the output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();

    info!("Starting Cloud Foundry operator");
    let settings = args.settings();
    debug!(settings = ?settings, "Operator settings");

    install_crypto_provider();

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let http_client = build_http_client(settings.timeout)?;
    let ctx = Arc::new(Context::new(client, http_client, settings));

    info!(
        namespace = ctx.settings.namespace.as_deref().unwrap_or("all"),
        max_reconcile_rate = ctx.settings.max_reconcile_rate,
        "Starting all controllers"
    );

    // Controllers only return after SIGTERM/SIGINT; the first one to stop ends the process
    tokio::select! {
        result = metrics::serve(args.metrics_port) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = run_controller::<Organization>(ctx.clone()) => controller_exit("Organization", result),
        result = run_controller::<Space>(ctx.clone()) => controller_exit("Space", result),
        result = run_controller::<OrgQuota>(ctx.clone()) => controller_exit("OrgQuota", result),
        result = run_controller::<SpaceQuota>(ctx.clone()) => controller_exit("SpaceQuota", result),
        result = run_controller::<Domain>(ctx.clone()) => controller_exit("Domain", result),
        result = run_controller::<Route>(ctx.clone()) => controller_exit("Route", result),
        result = run_controller::<App>(ctx.clone()) => controller_exit("App", result),
        result = run_controller::<ServiceInstance>(ctx.clone()) => controller_exit("ServiceInstance", result),
        result = run_controller::<ServiceCredentialBinding>(ctx.clone()) => controller_exit("ServiceCredentialBinding", result),
        result = run_controller::<ServiceRouteBinding>(ctx.clone()) => controller_exit("ServiceRouteBinding", result),
        result = run_controller::<OrgRole>(ctx.clone()) => controller_exit("OrgRole", result),
        result = run_controller::<SpaceRole>(ctx.clone()) => controller_exit("SpaceRole", result),
        result = run_controller::<OrgMembers>(ctx.clone()) => controller_exit("OrgMembers", result),
        result = run_controller::<SpaceMembers>(ctx.clone()) => controller_exit("SpaceMembers", result),
    }
}

/// Outcome of the first controller to return.
fn controller_exit(kind: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            info!("{kind} controller stopped, shutting down");
            Ok(())
        }
        Err(e) => {
            error!("CRITICAL: {kind} controller exited unexpectedly: {e:?}");
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
