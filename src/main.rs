// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    core::v1::{ConfigMap, Secret, Service},
};
use kube::{
    runtime::{watcher::Config, Controller},
    Api, Client,
};
use opensearch_operator::{
    constants::{
        CONTROLLER_NAME, DEFAULT_ENGINE_PASSWORD, DEFAULT_ENGINE_USERNAME, DEFAULT_REQUEUE_SECS,
        ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_ADDRESS, METRICS_SERVER_PATH,
        TOKIO_WORKER_THREADS,
    },
    context::{Context, OperatorConfig},
    crd::{self, legacy},
    events::KubeEventSink,
    metrics::gather_metrics,
    opensearch::OpenSearchClient,
    pki::RcgenIssuer,
    reconcilers::{
        error_policy, migration_error_policy, reconcile_cluster, reconcile_forward,
        reconcile_reverse,
    },
    store::{KubeStore, Managed},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Command-line flags. Every flag falls back to an environment variable.
#[derive(Debug, Parser)]
#[command(name = "opensearch-operator", version, about)]
struct OperatorArgs {
    /// Namespace to watch; all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Bind address of the metrics server
    #[arg(long, env = "METRICS_ADDR", default_value = METRICS_SERVER_ADDRESS)]
    metrics_addr: String,

    /// Username for the engine REST API
    #[arg(long, env = "OPENSEARCH_USERNAME", default_value = DEFAULT_ENGINE_USERNAME)]
    engine_username: String,

    /// Password for the engine REST API
    #[arg(long, env = "OPENSEARCH_PASSWORD", default_value = DEFAULT_ENGINE_PASSWORD, hide_env_values = true)]
    engine_password: String,

    /// Verify engine certificates instead of accepting self-signed ones.
    ///
    /// Only the platform trust store is consulted, so this requires engine HTTP
    /// certificates from a publicly trusted issuer. Operator-generated certificates are
    /// signed by a per-cluster CA and will fail verification.
    #[arg(long, env = "OPENSEARCH_VERIFY_TLS")]
    engine_verify_tls: bool,

    /// Seconds between steady-state passes
    #[arg(long, env = "REQUEUE_SECS", default_value_t = DEFAULT_REQUEUE_SECS)]
    requeue_secs: u64,

    /// Seconds to back off after a transient failure
    #[arg(long, env = "BACKOFF_SECS", default_value_t = ERROR_REQUEUE_DURATION_SECS)]
    backoff_secs: u64,

    /// Do not run the legacy-group migration controllers
    #[arg(long, env = "DISABLE_MIGRATION")]
    disable_migration: bool,
}

impl OperatorArgs {
    fn into_config(self) -> OperatorConfig {
        OperatorConfig {
            watch_namespace: self.watch_namespace.filter(|ns| !ns.is_empty()),
            metrics_addr: self.metrics_addr,
            engine_username: self.engine_username,
            engine_password: self.engine_password,
            engine_insecure: !self.engine_verify_tls,
            requeue: Duration::from_secs(self.requeue_secs),
            backoff: Duration::from_secs(self.backoff_secs),
            migration_enabled: !self.disable_migration,
        }
    }
}

fn main() -> Result<()> {
    let config = OperatorArgs::parse().into_config();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("opensearch-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT (json or text)
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

    info!("Starting OpenSearch Operator");
    debug!(watch_namespace = ?config.watch_namespace, migration = config.migration_enabled, "Operator configuration");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let engine = OpenSearchClient::new(
        &config.engine_username,
        &config.engine_password,
        config.engine_insecure,
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown = shutdown_trigger(shutdown_signal(), shutdown_tx);
    let ctx = Arc::new(Context::new(
        KubeStore::new(client.clone(), CONTROLLER_NAME),
        Arc::new(engine),
        Arc::new(KubeEventSink::new(client.clone(), CONTROLLER_NAME)),
        Arc::new(RcgenIssuer),
        config.clone(),
        shutdown_rx,
    ));

    let metrics_addr = config.metrics_addr.clone();
    let metrics = tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr).await {
            error!("Metrics server error: {}", e);
        }
    });

    info!("Starting all controllers");

    let cluster = async {
        run_cluster_controller(client.clone(), ctx.clone(), shutdown.clone()).await?;
        controller_exit("OpenSearchCluster controller", ctx.is_cancelled())
    };
    let migration = async {
        if !config.migration_enabled {
            return Ok(());
        }
        run_migration_controllers(client.clone(), ctx.clone(), shutdown.clone()).await?;
        controller_exit("migration controllers", ctx.is_cancelled())
    };

    // Controllers only return once the trigger fired and in-flight passes finished
    let result = tokio::try_join!(cluster, migration).map(|((), ())| ());
    metrics.abort();
    result
}

/// Resolves once shutdown starts; clones share the same signal.
type ShutdownTrigger = Shared<BoxFuture<'static, ()>>;

/// Flip the cancellation watch when `signal` fires, then release the controllers.
///
/// The watch is set before the trigger resolves, so in-flight passes stop at their next
/// cancellation point while the controllers wait for them to drain.
fn shutdown_trigger<F>(signal: F, tx: watch::Sender<bool>) -> ShutdownTrigger
where
    F: Future<Output = ()> + Send + 'static,
{
    async move {
        signal.await;
        info!("Received shutdown signal, draining controllers");
        let _ = tx.send(true);
    }
    .boxed()
    .shared()
}

/// A controller stream ending without a shutdown request is fatal.
fn controller_exit(name: &str, cancelled: bool) -> Result<()> {
    if cancelled {
        info!("{name} drained");
        Ok(())
    } else {
        error!("CRITICAL: {name} exited unexpectedly");
        Err(anyhow::anyhow!("{name} exited unexpectedly"))
    }
}

/// Build an `Api` scoped to the watch namespace, or cluster-wide.
fn scoped_api<K: Managed>(client: &Client, namespace: Option<&str>) -> Api<K> {
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the `OpenSearchCluster` controller
async fn run_cluster_controller(
    client: Client,
    ctx: Arc<Context>,
    shutdown: ShutdownTrigger,
) -> Result<()> {
    info!("Starting OpenSearchCluster controller");

    let api = scoped_api::<crd::OpenSearchCluster>(&client, ctx.config.watch_namespace.as_deref());

    // Owned objects live in the target namespace, which may differ from the descriptor's
    Controller::new(api, Config::default())
        .owns(Api::<StatefulSet>::all(client.clone()), Config::default())
        .owns(Api::<Service>::all(client.clone()), Config::default())
        .owns(Api::<ConfigMap>::all(client.clone()), Config::default())
        .owns(Api::<Secret>::all(client.clone()), Config::default())
        .owns(Api::<Deployment>::all(client), Config::default())
        .graceful_shutdown_on(shutdown)
        .run(
            reconcile_cluster::<KubeStore>,
            error_policy::<KubeStore>,
            ctx,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the forward and reverse migration controller for one kind.
///
/// `L` is the legacy-group type, `C` its current-group counterpart.
async fn run_migration_pair<L, C>(
    client: Client,
    ctx: Arc<Context>,
    shutdown: ShutdownTrigger,
) -> Result<()>
where
    L: Managed,
    C: Managed,
{
    info!(
        kind = %L::kind(&()),
        "Starting migration controllers for {} <-> {}",
        L::api_version(&()),
        C::api_version(&())
    );

    let namespace = ctx.config.watch_namespace.clone();
    let forward = Controller::new(
        scoped_api::<L>(&client, namespace.as_deref()),
        Config::default(),
    )
    .graceful_shutdown_on(shutdown.clone())
    .run(
        reconcile_forward::<L, C, KubeStore>,
        migration_error_policy::<L, KubeStore>,
        ctx.clone(),
    )
    .for_each(|_| futures::future::ready(()));

    let reverse = Controller::new(
        scoped_api::<C>(&client, namespace.as_deref()),
        Config::default(),
    )
    .graceful_shutdown_on(shutdown)
    .run(
        reconcile_reverse::<C, L, KubeStore>,
        migration_error_policy::<C, KubeStore>,
        ctx,
    )
    .for_each(|_| futures::future::ready(()));

    futures::join!(forward, reverse);
    Ok(())
}

/// Run the migration controllers for every kind served under both groups.
async fn run_migration_controllers(
    client: Client,
    ctx: Arc<Context>,
    shutdown: ShutdownTrigger,
) -> Result<()> {
    tokio::try_join!(
        run_migration_pair::<legacy::OpenSearchCluster, crd::OpenSearchCluster>(
            client.clone(),
            ctx.clone(),
            shutdown.clone()
        ),
        run_migration_pair::<legacy::OpensearchUser, crd::OpensearchUser>(
            client.clone(),
            ctx.clone(),
            shutdown.clone()
        ),
        run_migration_pair::<legacy::OpensearchRole, crd::OpensearchRole>(
            client.clone(),
            ctx.clone(),
            shutdown.clone()
        ),
        run_migration_pair::<legacy::OpensearchTenant, crd::OpensearchTenant>(
            client.clone(),
            ctx.clone(),
            shutdown.clone()
        ),
        run_migration_pair::<legacy::OpensearchActionGroup, crd::OpensearchActionGroup>(
            client.clone(),
            ctx.clone(),
            shutdown.clone()
        ),
        run_migration_pair::<legacy::OpensearchSnapshotPolicy, crd::OpensearchSnapshotPolicy>(
            client, ctx, shutdown
        ),
    )?;
    Ok(())
}

/// Router serving the Prometheus text exposition.
fn metrics_router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        ),
    }
}

async fn run_metrics_server(addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, path = METRICS_SERVER_PATH, "Starting metrics server");
    axum::serve(listener, metrics_router()).await?;
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
