// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use extdns::{
    config::OperatorConfig,
    constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS, ERROR_REQUEUE_DURATION_SECS,
        LEASE_NAME, METRICS_SERVER_PATH, PLATFORM_CREDENTIALS_SECRET, RECONCILE_REQUEUE_SECS,
        SERVER_BIND_ADDRESS, TOKIO_WORKER_THREADS, WEBHOOK_VALIDATE_PATH,
    },
    context::{externaldnses_with_platform_credentials, Context},
    crd::ExternalDNS,
    metrics::{self, ReconcileOutcome},
    reconcilers::credentials_request::CredentialsRequest,
    reconcilers::reconcile_externaldns,
    webhook,
};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use kube::{
    runtime::{controller::Action, reflector, reflector::ObjectRef, watcher, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use kube_lease_manager::LeaseManagerBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("extdns-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to INFO level.
/// Respects `RUST_LOG_FORMAT` environment variable for output format (json or text).
fn initialize_logging() {
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

    info!("Starting ExternalDNS lifecycle operator");
}

/// Initialize the Kubernetes client and the shared context.
///
/// The context carries the operator configuration and a reflector store over
/// all `ExternalDNS` resources; the store backs the secret-name reverse
/// lookups the watch mappers use.
async fn initialize_shared_context(config: OperatorConfig) -> Result<Arc<Context>> {
    debug!("Initializing Kubernetes client");
    let kube_config = kube::Config::infer().await?;
    let client = Client::try_from(kube_config)?;

    let externaldns_api = Api::<ExternalDNS>::all(client.clone());
    let (store, writer) = reflector::store();

    tokio::spawn(async move {
        let stream = watcher(externaldns_api, watcher::Config::default());
        reflector(writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("ExternalDNS reflector stream ended");
    });

    info!(
        operand_namespace = %config.operand_namespace,
        operator_namespace = %config.operator_namespace,
        is_openshift = config.is_openshift,
        "Shared context initialized"
    );

    Ok(Arc::new(Context {
        client,
        config,
        externaldnses: store,
    }))
}

/// Start the Prometheus metrics HTTP server with a health probe.
fn start_metrics_server(port: u16) -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = SERVER_BIND_ADDRESS,
        port,
        path = METRICS_SERVER_PATH,
        "Starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            metrics::gather()
        }

        async fn healthz_handler() -> &'static str {
            "ok"
        }

        let app = Router::new()
            .route(METRICS_SERVER_PATH, get(metrics_handler))
            .route("/healthz", get(healthz_handler));

        let bind_addr = format!("{SERVER_BIND_ADDRESS}:{port}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");

        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

/// Start the admission webhook HTTP server.
///
/// TLS termination is external (a fronting proxy or the platform's serving
/// certificates); the webhook itself serves plain HTTP.
fn start_webhook_server(context: Arc<Context>, port: u16) -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = SERVER_BIND_ADDRESS,
        port,
        path = WEBHOOK_VALIDATE_PATH,
        "Starting admission webhook server"
    );

    tokio::spawn(async move {
        let app = Router::new()
            .route(WEBHOOK_VALIDATE_PATH, post(webhook::validate_handler))
            .with_state(context);

        let bind_addr = format!("{SERVER_BIND_ADDRESS}:{port}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind webhook server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Webhook server listening on http://{bind_addr}{WEBHOOK_VALIDATE_PATH}");

        if let Err(e) = axum::serve(listener, app).await {
            error!("Webhook server error: {e}");
        }
    })
}

/// Create a default watcher configuration.
#[inline]
fn default_watcher_config() -> Config {
    Config::default()
}

/// Create a semantic watcher configuration.
///
/// Only triggers on semantic changes (spec modifications), ignoring
/// status-only updates, which prevents status-write reconcile loops.
#[inline]
fn semantic_watcher_config() -> Config {
    Config::default().any_semantic()
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let config = OperatorConfig::parse();
    let context = initialize_shared_context(config).await?;

    let _metrics_handle = start_metrics_server(context.config.metrics_port);
    let _webhook_handle = start_webhook_server(context.clone(), context.config.webhook_port);

    let leader_election_enabled = std::env::var("EXTDNS_ENABLE_LEADER_ELECTION")
        .unwrap_or_else(|_| "true".to_string())
        .parse::<bool>()
        .unwrap_or(true);

    if leader_election_enabled {
        let identity = std::env::var("POD_NAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| "extdns-operator".to_string());

        info!(
            lease_name = LEASE_NAME,
            lease_namespace = %context.config.operator_namespace,
            identity = %identity,
            "Leader election enabled, waiting to acquire leadership..."
        );

        let lease_manager = LeaseManagerBuilder::new(context.client.clone(), LEASE_NAME)
            .with_namespace(&context.config.operator_namespace)
            .with_identity(&identity)
            .with_duration(DEFAULT_LEASE_DURATION_SECS)
            .with_grace(DEFAULT_LEASE_GRACE_SECS)
            .build()
            .await?;

        let (leader_rx, _lease_handle) = lease_manager.watch().await;

        let mut rx = leader_rx.clone();
        while !*rx.borrow_and_update() {
            rx.changed().await?;
        }

        info!("Leadership acquired, starting controller");

        run_operator_with_leadership(context, leader_rx).await?;
    } else {
        warn!("Leader election DISABLED - running without high availability");
        run_operator_with_signals(context).await?;
    }

    Ok(())
}

/// Monitor leadership status - returns when leadership is lost or an error occurs
async fn monitor_leadership(
    mut leader_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<(), anyhow::Error> {
    loop {
        leader_rx.changed().await?;
        if !*leader_rx.borrow() {
            return Ok(());
        }
    }
}

/// Run the controller until a signal arrives or leadership is lost.
async fn run_operator_with_leadership(
    context: Arc<Context>,
    leader_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    let shutdown_result: Result<()> = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }

        result = wait_for_sigterm() => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }

        result = monitor_leadership(leader_rx) => {
            match result {
                Ok(()) => {
                    warn!("Leadership lost! Stopping the controller...");
                    anyhow::bail!("Leadership lost - stepping down")
                }
                Err(e) => {
                    error!("Leadership monitor error: {:?}", e);
                    anyhow::bail!("Leadership monitoring failed: {e}")
                }
            }
        }

        result = run_externaldns_operator(context) => {
            error!("CRITICAL: ExternalDNS operator exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ExternalDNS operator exited unexpectedly without error")
        }
    };

    shutdown_result?;
    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Run the controller until a signal arrives.
async fn run_operator_with_signals(context: Arc<Context>) -> Result<()> {
    let shutdown_result: Result<()> = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }

        result = wait_for_sigterm() => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }

        result = run_externaldns_operator(context) => {
            error!("CRITICAL: ExternalDNS operator exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ExternalDNS operator exited unexpectedly without error")
        }
    };

    shutdown_result?;
    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Wait for SIGTERM (Kubernetes sends this when deleting pods).
async fn wait_for_sigterm() -> Result<(), anyhow::Error> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        sigterm.recv().await;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Run the `ExternalDNS` operator.
///
/// Changes to any owned resource re-enqueue the owning CR through owner
/// references; credentials secrets are wired through two predicated watches
/// (source namespace and operand namespace) resolved against the reflector
/// store, because the CR references them by name rather than ownership.
async fn run_externaldns_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting ExternalDNS operator");

    let client = context.client.clone();
    let api = Api::<ExternalDNS>::all(client.clone());
    let deployment_api =
        Api::<Deployment>::namespaced(client.clone(), &context.config.operand_namespace);
    let service_account_api =
        Api::<ServiceAccount>::namespaced(client.clone(), &context.config.operand_namespace);
    let credentials_request_api =
        Api::<CredentialsRequest>::namespaced(client.clone(), &context.config.operator_namespace);
    let source_secret_api =
        Api::<Secret>::namespaced(client.clone(), &context.config.operator_namespace);
    let destination_secret_api =
        Api::<Secret>::namespaced(client.clone(), &context.config.operand_namespace);
    let trusted_ca_api =
        Api::<ConfigMap>::namespaced(client.clone(), &context.config.operator_namespace);

    let source_ctx = context.clone();
    let destination_ctx = context.clone();
    let trusted_ca_ctx = context.clone();

    Controller::new(api, semantic_watcher_config())
        .owns(deployment_api, default_watcher_config())
        .owns(service_account_api, default_watcher_config())
        .owns(credentials_request_api, default_watcher_config())
        .watches(source_secret_api, default_watcher_config(), move |secret| {
            let name = secret.name_any();
            let mut refs = source_ctx.externaldnses_with_source_secret(&name);
            if name == PLATFORM_CREDENTIALS_SECRET {
                refs.extend(externaldnses_with_platform_credentials(
                    &source_ctx.externaldnses,
                ));
            }
            refs
        })
        .watches(
            destination_secret_api,
            default_watcher_config(),
            move |secret| destination_ctx.externaldnses_with_destination_secret(&secret.name_any()),
        )
        .watches(trusted_ca_api, default_watcher_config(), move |configmap| {
            if trusted_ca_ctx.config.trusted_ca_configmap.as_deref()
                == Some(configmap.name_any().as_str())
            {
                trusted_ca_ctx
                    .externaldnses
                    .state()
                    .iter()
                    .map(|edns| ObjectRef::from_obj(&**edns))
                    .collect()
            } else {
                Vec::new()
            }
        })
        .run(reconcile_externaldns_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `ExternalDNS`
async fn reconcile_externaldns_wrapper(
    edns: Arc<ExternalDNS>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = std::time::Instant::now();

    debug!(
        name = %edns.name_any(),
        "Reconcile wrapper called for ExternalDNS"
    );

    let result = Box::pin(reconcile_externaldns(ctx.clone(), &edns)).await;
    let duration = start.elapsed();

    match result {
        Ok(()) => {
            metrics::record_reconciliation(ReconcileOutcome::Success, duration);

            // Event-driven: owned-resource and secret watches trigger immediate
            // reconciliation, the requeue is only a drift backstop.
            debug!("ExternalDNS reconciled, requeueing in {RECONCILE_REQUEUE_SECS}s");
            Ok(Action::requeue(Duration::from_secs(RECONCILE_REQUEUE_SECS)))
        }
        Err(e) => {
            error!("Failed to reconcile ExternalDNS {}: {}", edns.name_any(), e);
            metrics::record_reconciliation(ReconcileOutcome::Error, duration);
            Err(e.into())
        }
    }
}

/// Error policy for the controller.
///
/// Returns an action to requeue the resource after a delay when reconciliation fails.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy<T, C>(resource: Arc<T>, err: &ReconcileError, _ctx: Arc<C>) -> Action
where
    T: std::fmt::Debug,
{
    error!(
        error = %err,
        resource = ?resource,
        "Reconciliation error - will retry in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
