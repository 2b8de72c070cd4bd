// src/main.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use fleetwatch::{
    config::{self, NotificationConfig, NotifyMode},
    health::{AggregatorConfig, CheckRunner, HealthAggregator, COMPLETION_MESSAGE},
    metrics::MetricsRegistry,
    notify::{LogPublisher, NotificationPublisher, WebhookPublisher},
    provider::{HttpInstanceStatusProvider, HttpTargetHealthProvider},
    server::{ServerBuilder, TriggerHandler},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleetwatch=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let run_once = args.iter().any(|a| a == "--once");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "fleetwatch.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);
    let metrics = metrics_registry.collector();

    // Shared HTTP client for all collaborators
    let client = reqwest::Client::builder()
        .timeout(config.providers.timeout())
        .build()
        .context("Failed to create HTTP client")?;

    let instances = Arc::new(HttpInstanceStatusProvider::new(
        config.providers.instance_status_url.clone(),
        client.clone(),
    ));
    let targets = Arc::new(HttpTargetHealthProvider::new(
        config.providers.target_health_url.clone(),
        client.clone(),
    ));
    let publisher = build_publisher(&config.notification, client)?;

    let aggregator = Arc::new(HealthAggregator::new(
        AggregatorConfig {
            instance_ids: config.instances.clone(),
            target_group: config.target_group.clone(),
            channel: config.notification.channel.clone(),
        },
        instances,
        targets,
        publisher,
        Some(metrics),
    ));

    if run_once {
        // One check, then exit; a provider failure becomes a non-zero
        // exit status for the invoking scheduler.
        let outcome = aggregator.run_check().await?;
        info!(
            check_id = %outcome.check_id,
            unhealthy_instances = outcome.unhealthy_instances,
            unhealthy_targets = outcome.unhealthy_targets,
            alert_published = outcome.alert_published,
            "{}",
            COMPLETION_MESSAGE
        );
        return Ok(());
    }

    // Start scheduled checks
    let runner = Arc::new(CheckRunner::new(config.checker.clone(), aggregator.clone()));
    tokio::spawn(runner.clone().start());

    if config.server.enabled {
        let handler = TriggerHandler::new(
            aggregator,
            metrics_registry.clone(),
            config.metrics.clone(),
        );

        info!("Starting trigger server on {}", config.server.listen);
        tokio::select! {
            result = ServerBuilder::new(config.server.listen).with_handler(handler).serve() => result?,
            _ = shutdown_signal() => {}
        }
    } else {
        shutdown_signal().await;
    }

    runner.shutdown();
    Ok(())
}

fn build_publisher(
    config: &NotificationConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn NotificationPublisher>> {
    match config.mode {
        NotifyMode::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .context("notification.webhook_url is required when mode is webhook")?;
            Ok(Arc::new(WebhookPublisher::new(url, client)))
        }
        NotifyMode::Log => Ok(Arc::new(LogPublisher)),
    }
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
