// src/health/runner.rs
use std::sync::Arc;
use tokio::time::interval;
use tracing::info;

use super::aggregator::HealthAggregator;
use crate::config::CheckerConfig;

/// Drives the aggregator on a fixed schedule. Each tick is an
/// independent check; a failed check is already logged and recorded by
/// the aggregator, and the runner keeps ticking.
pub struct CheckRunner {
    config: CheckerConfig,
    aggregator: Arc<HealthAggregator>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl CheckRunner {
    pub fn new(config: CheckerConfig, aggregator: Arc<HealthAggregator>) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Self {
            config,
            aggregator,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn start(self: Arc<Self>) {
        let mut interval = interval(self.config.interval());
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!(
            "Starting check runner with interval: {:?}",
            self.config.interval()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Ok(outcome) = self.aggregator.run_check().await {
                        info!(
                            check_id = %outcome.check_id,
                            instances_checked = outcome.instances_checked,
                            targets_checked = outcome.targets_checked,
                            unhealthy_instances = outcome.unhealthy_instances,
                            unhealthy_targets = outcome.unhealthy_targets,
                            alert_published = outcome.alert_published,
                            "health check complete"
                        );
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Check runner shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
