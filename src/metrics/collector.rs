// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use crate::health::CheckOutcome;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        buffer
    }
}

pub struct MetricsCollector {
    // Check metrics
    pub checks_total: IntCounterVec,
    pub check_duration_seconds: Histogram,
    pub alerts_published_total: IntCounter,

    // Last observed fleet state
    pub unhealthy_instances: IntGauge,
    pub unhealthy_targets: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let checks_total = IntCounterVec::new(
            Opts::new("fw_checks_total", "Total number of health checks"),
            &["outcome"],
        )?;
        registry.register(Box::new(checks_total.clone()))?;

        let check_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "fw_check_duration_seconds",
            "Health check duration in seconds",
        ))?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let alerts_published_total = IntCounter::new(
            "fw_alerts_published_total",
            "Total number of alerts published",
        )?;
        registry.register(Box::new(alerts_published_total.clone()))?;

        let unhealthy_instances = IntGauge::new(
            "fw_unhealthy_instances",
            "Unhealthy instances in the last completed check",
        )?;
        registry.register(Box::new(unhealthy_instances.clone()))?;

        let unhealthy_targets = IntGauge::new(
            "fw_unhealthy_targets",
            "Unhealthy targets in the last completed check",
        )?;
        registry.register(Box::new(unhealthy_targets.clone()))?;

        Ok(Self {
            checks_total,
            check_duration_seconds,
            alerts_published_total,
            unhealthy_instances,
            unhealthy_targets,
        })
    }

    pub fn record_check(&self, outcome: &CheckOutcome, duration: Duration) {
        self.checks_total.with_label_values(&["ok"]).inc();
        self.check_duration_seconds.observe(duration.as_secs_f64());

        self.unhealthy_instances
            .set(outcome.unhealthy_instances as i64);
        self.unhealthy_targets.set(outcome.unhealthy_targets as i64);

        if outcome.alert_published {
            self.alerts_published_total.inc();
        }
    }

    pub fn record_check_failure(&self, duration: Duration) {
        self.checks_total.with_label_values(&["error"]).inc();
        self.check_duration_seconds.observe(duration.as_secs_f64());
    }
}
