// src/health/aggregator.rs
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics::MetricsCollector;
use crate::notify::NotificationPublisher;
use crate::provider::{
    InstanceStatusProvider, InstanceStatusRecord, ProviderError, TargetHealthProvider,
    TargetHealthRecord,
};

/// Subject line used for every alert message.
pub const ALERT_SUBJECT: &str = "Health Check Alert";

/// What the aggregator watches and where alerts go. Fixed per
/// deployment; there is no discovery.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub instance_ids: Vec<String>,
    pub target_group: String,
    pub channel: String,
}

/// Alert message body: the unhealthy subsets plus a capture timestamp.
/// Built fresh per check, never stored.
#[derive(Debug, Serialize)]
pub struct AlertPayload {
    pub unhealthy_instances: Vec<InstanceStatusRecord>,
    pub unhealthy_targets: Vec<TargetHealthRecord>,
    pub timestamp: String,
}

impl AlertPayload {
    fn new(
        unhealthy_instances: Vec<InstanceStatusRecord>,
        unhealthy_targets: Vec<TargetHealthRecord>,
    ) -> Self {
        Self {
            unhealthy_instances,
            unhealthy_targets,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn render(&self) -> Result<String, ProviderError> {
        serde_json::to_string_pretty(self).map_err(|e| ProviderError::Encode(e.to_string()))
    }
}

/// Per-check summary, for logging and metrics.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub check_id: Uuid,
    pub instances_checked: usize,
    pub targets_checked: usize,
    pub unhealthy_instances: usize,
    pub unhealthy_targets: usize,
    pub alert_published: bool,
}

impl CheckOutcome {
    pub fn all_healthy(&self) -> bool {
        self.unhealthy_instances == 0 && self.unhealthy_targets == 0
    }
}

fn unhealthy_instances(records: Vec<InstanceStatusRecord>) -> Vec<InstanceStatusRecord> {
    records.into_iter().filter(|r| !r.is_healthy()).collect()
}

fn unhealthy_targets(records: Vec<TargetHealthRecord>) -> Vec<TargetHealthRecord> {
    records.into_iter().filter(|r| !r.is_healthy()).collect()
}

/// Checks the configured fleet and target group, and publishes one
/// alert per check when anything is unhealthy.
pub struct HealthAggregator {
    config: AggregatorConfig,
    instances: Arc<dyn InstanceStatusProvider>,
    targets: Arc<dyn TargetHealthProvider>,
    publisher: Arc<dyn NotificationPublisher>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthAggregator {
    pub fn new(
        config: AggregatorConfig,
        instances: Arc<dyn InstanceStatusProvider>,
        targets: Arc<dyn TargetHealthProvider>,
        publisher: Arc<dyn NotificationPublisher>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            config,
            instances,
            targets,
            publisher,
            metrics,
        }
    }

    /// Run one check. Any collaborator failure aborts the whole check
    /// and propagates unchanged; no partial alert is ever sent.
    pub async fn run_check(&self) -> Result<CheckOutcome, ProviderError> {
        let started = Instant::now();
        let result = self.check(Uuid::new_v4()).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(outcome) => metrics.record_check(outcome, started.elapsed()),
                Err(_) => metrics.record_check_failure(started.elapsed()),
            }
        }

        if let Err(e) = &result {
            error!(error = %e, "health check failed");
        }

        result
    }

    async fn check(&self, check_id: Uuid) -> Result<CheckOutcome, ProviderError> {
        debug!(
            %check_id,
            instances = self.config.instance_ids.len(),
            target_group = %self.config.target_group,
            "starting health check"
        );

        // The two reads have no ordering dependency on each other.
        let (statuses, targets) = tokio::try_join!(
            self.instances.describe_status(&self.config.instance_ids),
            self.targets.describe_health(&self.config.target_group),
        )?;

        let instances_checked = statuses.len();
        let targets_checked = targets.len();

        let bad_instances = unhealthy_instances(statuses);
        let bad_targets = unhealthy_targets(targets);

        for record in &bad_instances {
            warn!(
                %check_id,
                instance_id = %record.instance_id,
                instance_status = ?record.instance_status,
                system_status = ?record.system_status,
                "instance unhealthy"
            );
        }
        for record in &bad_targets {
            warn!(
                %check_id,
                target_id = %record.target_id,
                state = ?record.state,
                "target unhealthy"
            );
        }

        let outcome = CheckOutcome {
            check_id,
            instances_checked,
            targets_checked,
            unhealthy_instances: bad_instances.len(),
            unhealthy_targets: bad_targets.len(),
            alert_published: !bad_instances.is_empty() || !bad_targets.is_empty(),
        };

        if outcome.alert_published {
            let payload = AlertPayload::new(bad_instances, bad_targets);
            let body = payload.render()?;
            self.publisher
                .publish(&self.config.channel, ALERT_SUBJECT, &body)
                .await?;
            info!(
                %check_id,
                channel = %self.config.channel,
                unhealthy_instances = outcome.unhealthy_instances,
                unhealthy_targets = outcome.unhealthy_targets,
                "alert published"
            );
        } else {
            debug!(%check_id, "all checked entities healthy");
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StatusSummary, TargetState};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    struct FakeInstanceProvider {
        result: Result<Vec<InstanceStatusRecord>, ()>,
    }

    #[async_trait]
    impl InstanceStatusProvider for FakeInstanceProvider {
        async fn describe_status(
            &self,
            instance_ids: &[String],
        ) -> Result<Vec<InstanceStatusRecord>, ProviderError> {
            assert!(!instance_ids.is_empty());
            match &self.result {
                Ok(records) => Ok(records.clone()),
                Err(()) => Err(ProviderError::BadStatus {
                    endpoint: "http://status.test/".to_string(),
                    status: 503,
                }),
            }
        }
    }

    struct FakeTargetProvider {
        result: Result<Vec<TargetHealthRecord>, ()>,
    }

    #[async_trait]
    impl TargetHealthProvider for FakeTargetProvider {
        async fn describe_health(
            &self,
            _target_group_id: &str,
        ) -> Result<Vec<TargetHealthRecord>, ProviderError> {
            match &self.result {
                Ok(records) => Ok(records.clone()),
                Err(()) => Err(ProviderError::BadStatus {
                    endpoint: "http://elb.test/".to_string(),
                    status: 503,
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationPublisher for RecordingPublisher {
        async fn publish(
            &self,
            channel_id: &str,
            subject: &str,
            body: &str,
        ) -> Result<(), ProviderError> {
            if self.fail {
                return Err(ProviderError::Delivery {
                    channel: channel_id.to_string(),
                    message: "delivery refused".to_string(),
                });
            }
            self.published.lock().unwrap().push((
                channel_id.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    fn instance(id: &str, instance_status: StatusSummary, system_status: StatusSummary) -> InstanceStatusRecord {
        InstanceStatusRecord {
            instance_id: id.to_string(),
            instance_status,
            system_status,
        }
    }

    fn target(id: &str, state: TargetState) -> TargetHealthRecord {
        TargetHealthRecord {
            target_id: id.to_string(),
            state,
            reason: None,
        }
    }

    fn aggregator(
        statuses: Result<Vec<InstanceStatusRecord>, ()>,
        targets: Result<Vec<TargetHealthRecord>, ()>,
        publisher: Arc<RecordingPublisher>,
    ) -> HealthAggregator {
        HealthAggregator::new(
            AggregatorConfig {
                instance_ids: vec!["i-1".to_string(), "i-2".to_string()],
                target_group: "tg-web".to_string(),
                channel: "ops-alerts".to_string(),
            },
            Arc::new(FakeInstanceProvider { result: statuses }),
            Arc::new(FakeTargetProvider { result: targets }),
            publisher,
            None,
        )
    }

    #[tokio::test]
    async fn all_healthy_publishes_nothing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Ok(vec![instance("i-1", StatusSummary::Ok, StatusSummary::Ok)]),
            Ok(vec![target("10.0.1.5:8080", TargetState::Healthy)]),
            publisher.clone(),
        );

        let outcome = agg.run_check().await.unwrap();
        assert!(outcome.all_healthy());
        assert!(!outcome.alert_published);
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn impaired_instance_triggers_one_alert() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Ok(vec![instance("i-2", StatusSummary::Impaired, StatusSummary::Ok)]),
            Ok(vec![]),
            publisher.clone(),
        );

        let outcome = agg.run_check().await.unwrap();
        assert!(outcome.alert_published);
        assert_eq!(outcome.unhealthy_instances, 1);
        assert_eq!(outcome.unhealthy_targets, 0);

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (channel, subject, body) = &published[0];
        assert_eq!(channel, "ops-alerts");
        assert_eq!(subject, ALERT_SUBJECT);
        assert!(body.contains("i-2"));
        assert!(body.contains("timestamp"));
    }

    #[tokio::test]
    async fn failed_system_status_counts_as_unhealthy() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Ok(vec![instance("i-1", StatusSummary::Ok, StatusSummary::Impaired)]),
            Ok(vec![]),
            publisher.clone(),
        );

        let outcome = agg.run_check().await.unwrap();
        assert_eq!(outcome.unhealthy_instances, 1);
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unhealthy_target_triggers_alert() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Ok(vec![]),
            Ok(vec![target("10.0.1.5:8080", TargetState::Unhealthy)]),
            publisher.clone(),
        );

        let outcome = agg.run_check().await.unwrap();
        assert!(outcome.alert_published);
        assert_eq!(outcome.unhealthy_targets, 1);

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert!(published[0].2.contains("10.0.1.5:8080"));
    }

    #[tokio::test]
    async fn draining_target_is_not_healthy() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Ok(vec![]),
            Ok(vec![target("10.0.1.7:8080", TargetState::Draining)]),
            publisher.clone(),
        );

        let outcome = agg.run_check().await.unwrap();
        assert_eq!(outcome.unhealthy_targets, 1);
    }

    #[tokio::test]
    async fn status_query_failure_aborts_without_publish() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Err(()),
            Ok(vec![target("10.0.1.5:8080", TargetState::Unhealthy)]),
            publisher.clone(),
        );

        let result = agg.run_check().await;
        assert!(result.is_err());
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_query_failure_aborts_without_publish() {
        let publisher = Arc::new(RecordingPublisher::default());
        let agg = aggregator(
            Ok(vec![instance("i-2", StatusSummary::Impaired, StatusSummary::Ok)]),
            Err(()),
            publisher.clone(),
        );

        assert!(agg.run_check().await.is_err());
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_propagates() {
        let publisher = Arc::new(RecordingPublisher {
            published: Mutex::new(Vec::new()),
            fail: true,
        });
        let agg = aggregator(
            Ok(vec![instance("i-2", StatusSummary::Impaired, StatusSummary::Ok)]),
            Ok(vec![]),
            publisher,
        );

        let err = agg.run_check().await.unwrap_err();
        assert!(matches!(err, ProviderError::Delivery { .. }));
    }

    fn arb_summary() -> impl Strategy<Value = StatusSummary> {
        prop_oneof![
            Just(StatusSummary::Ok),
            Just(StatusSummary::Impaired),
            Just(StatusSummary::InsufficientData),
            Just(StatusSummary::NotApplicable),
            Just(StatusSummary::Initializing),
        ]
    }

    fn arb_instance() -> impl Strategy<Value = InstanceStatusRecord> {
        ("[a-f0-9]{8}", arb_summary(), arb_summary()).prop_map(|(id, i, s)| InstanceStatusRecord {
            instance_id: format!("i-{id}"),
            instance_status: i,
            system_status: s,
        })
    }

    fn arb_state() -> impl Strategy<Value = TargetState> {
        prop_oneof![
            Just(TargetState::Healthy),
            Just(TargetState::Unhealthy),
            Just(TargetState::Initial),
            Just(TargetState::Draining),
            Just(TargetState::Unused),
            Just(TargetState::Unavailable),
        ]
    }

    proptest! {
        #[test]
        fn instance_partition_matches_classification(
            records in proptest::collection::vec(arb_instance(), 0..16)
        ) {
            let bad = unhealthy_instances(records.clone());
            for record in &records {
                prop_assert_eq!(bad.contains(record), !record.is_healthy());
            }
            prop_assert!(bad.iter().all(|r| !r.is_healthy()));
        }

        #[test]
        fn target_partition_matches_classification(
            states in proptest::collection::vec(arb_state(), 0..16)
        ) {
            let records: Vec<TargetHealthRecord> = states
                .iter()
                .enumerate()
                .map(|(i, state)| TargetHealthRecord {
                    target_id: format!("10.0.0.{i}:8080"),
                    state: *state,
                    reason: None,
                })
                .collect();
            let bad = unhealthy_targets(records.clone());
            prop_assert_eq!(
                bad.len(),
                records.iter().filter(|r| !r.is_healthy()).count()
            );
            prop_assert!(bad.iter().all(|r| r.state != TargetState::Healthy));
        }
    }
}
