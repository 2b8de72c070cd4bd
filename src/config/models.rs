// src/config/models.rs
use anyhow::{ensure, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Top-level configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Fixed list of instance IDs to check. No discovery.
    pub instances: Vec<String>,
    /// Target group whose aggregate health is checked.
    pub target_group: String,
    pub providers: ProviderConfig,
    pub notification: NotificationConfig,
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.instances.is_empty(),
            "at least one instance ID must be configured"
        );
        ensure!(
            !self.target_group.is_empty(),
            "target_group must not be empty"
        );
        ensure!(
            !self.notification.channel.is_empty(),
            "notification.channel must not be empty"
        );
        if self.notification.mode == NotifyMode::Webhook {
            ensure!(
                self.notification.webhook_url.is_some(),
                "notification.webhook_url is required when mode is webhook"
            );
        }
        ensure!(
            self.checker.interval_secs > 0,
            "checker.interval_secs must be greater than zero"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Endpoint answering instance status queries.
    pub instance_status_url: Url,
    /// Endpoint answering target health queries.
    pub target_health_url: Url,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    Webhook,
    Log,
}

impl Default for NotifyMode {
    fn default() -> Self {
        NotifyMode::Webhook
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Opaque channel identifier carried in every publish call.
    pub channel: String,
    #[serde(default)]
    pub mode: NotifyMode,
    pub webhook_url: Option<Url>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub interval_secs: u64,
}

impl CheckerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: SocketAddr::from(([0, 0, 0, 0], 8088)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
instances:
  - i-0123456789abcdef0
target_group: tg-web
providers:
  instance_status_url: http://status.internal:9800/
  target_health_url: http://elb.internal:9801/
notification:
  channel: ops-alerts
  webhook_url: http://hooks.internal:9802/notify
"#
    }

    #[test]
    fn parses_minimal_yaml_with_defaults() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.instances.len(), 1);
        assert_eq!(config.target_group, "tg-web");
        assert_eq!(config.notification.mode, NotifyMode::Webhook);
        assert_eq!(config.checker.interval_secs, 60);
        assert!(config.server.enabled);
        assert_eq!(config.metrics.path, "/metrics");
        assert_eq!(config.providers.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parses_json() {
        let json = r#"{
            "instances": ["i-1", "i-2"],
            "target_group": "tg-api",
            "providers": {
                "instance_status_url": "http://localhost:9800/",
                "target_health_url": "http://localhost:9801/",
                "timeout_secs": 3
            },
            "notification": {"channel": "ops", "mode": "log"},
            "checker": {"interval_secs": 15}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.instances, vec!["i-1", "i-2"]);
        assert_eq!(config.notification.mode, NotifyMode::Log);
        assert_eq!(config.checker.interval(), Duration::from_secs(15));
    }

    #[test]
    fn rejects_empty_instance_list() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.instances.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_webhook_mode_without_url() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.notification.webhook_url = None;
        assert!(config.validate().is_err());

        config.notification.mode = NotifyMode::Log;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.checker.interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
