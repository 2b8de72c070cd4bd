// src/provider/target.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::error::ProviderError;

/// Health state of one routing target within a target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Healthy,
    Unhealthy,
    Initial,
    Draining,
    Unused,
    Unavailable,
}

impl TargetState {
    pub fn is_healthy(self) -> bool {
        self == TargetState::Healthy
    }
}

/// One target's health as reported by the load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHealthRecord {
    pub target_id: String,
    pub state: TargetState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TargetHealthRecord {
    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }
}

/// Read-only collaborator that reports health for every target in a
/// named target group.
#[async_trait]
pub trait TargetHealthProvider: Send + Sync {
    async fn describe_health(
        &self,
        target_group_id: &str,
    ) -> Result<Vec<TargetHealthRecord>, ProviderError>;
}

#[derive(Serialize)]
struct HealthQuery<'a> {
    target_group: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    targets: Vec<TargetHealthRecord>,
}

/// Production provider: queries an HTTP target-health endpoint for the
/// configured target group.
pub struct HttpTargetHealthProvider {
    client: Client,
    endpoint: Url,
}

impl HttpTargetHealthProvider {
    pub fn new(endpoint: Url, client: Client) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl TargetHealthProvider for HttpTargetHealthProvider {
    async fn describe_health(
        &self,
        target_group_id: &str,
    ) -> Result<Vec<TargetHealthRecord>, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&HealthQuery {
                target_group: target_group_id,
            })
            .send()
            .await
            .map_err(|e| ProviderError::transport(self.endpoint.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadStatus {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body: HealthResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(self.endpoint.as_str(), &e))?;

        debug!(
            endpoint = %self.endpoint,
            target_group = target_group_id,
            records = body.targets.len(),
            "fetched target health"
        );

        Ok(body.targets)
    }
}
