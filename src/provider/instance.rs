// src/provider/instance.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::error::ProviderError;

/// Status summary reported for one side of an instance check.
/// Only `ok` counts as healthy; everything else flags the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusSummary {
    Ok,
    Impaired,
    InsufficientData,
    NotApplicable,
    Initializing,
}

impl StatusSummary {
    pub fn is_ok(self) -> bool {
        self == StatusSummary::Ok
    }
}

/// One instance's status as reported by the status provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatusRecord {
    pub instance_id: String,
    pub instance_status: StatusSummary,
    pub system_status: StatusSummary,
}

impl InstanceStatusRecord {
    /// Healthy only when both the instance-level and system-level
    /// checks report ok.
    pub fn is_healthy(&self) -> bool {
        self.instance_status.is_ok() && self.system_status.is_ok()
    }
}

/// Read-only collaborator that reports instance status for a fixed
/// set of instance IDs.
#[async_trait]
pub trait InstanceStatusProvider: Send + Sync {
    async fn describe_status(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<InstanceStatusRecord>, ProviderError>;
}

#[derive(Serialize)]
struct StatusQuery<'a> {
    instance_ids: &'a [String],
}

#[derive(Deserialize)]
struct StatusResponse {
    statuses: Vec<InstanceStatusRecord>,
}

/// Production provider: queries an HTTP status endpoint with the
/// configured instance IDs and decodes the JSON reply.
pub struct HttpInstanceStatusProvider {
    client: Client,
    endpoint: Url,
}

impl HttpInstanceStatusProvider {
    pub fn new(endpoint: Url, client: Client) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl InstanceStatusProvider for HttpInstanceStatusProvider {
    async fn describe_status(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<InstanceStatusRecord>, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&StatusQuery { instance_ids })
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

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(self.endpoint.as_str(), &e))?;

        debug!(
            endpoint = %self.endpoint,
            records = body.statuses.len(),
            "fetched instance status"
        );

        Ok(body.statuses)
    }
}
