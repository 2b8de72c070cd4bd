// src/provider/mod.rs
mod error;
mod instance;
mod target;

pub use error::ProviderError;
pub use instance::{HttpInstanceStatusProvider, InstanceStatusProvider, InstanceStatusRecord, StatusSummary};
pub use target::{HttpTargetHealthProvider, TargetHealthProvider, TargetHealthRecord, TargetState};
