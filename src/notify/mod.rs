// src/notify/mod.rs
mod publisher;

pub use publisher::{LogPublisher, NotificationPublisher, WebhookPublisher};
