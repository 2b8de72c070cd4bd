// src/server/handler.rs
use hyper::{Body, Method, Request, Response, StatusCode};
use std::sync::Arc;
use tower::Service;

use crate::config::MetricsConfig;
use crate::health::{HealthAggregator, COMPLETION_MESSAGE};
use crate::metrics::MetricsRegistry;
use crate::provider::ProviderError;

// Convert ProviderError to a Hyper response: the trigger sees the
// whole invocation fail, with the error text as diagnostic.
impl From<ProviderError> for Response<Body> {
    fn from(err: ProviderError) -> Self {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(err.to_string()))
            .unwrap()
    }
}

/// Trigger surface: `POST /invoke` runs one check now, `GET <metrics
/// path>` serves the Prometheus registry. The request body of an
/// invoke (the trigger's event object) is ignored.
#[derive(Clone)]
pub struct TriggerHandler {
    aggregator: Arc<HealthAggregator>,
    registry: Arc<MetricsRegistry>,
    metrics: MetricsConfig,
}

impl TriggerHandler {
    pub fn new(
        aggregator: Arc<HealthAggregator>,
        registry: Arc<MetricsRegistry>,
        metrics: MetricsConfig,
    ) -> Self {
        Self {
            aggregator,
            registry,
            metrics,
        }
    }

    async fn dispatch(self, req: Request<Body>) -> Response<Body> {
        match (req.method(), req.uri().path()) {
            (&Method::POST, "/invoke") => match self.aggregator.run_check().await {
                Ok(_) => Response::builder()
                    .status(StatusCode::OK)
                    .body(Body::from(COMPLETION_MESSAGE))
                    .unwrap(),
                Err(err) => err.into(),
            },
            (&Method::GET, path) if self.metrics.enabled && path == self.metrics.path => {
                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "text/plain; version=0.0.4")
                    .body(Body::from(self.registry.gather()))
                    .unwrap()
            }
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from("Not Found"))
                .unwrap(),
        }
    }
}

impl Service<Request<Body>> for TriggerHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.dispatch(req).await) })
    }
}
