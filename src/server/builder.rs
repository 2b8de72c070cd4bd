// src/server/builder.rs
use anyhow::Result;
use hyper::server::conn::Http;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::handler::TriggerHandler;

/// Boots the trigger server: binds the listener and serves one Hyper
/// connection per accepted socket.
pub struct ServerBuilder {
    addr: SocketAddr,
    handler: Option<TriggerHandler>,
}

impl ServerBuilder {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: TriggerHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Consume the builder, bind the TCP socket, spawn Hyper tasks.
    /// Runs until the listener fails.
    pub async fn serve(self) -> Result<()> {
        let handler = self.handler.expect("handler must be set via with_handler()");

        let listener = TcpListener::bind(self.addr).await?;
        info!("Trigger server listening on {}", self.addr);

        loop {
            let (stream, peer) = listener.accept().await?;
            let svc = handler.clone();

            tokio::spawn(async move {
                if let Err(err) = Http::new().serve_connection(stream, svc).await {
                    warn!(%peer, %err, "connection error");
                }
            });
        }
    }
}
