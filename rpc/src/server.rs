//! Axum-based API server.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use vsp_node::VspCore;

use crate::error::RpcServerError;
use crate::handlers::router;

pub struct RpcServer {
    pub listen: SocketAddr,
    core: VspCore,
}

impl RpcServer {
    pub fn new(listen: &str, core: VspCore) -> Result<Self, RpcServerError> {
        let listen = listen
            .parse()
            .map_err(|e: std::net::AddrParseError| RpcServerError::InvalidAddress {
                addr: listen.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { listen, core })
    }

    /// Serve until `shutdown` fires, then finish in-flight requests.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RpcServerError> {
        let listener = TcpListener::bind(self.listen)
            .await
            .map_err(|source| RpcServerError::Bind {
                addr: self.listen.to_string(),
                source,
            })?;
        tracing::info!(addr = %self.listen, "API server listening");

        let app = router(self.core).into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("API server shutting down");
            })
            .await?;
        Ok(())
    }
}
