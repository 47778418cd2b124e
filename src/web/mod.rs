pub mod handlers;
pub mod routes;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::error::{RaghuError, Result};
use crate::helpdesk::Helpdesk;

/// Serve the helpdesk over plain HTTP until the shutdown signal fires.
pub async fn serve(
    bind: &str,
    helpdesk: Arc<Helpdesk>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = routes::build(helpdesk);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| RaghuError::Config(format!("failed to bind {bind}: {e}")))?;

    info!(bind = %bind, "helpdesk listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
