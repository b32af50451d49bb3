pub mod cors;
pub mod routes;

use tokio::sync::broadcast;
use tracing::info;

use crate::error::{NextWaveError, Result};

pub use routes::AppState;

pub async fn serve(bind: &str, state: AppState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let app = routes::build(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| NextWaveError::Config(format!("failed to bind {bind}: {e}")))?;

    info!(bind = %bind, "functions listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|e| NextWaveError::Config(format!("server error: {e}")))?;

    Ok(())
}
