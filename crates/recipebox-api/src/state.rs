use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use recipebox_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

/// Process-wide state built once at startup and shared by every handler.
pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}

/// Runs a blocking database call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}
