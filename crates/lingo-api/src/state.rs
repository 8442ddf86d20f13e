use std::path::PathBuf;
use std::sync::Arc;

use lingo_db::Database;
use lingo_gateway::Broadcaster;
use tracing::error;

use crate::dispatch::MessageDispatcher;
use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub broadcaster: Broadcaster,
    pub dispatcher: MessageDispatcher,
    /// Directory served under `/uploads`
    pub upload_dir: PathBuf,
}

/// Run a blocking lingo-db call off the async runtime.
pub(crate) async fn with_db<F, T>(db: &Arc<Database>, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::Persistence)
}
