use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::models::{Device, DeviceUrl, Heartbeat, ProbeResult};
use crate::settings::{ServerSettings, StoreBackend};

pub mod memory;
pub mod pool;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("store query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("stored heartbeat is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence used by the request handlers.
///
/// Every method is one unit of work: implementations either apply all of it
/// or none of it. Calls block, so async callers should go through
/// [`crate::state::AppState::with_store`].
pub trait DeviceStore: Send + Sync {
    /// Insert the device, or refresh hostname, role, `last_seen_at` and the
    /// heartbeat snapshot. The stored secret is never touched on refresh.
    fn record_heartbeat(&self, heartbeat: &Heartbeat, seen_at: DateTime<Utc>) -> StoreResult<()>;

    /// Configured URLs for a device, ascending by url id.
    fn device_urls(&self, device_id: &str) -> StoreResult<Vec<DeviceUrl>>;

    /// Make sure the device exists, then swap its whole URL set for `urls`.
    /// Returns the number of rows written.
    fn replace_device_urls(
        &self,
        device_id: &str,
        urls: &[DeviceUrl],
        seen_at: DateTime<Utc>,
    ) -> StoreResult<usize>;

    /// Append a batch of results. Either the whole batch lands or nothing does.
    fn insert_results(&self, device_id: &str, batch: &[ProbeResult]) -> StoreResult<usize>;

    /// The newest `limit` results for a device, oldest first.
    fn latest_results(&self, device_id: &str, limit: usize) -> StoreResult<Vec<ProbeResult>>;

    fn device(&self, device_id: &str) -> StoreResult<Option<Device>>;

    /// All known devices ordered by id.
    fn devices(&self) -> StoreResult<Vec<Device>>;
}

/// Open the backend named in the settings.
///
/// `Ok(None)` means the SQLite backend was picked without a `DATABASE_URL`;
/// the server still starts and data requests report the missing setting.
pub fn open_store(settings: &ServerSettings) -> anyhow::Result<Option<Arc<dyn DeviceStore>>> {
    match settings.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store, data is lost on restart");
            Ok(Some(Arc::new(MemoryStore::default())))
        }
        StoreBackend::Sqlite => match settings.database_url.as_deref() {
            Some(url) => {
                let store = SqliteStore::open(url, settings.pool_size)?;
                info!("opened sqlite store at {}", url);
                Ok(Some(Arc::new(store)))
            }
            None => {
                warn!("DATABASE_URL not set, data endpoints will fail until it is configured");
                Ok(None)
            }
        },
    }
}
