use std::sync::Arc;

use crate::db::{DeviceStore, StoreResult};
use crate::error::{ApiError, ApiResult};

/// Rocket managed state. `store` is `None` when no database is configured.
pub struct AppState {
    store: Option<Arc<dyn DeviceStore>>,
}

impl AppState {
    pub fn new(store: Option<Arc<dyn DeviceStore>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> ApiResult<Arc<dyn DeviceStore>> {
        self.store.clone().ok_or(ApiError::NotConfigured)
    }

    /// Run a blocking store call off the async executor.
    pub async fn with_store<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DeviceStore) -> StoreResult<T> + Send + 'static,
    {
        let store = self.store()?;
        let out = rocket::tokio::task::spawn_blocking(move || f(store.as_ref())).await??;
        Ok(out)
    }
}
