use crate::errors::AppError;
use crate::models::{AppData, ShipmentRecord};
use crate::query::ShipmentFilter;
use crate::storage::persist_data;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, data: AppData) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Snapshot of the stored shipments that pass `filter`.
    pub async fn shipments(&self, filter: &ShipmentFilter) -> Vec<ShipmentRecord> {
        let data = self.data.lock().await;
        filter.apply(&data.shipments)
    }

    /// Applies `change` to a copy of the store and commits it only once the
    /// copy has been written to disk. The lock is held throughout.
    pub async fn update<T, F>(&self, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut AppData) -> Result<T, AppError>,
    {
        let mut data = self.data.lock().await;
        let mut draft = data.clone();
        let outcome = change(&mut draft)?;
        persist_data(&self.data_path, &draft).await?;
        *data = draft;
        Ok(outcome)
    }
}
