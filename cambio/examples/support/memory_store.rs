//! In-memory stand-in for the storage collaborator, used by examples.

use async_trait::async_trait;
use tokio::sync::Mutex;

use cambio::{CambioError, HistoricalRate, HistoricalRateStore};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<HistoricalRate>>,
}

#[async_trait]
impl HistoricalRateStore for MemoryStore {
    async fn save_rates(&self, rows: &[HistoricalRate]) -> Result<(), CambioError> {
        self.rows.lock().await.extend_from_slice(rows);
        Ok(())
    }
}
