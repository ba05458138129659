//! The fault-record storage boundary.

use async_trait::async_trait;
use roadwatch_common::{Device, JoinedFaultRow, NewFaultRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be obtained or was lost.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait FaultStore: Send + Sync {
    /// Find the device with this identifier, creating it if unseen.
    /// Commits on its own, outside any ingestion transaction.
    async fn lookup_or_create_device(&self, identifier: &str) -> StoreResult<Device>;

    /// Open a unit of work. Dropping the returned transaction without calling
    /// `commit` discards everything written through it.
    async fn begin(&self) -> StoreResult<Box<dyn FaultTx>>;

    /// Every fault joined with its neighborhood and fault type.
    async fn scan_joined_faults(&self) -> StoreResult<Vec<JoinedFaultRow>>;
}

#[async_trait]
pub trait FaultTx: Send {
    async fn lookup_neighborhood_id(&mut self, name: &str) -> StoreResult<Option<i64>>;

    async fn lookup_fault_type_id(&mut self, name: &str) -> StoreResult<Option<i64>>;

    async fn insert_fault(&mut self, record: &NewFaultRecord) -> StoreResult<i64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
