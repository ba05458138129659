pub mod ingest;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

pub use ingest::{IngestError, IngestReceipt, Ingestor};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryFaultStore;
pub use postgres::PgFaultStore;
