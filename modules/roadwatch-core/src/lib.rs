pub mod config;
pub mod deps;
pub mod file_config;
pub mod geo;
pub mod store;

pub use config::AppConfig;
pub use deps::ServerDeps;
pub use file_config::{FileConfig, GeocodingConfig, ReportConfig, ServerConfig, SourceConfig};
pub use geo::{BaseAddress, GeoSource, LookupContext, NeighborhoodResolver, ReverseGeocoder};
pub use store::{FaultStore, FaultTx, StoreError, StoreResult};
