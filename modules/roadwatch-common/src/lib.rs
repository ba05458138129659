pub mod error;
pub mod normalize;
pub mod types;

pub use error::{GeoError, ResolveError, ValidationError};
pub use normalize::normalize_name;
pub use types::*;
