pub mod adapters;
pub mod reconcile;

pub use reconcile::ReconciliationEngine;
