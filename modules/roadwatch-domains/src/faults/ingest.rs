use chrono::Utc;
use roadwatch_common::{
    Detection, DetectionRequest, LocationConfidence, NeighborhoodReport, NewFaultRecord,
    RepairStatus, ResolveError, ResolvedLocation, ValidationError,
};
use roadwatch_core::{FaultStore, NeighborhoodResolver, ServerDeps, StoreError};
use std::sync::Arc;
use thiserror::Error;

use crate::reports::build_top_n;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("upstream dependency failed: {0}")]
    UpstreamDependencyFailed(#[from] ResolveError),

    #[error("neighborhood '{0}' is not in the catalog")]
    UnknownNeighborhood(String),

    #[error("fault type '{0}' is not in the catalog")]
    UnknownFaultType(String),

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl IngestError {
    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::UpstreamDependencyFailed(_) | IngestError::StoreUnavailable(_)
        )
    }
}

/// What a successful ingestion reports back to the producer.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReceipt {
    pub record_id: i64,
    pub device_id: i64,
    pub neighborhood_id: i64,
    pub neighborhood_name: String,
    pub location_confidence: LocationConfidence,
    pub location: ResolvedLocation,
}

/// Turns detections into stored fault records and serves the ranked report.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn FaultStore>,
    resolver: Arc<dyn NeighborhoodResolver>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn FaultStore>, resolver: Arc<dyn NeighborhoodResolver>) -> Self {
        Self { store, resolver }
    }

    pub fn from_deps(deps: &ServerDeps) -> Self {
        Self::new(deps.store.clone(), deps.resolver.clone())
    }

    /// Validate a raw producer payload, then ingest it. Nothing external is
    /// touched when validation fails.
    pub async fn ingest_request(
        &self,
        request: DetectionRequest,
        device_identifier: &str,
    ) -> Result<IngestReceipt, IngestError> {
        let detection = request.into_detection(device_identifier)?;
        self.ingest(detection).await
    }

    pub async fn ingest(&self, detection: Detection) -> Result<IngestReceipt, IngestError> {
        // Device registration commits on its own and survives a later failure.
        let device = self
            .store
            .lookup_or_create_device(&detection.device_identifier)
            .await?;

        let location = self.resolver.resolve(detection.coordinate).await?;

        let mut tx = self.store.begin().await?;

        let neighborhood_id = tx
            .lookup_neighborhood_id(&location.neighborhood)
            .await?
            .ok_or_else(|| IngestError::UnknownNeighborhood(location.neighborhood.clone()))?;

        let fault_type_id = tx
            .lookup_fault_type_id(&detection.fault_label)
            .await?
            .ok_or_else(|| IngestError::UnknownFaultType(detection.fault_label.clone()))?;

        let record_id = tx
            .insert_fault(&NewFaultRecord {
                device_id: device.id,
                neighborhood_id,
                fault_type_id,
                coordinate: detection.coordinate,
                detected_at: Utc::now(),
                confidence: detection.confidence,
                repair_status: RepairStatus::Pending,
                image_ref: detection.image_ref,
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            record_id,
            device = %device.identifier,
            neighborhood = %location.neighborhood,
            fault_type = %detection.fault_label,
            confidence = %location.confidence,
            "Fault recorded"
        );

        Ok(IngestReceipt {
            record_id,
            device_id: device.id,
            neighborhood_id,
            neighborhood_name: location.neighborhood.clone(),
            location_confidence: location.confidence,
            location,
        })
    }

    pub async fn top_neighborhoods(&self, n: usize) -> Result<Vec<NeighborhoodReport>, IngestError> {
        let rows = self.store.scan_joined_faults().await?;
        Ok(build_top_n(rows, n))
    }
}
