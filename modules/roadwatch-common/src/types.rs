use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// --- Location ---

/// A validated WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// What one geocoding source said about one coordinate. Any field may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSourceResult {
    pub source_id: String,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
}

impl RawSourceResult {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// The postal code as it will be voted on: trimmed, empty treated as absent.
    pub fn postal_code(&self) -> Option<&str> {
        non_blank(self.postal_code.as_deref())
    }

    pub fn neighborhood(&self) -> Option<&str> {
        non_blank(self.neighborhood.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationConfidence {
    /// Two or more sources agree on the postal code.
    High,
    /// Exactly one source backs the postal code.
    Medium,
    /// No source produced a postal code; base address fallback.
    Low,
}

impl std::fmt::Display for LocationConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationConfidence::High => write!(f, "high"),
            LocationConfidence::Medium => write!(f, "medium"),
            LocationConfidence::Low => write!(f, "low"),
        }
    }
}

impl LocationConfidence {
    pub fn from_agreement(agreeing_sources: usize) -> Self {
        match agreeing_sources {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// The reconciled answer for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub neighborhood: String,
    pub postal_code: String,
    pub municipality: String,
    pub state: String,
    pub confidence: LocationConfidence,
    pub agreeing_sources: usize,
    pub sources_consulted: usize,
}

// --- Catalog ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultType {
    pub id: i64,
    pub name: String,
    pub priority: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub identifier: String,
}

// --- Fault records ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl std::fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairStatus::Pending => write!(f, "pending"),
            RepairStatus::InProgress => write!(f, "in_progress"),
            RepairStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl RepairStatus {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "in_progress" | "en_proceso" => Self::InProgress,
            "resolved" | "reparada" => Self::Resolved,
            _ => Self::Pending,
        }
    }
}

/// A persisted fault detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultRecord {
    pub id: i64,
    pub device_id: i64,
    pub neighborhood_id: i64,
    pub fault_type_id: i64,
    pub coordinate: Coordinate,
    pub detected_at: DateTime<Utc>,
    pub confidence: f64,
    pub repair_status: RepairStatus,
    pub image_ref: Option<String>,
}

/// Insert payload for a fault record; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFaultRecord {
    pub device_id: i64,
    pub neighborhood_id: i64,
    pub fault_type_id: i64,
    pub coordinate: Coordinate,
    pub detected_at: DateTime<Utc>,
    pub confidence: f64,
    pub repair_status: RepairStatus,
    pub image_ref: Option<String>,
}

impl NewFaultRecord {
    pub fn into_record(self, id: i64) -> FaultRecord {
        FaultRecord {
            id,
            device_id: self.device_id,
            neighborhood_id: self.neighborhood_id,
            fault_type_id: self.fault_type_id,
            coordinate: self.coordinate,
            detected_at: self.detected_at,
            confidence: self.confidence,
            repair_status: self.repair_status,
            image_ref: self.image_ref,
        }
    }
}

/// One fault with its neighborhood and fault type already joined, as the
/// store's scan emits it.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedFaultRow {
    pub fault_id: i64,
    pub neighborhood_id: i64,
    pub neighborhood_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub detected_at: DateTime<Utc>,
    pub confidence: f64,
    pub repair_status: RepairStatus,
    pub image_ref: Option<String>,
    pub fault_type_name: String,
    pub fault_type_priority: String,
    pub fault_type_description: String,
}

// --- Reports ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultTypeSummary {
    pub name: String,
    pub priority: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultRecordDetail {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub detected_at: DateTime<Utc>,
    pub confidence: f64,
    pub repair_status: RepairStatus,
    pub image_ref: Option<String>,
    pub fault_type: FaultTypeSummary,
}

impl From<JoinedFaultRow> for FaultRecordDetail {
    fn from(row: JoinedFaultRow) -> Self {
        Self {
            id: row.fault_id,
            latitude: row.latitude,
            longitude: row.longitude,
            detected_at: row.detected_at,
            confidence: row.confidence,
            repair_status: row.repair_status,
            image_ref: row.image_ref,
            fault_type: FaultTypeSummary {
                name: row.fault_type_name,
                priority: row.fault_type_priority,
                description: row.fault_type_description,
            },
        }
    }
}

/// One entry of the ranked neighborhood report. Derived per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodReport {
    pub neighborhood_id: i64,
    pub neighborhood_name: String,
    pub total_faults: usize,
    pub faults: Vec<FaultRecordDetail>,
}

// --- Ingestion ---

/// Detection payload as sent by a producer. The Spanish aliases accept the
/// field names used by the Android client.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRequest {
    #[serde(alias = "latitud")]
    pub latitude: f64,
    #[serde(alias = "longitud")]
    pub longitude: f64,
    #[serde(alias = "nombre_falla_detectada")]
    pub fault_label: String,
    #[serde(alias = "nivel_confianza")]
    pub confidence: f64,
    #[serde(default, alias = "url_imagen")]
    pub image_ref: Option<String>,
}

impl DetectionRequest {
    /// Validate the payload and attach the caller's device identifier.
    pub fn into_detection(self, device_identifier: impl Into<String>) -> Result<Detection, ValidationError> {
        let coordinate = Coordinate::new(self.latitude, self.longitude)?;
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(self.confidence));
        }
        let fault_label = self.fault_label.trim().to_string();
        if fault_label.is_empty() {
            return Err(ValidationError::EmptyFaultLabel);
        }
        let image_ref = self.image_ref.filter(|r| !r.trim().is_empty());

        Ok(Detection {
            coordinate,
            fault_label,
            confidence: self.confidence,
            device_identifier: device_identifier.into(),
            image_ref,
        })
    }
}

/// A validated detection ready for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub coordinate: Coordinate,
    pub fault_label: String,
    pub confidence: f64,
    pub device_identifier: String,
    pub image_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lat: f64, lon: f64, label: &str, confidence: f64) -> DetectionRequest {
        DetectionRequest {
            latitude: lat,
            longitude: lon,
            fault_label: label.to_string(),
            confidence,
            image_ref: None,
        }
    }

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.1),
            Err(ValidationError::LongitudeOutOfRange(-180.1))
        );
    }

    #[test]
    fn coordinate_rejects_nan() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn confidence_from_agreement() {
        assert_eq!(LocationConfidence::from_agreement(0), LocationConfidence::Low);
        assert_eq!(LocationConfidence::from_agreement(1), LocationConfidence::Medium);
        assert_eq!(LocationConfidence::from_agreement(2), LocationConfidence::High);
        assert_eq!(LocationConfidence::from_agreement(5), LocationConfidence::High);
    }

    #[test]
    fn raw_result_blank_postal_code_is_absent() {
        let mut result = RawSourceResult::new("test");
        result.postal_code = Some("   ".into());
        assert_eq!(result.postal_code(), None);
        result.postal_code = Some(" 64000 ".into());
        assert_eq!(result.postal_code(), Some("64000"));
    }

    #[test]
    fn repair_status_round_trips_through_text() {
        for status in [RepairStatus::Pending, RepairStatus::InProgress, RepairStatus::Resolved] {
            assert_eq!(RepairStatus::from_str_loose(&status.to_string()), status);
        }
        assert_eq!(RepairStatus::from_str_loose("Pendiente"), RepairStatus::Pending);
    }

    #[test]
    fn detection_validation() {
        let ok = request(25.6866, -100.3161, " Bache Profundo ", 0.95)
            .into_detection("10.0.0.7")
            .unwrap();
        assert_eq!(ok.fault_label, "Bache Profundo");
        assert_eq!(ok.device_identifier, "10.0.0.7");

        assert_eq!(
            request(25.0, -100.0, "Bache", 1.2).into_detection("d").unwrap_err(),
            ValidationError::ConfidenceOutOfRange(1.2)
        );
        assert_eq!(
            request(25.0, -100.0, "   ", 0.5).into_detection("d").unwrap_err(),
            ValidationError::EmptyFaultLabel
        );
        assert_eq!(
            request(125.0, -100.0, "Bache", 0.5).into_detection("d").unwrap_err(),
            ValidationError::LatitudeOutOfRange(125.0)
        );
    }

    #[test]
    fn detection_request_accepts_android_field_names() {
        let json = r#"{
            "latitud": 25.6866,
            "longitud": -100.3161,
            "nombre_falla_detectada": "Bache Profundo",
            "nivel_confianza": 0.95,
            "url_imagen": null
        }"#;
        let req: DetectionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.fault_label, "Bache Profundo");
        assert_eq!(req.latitude, 25.6866);
        assert!(req.image_ref.is_none());
    }

    #[test]
    fn report_serializes_iso_timestamps() {
        let row = JoinedFaultRow {
            fault_id: 7,
            neighborhood_id: 1,
            neighborhood_name: "Centro".into(),
            latitude: 25.686614,
            longitude: -100.316112,
            detected_at: DateTime::parse_from_rfc3339("2025-03-01T14:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            confidence: 0.873,
            repair_status: RepairStatus::Pending,
            image_ref: None,
            fault_type_name: "Bache Profundo".into(),
            fault_type_priority: "alta".into(),
            fault_type_description: "Hundimiento mayor a 5 cm".into(),
        };
        let value = serde_json::to_value(FaultRecordDetail::from(row)).unwrap();
        assert_eq!(value["detected_at"], "2025-03-01T14:30:00Z");
        assert_eq!(value["confidence"], 0.873);
        assert_eq!(value["latitude"], 25.686614);
        assert_eq!(value["repair_status"], "pending");
        assert_eq!(value["fault_type"]["name"], "Bache Profundo");
    }
}
