use serde::{Deserialize, Deserializer};

// --- Nominatim reverse geocoding ---

/// Response of `GET /reverse?format=json&addressdetails=1`.
///
/// Nominatim answers 200 with `{"error": "Unable to geocode"}` for points it
/// cannot place (open water, for example), so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseResponse {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub display_name: Option<String>,
    pub address: Option<NominatimAddress>,
    pub error: Option<String>,
}

/// The `address` object. Only the keys the pipeline reads are modelled.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NominatimAddress {
    pub suburb: Option<String>,
    pub neighbourhood: Option<String>,
    pub residential: Option<String>,
    pub quarter: Option<String>,
    pub road: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country_code: Option<String>,
}

// --- codigospostales.mx ---

/// One row of the `GET /cp?colonia=..&municipio=..` array response.
#[derive(Debug, Clone, Deserialize)]
pub struct CodigosPostalesEntry {
    pub colonia: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cp: Option<String>,
    pub municipio: Option<String>,
    pub estado: Option<String>,
    pub ciudad: Option<String>,
}

// --- Mexico Postal Codes (RapidAPI) ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MexicoPostalResponse {
    #[serde(default)]
    pub postal_codes: Vec<MexicoPostalCode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MexicoPostalCode {
    pub settlement: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub postal_code: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub settlement_type: Option<String>,
}

/// Postal codes arrive as `"64000"` from some providers and `64000` from
/// others. Numbers are rendered back to five digits so leading zeros survive.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| format!("{n:05}")),
        _ => None,
    })
}
