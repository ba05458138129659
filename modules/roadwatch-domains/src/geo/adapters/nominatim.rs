use async_trait::async_trait;
use geo_client::{NominatimAddress, NominatimClient};
use roadwatch_common::{Coordinate, GeoError};
use roadwatch_core::{BaseAddress, ReverseGeocoder};

use super::client_error;

/// Nominatim as the base reverse geocoder.
pub struct NominatimGeocoder {
    id: String,
    client: NominatimClient,
}

impl NominatimGeocoder {
    pub fn new(id: impl Into<String>, client: NominatimClient) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    fn id(&self) -> &str {
        &self.id
    }

    async fn reverse(&self, coordinate: Coordinate, locale: &str) -> Result<BaseAddress, GeoError> {
        let resp = self
            .client
            .reverse(coordinate.latitude(), coordinate.longitude(), locale)
            .await
            .map_err(|e| client_error(&self.id, e))?;

        match resp.address {
            Some(address) => Ok(to_base_address(address, resp.display_name)),
            None => {
                tracing::debug!(
                    source = %self.id,
                    %coordinate,
                    error = resp.error.as_deref().unwrap_or(""),
                    "Reverse lookup returned no address"
                );
                Err(GeoError::NoAddress {
                    source_id: self.id.clone(),
                })
            }
        }
    }
}

fn to_base_address(address: NominatimAddress, display_name: Option<String>) -> BaseAddress {
    BaseAddress {
        display_name,
        suburb: address.suburb,
        neighbourhood: address.neighbourhood,
        residential: address.residential,
        quarter: address.quarter,
        city: address.city,
        town: address.town,
        municipality: address.municipality,
        state: address.state,
        postcode: address.postcode,
    }
}
