pub mod error;
pub mod postal;
pub mod throttle;
pub mod types;

pub use error::{GeoClientError, Result};
pub use postal::{CodigosPostalesClient, MexicoPostalClient};
pub use throttle::Throttle;
pub use types::{
    CodigosPostalesEntry, MexicoPostalCode, MexicoPostalResponse, NominatimAddress,
    ReverseResponse,
};

use std::time::Duration;

pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Identification header sent to every provider unless overridden.
pub const DEFAULT_USER_AGENT: &str = "LocalizadorColonias/1.0";

/// Zoom 18 asks Nominatim for building-level detail, which is where the
/// suburb/neighbourhood keys are populated for Mexican cities.
const REVERSE_ZOOM: u8 = 18;

/// Client for Nominatim's `/reverse` endpoint.
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    throttle: Throttle,
}

impl NominatimClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: NOMINATIM_REVERSE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            throttle: Throttle::new(Duration::from_secs(1)),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_throttle(mut self, min_interval: Duration) -> Self {
        self.throttle = Throttle::new(min_interval);
        self
    }

    /// Reverse-geocode a point. A 200 without an `address` object is returned
    /// as-is; deciding whether that is fatal is the caller's job.
    pub async fn reverse(&self, lat: f64, lon: f64, language: &str) -> Result<ReverseResponse> {
        self.throttle.wait().await;

        let zoom = REVERSE_ZOOM.to_string();
        let lat = lat.to_string();
        let lon = lon.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("zoom", zoom.as_str()),
                ("accept-language", language),
            ])
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let body: ReverseResponse = resp.json().await?;
        tracing::debug!(
            lat = %lat,
            lon = %lon,
            has_address = body.address.is_some(),
            "Nominatim reverse lookup complete"
        );
        Ok(body)
    }
}

/// Turn a non-2xx response into `GeoClientError::Api`, keeping the body for
/// diagnostics.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GeoClientError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}
