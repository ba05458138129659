pub mod codigos_postales;
pub mod mexico_postal;
pub mod nominatim;
pub mod static_table;

use anyhow::Result;
use geo_client::GeoClientError;
use roadwatch_common::GeoError;
use roadwatch_core::{GeoSource, GeocodingConfig, ReverseGeocoder, SourceConfig};
use std::sync::Arc;

pub use codigos_postales::CodigosPostalesSource;
pub use mexico_postal::MexicoPostalSource;
pub use nominatim::NominatimGeocoder;
pub use static_table::StaticTableSource;

/// Build the mandatory base geocoder.
pub fn build_base_geocoder(
    config: &GeocodingConfig,
    http_client: &reqwest::Client,
) -> Arc<dyn ReverseGeocoder> {
    let client = geo_client::NominatimClient::new(http_client.clone())
        .with_base_url(&config.base.url)
        .with_user_agent(&config.user_agent)
        .with_throttle(config.throttle());
    Arc::new(NominatimGeocoder::new(&config.base.id, client))
}

/// Build the optional sources in declaration order.
///
/// A RapidAPI source without a key is skipped with a warning rather than
/// failing startup.
pub fn build_sources(
    config: &GeocodingConfig,
    http_client: &reqwest::Client,
    mexico_postal_api_key: Option<&str>,
) -> Result<Vec<Arc<dyn GeoSource>>> {
    let mut sources: Vec<Arc<dyn GeoSource>> = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        match source {
            SourceConfig::CodigosPostales { id, url } => {
                let mut client = geo_client::CodigosPostalesClient::new(http_client.clone())
                    .with_user_agent(&config.user_agent)
                    .with_throttle(config.throttle());
                if let Some(url) = url {
                    client = client.with_base_url(url);
                }
                sources.push(Arc::new(CodigosPostalesSource::new(id, client)));
            }
            SourceConfig::MexicoPostal { id, url, host } => {
                let Some(key) = mexico_postal_api_key else {
                    tracing::warn!(source = %id, "MEXICO_POSTAL_API_KEY not set, skipping source");
                    continue;
                };
                let mut client = geo_client::MexicoPostalClient::new(http_client.clone(), key)
                    .with_user_agent(&config.user_agent)
                    .with_throttle(config.throttle());
                if let Some(url) = url {
                    client = client.with_base_url(url);
                }
                if let Some(host) = host {
                    client = client.with_host(host);
                }
                sources.push(Arc::new(MexicoPostalSource::new(id, client)));
            }
            SourceConfig::StaticTable { id, table, state } => {
                if table.is_empty() {
                    anyhow::bail!("static_table source '{}' has an empty table", id);
                }
                sources.push(Arc::new(StaticTableSource::new(
                    id,
                    table.iter().map(|(k, v)| (k.clone(), v.clone())),
                    state.clone(),
                )));
            }
        }
    }

    let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
    tracing::info!(base = %config.base.id, sources = ?ids, "Geocoding sources configured");
    Ok(sources)
}

pub(crate) fn client_error(source_id: &str, err: GeoClientError) -> GeoError {
    GeoError::Request {
        source_id: source_id.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadwatch_core::file_config::parse_config;

    const CONFIG: &str = r#"
        [server]
        port = 8000

        [geocoding]
        throttle_ms = 0

        [[geocoding.sources]]
        kind = "static_table"
        id = "sepomex"
        table = { "centro" = "64000" }

        [[geocoding.sources]]
        kind = "codigos_postales"
        id = "codigospostales_mx"

        [[geocoding.sources]]
        kind = "mexico_postal"
        id = "mexico_postal"
    "#;

    #[test]
    fn sources_built_in_declaration_order() {
        let config = parse_config(CONFIG).unwrap();
        let sources = build_sources(&config.geocoding, &reqwest::Client::new(), Some("key")).unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["sepomex", "codigospostales_mx", "mexico_postal"]);
    }

    #[test]
    fn rapidapi_source_skipped_without_key() {
        let config = parse_config(CONFIG).unwrap();
        let sources = build_sources(&config.geocoding, &reqwest::Client::new(), None).unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["sepomex", "codigospostales_mx"]);
    }

    #[test]
    fn base_geocoder_uses_configured_id() {
        let config = parse_config(CONFIG).unwrap();
        let base = build_base_geocoder(&config.geocoding, &reqwest::Client::new());
        assert_eq!(base.id(), "nominatim");
    }
}
