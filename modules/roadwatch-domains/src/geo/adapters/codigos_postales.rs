use async_trait::async_trait;
use geo_client::{CodigosPostalesClient, CodigosPostalesEntry};
use roadwatch_common::{normalize_name, GeoError, RawSourceResult};
use roadwatch_core::{GeoSource, LookupContext};

use super::client_error;

/// codigospostales.mx, searched by the base geocoder's colonia + municipio.
pub struct CodigosPostalesSource {
    id: String,
    client: CodigosPostalesClient,
}

impl CodigosPostalesSource {
    pub fn new(id: impl Into<String>, client: CodigosPostalesClient) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }
}

#[async_trait]
impl GeoSource for CodigosPostalesSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn lookup(&self, ctx: &LookupContext) -> Result<Option<RawSourceResult>, GeoError> {
        let (Some(colonia), Some(municipio)) = (&ctx.neighborhood, &ctx.municipality) else {
            return Ok(None);
        };

        let entries = self
            .client
            .lookup(&normalize_name(colonia), &normalize_name(municipio))
            .await
            .map_err(|e| client_error(&self.id, e))?;

        Ok(entries.into_iter().next().map(|entry| to_result(&self.id, entry)))
    }
}

fn to_result(source_id: &str, entry: CodigosPostalesEntry) -> RawSourceResult {
    RawSourceResult {
        source_id: source_id.to_string(),
        neighborhood: entry.colonia,
        postal_code: entry.cp,
        municipality: entry.municipio.or(entry.ciudad),
        state: entry.estado,
    }
}
