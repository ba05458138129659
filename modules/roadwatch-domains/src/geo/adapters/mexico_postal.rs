use async_trait::async_trait;
use geo_client::{MexicoPostalClient, MexicoPostalCode};
use roadwatch_common::{normalize_name, GeoError, RawSourceResult};
use roadwatch_core::{GeoSource, LookupContext};

use super::client_error;

/// Mexico Postal Codes (RapidAPI), searched by colonia with optional
/// municipio/estado narrowing.
pub struct MexicoPostalSource {
    id: String,
    client: MexicoPostalClient,
}

impl MexicoPostalSource {
    pub fn new(id: impl Into<String>, client: MexicoPostalClient) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }
}

#[async_trait]
impl GeoSource for MexicoPostalSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn lookup(&self, ctx: &LookupContext) -> Result<Option<RawSourceResult>, GeoError> {
        let Some(colonia) = &ctx.neighborhood else {
            return Ok(None);
        };
        let municipio = ctx.municipality.as_deref().map(normalize_name).unwrap_or_default();
        let estado = ctx.state.as_deref().unwrap_or_default();

        let resp = self
            .client
            .lookup(&normalize_name(colonia), &municipio, estado)
            .await
            .map_err(|e| client_error(&self.id, e))?;

        Ok(resp
            .postal_codes
            .into_iter()
            .next()
            .map(|code| to_result(&self.id, code)))
    }
}

fn to_result(source_id: &str, code: MexicoPostalCode) -> RawSourceResult {
    RawSourceResult {
        source_id: source_id.to_string(),
        neighborhood: code.settlement,
        postal_code: code.postal_code,
        municipality: code.municipality,
        state: code.state,
    }
}
