use async_trait::async_trait;
use roadwatch_common::{normalize_name, GeoError, RawSourceResult};
use roadwatch_core::{GeoSource, LookupContext};
use std::collections::HashMap;

/// A fixed neighborhood -> postal code table.
///
/// Stands in for postal registries that have no public API. Keys are stored
/// normalized, so `"San Jerónimo"` and `"san jeronimo"` hit the same entry.
pub struct StaticTableSource {
    id: String,
    table: HashMap<String, String>,
    state: Option<String>,
}

impl StaticTableSource {
    pub fn new(
        id: impl Into<String>,
        entries: impl IntoIterator<Item = (String, String)>,
        state: Option<String>,
    ) -> Self {
        let table = entries
            .into_iter()
            .map(|(name, code)| (normalize_name(&name), code))
            .collect();
        Self {
            id: id.into(),
            table,
            state,
        }
    }
}

#[async_trait]
impl GeoSource for StaticTableSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn lookup(&self, ctx: &LookupContext) -> Result<Option<RawSourceResult>, GeoError> {
        let Some(neighborhood) = &ctx.neighborhood else {
            return Ok(None);
        };

        Ok(self
            .table
            .get(&normalize_name(neighborhood))
            .map(|code| RawSourceResult {
                source_id: self.id.clone(),
                neighborhood: Some(neighborhood.clone()),
                postal_code: Some(code.clone()),
                municipality: ctx.municipality.clone(),
                state: self.state.clone().or_else(|| ctx.state.clone()),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadwatch_common::Coordinate;

    fn sepomex() -> StaticTableSource {
        StaticTableSource::new(
            "sepomex",
            [
                ("Centro".to_string(), "64000".to_string()),
                ("San Jerónimo".to_string(), "64630".to_string()),
            ],
            Some("Nuevo León".into()),
        )
    }

    fn ctx(neighborhood: Option<&str>) -> LookupContext {
        LookupContext {
            coordinate: Coordinate::new(25.68, -100.36).unwrap(),
            locale: "es".into(),
            neighborhood: neighborhood.map(str::to_string),
            municipality: Some("Monterrey".into()),
            state: None,
        }
    }

    #[tokio::test]
    async fn matches_ignoring_accents_and_case() {
        let result = sepomex().lookup(&ctx(Some("SAN JERONIMO"))).await.unwrap().unwrap();
        assert_eq!(result.postal_code(), Some("64630"));
        // Original text of the query is preserved for output.
        assert_eq!(result.neighborhood(), Some("SAN JERONIMO"));
        assert_eq!(result.state.as_deref(), Some("Nuevo León"));
        assert_eq!(result.municipality.as_deref(), Some("Monterrey"));
    }

    #[tokio::test]
    async fn unknown_neighborhood_is_no_contribution() {
        assert_eq!(sepomex().lookup(&ctx(Some("Cumbres"))).await, Ok(None));
        assert_eq!(sepomex().lookup(&ctx(None)).await, Ok(None));
    }
}
