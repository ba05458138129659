//! Multi-source neighborhood reconciliation.
//!
//! One mandatory reverse lookup seeds a fan-out to the optional postal-code
//! sources. Their answers are merged by majority vote on postal code, falling
//! back to the base address when nobody produced one.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use roadwatch_common::{
    normalize_name, Coordinate, GeoError, LocationConfidence, RawSourceResult, ResolveError,
    ResolvedLocation,
};
use roadwatch_core::{
    BaseAddress, GeoSource, GeocodingConfig, LookupContext, NeighborhoodResolver, ReverseGeocoder,
};
use std::sync::Arc;
use std::time::Duration;

use super::adapters::{build_base_geocoder, build_sources};

pub const UNSPECIFIED_NEIGHBORHOOD: &str = "No especificada";
pub const UNAVAILABLE: &str = "No disponible";

const DEFAULT_LOCALE: &str = "es";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ReconciliationEngine {
    base: Arc<dyn ReverseGeocoder>,
    sources: Vec<Arc<dyn GeoSource>>,
    locale: String,
    timeout: Duration,
}

impl ReconciliationEngine {
    pub fn new(base: Arc<dyn ReverseGeocoder>, sources: Vec<Arc<dyn GeoSource>>) -> Self {
        Self {
            base,
            sources,
            locale: DEFAULT_LOCALE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Per-call budget for every source, base included.
    ///
    /// The budget covers the whole call, including any wait on the source's
    /// own throttle. With a 1 s Nominatim throttle and a 10 s timeout, at most
    /// ten base lookups can be queued at once; later ones fail fast as
    /// `GeocodingUnavailable` (retryable) instead of piling up behind the
    /// throttle.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wire the engine from the `[geocoding]` config section.
    pub fn from_config(
        config: &GeocodingConfig,
        http_client: &reqwest::Client,
        mexico_postal_api_key: Option<&str>,
    ) -> Result<Self> {
        let base = build_base_geocoder(config, http_client);
        let sources = build_sources(config, http_client, mexico_postal_api_key)?;
        Ok(Self::new(base, sources)
            .with_locale(&config.locale)
            .with_timeout(config.timeout()))
    }

    pub async fn resolve(&self, coordinate: Coordinate) -> Result<ResolvedLocation, ResolveError> {
        let base = self.lookup_base(coordinate).await.map_err(|cause| {
            tracing::warn!(%coordinate, source = cause.source_id(), error = %cause, "Base geocoding failed");
            ResolveError::GeocodingUnavailable { coordinate, cause }
        })?;

        let ctx = LookupContext::from_base(coordinate, &self.locale, &base);

        // join_all yields in input order, so results stay in declaration order
        // regardless of which source answers first.
        let results: Vec<RawSourceResult> = join_all(self.sources.iter().map(|s| self.query_source(s.as_ref(), &ctx)))
            .await
            .into_iter()
            .flatten()
            .collect();

        let location = reconcile(&base, &results, self.sources.len());
        tracing::info!(
            %coordinate,
            neighborhood = %location.neighborhood,
            postal_code = %location.postal_code,
            confidence = %location.confidence,
            agreeing = location.agreeing_sources,
            consulted = location.sources_consulted,
            "Location resolved"
        );
        Ok(location)
    }

    async fn lookup_base(&self, coordinate: Coordinate) -> Result<BaseAddress, GeoError> {
        match tokio::time::timeout(self.timeout, self.base.reverse(coordinate, &self.locale)).await {
            Ok(result) => result,
            Err(_) => Err(GeoError::Timeout {
                source_id: self.base.id().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Never fails: every error is logged and counts as no contribution.
    async fn query_source(&self, source: &dyn GeoSource, ctx: &LookupContext) -> Option<RawSourceResult> {
        match tokio::time::timeout(self.timeout, source.lookup(ctx)).await {
            Ok(Ok(Some(result))) => Some(result),
            Ok(Ok(None)) => {
                tracing::debug!(source = source.id(), "Source had no result");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(source = source.id(), error = %e, "Source lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    source = source.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Source lookup timed out"
                );
                None
            }
        }
    }
}

#[async_trait]
impl NeighborhoodResolver for ReconciliationEngine {
    async fn resolve(&self, coordinate: Coordinate) -> Result<ResolvedLocation, ResolveError> {
        ReconciliationEngine::resolve(self, coordinate).await
    }
}

/// Merge source results (in declaration order) into one location.
pub fn reconcile(base: &BaseAddress, results: &[RawSourceResult], sources_consulted: usize) -> ResolvedLocation {
    // (postal code, indices of results backing it), in first-produced order.
    let mut votes: Vec<(&str, Vec<usize>)> = Vec::new();
    for (i, result) in results.iter().enumerate() {
        let Some(code) = result.postal_code() else {
            continue;
        };
        match votes.iter_mut().find(|(c, _)| *c == code) {
            Some((_, backers)) => backers.push(i),
            None => votes.push((code, vec![i])),
        }
    }

    // Strictly greater replaces, so the earliest code wins a tie.
    let winner = votes.iter().fold(None, |best: Option<&(&str, Vec<usize>)>, candidate| match best {
        Some(b) if b.1.len() >= candidate.1.len() => Some(b),
        _ => Some(candidate),
    });

    let Some((code, backers)) = winner else {
        return fallback(base, sources_consulted);
    };

    let backing: Vec<&RawSourceResult> = backers.iter().map(|&i| &results[i]).collect();
    log_disagreement(code, &backing);

    let neighborhood = backing
        .iter()
        .find_map(|r| r.neighborhood())
        .or_else(|| base.neighborhood_seed())
        .or_else(|| base.fallback_neighborhood())
        .unwrap_or(UNSPECIFIED_NEIGHBORHOOD);
    let municipality = backing
        .iter()
        .find_map(|r| non_blank(&r.municipality))
        .or_else(|| base.municipality())
        .unwrap_or(UNAVAILABLE);
    let state = backing
        .iter()
        .find_map(|r| non_blank(&r.state))
        .or_else(|| base.state())
        .unwrap_or(UNAVAILABLE);

    ResolvedLocation {
        neighborhood: neighborhood.to_string(),
        postal_code: code.to_string(),
        municipality: municipality.to_string(),
        state: state.to_string(),
        confidence: LocationConfidence::from_agreement(backers.len()),
        agreeing_sources: backers.len(),
        sources_consulted,
    }
}

fn fallback(base: &BaseAddress, sources_consulted: usize) -> ResolvedLocation {
    ResolvedLocation {
        neighborhood: base
            .fallback_neighborhood()
            .unwrap_or(UNSPECIFIED_NEIGHBORHOOD)
            .to_string(),
        postal_code: base.postcode().unwrap_or(UNAVAILABLE).to_string(),
        municipality: base.municipality().unwrap_or(UNAVAILABLE).to_string(),
        state: base.state().unwrap_or(UNAVAILABLE).to_string(),
        confidence: LocationConfidence::Low,
        agreeing_sources: 0,
        sources_consulted,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn log_disagreement(code: &str, backing: &[&RawSourceResult]) {
    let mut names = backing.iter().filter_map(|r| r.neighborhood().map(normalize_name));
    if let Some(first) = names.next() {
        if names.any(|n| n != first) {
            let sources: Vec<&str> = backing.iter().map(|r| r.source_id.as_str()).collect();
            tracing::debug!(postal_code = code, ?sources, "Sources agree on postal code but not on neighborhood name");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeBase {
        result: Result<BaseAddress, GeoError>,
        delay: Duration,
    }

    impl FakeBase {
        fn ok(address: BaseAddress) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(address),
                delay: Duration::ZERO,
            })
        }

        fn err(error: GeoError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(error),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl ReverseGeocoder for FakeBase {
        fn id(&self) -> &str {
            "base"
        }

        async fn reverse(&self, _coordinate: Coordinate, _locale: &str) -> Result<BaseAddress, GeoError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    struct FakeSource {
        id: String,
        result: Result<Option<RawSourceResult>, GeoError>,
        delay: Duration,
        seen: Mutex<Option<LookupContext>>,
    }

    impl FakeSource {
        fn answering(id: &str, neighborhood: &str, postal_code: &str) -> Self {
            let mut result = RawSourceResult::new(id);
            result.neighborhood = Some(neighborhood.to_string());
            result.postal_code = Some(postal_code.to_string());
            result.municipality = Some(format!("{id}-municipality"));
            result.state = Some("Nuevo León".to_string());
            Self {
                id: id.to_string(),
                result: Ok(Some(result)),
                delay: Duration::ZERO,
                seen: Mutex::new(None),
            }
        }

        fn silent(id: &str) -> Self {
            Self {
                id: id.to_string(),
                result: Ok(None),
                delay: Duration::ZERO,
                seen: Mutex::new(None),
            }
        }

        fn failing(id: &str) -> Self {
            Self {
                id: id.to_string(),
                result: Err(GeoError::Request {
                    source_id: id.to_string(),
                    message: "HTTP 500".to_string(),
                }),
                delay: Duration::ZERO,
                seen: Mutex::new(None),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl GeoSource for FakeSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn lookup(&self, ctx: &LookupContext) -> Result<Option<RawSourceResult>, GeoError> {
            *self.seen.lock().unwrap() = Some(ctx.clone());
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn centro_base() -> BaseAddress {
        BaseAddress {
            display_name: Some("Centro, Monterrey, Nuevo León".into()),
            suburb: Some("Centro".into()),
            city: Some("Monterrey".into()),
            state: Some("Nuevo León".into()),
            postcode: Some("64000".into()),
            ..Default::default()
        }
    }

    fn point() -> Coordinate {
        Coordinate::new(25.6866, -100.3161).unwrap()
    }

    fn engine(base: Arc<dyn ReverseGeocoder>, sources: Vec<FakeSource>) -> ReconciliationEngine {
        let sources = sources
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn GeoSource>)
            .collect();
        ReconciliationEngine::new(base, sources).with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn two_sources_agreeing_is_high() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![
                FakeSource::answering("a", "Centro", "64000"),
                FakeSource::answering("b", "CENTRO", "64000"),
                FakeSource::answering("c", "Obispado", "64060"),
            ],
        );
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.postal_code, "64000");
        assert_eq!(location.neighborhood, "Centro");
        assert_eq!(location.municipality, "a-municipality");
        assert_eq!(location.confidence, LocationConfidence::High);
        assert_eq!(location.agreeing_sources, 2);
        assert_eq!(location.sources_consulted, 3);
    }

    #[tokio::test]
    async fn single_source_is_medium() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![FakeSource::silent("a"), FakeSource::answering("b", "Centro", "64000")],
        );
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.confidence, LocationConfidence::Medium);
        assert_eq!(location.agreeing_sources, 1);
        assert_eq!(location.sources_consulted, 2);
    }

    #[tokio::test]
    async fn tie_goes_to_earliest_declared_source() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![
                FakeSource::answering("first", "Del Valle", "66220"),
                FakeSource::answering("second", "Centro", "64000"),
            ],
        );
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.postal_code, "66220");
        assert_eq!(location.neighborhood, "Del Valle");
        assert_eq!(location.confidence, LocationConfidence::Medium);
    }

    #[tokio::test]
    async fn completion_order_does_not_matter() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![
                FakeSource::answering("slow", "Del Valle", "66220").delayed(Duration::from_millis(60)),
                FakeSource::answering("fast", "Centro", "64000"),
            ],
        );
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.postal_code, "66220");
    }

    #[tokio::test]
    async fn no_postal_code_falls_back_to_base() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![FakeSource::silent("a"), FakeSource::failing("b")],
        );
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.neighborhood, "Centro");
        assert_eq!(location.postal_code, "64000");
        assert_eq!(location.municipality, "Monterrey");
        assert_eq!(location.confidence, LocationConfidence::Low);
        assert_eq!(location.agreeing_sources, 0);
        assert_eq!(location.sources_consulted, 2);
    }

    #[tokio::test]
    async fn empty_base_address_uses_placeholders() {
        let engine = engine(FakeBase::ok(BaseAddress::default()), vec![]);
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.neighborhood, UNSPECIFIED_NEIGHBORHOOD);
        assert_eq!(location.postal_code, UNAVAILABLE);
        assert_eq!(location.municipality, UNAVAILABLE);
        assert_eq!(location.state, UNAVAILABLE);
        assert_eq!(location.confidence, LocationConfidence::Low);
        assert_eq!(location.sources_consulted, 0);
    }

    #[tokio::test]
    async fn base_failure_is_geocoding_unavailable() {
        let cause = GeoError::NoAddress {
            source_id: "base".into(),
        };
        let engine = engine(FakeBase::err(cause.clone()), vec![FakeSource::answering("a", "Centro", "64000")]);
        let err = engine.resolve(point()).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::GeocodingUnavailable {
                coordinate: point(),
                cause
            }
        );
    }

    #[tokio::test]
    async fn base_timeout_is_geocoding_unavailable() {
        let base = Arc::new(FakeBase {
            result: Ok(centro_base()),
            delay: Duration::from_millis(500),
        });
        let engine = engine(base, vec![]).with_timeout(Duration::from_millis(20));
        let ResolveError::GeocodingUnavailable { cause, .. } = engine.resolve(point()).await.unwrap_err();
        assert!(matches!(cause, GeoError::Timeout { timeout_ms: 20, .. }));
    }

    /// Base geocoder that shares one throttle across calls, like Nominatim.
    struct ThrottledBase {
        throttle: geo_client::Throttle,
    }

    #[async_trait]
    impl ReverseGeocoder for ThrottledBase {
        fn id(&self) -> &str {
            "base"
        }

        async fn reverse(&self, _coordinate: Coordinate, _locale: &str) -> Result<BaseAddress, GeoError> {
            self.throttle.wait().await;
            Ok(centro_base())
        }
    }

    #[tokio::test]
    async fn throttle_wait_counts_against_base_timeout() {
        let base = Arc::new(ThrottledBase {
            throttle: geo_client::Throttle::new(Duration::from_millis(500)),
        });
        let engine = engine(base, vec![]).with_timeout(Duration::from_millis(50));

        assert!(engine.resolve(point()).await.is_ok());
        let ResolveError::GeocodingUnavailable { cause, .. } = engine.resolve(point()).await.unwrap_err();
        assert!(matches!(cause, GeoError::Timeout { timeout_ms: 50, .. }));
    }

    #[tokio::test]
    async fn majority_beats_first_declared_fastest_source() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![
                FakeSource::answering("first", "Del Valle", "66220"),
                FakeSource::answering("second", "Centro", "64000").delayed(Duration::from_millis(40)),
                FakeSource::answering("third", "Centro", "64000"),
            ],
        );
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.postal_code, "64000");
        assert_eq!(location.neighborhood, "Centro");
        assert_eq!(location.municipality, "second-municipality");
        assert_eq!(location.confidence, LocationConfidence::High);
        assert_eq!(location.agreeing_sources, 2);
        assert_eq!(location.sources_consulted, 3);
    }

    #[tokio::test]
    async fn slow_optional_source_is_ignored() {
        let engine = engine(
            FakeBase::ok(centro_base()),
            vec![
                FakeSource::answering("hung", "Centro", "64000").delayed(Duration::from_millis(500)),
                FakeSource::answering("ok", "Centro", "64000"),
            ],
        )
        .with_timeout(Duration::from_millis(50));
        let location = engine.resolve(point()).await.unwrap();
        assert_eq!(location.agreeing_sources, 1);
        assert_eq!(location.sources_consulted, 2);
    }

    #[tokio::test]
    async fn sources_see_base_context() {
        let base = BaseAddress {
            neighbourhood: Some("Mitras Centro".into()),
            town: Some("Monterrey".into()),
            state: Some("Nuevo León".into()),
            ..Default::default()
        };
        let source = Arc::new(FakeSource::silent("a"));
        let engine = ReconciliationEngine::new(FakeBase::ok(base), vec![source.clone() as Arc<dyn GeoSource>])
            .with_locale("es-MX");
        engine.resolve(point()).await.unwrap();

        let seen = source.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.neighborhood.as_deref(), Some("Mitras Centro"));
        assert_eq!(seen.municipality.as_deref(), Some("Monterrey"));
        assert_eq!(seen.locale, "es-MX");
    }

    #[test]
    fn winner_without_name_borrows_from_other_backer() {
        let mut nameless = RawSourceResult::new("a");
        nameless.postal_code = Some("64849".into());
        let mut named = RawSourceResult::new("b");
        named.postal_code = Some(" 64849 ".into());
        named.neighborhood = Some("Altavista".into());

        let location = reconcile(&BaseAddress::default(), &[nameless, named], 2);
        assert_eq!(location.postal_code, "64849");
        assert_eq!(location.neighborhood, "Altavista");
        assert_eq!(location.confidence, LocationConfidence::High);
    }

    #[test]
    fn winner_without_any_name_uses_base_seed() {
        let mut result = RawSourceResult::new("a");
        result.postal_code = Some("64000".into());
        let location = reconcile(&centro_base(), &[result], 1);
        assert_eq!(location.neighborhood, "Centro");
        assert_eq!(location.municipality, "Monterrey");
    }

    #[test]
    fn blank_postal_codes_do_not_vote() {
        let mut blank = RawSourceResult::new("a");
        blank.postal_code = Some("  ".into());
        blank.neighborhood = Some("Cumbres".into());
        let location = reconcile(&centro_base(), &[blank], 1);
        assert_eq!(location.confidence, LocationConfidence::Low);
        assert_eq!(location.neighborhood, "Centro");
    }
}
