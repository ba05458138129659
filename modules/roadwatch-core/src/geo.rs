//! Capabilities the reconciliation pipeline is built from.

use async_trait::async_trait;
use roadwatch_common::{Coordinate, GeoError, RawSourceResult, ResolveError, ResolvedLocation};

/// Raw address fields returned by the base reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseAddress {
    pub display_name: Option<String>,
    pub suburb: Option<String>,
    pub neighbourhood: Option<String>,
    pub residential: Option<String>,
    pub quarter: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

impl BaseAddress {
    /// Neighborhood text handed to optional sources: suburb, then neighbourhood.
    pub fn neighborhood_seed(&self) -> Option<&str> {
        first_present(&[&self.suburb, &self.neighbourhood])
    }

    /// Neighborhood used when no source produced a postal code.
    pub fn fallback_neighborhood(&self) -> Option<&str> {
        first_present(&[
            &self.suburb,
            &self.neighbourhood,
            &self.residential,
            &self.quarter,
        ])
    }

    pub fn municipality(&self) -> Option<&str> {
        first_present(&[&self.city, &self.town, &self.municipality])
    }

    pub fn state(&self) -> Option<&str> {
        first_present(&[&self.state])
    }

    pub fn postcode(&self) -> Option<&str> {
        first_present(&[&self.postcode])
    }
}

fn first_present<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|f| f.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// What an optional source gets to work with: the point plus whatever the
/// base geocoder said about it.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupContext {
    pub coordinate: Coordinate,
    pub locale: String,
    pub neighborhood: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
}

impl LookupContext {
    pub fn from_base(coordinate: Coordinate, locale: &str, base: &BaseAddress) -> Self {
        Self {
            coordinate,
            locale: locale.to_string(),
            neighborhood: base.neighborhood_seed().map(str::to_string),
            municipality: base.municipality().map(str::to_string),
            state: base.state().map(str::to_string),
        }
    }
}

/// The mandatory first lookup. A payload without address fields must be
/// reported as `GeoError::NoAddress`.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    fn id(&self) -> &str;

    async fn reverse(&self, coordinate: Coordinate, locale: &str) -> Result<BaseAddress, GeoError>;
}

/// One optional coordinate -> postal-code provider. `Ok(None)` means the
/// source had nothing to say, which is not an error.
#[async_trait]
pub trait GeoSource: Send + Sync {
    fn id(&self) -> &str;

    async fn lookup(&self, ctx: &LookupContext) -> Result<Option<RawSourceResult>, GeoError>;
}

/// Anything that can turn a coordinate into a neighborhood.
#[async_trait]
pub trait NeighborhoodResolver: Send + Sync {
    async fn resolve(&self, coordinate: Coordinate) -> Result<ResolvedLocation, ResolveError>;
}
