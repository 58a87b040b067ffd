//! Geo Lookup Adapter: address/postal-code resolution and spherical distance.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeocoderConfig;
use crate::database::models::Location;

/// Radius used to turn a distance into an angle on the sphere.
pub const EARTH_RADIUS_KM: f64 = 6378.0;

const MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Unsupported geocoder provider: {0}")]
    Unsupported(String),

    #[error("Geocoder provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub zipcode: Option<String>,
    pub country_code: Option<String>,
}

impl GeoPoint {
    pub fn at(longitude: f64, latitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            formatted_address: None,
            street: None,
            city: None,
            state_code: None,
            zipcode: None,
            country_code: None,
        }
    }
}

impl From<GeoPoint> for Location {
    fn from(p: GeoPoint) -> Self {
        Location {
            formatted_address: p.formatted_address,
            street: p.street,
            city: p.city,
            state: p.state_code,
            zipcode: p.zipcode,
            country: p.country_code,
            ..Location::point(p.longitude, p.latitude)
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-form address or postal code. Unknown inputs yield `GeoError::NotFound`.
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError>;
}

pub fn from_config(config: &GeocoderConfig) -> Result<Arc<dyn Geocoder>, GeoError> {
    match config.provider.to_ascii_lowercase().as_str() {
        "mapquest" => Ok(Arc::new(MapQuestGeocoder::new(config.api_key.clone()))),
        other => Err(GeoError::Unsupported(other.to_string())),
    }
}

pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    admin_area5: Option<String>,
    #[serde(default)]
    admin_area3: Option<String>,
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    geocode_quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestGeocoder {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, MAPQUEST_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { client: reqwest::Client::new(), api_key, base_url }
    }

    fn to_point(address: &str, loc: MapQuestLocation) -> Result<GeoPoint, GeoError> {
        // Unresolvable input falls back to a country centroid
        if loc.geocode_quality.as_deref() == Some("COUNTRY") {
            return Err(GeoError::NotFound(address.to_string()));
        }
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let street = non_empty(loc.street);
        let city = non_empty(loc.admin_area5);
        let state = non_empty(loc.admin_area3);
        let zipcode = non_empty(loc.postal_code);
        let country = non_empty(loc.admin_area1);

        let state_zip = [state.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<&str> = [street.as_deref(), city.as_deref(), Some(state_zip.as_str()), country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();

        Ok(GeoPoint {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address: if parts.is_empty() { None } else { Some(parts.join(", ")) },
            street,
            city,
            state_code: state,
            zipcode,
            country_code: country,
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
        debug!("Geocoding '{}'", address);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Geocoder returned HTTP {}", response.status());
            return Err(GeoError::Provider(format!("HTTP {}", response.status())));
        }

        let body: MapQuestResponse = response.json().await?;
        let location = body
            .results
            .into_iter()
            .next()
            .and_then(|r| r.locations.into_iter().next())
            .ok_or_else(|| GeoError::NotFound(address.to_string()))?;

        Self::to_point(address, location)
    }
}

/// Converts a distance in kilometres into radians on the Earth's sphere.
pub fn radius_radians(distance_km: f64) -> f64 {
    distance_km / EARTH_RADIUS_KM
}

/// Great-circle angle in radians between two `(longitude, latitude)` points.
pub fn angular_distance(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}
