// handlers/mod.rs - HTTP handlers, one module per resource under /api/v1
//
// Handlers only unpack the request and shape the envelope; rules live in services.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod system;

use uuid::Uuid;

use crate::error::ApiError;

/// Path ids that are not UUIDs are reported like missing records.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::debug!("Malformed id in path: {}", raw);
        ApiError::resource_not_found()
    })
}

/// Decodes the raw query string into ordered `(key, value)` pairs, repeated keys included.
pub fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    })
    .unwrap_or_default()
}
