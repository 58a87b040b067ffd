use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, RawQuery, State},
    http::StatusCode,
};
use serde_json::{json, Value};

use crate::database::models::{Bootcamp, BootcampInput};
use crate::error::ApiError;
use crate::filter::Collection;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::bootcamps::oversize;
use crate::services::{AdvancedResults, BootcampService, PhotoUpload};
use crate::state::AppState;

use super::{parse_id, query_pairs};

/// GET /api/v1/bootcamps
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Vec<Value>> {
    let listing = AdvancedResults::new(&state, Collection::Bootcamps)
        .list(&query_pairs(raw.as_deref()))
        .await?;
    Ok(ApiResponse::list(listing.data).with_pagination(listing.pagination))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&state).get(parse_id(&id)?).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /api/v1/bootcamps
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(input): JsonBody<BootcampInput>,
) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&state).create(&auth.user, input).await?;
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<BootcampInput>,
) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&state).update(&auth.user, parse_id(&id)?, input).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// DELETE /api/v1/bootcamps/:id
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    BootcampService::new(&state).delete(&auth.user, parse_id(&id)?).await?;
    Ok(ApiResponse::success(json!({})))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance
pub async fn radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> ApiResult<Vec<Bootcamp>> {
    let distance: f64 = distance
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Distance must be a non-negative number"))?;
    let bootcamps = BootcampService::new(&state).within_radius(&zipcode, distance).await?;
    Ok(ApiResponse::list(bootcamps))
}

/// PUT /api/v1/bootcamps/:id/photo
///
/// Expects a multipart body with the image in a field named `file`.
pub async fn photo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let id = parse_id(&id)?;
    let max = state.config.upload.max_file_upload;
    let upload = match multipart {
        Ok(multipart) => read_file_field(multipart, max).await?,
        Err(rejection) => {
            tracing::debug!("Photo upload without multipart body: {}", rejection.body_text());
            None
        }
    };

    let file_name = BootcampService::new(&state).upload_photo(&auth.user, id, upload).await?;
    Ok(ApiResponse::success(file_name))
}

async fn read_file_field(mut multipart: Multipart, max: usize) -> Result<Option<PhotoUpload>, ApiError> {
    let bad_body = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            oversize(max)
        } else {
            ApiError::bad_request(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(bad_body)?;
        return Ok(Some(PhotoUpload { file_name, content_type, data }));
    }
    Ok(None)
}
