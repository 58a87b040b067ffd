use axum::extract::{Path, RawQuery, State};
use serde_json::{json, Value};

use crate::database::models::{Review, ReviewInput};
use crate::filter::Collection;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::advanced_results::expand_review;
use crate::services::{AdvancedResults, ReviewService};
use crate::state::AppState;

use super::{parse_id, query_pairs};

/// GET /api/v1/reviews
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Vec<Value>> {
    let listing = AdvancedResults::new(&state, Collection::Reviews)
        .list(&query_pairs(raw.as_deref()))
        .await?;
    Ok(ApiResponse::list(listing.data).with_pagination(listing.pagination))
}

/// GET /api/v1/bootcamps/:id/reviews
pub async fn list_for_bootcamp(State(state): State<AppState>, Path(bootcamp_id): Path<String>) -> ApiResult<Vec<Review>> {
    let reviews = ReviewService::new(&state).for_bootcamp(parse_id(&bootcamp_id)?).await?;
    Ok(ApiResponse::list(reviews))
}

/// GET /api/v1/reviews/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let review = ReviewService::new(&state).get(parse_id(&id)?).await?;
    Ok(ApiResponse::success(expand_review(&state, &review).await?))
}

/// POST /api/v1/bootcamps/:id/reviews
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(bootcamp_id): Path<String>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> ApiResult<Review> {
    let review = ReviewService::new(&state)
        .create(&auth.user, parse_id(&bootcamp_id)?, input)
        .await?;
    Ok(ApiResponse::created(review))
}

/// PUT /api/v1/reviews/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> ApiResult<Review> {
    let review = ReviewService::new(&state).update(&auth.user, parse_id(&id)?, input).await?;
    Ok(ApiResponse::success(review))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    ReviewService::new(&state).delete(&auth.user, parse_id(&id)?).await?;
    Ok(ApiResponse::success(json!({})))
}
