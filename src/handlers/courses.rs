use axum::extract::{Path, RawQuery, State};
use serde_json::{json, Value};

use crate::database::models::{Course, CourseInput};
use crate::filter::Collection;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::advanced_results::expand_course;
use crate::services::{AdvancedResults, CourseService};
use crate::state::AppState;

use super::{parse_id, query_pairs};

/// GET /api/v1/courses
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Vec<Value>> {
    let listing = AdvancedResults::new(&state, Collection::Courses)
        .list(&query_pairs(raw.as_deref()))
        .await?;
    Ok(ApiResponse::list(listing.data).with_pagination(listing.pagination))
}

/// GET /api/v1/bootcamps/:id/courses
pub async fn list_for_bootcamp(State(state): State<AppState>, Path(bootcamp_id): Path<String>) -> ApiResult<Vec<Course>> {
    let courses = CourseService::new(&state).for_bootcamp(parse_id(&bootcamp_id)?).await?;
    Ok(ApiResponse::list(courses))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let course = CourseService::new(&state).get(parse_id(&id)?).await?;
    Ok(ApiResponse::success(expand_course(&state, &course).await?))
}

/// POST /api/v1/bootcamps/:id/courses
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(bootcamp_id): Path<String>,
    JsonBody(input): JsonBody<CourseInput>,
) -> ApiResult<Course> {
    let course = CourseService::new(&state)
        .create(&auth.user, parse_id(&bootcamp_id)?, input)
        .await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<CourseInput>,
) -> ApiResult<Course> {
    let course = CourseService::new(&state).update(&auth.user, parse_id(&id)?, input).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    CourseService::new(&state).delete(&auth.user, parse_id(&id)?).await?;
    Ok(ApiResponse::success(json!({})))
}
