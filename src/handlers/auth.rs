use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, TOKEN_COOKIE};
use crate::services::auth::{
    ForgotPasswordInput, LoginInput, RegisterInput, ResetPasswordInput, Session, UpdateDetailsInput,
    UpdatePasswordInput,
};
use crate::services::AuthService;
use crate::state::AppState;
use crate::error::ApiError;

/// POST /api/v1/auth/register
pub async fn register(State(state): State<AppState>, JsonBody(input): JsonBody<RegisterInput>) -> Result<Response, ApiError> {
    let session = AuthService::new(&state).register(input).await?;
    Ok(token_response(&state.config, session))
}

/// POST /api/v1/auth/login
pub async fn login(State(state): State<AppState>, JsonBody(input): JsonBody<LoginInput>) -> Result<Response, ApiError> {
    let session = AuthService::new(&state).login(input).await?;
    Ok(token_response(&state.config, session))
}

/// GET /api/v1/auth/logout - replaces the cookie with a short-lived `none`
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = token_cookie(&state.config, "none", Utc::now() + Duration::seconds(10));
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "data": {} })),
    )
        .into_response()
}

/// GET /api/v1/auth/me
pub async fn me(auth: AuthUser) -> ApiResult<User> {
    Ok(ApiResponse::success(auth.user))
}

/// PUT /api/v1/auth/updateuserdetails
pub async fn update_details(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(input): JsonBody<UpdateDetailsInput>,
) -> ApiResult<User> {
    let user = AuthService::new(&state).update_details(&auth.user, input).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/auth/updatepassword
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(input): JsonBody<UpdatePasswordInput>,
) -> Result<Response, ApiError> {
    let session = AuthService::new(&state).update_password(&auth.user, input).await?;
    Ok(token_response(&state.config, session))
}

/// POST /api/v1/auth/forgotpassword
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<ForgotPasswordInput>,
) -> ApiResult<Value> {
    let base = reset_url_base(&headers, state.config.server.port);
    AuthService::new(&state).forgot_password(input, &base).await?;
    Ok(ApiResponse::success(json!("Email sent")))
}

/// PUT /api/v1/auth/resetpassword/:resettoken
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(input): JsonBody<ResetPasswordInput>,
) -> Result<Response, ApiError> {
    let session = AuthService::new(&state).reset_password(&token, input).await?;
    Ok(token_response(&state.config, session))
}

/// `{success, token}` plus the session cookie.
fn token_response(config: &AppConfig, session: Session) -> Response {
    let expires = Utc::now() + Duration::days(config.auth.cookie_expire_days);
    let cookie = token_cookie(config, &session.token, expires);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "token": session.token })),
    )
        .into_response()
}

pub fn token_cookie(config: &AppConfig, value: &str, expires: DateTime<Utc>) -> String {
    let mut cookie = format!(
        "{}={}; Expires={}; HttpOnly; Path=/",
        TOKEN_COOKIE,
        value,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    if config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Link target for the reset email, built from the request's own host.
fn reset_url_base(headers: &HeaderMap, port: u16) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", port));
    format!("{}://{}/api/v1/auth/resetpassword", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    #[test]
    fn cookie_is_http_only_and_secure_in_production() {
        let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();

        let dev = token_cookie(&AppConfig::development(), "abc", expires);
        assert_eq!(dev, "token=abc; Expires=Wed, 02 Jan 2030 03:04:05 GMT; HttpOnly; Path=/");

        let prod = token_cookie(&AppConfig::production(), "abc", expires);
        assert!(prod.ends_with("; Secure"));
    }

    #[test]
    fn reset_url_uses_request_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.devcamper.io"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(reset_url_base(&headers, 5000), "https://api.devcamper.io/api/v1/auth/resetpassword");
        assert_eq!(reset_url_base(&HeaderMap::new(), 5000), "http://localhost:5000/api/v1/auth/resetpassword");
    }
}
