use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::auth::validate_jwt;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated caller, resolved from the token to a live user record.
///
/// Adding this extractor to a handler makes the route require authentication.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("No token on {} {}", parts.method, parts.uri.path());
            ApiError::unauthorized()
        })?;

        let claims = validate_jwt(&token, &state.config.auth)?;

        let user = state.store.get_user(claims.sub).await?.ok_or_else(|| {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            ApiError::unauthorized()
        })?;

        Ok(AuthUser { user })
    }
}

/// Bearer header first, then the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty() && *value != "none")
        .map(|(_, value)| value.to_string())
}
