use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, config: &AuthConfig) -> Self {
        let now = Utc::now();
        let lifetime = Duration::from_std(config.jwt_expire).unwrap_or_else(|_| Duration::days(30));
        Self {
            sub: user_id,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub fn generate_jwt(claims: &Claims, config: &AuthConfig) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verifies signature and expiry.
pub fn validate_jwt(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// bcrypt runs on the blocking pool so request workers stay free.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

/// One-way comparison; a malformed stored hash never matches.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(result) => result.unwrap_or(false),
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}

/// A freshly issued password reset token.
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Sent to the user, never stored.
    pub plain: String,
    /// Stored on the user record.
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate_reset_token(ttl: std::time::Duration) -> ResetToken {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plain = hex::encode(bytes);
    let hash = hash_reset_token(&plain);
    let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(10));
    ResetToken { plain, hash, expires_at: Utc::now() + ttl }
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn jwt_round_trip() {
        let config = AppConfig::test().auth;
        let id = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(id, &config), &config).unwrap();
        assert_eq!(validate_jwt(&token, &config).unwrap().sub, id);
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let config = AppConfig::test().auth;
        let now = Utc::now().timestamp();
        let expired = Claims { sub: Uuid::new_v4(), iat: now - 3600, exp: now - 60 };
        let token = generate_jwt(&expired, &config).unwrap();
        assert!(matches!(validate_jwt(&token, &config), Err(AuthError::InvalidToken(_))));

        let mut other = config.clone();
        other.jwt_secret = "another-secret".into();
        let token = generate_jwt(&Claims::new(Uuid::new_v4(), &other), &other).unwrap();
        assert!(validate_jwt(&token, &config).is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hashing_leaves_the_runtime_free() {
        let ticker = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            std::time::Instant::now()
        });
        let hash = hash_password("123456", 10).await.unwrap();
        let hashed_at = std::time::Instant::now();
        assert!(verify_password("123456", &hash).await);
        // the timer task ran while bcrypt was working
        assert!(ticker.await.unwrap() < hashed_at);
    }

    #[tokio::test]
    async fn password_hash_is_one_way() {
        let hash = hash_password("123456", 4).await.unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_password("123456", &hash).await);
        assert!(!verify_password("654321", &hash).await);
        assert!(!verify_password("123456", "not-a-hash").await);
    }

    #[test]
    fn reset_token_stores_only_the_digest() {
        let token = generate_reset_token(std::time::Duration::from_secs(600));
        assert_eq!(token.plain.len(), 40);
        assert_eq!(token.hash, hash_reset_token(&token.plain));
        assert_ne!(token.hash, token.plain);
        assert!(token.expires_at > Utc::now());
    }
}
