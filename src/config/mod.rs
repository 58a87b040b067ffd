use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub auth: AuthConfig,
    pub geocoder: GeocoderConfig,
    pub upload: UploadConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Test,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Which set the pagination total is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalCount {
    /// Count of documents matching the request's filters.
    Filtered,
    /// Count of every document in the collection, regardless of filters.
    Collection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub max_limit: u32,
    pub total_count: TotalCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expire: Duration,
    pub cookie_expire_days: i64,
    pub bcrypt_cost: u32,
    pub reset_token_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub provider: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_upload: usize,
    pub file_upload_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub from_name: String,
    pub from_email: String,
}

const DEV_JWT_SECRET: &str = "devcamper-development-secret";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("test") => Environment::Test,
            _ => Environment::Development,
        };

        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Test => Self::test(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(port) = parse_var("PORT")? {
            self.server.port = port;
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(v) = parse_var("DATABASE_MAX_CONNECTIONS")? {
            self.database.max_connections = v;
        }
        if let Some(v) = parse_var("DATABASE_CONNECTION_TIMEOUT")? {
            self.database.connection_timeout = v;
        }

        if let Some(v) = parse_var("QUERY_MAX_LIMIT")? {
            self.query.max_limit = v;
        }
        if let Ok(v) = env::var("PAGINATION_TOTAL") {
            self.query.total_count = match v.as_str() {
                "filtered" => TotalCount::Filtered,
                "collection" => TotalCount::Collection,
                _ => return Err(ConfigError::Invalid { name: "PAGINATION_TOTAL", value: v }),
            };
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRE") {
            self.auth.jwt_expire = parse_duration(&v)
                .ok_or(ConfigError::Invalid { name: "JWT_EXPIRE", value: v })?;
        }
        if let Some(v) = parse_var("JWT_COOKIE_EXPIRE")? {
            self.auth.cookie_expire_days = v;
        }
        if let Some(v) = parse_var("BCRYPT_COST")? {
            self.auth.bcrypt_cost = v;
        }

        if let Ok(v) = env::var("GEOCODER_PROVIDER") {
            self.geocoder.provider = v;
        }
        if let Ok(v) = env::var("GEOCODER_API_KEY") {
            self.geocoder.api_key = v;
        }

        if let Some(v) = parse_var("MAX_FILE_UPLOAD")? {
            self.upload.max_file_upload = v;
        }
        if let Ok(v) = env::var("FILE_UPLOAD_PATH") {
            self.upload.file_upload_path = PathBuf::from(v);
        }

        if let Ok(v) = env::var("SMTP_HOST") {
            self.smtp.host = v;
        }
        if let Some(v) = parse_var("SMTP_PORT")? {
            self.smtp.port = v;
        }
        if let Ok(v) = env::var("SMTP_EMAIL") {
            self.smtp.email = v;
        }
        if let Ok(v) = env::var("SMTP_PASSWORD") {
            self.smtp.password = v;
        }
        if let Ok(v) = env::var("FROM_NAME") {
            self.smtp.from_name = v;
        }
        if let Ok(v) = env::var("FROM_EMAIL") {
            self.smtp.from_email = v;
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.is_production() && self.auth.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if let Some(url) = &self.database.url {
            url::Url::parse(url).map_err(|_| ConfigError::Invalid {
                name: "DATABASE_URL",
                value: "<redacted>".to_string(),
            })?;
        }
        if self.query.max_limit == 0 {
            return Err(ConfigError::Invalid { name: "QUERY_MAX_LIMIT", value: "0".to_string() });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 5000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            query: QueryConfig {
                max_limit: 100,
                total_count: TotalCount::Filtered,
            },
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expire: Duration::from_secs(30 * 24 * 60 * 60),
                cookie_expire_days: 30,
                bcrypt_cost: 10,
                reset_token_ttl: Duration::from_secs(10 * 60),
            },
            geocoder: GeocoderConfig {
                provider: "mapquest".to_string(),
                api_key: String::new(),
            },
            upload: UploadConfig {
                max_file_upload: 1_000_000,
                file_upload_path: PathBuf::from("./public/uploads"),
            },
            smtp: SmtpConfig {
                host: String::new(),
                port: 587,
                email: String::new(),
                password: String::new(),
                from_name: "DevCamper".to_string(),
                from_email: "noreply@devcamper.io".to_string(),
            },
        }
    }

    pub fn test() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Test;
        config.auth.jwt_secret = "devcamper-test-secret".to_string();
        // bcrypt minimum cost keeps the suite fast
        config.auth.bcrypt_cost = 4;
        config.upload.file_upload_path = env::temp_dir().join("devcamper-uploads");
        config
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.auth.jwt_secret = String::new();
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}

/// Parses lifetimes such as `30d`, `12h`, `15m`, `90s` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], c),
        Some(_) => (value, 's'),
        None => return None,
    };
    let amount: u64 = digits.parse().ok()?;
    let secs = match unit {
        's' => amount,
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(60 * 60)?,
        'd' => amount.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.query.total_count, TotalCount::Filtered);
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn parses_jwt_lifetimes() {
        assert_eq!(parse_duration("30d"), Some(Duration::from_secs(30 * 86_400)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7_200)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("3w"), None);
        assert_eq!(parse_duration(""), None);
    }
}
