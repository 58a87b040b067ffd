#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use devcamper_api::auth::hash_password;
use devcamper_api::config::AppConfig;
use devcamper_api::database::models::User;
use devcamper_api::geo::{GeoError, GeoPoint, Geocoder};
use devcamper_api::mail::{EmailMessage, MailError, Mailer};
use devcamper_api::store::{MemoryStore, Store};
use devcamper_api::types::Role;
use devcamper_api::{app, AppState};

pub const BOSTON_ADDRESS: &str = "233 Bay State Rd Boston MA 02215";
pub const BOSTON: (f64, f64) = (-71.104028, 42.350846);
pub const LOWELL_ADDRESS: &str = "220 Pawtucket St, Lowell, MA 01854";
pub const LOWELL: (f64, f64) = (-71.324682, 42.647923);

/// Resolves the fixture addresses and postal codes; everything else is not found.
pub struct StubGeocoder {
    points: HashMap<&'static str, (f64, f64)>,
}

impl Default for StubGeocoder {
    fn default() -> Self {
        let points = HashMap::from([
            (BOSTON_ADDRESS, BOSTON),
            ("02215", BOSTON),
            (LOWELL_ADDRESS, LOWELL),
            ("01854", LOWELL),
        ]);
        Self { points }
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
        self.points
            .get(address)
            .map(|(lng, lat)| GeoPoint::at(*lng, *lat))
            .ok_or_else(|| GeoError::NotFound(address.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.lock().expect("mailer lock").push(message.clone());
        Ok(())
    }
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// The full router over an in-memory store, driven in-process with `oneshot`.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_config(|_| {})
    }

    pub fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::test();
        customize(&mut config);
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(mut config: AppConfig, store: Arc<dyn Store>) -> Result<Self> {
        let uploads = tempfile::tempdir().context("failed to create upload dir")?;
        config.upload.file_upload_path = uploads.path().to_path_buf();

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(config, store, Arc::new(StubGeocoder::default()), mailer.clone());
        Ok(Self { router: app(state.clone()), state, mailer, uploads })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok(Response { status, headers, body })
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Result<Response> {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn get_as(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<Response> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<Response> {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers through the API and returns the session token.
    pub async fn register(&self, email: &str, role: &str) -> Result<String> {
        let res = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({"name": "Test User", "email": email, "password": "123456", "role": role}),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "register failed: {}", res.body);
        token_of(&res)
    }

    /// Admins cannot self-register, so they are written to the store and then logged in.
    pub async fn admin(&self, email: &str) -> Result<String> {
        let user = User {
            id: uuid::Uuid::new_v4(),
            name: "Admin".to_string(),
            email: email.to_string(),
            role: Role::Admin,
            password_hash: hash_password("123456", self.state.config.auth.bcrypt_cost).await?,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: chrono::Utc::now(),
        };
        self.state.store.insert_user(&user).await?;
        let res = self
            .post("/api/v1/auth/login", None, json!({"email": email, "password": "123456"}))
            .await?;
        token_of(&res)
    }

    pub async fn create_bootcamp(&self, token: &str, name: &str, address: &str) -> Result<Value> {
        let res = self.post("/api/v1/bootcamps", Some(token), bootcamp_body(name, address)).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create bootcamp failed: {}", res.body);
        Ok(res.body["data"].clone())
    }

    pub async fn create_course(&self, token: &str, bootcamp_id: &str, title: &str, tuition: f64) -> Result<Value> {
        let res = self
            .post(
                &format!("/api/v1/bootcamps/{}/courses", bootcamp_id),
                Some(token),
                json!({
                    "title": title,
                    "description": format!("{} course", title),
                    "weeks": 8,
                    "tuition": tuition,
                    "minimumSkill": "beginner",
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create course failed: {}", res.body);
        Ok(res.body["data"].clone())
    }

    pub async fn create_review(&self, token: &str, bootcamp_id: &str, rating: i32) -> Result<Value> {
        let res = self
            .post(
                &format!("/api/v1/bootcamps/{}/reviews", bootcamp_id),
                Some(token),
                json!({"title": "Review", "text": "Solid program", "rating": rating}),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create review failed: {}", res.body);
        Ok(res.body["data"].clone())
    }
}

pub fn bootcamp_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} is a full stack bootcamp", name),
        "website": "https://example.com",
        "phone": "(111) 111-1111",
        "email": "enroll@example.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
        "housing": true,
        "jobAssistance": true,
        "jobGuarantee": false,
        "acceptGi": true,
    })
}

pub fn token_of(res: &Response) -> Result<String> {
    res.body["token"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("no token in response: {}", res.body))
}

pub fn id_of(doc: &Value) -> String {
    doc["id"].as_str().unwrap_or_default().to_string()
}
