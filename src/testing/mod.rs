//! In-process fixtures for service tests: a state over `MemoryStore` with
//! stand-in geocoder and mailer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::{BootcampInput, User};
use crate::geo::{GeoError, GeoPoint, Geocoder};
use crate::mail::{EmailMessage, MailError, Mailer};
use crate::state::AppState;
use crate::store::MemoryStore;
use crate::types::Role;

pub const BOSTON: (f64, f64) = (-71.104028, 42.350846);

/// Resolves a fixed set of addresses; everything else is not found.
#[derive(Default)]
pub struct StubGeocoder {
    points: HashMap<String, (f64, f64)>,
}

impl StubGeocoder {
    pub fn with(mut self, address: &str, point: (f64, f64)) -> Self {
        self.points.insert(address.to_string(), point);
        self
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

/// Keeps every sent message; can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let geocoder = StubGeocoder::default()
            .with("233 Bay State Rd Boston MA 02215", BOSTON)
            .with("02215", BOSTON)
            .with("220 Pawtucket St, Lowell, MA 01854", (-71.324682, 42.647923));
        let mailer = Arc::new(mailer);
        let state = AppState::new(
            AppConfig::test(),
            Arc::new(MemoryStore::new()),
            Arc::new(geocoder),
            mailer.clone(),
        );
        Self { state, mailer }
    }

    /// Inserts a user directly; the password hash is not a real bcrypt hash.
    pub async fn user(&self, role: Role) -> anyhow::Result<User> {
        let id = Uuid::new_v4();
        let user = User {
            id,
            name: format!("{} {}", role, id.simple()),
            email: format!("{}@example.com", id.simple()),
            role,
            password_hash: "unused".to_string(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        };
        self.state.store.insert_user(&user).await?;
        Ok(user)
    }

    pub fn bootcamp_input(name: &str) -> BootcampInput {
        BootcampInput {
            name: Some(name.to_string()),
            description: Some(format!("{} teaches full stack development", name)),
            address: Some("233 Bay State Rd Boston MA 02215".to_string()),
            careers: Some(vec!["Web Development".to_string()]),
            ..BootcampInput::default()
        }
    }
}
