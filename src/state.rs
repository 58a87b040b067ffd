use std::sync::Arc;

use crate::config::AppConfig;
use crate::geo::Geocoder;
use crate::mail::Mailer;
use crate::store::Store;

/// Shared per-process dependencies handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { config: Arc::new(config), store, geocoder, mailer }
    }
}
