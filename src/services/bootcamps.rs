use std::path::Path;

use axum::body::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Bootcamp, BootcampInput, Location, User, DEFAULT_PHOTO};
use crate::error::ApiError;
use crate::geo::radius_radians;
use crate::services::{access, cascade};
use crate::state::AppState;
use crate::types::{Operation, ResourceKind, Role};
use crate::validation::apply_bootcamp;

/// A file received on the photo upload route.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

pub struct BootcampService<'a> {
    state: &'a AppState,
}

impl<'a> BootcampService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn get(&self, id: Uuid) -> Result<Bootcamp, ApiError> {
        self.state
            .store
            .get_bootcamp(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Bootcamp not found with id of {}", id)))
    }

    /// Validates, geocodes the address and stores a new bootcamp owned by `actor`.
    ///
    /// Publishers are limited to one bootcamp; the store enforces the limit so
    /// that concurrent creates cannot both pass.
    pub async fn create(&self, actor: &User, input: BootcampInput) -> Result<Bootcamp, ApiError> {
        access::authorize(actor, access::BOOTCAMP_WRITERS)?;

        let mut bootcamp = blank_bootcamp(actor);
        apply_bootcamp(&mut bootcamp, &input, true)?;

        let point = self.state.geocoder.geocode(&bootcamp.address).await?;
        bootcamp.location = Location::from(point);

        self.state.store.insert_bootcamp(&bootcamp).await?;
        tracing::info!("User {} created bootcamp {} ({})", actor.id, bootcamp.id, bootcamp.slug);
        Ok(bootcamp)
    }

    pub async fn update(&self, actor: &User, id: Uuid, input: BootcampInput) -> Result<Bootcamp, ApiError> {
        access::authorize(actor, access::BOOTCAMP_WRITERS)?;
        let mut bootcamp = self.get(id).await?;
        access::ensure_owner(actor, bootcamp.user, ResourceKind::Bootcamp, id, Operation::Update)?;

        apply_bootcamp(&mut bootcamp, &input, false)?;
        if !self.state.store.update_bootcamp(&bootcamp).await? {
            return Err(ApiError::not_found(format!("Bootcamp not found with id of {}", id)));
        }
        self.get(id).await
    }

    /// Removes the bootcamp and every course and review that references it.
    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<(), ApiError> {
        access::authorize(actor, access::BOOTCAMP_WRITERS)?;
        let bootcamp = self.get(id).await?;
        access::ensure_owner(actor, bootcamp.user, ResourceKind::Bootcamp, id, Operation::Delete)?;

        cascade::delete_bootcamp(self.state.store.as_ref(), id).await?;
        Ok(())
    }

    /// Bootcamps within `distance_km` of the postal code's centroid.
    pub async fn within_radius(&self, zipcode: &str, distance_km: f64) -> Result<Vec<Bootcamp>, ApiError> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(ApiError::bad_request("Distance must be a non-negative number"));
        }

        let point = self.state.geocoder.geocode(zipcode).await?;
        let radius = radius_radians(distance_km);
        tracing::debug!(
            "Radius search around {} ({}, {}) r={}rad",
            zipcode,
            point.longitude,
            point.latitude,
            radius
        );
        Ok(self
            .state
            .store
            .bootcamps_within(point.longitude, point.latitude, radius)
            .await?)
    }

    /// Stores an uploaded image as `photo_<id><ext>` and records it on the bootcamp.
    pub async fn upload_photo(&self, actor: &User, id: Uuid, upload: Option<PhotoUpload>) -> Result<String, ApiError> {
        access::authorize(actor, access::BOOTCAMP_WRITERS)?;
        let bootcamp = self.get(id).await?;
        access::ensure_owner(actor, bootcamp.user, ResourceKind::Bootcamp, id, Operation::UploadPhoto)?;

        let upload = upload.ok_or_else(|| ApiError::bad_request("Please upload a file"))?;
        let max = self.state.config.upload.max_file_upload;
        check_upload(&upload, max)?;

        let file_name = photo_file_name(id, &upload.file_name);
        let dir = &self.state.config.upload.file_upload_path;
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(dir.join(&file_name), &upload.data).await
        }
        .await;
        if let Err(e) = written {
            tracing::error!("Failed to write upload {} into {}: {}", file_name, dir.display(), e);
            return Err(ApiError::internal_server_error("Problem with file upload"));
        }

        self.state.store.set_bootcamp_photo(id, &file_name).await?;
        tracing::info!("Stored photo {} for bootcamp {}", file_name, id);
        Ok(file_name)
    }
}

pub fn check_upload(upload: &PhotoUpload, max_bytes: usize) -> Result<(), ApiError> {
    let is_image = upload
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image"))
        .unwrap_or(false);
    if !is_image {
        tracing::warn!("Rejected upload {} with type {:?}", upload.file_name, upload.content_type);
        return Err(ApiError::bad_request("Please upload an image file"));
    }
    if upload.data.len() > max_bytes {
        tracing::warn!("Rejected upload {} of {} bytes", upload.file_name, upload.data.len());
        return Err(oversize(max_bytes));
    }
    Ok(())
}

pub fn oversize(max_bytes: usize) -> ApiError {
    ApiError::bad_request(format!("Please upload an image less than {}", max_bytes))
}

/// The stored name keeps the original extension; the stem is always the bootcamp id.
pub fn photo_file_name(id: Uuid, original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("photo_{}{}", id, ext)
}

fn blank_bootcamp(actor: &User) -> Bootcamp {
    Bootcamp {
        id: Uuid::new_v4(),
        name: String::new(),
        slug: String::new(),
        description: String::new(),
        website: None,
        phone: None,
        email: None,
        address: String::new(),
        location: Location::point(0.0, 0.0),
        careers: Vec::new(),
        average_rating: None,
        average_cost: None,
        photo: DEFAULT_PHOTO.to_string(),
        housing: false,
        job_assistance: false,
        job_guarantee: false,
        accept_gi: false,
        user: actor.id,
        created_at: Utc::now(),
        admin_owned: actor.role == Role::Admin,
    }
}
