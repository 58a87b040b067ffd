//! Resource Store: persistent collections of bootcamps, courses, reviews and users.
//!
//! The store enforces uniqueness and referential constraints itself
//! (unique names and emails, one review per user per bootcamp, one
//! bootcamp per non-admin publisher). Derived aggregates and cascades are
//! driven from the service layer through the primitives below.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TotalCount;
use crate::database::models::{Bootcamp, Course, Review, User};
use crate::database::DatabaseError;
use crate::filter::ListQuery;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries the constraint or field name.
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    #[error("User {0} has already published a bootcamp")]
    OwnerLimit(Uuid),

    #[error("Referenced record does not exist: {0}")]
    MissingReference(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(DatabaseError::Sqlx(err))
    }
}

/// One page of a listing plus the total used for pagination links.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait BootcampStore: Send + Sync {
    async fn list_bootcamps(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Bootcamp>, StoreError>;
    async fn get_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError>;
    async fn get_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError>;
    /// Fails with `OwnerLimit` when a non-admin owner already has a bootcamp.
    async fn insert_bootcamp(&self, bootcamp: &Bootcamp) -> Result<(), StoreError>;
    /// Replaces the client-editable fields. Location, address, owner and aggregates are untouched.
    async fn update_bootcamp(&self, bootcamp: &Bootcamp) -> Result<bool, StoreError>;
    /// Removes the bootcamp row only. Use the cascade service for full removal.
    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<bool, StoreError>;
    async fn set_average_cost(&self, id: Uuid, average_cost: Option<i32>) -> Result<(), StoreError>;
    async fn set_average_rating(&self, id: Uuid, average_rating: Option<f64>) -> Result<(), StoreError>;
    /// Bootcamps whose location lies within `radius` radians of the given point.
    async fn bootcamps_within(&self, longitude: f64, latitude: f64, radius: f64) -> Result<Vec<Bootcamp>, StoreError>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn list_courses(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Course>, StoreError>;
    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError>;
    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;
    async fn insert_course(&self, course: &Course) -> Result<(), StoreError>;
    async fn update_course(&self, course: &Course) -> Result<bool, StoreError>;
    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError>;
    /// Mean tuition over all courses of a bootcamp, `None` when it has none.
    async fn average_tuition(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn list_reviews(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Review>, StoreError>;
    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError>;
    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, StoreError>;
    async fn insert_review(&self, review: &Review) -> Result<(), StoreError>;
    async fn update_review(&self, review: &Review) -> Result<bool, StoreError>;
    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError>;
    async fn average_rating(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Looks up a user holding an unexpired reset token with the given hash.
    async fn find_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, user: &User) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait Store: BootcampStore + CourseStore + ReviewStore + UserStore {
    async fn health_check(&self) -> Result<(), StoreError>;
    /// Removes every record from every collection.
    async fn clear_all(&self) -> Result<(), StoreError>;
}
