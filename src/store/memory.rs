//! Process-local store used by the test suite and `serve --memory`.
//!
//! Constraint checks run under the write lock, so the uniqueness and
//! one-bootcamp-per-publisher rules hold under concurrent requests exactly
//! as the PostgreSQL indexes do.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BootcampStore, CourseStore, Page, ReviewStore, Store, StoreError, UserStore};
use crate::config::TotalCount;
use crate::database::models::{Bootcamp, Course, Review, User};
use crate::filter::filter_match::{compare_documents, matches_all};
use crate::filter::{ListQuery, ResourceSchema, BOOTCAMPS, COURSES, REVIEWS};
use crate::geo;

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    bootcamps: HashMap<Uuid, Bootcamp>,
    courses: HashMap<Uuid, Course>,
    reviews: HashMap<Uuid, Review>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_doc<T: Serialize>(item: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Filters, sorts and slices a collection the way the SQL backend would.
fn paginate<'a, T, I>(
    schema: &ResourceSchema,
    items: I,
    query: &ListQuery,
    total: TotalCount,
) -> Result<Page<T>, StoreError>
where
    T: Serialize + Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut collection_size = 0u64;
    let mut matched = Vec::new();
    for item in items {
        collection_size += 1;
        let doc = to_doc(item)?;
        if matches_all(&doc, &query.conditions) {
            matched.push((doc, item));
        }
    }
    matched.sort_by(|a, b| compare_documents(schema, &a.0, &b.0, &query.order));

    let total = match total {
        TotalCount::Filtered => matched.len() as u64,
        TotalCount::Collection => collection_size,
    };
    let items = matched
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit as usize)
        .map(|(_, item)| item.clone())
        .collect();

    Ok(Page { items, total })
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, Uuid)) {
    items.sort_by(|a, b| {
        let (ta, ia) = key(a);
        let (tb, ib) = key(b);
        tb.cmp(&ta).then(ia.cmp(&ib))
    });
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

#[async_trait]
impl BootcampStore for MemoryStore {
    async fn list_bootcamps(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Bootcamp>, StoreError> {
        let data = self.inner.read().await;
        paginate(&BOOTCAMPS, data.bootcamps.values(), query, total)
    }

    async fn get_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        Ok(self.inner.read().await.bootcamps.get(&id).cloned())
    }

    async fn get_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError> {
        let data = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| data.bootcamps.get(id).cloned()).collect())
    }

    async fn insert_bootcamp(&self, bootcamp: &Bootcamp) -> Result<(), StoreError> {
        let mut data = self.inner.write().await;
        if !data.users.contains_key(&bootcamp.user) {
            return Err(StoreError::MissingReference("user".into()));
        }
        if data.bootcamps.values().any(|b| b.name == bootcamp.name) {
            return Err(StoreError::Duplicate("bootcamps_name_key".into()));
        }
        if !bootcamp.admin_owned
            && data.bootcamps.values().any(|b| b.user == bootcamp.user && !b.admin_owned)
        {
            return Err(StoreError::OwnerLimit(bootcamp.user));
        }
        data.bootcamps.insert(bootcamp.id, bootcamp.clone());
        Ok(())
    }

    async fn update_bootcamp(&self, bootcamp: &Bootcamp) -> Result<bool, StoreError> {
        let mut data = self.inner.write().await;
        if data.bootcamps.values().any(|b| b.id != bootcamp.id && b.name == bootcamp.name) {
            return Err(StoreError::Duplicate("bootcamps_name_key".into()));
        }
        let Some(stored) = data.bootcamps.get_mut(&bootcamp.id) else {
            return Ok(false);
        };
        stored.name = bootcamp.name.clone();
        stored.slug = bootcamp.slug.clone();
        stored.description = bootcamp.description.clone();
        stored.website = bootcamp.website.clone();
        stored.phone = bootcamp.phone.clone();
        stored.email = bootcamp.email.clone();
        stored.careers = bootcamp.careers.clone();
        stored.housing = bootcamp.housing;
        stored.job_assistance = bootcamp.job_assistance;
        stored.job_guarantee = bootcamp.job_guarantee;
        stored.accept_gi = bootcamp.accept_gi;
        Ok(true)
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut data = self.inner.write().await;
        let removed = data.bootcamps.remove(&id).is_some();
        // Mirrors the ON DELETE CASCADE foreign keys
        data.courses.retain(|_, c| c.bootcamp != id);
        data.reviews.retain(|_, r| r.bootcamp != id);
        Ok(removed)
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<bool, StoreError> {
        let mut data = self.inner.write().await;
        Ok(match data.bootcamps.get_mut(&id) {
            Some(b) => {
                b.photo = photo.to_string();
                true
            }
            None => false,
        })
    }

    async fn set_average_cost(&self, id: Uuid, average_cost: Option<i32>) -> Result<(), StoreError> {
        if let Some(b) = self.inner.write().await.bootcamps.get_mut(&id) {
            b.average_cost = average_cost;
        }
        Ok(())
    }

    async fn set_average_rating(&self, id: Uuid, average_rating: Option<f64>) -> Result<(), StoreError> {
        if let Some(b) = self.inner.write().await.bootcamps.get_mut(&id) {
            b.average_rating = average_rating;
        }
        Ok(())
    }

    async fn bootcamps_within(&self, longitude: f64, latitude: f64, radius: f64) -> Result<Vec<Bootcamp>, StoreError> {
        let data = self.inner.read().await;
        let mut found: Vec<Bootcamp> = data
            .bootcamps
            .values()
            .filter(|b| {
                geo::angular_distance(longitude, latitude, b.location.longitude(), b.location.latitude()) <= radius
            })
            .cloned()
            .collect();
        newest_first(&mut found, |b| (b.created_at, b.id));
        Ok(found)
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn list_courses(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Course>, StoreError> {
        let data = self.inner.read().await;
        paginate(&COURSES, data.courses.values(), query, total)
    }

    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        let data = self.inner.read().await;
        let mut found: Vec<Course> = data
            .courses
            .values()
            .filter(|c| bootcamp_ids.contains(&c.bootcamp))
            .cloned()
            .collect();
        newest_first(&mut found, |c| (c.created_at, c.id));
        Ok(found)
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.inner.read().await.courses.get(&id).cloned())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut data = self.inner.write().await;
        if !data.bootcamps.contains_key(&course.bootcamp) {
            return Err(StoreError::MissingReference("bootcamp".into()));
        }
        if !data.users.contains_key(&course.user) {
            return Err(StoreError::MissingReference("user".into()));
        }
        data.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<bool, StoreError> {
        let mut data = self.inner.write().await;
        let Some(stored) = data.courses.get_mut(&course.id) else {
            return Ok(false);
        };
        stored.title = course.title.clone();
        stored.description = course.description.clone();
        stored.weeks = course.weeks.clone();
        stored.tuition = course.tuition;
        stored.minimum_skill = course.minimum_skill;
        stored.scholarship_available = course.scholarship_available;
        Ok(true)
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.courses.remove(&id).is_some())
    }

    async fn delete_courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let mut data = self.inner.write().await;
        let before = data.courses.len();
        data.courses.retain(|_, c| c.bootcamp != bootcamp_id);
        Ok((before - data.courses.len()) as u64)
    }

    async fn average_tuition(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let data = self.inner.read().await;
        Ok(mean(
            data.courses
                .values()
                .filter(|c| c.bootcamp == bootcamp_id)
                .map(|c| c.tuition),
        ))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn list_reviews(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Review>, StoreError> {
        let data = self.inner.read().await;
        paginate(&REVIEWS, data.reviews.values(), query, total)
    }

    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let data = self.inner.read().await;
        let mut found: Vec<Review> = data
            .reviews
            .values()
            .filter(|r| r.bootcamp == bootcamp_id)
            .cloned()
            .collect();
        newest_first(&mut found, |r| (r.created_at, r.id));
        Ok(found)
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.inner.read().await.reviews.get(&id).cloned())
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut data = self.inner.write().await;
        if !data.bootcamps.contains_key(&review.bootcamp) {
            return Err(StoreError::MissingReference("bootcamp".into()));
        }
        if !data.users.contains_key(&review.user) {
            return Err(StoreError::MissingReference("user".into()));
        }
        if data
            .reviews
            .values()
            .any(|r| r.bootcamp == review.bootcamp && r.user == review.user)
        {
            return Err(StoreError::Duplicate("reviews_bootcamp_user_key".into()));
        }
        data.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn update_review(&self, review: &Review) -> Result<bool, StoreError> {
        let mut data = self.inner.write().await;
        let Some(stored) = data.reviews.get_mut(&review.id) else {
            return Ok(false);
        };
        stored.title = review.title.clone();
        stored.text = review.text.clone();
        stored.rating = review.rating;
        Ok(true)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.reviews.remove(&id).is_some())
    }

    async fn delete_reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let mut data = self.inner.write().await;
        let before = data.reviews.len();
        data.reviews.retain(|_, r| r.bootcamp != bootcamp_id);
        Ok((before - data.reviews.len()) as u64)
    }

    async fn average_rating(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let data = self.inner.read().await;
        Ok(mean(
            data.reviews
                .values()
                .filter(|r| r.bootcamp == bootcamp_id)
                .map(|r| f64::from(r.rating)),
        ))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut data = self.inner.write().await;
        if data.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        data.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let data = self.inner.read().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, StoreError> {
        let now = Utc::now();
        let data = self.inner.read().await;
        Ok(data
            .users
            .values()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token_hash)
                    && u.reset_password_expire.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut data = self.inner.write().await;
        if data.users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        let Some(stored) = data.users.get_mut(&user.id) else {
            return Ok(false);
        };
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.role = user.role;
        stored.password_hash = user.password_hash.clone();
        stored.reset_password_token = user.reset_password_token.clone();
        stored.reset_password_expire = user.reset_password_expire;
        Ok(true)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        *self.inner.write().await = Collections::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Career, Location, MinimumSkill};
    use crate::types::Role;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: email.into(),
            role: Role::Publisher,
            password_hash: "x".into(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }

    fn bootcamp(name: &str, owner: Uuid, admin_owned: bool) -> Bootcamp {
        Bootcamp {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: name.to_lowercase(),
            description: "d".into(),
            website: None,
            phone: None,
            email: None,
            address: "a".into(),
            location: Location::point(-71.1, 42.3),
            careers: vec![Career::Other],
            average_rating: None,
            average_cost: None,
            photo: "no-photo.jpg".into(),
            housing: false,
            job_assistance: false,
            job_guarantee: false,
            accept_gi: false,
            user: owner,
            created_at: Utc::now(),
            admin_owned,
        }
    }

    fn course(bootcamp: &Bootcamp, tuition: f64) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: "c".into(),
            description: "d".into(),
            weeks: "4".into(),
            tuition,
            minimum_skill: MinimumSkill::Beginner,
            scholarship_available: false,
            bootcamp: bootcamp.id,
            user: bootcamp.user,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn enforces_one_bootcamp_per_publisher() {
        let store = MemoryStore::new();
        let owner = user("p@example.com");
        store.insert_user(&owner).await.unwrap();

        store.insert_bootcamp(&bootcamp("One", owner.id, false)).await.unwrap();
        let err = store.insert_bootcamp(&bootcamp("Two", owner.id, false)).await.unwrap_err();
        assert!(matches!(err, StoreError::OwnerLimit(id) if id == owner.id));

        // Admin-owned rows sit outside the limit
        store.insert_bootcamp(&bootcamp("Three", owner.id, true)).await.unwrap();
    }

    #[tokio::test]
    async fn enforces_unique_names_and_emails() {
        let store = MemoryStore::new();
        let a = user("a@example.com");
        let b = user("b@example.com");
        store.insert_user(&a).await.unwrap();
        store.insert_user(&b).await.unwrap();
        assert!(matches!(store.insert_user(&user("a@example.com")).await, Err(StoreError::Duplicate(_))));

        store.insert_bootcamp(&bootcamp("Same", a.id, false)).await.unwrap();
        assert!(matches!(
            store.insert_bootcamp(&bootcamp("Same", b.id, false)).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn average_tuition_and_cascade() {
        let store = MemoryStore::new();
        let owner = user("o@example.com");
        store.insert_user(&owner).await.unwrap();
        let camp = bootcamp("Camp", owner.id, false);
        store.insert_bootcamp(&camp).await.unwrap();
        assert_eq!(store.average_tuition(camp.id).await.unwrap(), None);

        for t in [100.0, 250.0, 400.0] {
            store.insert_course(&course(&camp, t)).await.unwrap();
        }
        assert_eq!(store.average_tuition(camp.id).await.unwrap(), Some(250.0));

        assert_eq!(store.delete_courses_for_bootcamp(camp.id).await.unwrap(), 3);
        assert!(store.courses_for_bootcamps(&[camp.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn course_requires_existing_bootcamp() {
        let store = MemoryStore::new();
        let owner = user("o@example.com");
        store.insert_user(&owner).await.unwrap();
        let ghost = bootcamp("Ghost", owner.id, false);
        let err = store.insert_course(&course(&ghost, 10.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }
}
