use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Course, CourseInput, MinimumSkill, User};
use crate::error::ApiError;
use crate::services::{access, aggregate};
use crate::state::AppState;
use crate::types::{Operation, ResourceKind};
use crate::validation::apply_course;

pub struct CourseService<'a> {
    state: &'a AppState,
}

impl<'a> CourseService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn get(&self, id: Uuid) -> Result<Course, ApiError> {
        self.state
            .store
            .get_course(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No course with the id of {}", id)))
    }

    /// Every course of one bootcamp, unpaginated.
    pub async fn for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Course>, ApiError> {
        self.require_bootcamp(bootcamp_id).await?;
        Ok(self.state.store.courses_for_bootcamps(&[bootcamp_id]).await?)
    }

    pub async fn create(&self, actor: &User, bootcamp_id: Uuid, input: CourseInput) -> Result<Course, ApiError> {
        access::authorize(actor, access::COURSE_WRITERS)?;
        let bootcamp_owner = self.require_bootcamp(bootcamp_id).await?;
        access::ensure_owner(actor, bootcamp_owner, ResourceKind::Bootcamp, bootcamp_id, Operation::AddCourse)?;

        let mut course = Course {
            id: Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            weeks: String::new(),
            tuition: 0.0,
            minimum_skill: MinimumSkill::Beginner,
            scholarship_available: false,
            bootcamp: bootcamp_id,
            user: actor.id,
            created_at: Utc::now(),
        };
        apply_course(&mut course, &input, true)?;

        self.state.store.insert_course(&course).await?;
        aggregate::recompute_average_cost(self.state.store.as_ref(), bootcamp_id).await?;
        tracing::info!("User {} added course {} to bootcamp {}", actor.id, course.id, bootcamp_id);
        Ok(course)
    }

    pub async fn update(&self, actor: &User, id: Uuid, input: CourseInput) -> Result<Course, ApiError> {
        access::authorize(actor, access::COURSE_WRITERS)?;
        let mut course = self.get(id).await?;
        access::ensure_owner(actor, course.user, ResourceKind::Course, id, Operation::Update)?;

        apply_course(&mut course, &input, false)?;
        if !self.state.store.update_course(&course).await? {
            return Err(ApiError::not_found(format!("No course with the id of {}", id)));
        }
        aggregate::recompute_average_cost(self.state.store.as_ref(), course.bootcamp).await?;
        self.get(id).await
    }

    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<(), ApiError> {
        access::authorize(actor, access::COURSE_WRITERS)?;
        let course = self.get(id).await?;
        access::ensure_owner(actor, course.user, ResourceKind::Course, id, Operation::Delete)?;

        self.state.store.delete_course(id).await?;
        aggregate::recompute_average_cost(self.state.store.as_ref(), course.bootcamp).await?;
        Ok(())
    }

    /// Returns the owning user of the bootcamp.
    async fn require_bootcamp(&self, bootcamp_id: Uuid) -> Result<Uuid, ApiError> {
        self.state
            .store
            .get_bootcamp(bootcamp_id)
            .await?
            .map(|b| b.user)
            .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", bootcamp_id)))
    }
}
