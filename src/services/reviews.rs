use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Review, ReviewInput, User};
use crate::error::ApiError;
use crate::services::{access, aggregate};
use crate::state::AppState;
use crate::types::{Operation, ResourceKind};
use crate::validation::apply_review;

pub struct ReviewService<'a> {
    state: &'a AppState,
}

impl<'a> ReviewService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn get(&self, id: Uuid) -> Result<Review, ApiError> {
        self.state
            .store
            .get_review(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {}", id)))
    }

    pub async fn for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, ApiError> {
        self.require_bootcamp(bootcamp_id).await?;
        Ok(self.state.store.reviews_for_bootcamp(bootcamp_id).await?)
    }

    /// One review per user per bootcamp; a second attempt is a duplicate key.
    pub async fn create(&self, actor: &User, bootcamp_id: Uuid, input: ReviewInput) -> Result<Review, ApiError> {
        access::authorize(actor, access::REVIEW_WRITERS)?;
        self.require_bootcamp(bootcamp_id).await?;

        let mut review = Review {
            id: Uuid::new_v4(),
            title: String::new(),
            text: String::new(),
            rating: 0,
            bootcamp: bootcamp_id,
            user: actor.id,
            created_at: Utc::now(),
        };
        apply_review(&mut review, &input)?;

        self.state.store.insert_review(&review).await?;
        aggregate::recompute_average_rating(self.state.store.as_ref(), bootcamp_id).await?;
        tracing::info!("User {} reviewed bootcamp {}", actor.id, bootcamp_id);
        Ok(review)
    }

    pub async fn update(&self, actor: &User, id: Uuid, input: ReviewInput) -> Result<Review, ApiError> {
        access::authorize(actor, access::REVIEW_WRITERS)?;
        let mut review = self.get(id).await?;
        access::ensure_owner(actor, review.user, ResourceKind::Review, id, Operation::Update)?;

        apply_review(&mut review, &input)?;
        if !self.state.store.update_review(&review).await? {
            return Err(ApiError::not_found(format!("No review found with the id of {}", id)));
        }
        aggregate::recompute_average_rating(self.state.store.as_ref(), review.bootcamp).await?;
        self.get(id).await
    }

    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<(), ApiError> {
        access::authorize(actor, access::REVIEW_WRITERS)?;
        let review = self.get(id).await?;
        access::ensure_owner(actor, review.user, ResourceKind::Review, id, Operation::Delete)?;

        self.state.store.delete_review(id).await?;
        aggregate::recompute_average_rating(self.state.store.as_ref(), review.bootcamp).await?;
        Ok(())
    }

    async fn require_bootcamp(&self, bootcamp_id: Uuid) -> Result<(), ApiError> {
        match self.state.store.get_bootcamp(bootcamp_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found(format!("No bootcamp with the id of {}", bootcamp_id))),
        }
    }
}
