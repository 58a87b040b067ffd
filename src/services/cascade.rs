//! Cascade Maintainer: removes a bootcamp together with everything that references it.

use uuid::Uuid;

use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeReport {
    pub courses: u64,
    pub reviews: u64,
    pub bootcamp: bool,
}

/// Dependents go first so no course or review outlives its bootcamp, even
/// if the final delete fails.
pub async fn delete_bootcamp(store: &dyn Store, bootcamp_id: Uuid) -> Result<CascadeReport, StoreError> {
    let courses = store.delete_courses_for_bootcamp(bootcamp_id).await?;
    let reviews = store.delete_reviews_for_bootcamp(bootcamp_id).await?;
    let bootcamp = store.delete_bootcamp(bootcamp_id).await?;

    tracing::info!(
        "Deleted bootcamp {} with {} courses and {} reviews",
        bootcamp_id,
        courses,
        reviews
    );
    Ok(CascadeReport { courses, reviews, bootcamp })
}
