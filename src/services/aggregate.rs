//! Aggregate Maintainer: derived bootcamp fields recomputed from their children.
//!
//! Every trigger recomputes from the full set of sibling records; no running
//! totals are kept.

use uuid::Uuid;

use crate::store::{Store, StoreError};

/// Mean tuition rounded up to the next multiple of ten.
pub fn round_cost(average_tuition: f64) -> i32 {
    ((average_tuition / 10.0).ceil() * 10.0) as i32
}

/// Mean rating rounded to one decimal place.
pub fn round_rating(average_rating: f64) -> f64 {
    (average_rating * 10.0).round() / 10.0
}

/// Recomputes `averageCost`. A bootcamp without courses gets `null`.
pub async fn recompute_average_cost(store: &dyn Store, bootcamp_id: Uuid) -> Result<Option<i32>, StoreError> {
    let average_cost = store.average_tuition(bootcamp_id).await?.map(round_cost);
    store.set_average_cost(bootcamp_id, average_cost).await?;
    tracing::debug!("Bootcamp {} averageCost -> {:?}", bootcamp_id, average_cost);
    Ok(average_cost)
}

/// Recomputes `averageRating`. A bootcamp without reviews gets `null`.
pub async fn recompute_average_rating(store: &dyn Store, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
    let average_rating = store.average_rating(bootcamp_id).await?.map(round_rating);
    store.set_average_rating(bootcamp_id, average_rating).await?;
    tracing::debug!("Bootcamp {} averageRating -> {:?}", bootcamp_id, average_rating);
    Ok(average_rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_rounds_up_to_tens() {
        assert_eq!(round_cost(250.0), 250);
        assert_eq!(round_cost(175.0), 180);
        assert_eq!(round_cost(9_000.01), 9_010);
        assert_eq!(round_cost(0.0), 0);
    }

    #[test]
    fn rating_keeps_one_decimal() {
        assert_eq!(round_rating(7.0), 7.0);
        assert_eq!(round_rating(22.0 / 3.0), 7.3);
        assert_eq!(round_rating(8.25), 8.3);
    }
}
