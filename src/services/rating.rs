use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::models::{Rating, RatingResponse, RequestStatus};
use crate::services::clock::{Clock, IdSource};
use crate::services::error::EngineError;
use crate::store::{RetryPolicy, Store, Tables, with_retry};

/// Rounded arithmetic mean of a score list, one decimal. Zero when empty.
fn mean_rating(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i32 = scores.iter().sum();
    let avg = f64::from(sum) / scores.len() as f64;
    (avg * 10.0).round() / 10.0
}

/// One rating per completed request. The insert and the provider's
/// average/review-count recompute happen in the same transaction so the
/// aggregates can never drift from the rows under concurrent raters.
pub struct RatingService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    retry: RetryPolicy,
}

impl<S: Store> RatingService<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        retry: RetryPolicy,
    ) -> Self {
        RatingService { store, clock, ids, retry }
    }

    pub async fn create_rating(
        &self,
        seeker_id: Uuid,
        request_id: Uuid,
        score: i32,
        comment: Option<String>,
    ) -> Result<RatingResponse, EngineError> {
        if !(1..=5).contains(&score) {
            return Err(EngineError::InvalidScore);
        }

        let now = self.clock.now();
        let rating_id = self.ids.next_id();

        with_retry(&self.retry, || {
            self.store.with_txn(|t| {
                let request = t.request(request_id).ok_or(EngineError::InvalidRequest)?;
                if request.seeker_id != seeker_id {
                    return Err(EngineError::InvalidRequest);
                }
                if request.status != RequestStatus::Done {
                    return Err(EngineError::NotCompleted);
                }
                let provider_id = request.provider_id.ok_or(EngineError::NoAssignedProvider)?;
                if t.rating_for_request(request_id).is_some() {
                    return Err(EngineError::AlreadyRated);
                }

                t.insert_rating(Rating {
                    id: rating_id,
                    request_id,
                    provider_id,
                    seeker_id,
                    score,
                    comment: comment.clone(),
                    created_at: now,
                });

                let scores: Vec<i32> =
                    t.ratings_for_provider(provider_id).iter().map(|r| r.score).collect();
                let average = mean_rating(&scores);
                let reviews = scores.len() as i32;

                let provider = t.provider_mut(provider_id).ok_or(EngineError::NotFound)?;
                provider.rating = average;
                provider.total_reviews = reviews;
                provider.updated_at = now;
                Ok(())
            })
        })
        .await?;

        info!("request {request_id} rated {score} by seeker {seeker_id}");
        self.get_rating_for_request(request_id)?.ok_or(EngineError::NotFound)
    }

    pub fn get_rating_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<RatingResponse>, EngineError> {
        self.store.read(|t| {
            Ok(t.rating_for_request(request_id).map(|rating| Self::to_response(t, rating)))
        })
    }

    /// All ratings received by a provider, newest first.
    pub fn get_provider_ratings(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<RatingResponse>, EngineError> {
        self.store.read(|t| {
            let mut ratings = t.ratings_for_provider(provider_id);
            ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(ratings.into_iter().map(|r| Self::to_response(t, r)).collect())
        })
    }

    /// Mean score over a provider's ratings; 0.0 when there are none.
    pub fn calculate_average_rating(&self, provider_id: Uuid) -> Result<f64, EngineError> {
        self.store.read(|t| {
            let scores: Vec<i32> =
                t.ratings_for_provider(provider_id).iter().map(|r| r.score).collect();
            Ok(mean_rating(&scores))
        })
    }

    fn to_response(t: &Tables, rating: &Rating) -> RatingResponse {
        RatingResponse {
            id: rating.id.to_string(),
            request_id: rating.request_id.to_string(),
            provider_id: rating.provider_id.to_string(),
            seeker_id: rating.seeker_id.to_string(),
            score: rating.score,
            comment: rating.comment.clone(),
            created_at: rating.created_at,
            provider_name: t.provider(rating.provider_id).map(|p| p.full_name.clone()),
            seeker_name: t.seeker(rating.seeker_id).map(|s| s.full_name.clone()),
            service_type: t.request(rating.request_id).map(|r| r.service_type.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_rounds_to_one_decimal() {
        assert_eq!(mean_rating(&[]), 0.0);
        assert_eq!(mean_rating(&[4, 5, 3]), 4.0);
        assert_eq!(mean_rating(&[4, 4, 5]), 4.3);
        assert_eq!(mean_rating(&[5, 4]), 4.5);
        assert_eq!(mean_rating(&[1]), 1.0);
    }
}
