use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{Provider, ProviderSummary};
use crate::services::error::EngineError;
use crate::services::geo;
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    /// Used when a caller passes a non-positive max result count.
    pub default_results: i64,
    /// Hard ceiling regardless of what a caller asks for.
    pub max_results: i64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy { default_results: 20, max_results: 50 }
    }
}

#[derive(Debug, Clone)]
pub struct MatchCriteria {
    pub service_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub max_results: i64,
}

/// Ranks eligible providers for a request: available, not soft-deleted,
/// holding the requested skill, with a known location inside the radius.
/// Ordering is fully deterministic so results are reproducible.
pub struct MatchingService<S: Store> {
    store: Arc<S>,
    policy: MatchPolicy,
}

impl<S: Store> MatchingService<S> {
    pub fn new(store: Arc<S>, policy: MatchPolicy) -> Self {
        MatchingService { store, policy }
    }

    pub fn find_candidates(
        &self,
        criteria: &MatchCriteria,
    ) -> Result<Vec<ProviderSummary>, EngineError> {
        let limit = self.effective_limit(criteria.max_results);

        self.store.read(|t| {
            let mut matched: Vec<(f64, &Provider)> = t
                .providers_iter()
                .filter(|p| p.availability && !p.is_deleted && p.has_skill(&criteria.service_type))
                .filter_map(|p| {
                    let (lat, lon) = p.location()?;
                    let distance =
                        geo::distance_km(criteria.latitude, criteria.longitude, lat, lon);
                    (distance <= criteria.radius_km).then_some((distance, p))
                })
                .collect();

            // Distance ascending, rating descending, id ascending.
            matched.sort_by(|(da, pa), (db, pb)| {
                da.partial_cmp(db)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| pb.rating.partial_cmp(&pa.rating).unwrap_or(Ordering::Equal))
                    .then_with(|| pa.id.cmp(&pb.id))
            });
            matched.truncate(limit);

            Ok(matched
                .into_iter()
                .map(|(distance, p)| ProviderSummary {
                    id: p.id.to_string(),
                    full_name: p.full_name.clone(),
                    phone: p.phone.clone(),
                    bio: p.bio.clone(),
                    skills: p.skills.clone(),
                    experience_years: p.experience_years,
                    rating: p.rating,
                    total_jobs: p.total_jobs,
                    distance_km: (distance * 10.0).round() / 10.0,
                })
                .collect())
        })
    }

    fn effective_limit(&self, requested: i64) -> usize {
        let capped = if requested <= 0 {
            self.policy.default_results
        } else {
            requested.min(self.policy.max_results)
        };
        capped.max(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::store::MemStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn provider(id: u128, lat: f64, lon: f64, rating: f64, skills: &[&str]) -> Provider {
        let now = Utc::now();
        Provider {
            id: Uuid::from_u128(id),
            user_id: Uuid::new_v4(),
            full_name: format!("provider-{id}"),
            phone: "0600000000".to_string(),
            bio: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: Some(3),
            latitude: Some(lat),
            longitude: Some(lon),
            availability: true,
            rating,
            total_reviews: 0,
            total_jobs: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn service_with(providers: Vec<Provider>) -> MatchingService<MemStore> {
        let store = Arc::new(MemStore::default());
        store
            .with_txn(|t| {
                for p in providers {
                    t.insert_provider(p);
                }
                Ok(())
            })
            .unwrap();
        MatchingService::new(store, MatchPolicy { default_results: 2, max_results: 50 })
    }

    fn criteria(radius_km: f64, max_results: i64) -> MatchCriteria {
        MatchCriteria {
            service_type: "plumbing".to_string(),
            latitude: 31.79,
            longitude: -7.09,
            radius_km,
            max_results,
        }
    }

    // One degree of latitude is about 111.19 km.
    const DEG_PER_KM: f64 = 1.0 / 111.194_926;

    #[test]
    fn filters_skill_availability_and_radius() {
        let mut far = provider(1, 31.79 + 80.0 * DEG_PER_KM, -7.09, 4.0, &["plumbing"]);
        far.full_name = "far".to_string();
        let mut busy = provider(2, 31.79, -7.09, 4.0, &["plumbing"]);
        busy.availability = false;
        let electrician = provider(3, 31.79, -7.09, 4.0, &["electrical"]);
        let mut deleted = provider(4, 31.79, -7.09, 4.0, &["plumbing"]);
        deleted.is_deleted = true;
        let mut nowhere = provider(5, 0.0, 0.0, 4.0, &["plumbing"]);
        nowhere.latitude = None;
        nowhere.longitude = None;
        let good = provider(6, 31.79 + 2.0 * DEG_PER_KM, -7.09, 4.0, &["plumbing"]);

        let svc = service_with(vec![far, busy, electrician, deleted, nowhere, good]);
        let found = svc.find_candidates(&criteria(5.0, 10)).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Uuid::from_u128(6).to_string());
        assert!((found[0].distance_km - 2.0).abs() < 0.1);
    }

    #[test]
    fn orders_by_distance_then_rating_then_id() {
        let near_low = provider(10, 31.79 + 1.0 * DEG_PER_KM, -7.09, 3.0, &["plumbing"]);
        let far_high = provider(11, 31.79 + 3.0 * DEG_PER_KM, -7.09, 5.0, &["plumbing"]);
        // Same spot, different ratings, then same rating to force the id tie-break.
        let tied_a = provider(12, 31.79 + 2.0 * DEG_PER_KM, -7.09, 4.5, &["plumbing"]);
        let tied_b = provider(13, 31.79 + 2.0 * DEG_PER_KM, -7.09, 4.9, &["plumbing"]);
        let tied_c = provider(14, 31.79 + 2.0 * DEG_PER_KM, -7.09, 4.5, &["plumbing"]);

        let svc = service_with(vec![far_high, tied_c, tied_a, near_low, tied_b]);
        let found = svc.find_candidates(&criteria(10.0, 10)).unwrap();

        let ids: Vec<String> = found.iter().map(|p| p.id.clone()).collect();
        let expect: Vec<String> = [10u128, 13, 12, 14, 11]
            .iter()
            .map(|n| Uuid::from_u128(*n).to_string())
            .collect();
        assert_eq!(ids, expect);
    }

    #[test]
    fn non_positive_limit_uses_default_cap() {
        let providers = (20u128..26)
            .map(|n| provider(n, 31.79 + (n as f64) * 0.1 * DEG_PER_KM, -7.09, 4.0, &["plumbing"]))
            .collect();
        let svc = service_with(providers);

        // Policy default in these tests is 2.
        assert_eq!(svc.find_candidates(&criteria(50.0, 0)).unwrap().len(), 2);
        assert_eq!(svc.find_candidates(&criteria(50.0, -7)).unwrap().len(), 2);
        assert_eq!(svc.find_candidates(&criteria(50.0, 3)).unwrap().len(), 3);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let svc = service_with(vec![]);
        assert!(svc.find_candidates(&criteria(5.0, 10)).unwrap().is_empty());
    }
}
