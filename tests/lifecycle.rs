//! End-to-end engine tests driving the services directly over the
//! in-memory store with a controllable clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use khidma_server::models::{
    EventKind, OfferStatus, Provider, ProviderOffer, RequestStatus, Seeker,
};
use khidma_server::services::clock::{Clock, IdSource, UuidSource};
use khidma_server::services::error::EngineError;
use khidma_server::services::events::RecordingSink;
use khidma_server::services::matching::{MatchCriteria, MatchPolicy, MatchingService};
use khidma_server::services::rating::RatingService;
use khidma_server::services::request::{LifecyclePolicy, NewRequest, RequestService};
use khidma_server::store::{MemStore, RetryPolicy, Store};

struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    fn starting_at(t: DateTime<Utc>) -> Arc<Self> {
        Arc::new(FixedClock(Mutex::new(t)))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

struct Harness {
    store: Arc<MemStore>,
    clock: Arc<FixedClock>,
    events: Arc<RecordingSink>,
    lifecycle: RequestService<MemStore>,
    matching: MatchingService<MemStore>,
    ratings: RatingService<MemStore>,
}

fn harness() -> Harness {
    harness_with(LifecyclePolicy::default())
}

fn harness_with(policy: LifecyclePolicy) -> Harness {
    let store = Arc::new(MemStore::default());
    let clock = FixedClock::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    let ids: Arc<dyn IdSource> = Arc::new(UuidSource);
    let events = Arc::new(RecordingSink::new());

    let lifecycle = RequestService::new(
        store.clone(),
        clock.clone(),
        ids.clone(),
        events.clone(),
        policy,
    );
    let matching = MatchingService::new(store.clone(), MatchPolicy::default());
    let ratings = RatingService::new(store.clone(), clock.clone(), ids, RetryPolicy::default());

    Harness { store, clock, events, lifecycle, matching, ratings }
}

// One degree of latitude is roughly 111.19 km; used to place providers at
// known distances from a search point.
const DEG_PER_KM: f64 = 1.0 / 111.194_926;

fn seed_seeker(h: &Harness, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = h.clock.now();
    h.store
        .with_txn(|t| {
            t.insert_seeker(Seeker {
                id,
                user_id: Uuid::new_v4(),
                full_name: name.to_string(),
                phone: "0611111111".to_string(),
                latitude: Some(31.79),
                longitude: Some(-7.09),
                address: None,
                created_at: now,
                updated_at: now,
            });
            Ok(())
        })
        .unwrap();
    id
}

fn seed_provider(h: &Harness, name: &str, lat: f64, lon: f64, rating: f64) -> Uuid {
    let id = Uuid::new_v4();
    let now = h.clock.now();
    h.store
        .with_txn(|t| {
            t.insert_provider(Provider {
                id,
                user_id: Uuid::new_v4(),
                full_name: name.to_string(),
                phone: "0622222222".to_string(),
                bio: None,
                skills: vec!["plumbing".to_string()],
                experience_years: Some(5),
                latitude: Some(lat),
                longitude: Some(lon),
                availability: true,
                rating,
                total_reviews: 0,
                total_jobs: 0,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            });
            Ok(())
        })
        .unwrap();
    id
}

fn plumbing_request(provider_ids: Vec<Uuid>) -> NewRequest {
    NewRequest {
        service_type: "plumbing".to_string(),
        description: Some("Leaking kitchen sink".to_string()),
        latitude: 31.79,
        longitude: -7.09,
        preferred_time: None,
        provider_ids,
    }
}

fn request_status(h: &Harness, request_id: Uuid) -> RequestStatus {
    h.store.read(|t| Ok(t.request(request_id).unwrap().status)).unwrap()
}

fn offer(h: &Harness, request_id: Uuid, provider_id: Uuid) -> ProviderOffer {
    h.store.read(|t| Ok(t.offer(request_id, provider_id).unwrap().clone())).unwrap()
}

fn provider_row(h: &Harness, provider_id: Uuid) -> Provider {
    h.store.read(|t| Ok(t.provider(provider_id).unwrap().clone())).unwrap()
}

#[tokio::test]
async fn end_to_end_plumbing_scenario() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    // P1 is ~3 km away with rating 4.8, P2 ~4.5 km away with rating 4.9.
    let p1 = seed_provider(&h, "P1", 31.79 + 3.0 * DEG_PER_KM, -7.09, 4.8);
    let p2 = seed_provider(&h, "P2", 31.79 + 4.5 * DEG_PER_KM, -7.09, 4.9);
    // Out of radius, must never match.
    seed_provider(&h, "P3", 31.79 + 8.0 * DEG_PER_KM, -7.09, 5.0);

    let candidates = h
        .matching
        .find_candidates(&MatchCriteria {
            service_type: "plumbing".to_string(),
            latitude: 31.79,
            longitude: -7.09,
            radius_km: 5.0,
            max_results: 10,
        })
        .unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, p1.to_string());
    assert_eq!(candidates[1].id, p2.to_string());
    assert!((candidates[0].distance_km - 3.0).abs() < 0.05);
    assert!((candidates[1].distance_km - 4.5).abs() < 0.05);

    let request_id =
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1, p2])).await.unwrap();
    assert_eq!(request_status(&h, request_id), RequestStatus::Pending);

    // P1 accepts; P2's offer is declined in the same transaction.
    h.lifecycle.accept_offer(p1, request_id).await.unwrap();
    assert_eq!(request_status(&h, request_id), RequestStatus::InProgress);
    assert_eq!(offer(&h, request_id, p1).status, OfferStatus::Accepted);
    assert_eq!(offer(&h, request_id, p2).status, OfferStatus::Declined);
    assert!(offer(&h, request_id, p2).responded_at.is_some());

    let detail = h.lifecycle.get_request_detail(request_id).unwrap();
    assert_eq!(detail.provider_id, Some(p1.to_string()));
    assert_eq!(detail.provider_name.as_deref(), Some("P1"));

    h.lifecycle.complete_request(p1, request_id).await.unwrap();
    assert_eq!(request_status(&h, request_id), RequestStatus::Done);
    assert_eq!(provider_row(&h, p1).total_jobs, 1);

    let rating = h
        .ratings
        .create_rating(seeker, request_id, 5, Some("Great job".to_string()))
        .await
        .unwrap();
    assert_eq!(rating.score, 5);
    assert_eq!(rating.comment.as_deref(), Some("Great job"));

    let p1_row = provider_row(&h, p1);
    assert_eq!(p1_row.rating, 5.0);
    assert_eq!(p1_row.total_reviews, 1);

    let second = h.ratings.create_rating(seeker, request_id, 4, None).await;
    assert_eq!(second, Err(EngineError::AlreadyRated));

    let kinds: Vec<EventKind> = h.events.snapshot().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::OfferCreated,
            EventKind::OfferCreated,
            EventKind::OfferAccepted,
            EventKind::OfferDeclined,
            EventKind::RequestCompleted,
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_have_exactly_one_winner() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);
    let p2 = seed_provider(&h, "P2", 31.82, -7.09, 4.9);

    let request_id =
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1, p2])).await.unwrap();

    let a = tokio::spawn({
        let lifecycle = h.lifecycle.clone();
        async move { lifecycle.accept_offer(p1, request_id).await }
    });
    let b = tokio::spawn({
        let lifecycle = h.lifecycle.clone();
        async move { lifecycle.accept_offer(p2, request_id).await }
    });
    let (ra, rb) = (a.await.unwrap(), b.await.unwrap());

    assert!(
        ra.is_ok() != rb.is_ok(),
        "exactly one accept must win, got {ra:?} and {rb:?}"
    );
    let (winner, loser_result) = if ra.is_ok() { (p1, rb) } else { (p2, ra) };
    let loser = if winner == p1 { p2 } else { p1 };

    assert_eq!(loser_result, Err(EngineError::AlreadyAssigned));
    assert_eq!(request_status(&h, request_id), RequestStatus::InProgress);
    assert_eq!(offer(&h, request_id, winner).status, OfferStatus::Accepted);
    assert_eq!(offer(&h, request_id, loser).status, OfferStatus::Declined);

    let assigned = h
        .store
        .read(|t| Ok(t.request(request_id).unwrap().provider_id))
        .unwrap();
    assert_eq!(assigned, Some(winner));
}

#[tokio::test]
async fn decline_leaves_request_open_for_others() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);
    let p2 = seed_provider(&h, "P2", 31.82, -7.09, 4.9);

    let request_id =
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1, p2])).await.unwrap();

    h.lifecycle.decline_offer(p1, request_id).await.unwrap();
    assert_eq!(offer(&h, request_id, p1).status, OfferStatus::Declined);
    assert_eq!(request_status(&h, request_id), RequestStatus::Pending);

    // A declined provider cannot change their mind.
    assert_eq!(
        h.lifecycle.accept_offer(p1, request_id).await,
        Err(EngineError::OfferNotPending)
    );

    // The other candidate can still take the job.
    h.lifecycle.accept_offer(p2, request_id).await.unwrap();
    assert_eq!(request_status(&h, request_id), RequestStatus::InProgress);
}

#[tokio::test]
async fn create_request_validation() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);

    // Unknown seeker.
    assert_eq!(
        h.lifecycle.create_request(Uuid::new_v4(), plumbing_request(vec![p1])).await,
        Err(EngineError::InvalidSeeker)
    );

    // Unknown candidate provider.
    assert_eq!(
        h.lifecycle.create_request(seeker, plumbing_request(vec![Uuid::new_v4()])).await,
        Err(EngineError::ProviderUnavailable)
    );

    let first = h.lifecycle.create_request(seeker, plumbing_request(vec![p1])).await;
    assert!(first.is_ok());

    // Same seeker, same service type, still active.
    assert_eq!(
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1])).await,
        Err(EngineError::DuplicateActiveRequest)
    );

    // A different service type is fine.
    let mut other = plumbing_request(vec![]);
    other.service_type = "electrical".to_string();
    assert!(h.lifecycle.create_request(seeker, other).await.is_ok());
}

#[tokio::test]
async fn complete_requires_assigned_provider_and_state() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);
    let p2 = seed_provider(&h, "P2", 31.82, -7.09, 4.9);

    let request_id =
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1, p2])).await.unwrap();

    // Not in progress yet.
    assert_eq!(
        h.lifecycle.complete_request(p1, request_id).await,
        Err(EngineError::InvalidState)
    );

    h.lifecycle.accept_offer(p1, request_id).await.unwrap();

    // Wrong provider.
    assert_eq!(
        h.lifecycle.complete_request(p2, request_id).await,
        Err(EngineError::NotAssignedProvider)
    );

    h.lifecycle.complete_request(p1, request_id).await.unwrap();
    assert_eq!(request_status(&h, request_id), RequestStatus::Done);

    // Terminal state, cannot complete twice.
    assert_eq!(
        h.lifecycle.complete_request(p1, request_id).await,
        Err(EngineError::InvalidState)
    );
}

#[tokio::test]
async fn cancel_ownership_and_policy() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let stranger = seed_seeker(&h, "Nadia");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);

    let request_id =
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1])).await.unwrap();

    assert_eq!(
        h.lifecycle.cancel_request(stranger, request_id).await,
        Err(EngineError::NotOwner)
    );

    h.lifecycle.accept_offer(p1, request_id).await.unwrap();

    // Default policy permits cancelling an in-progress request.
    h.lifecycle.cancel_request(seeker, request_id).await.unwrap();
    assert_eq!(request_status(&h, request_id), RequestStatus::Cancelled);

    // With the policy knob off, in-progress cancellation is rejected.
    let strict = harness_with(LifecyclePolicy {
        allow_cancel_in_progress: false,
        ..LifecyclePolicy::default()
    });
    let seeker2 = seed_seeker(&strict, "Sara");
    let p = seed_provider(&strict, "P", 31.81, -7.09, 4.8);
    let req2 = strict.lifecycle.create_request(seeker2, plumbing_request(vec![p])).await.unwrap();
    strict.lifecycle.accept_offer(p, req2).await.unwrap();
    assert_eq!(
        strict.lifecycle.cancel_request(seeker2, req2).await,
        Err(EngineError::InvalidState)
    );
}

#[tokio::test]
async fn expiry_sweep_is_idempotent_with_strict_threshold() {
    let h = harness();
    let seeker_a = seed_seeker(&h, "Sara");
    let seeker_b = seed_seeker(&h, "Nadia");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);

    let old_request =
        h.lifecycle.create_request(seeker_a, plumbing_request(vec![p1])).await.unwrap();

    // Exactly at the 24h threshold: age is not strictly greater, so the
    // request must survive the sweep.
    h.clock.advance(Duration::hours(24));
    assert_eq!(h.lifecycle.expire_stale().await.unwrap(), 0);
    assert_eq!(request_status(&h, old_request), RequestStatus::Pending);

    // Past the threshold; a younger request from another seeker stays.
    h.clock.advance(Duration::seconds(1));
    let fresh_request =
        h.lifecycle.create_request(seeker_b, plumbing_request(vec![])).await.unwrap();

    assert_eq!(h.lifecycle.expire_stale().await.unwrap(), 1);
    assert_eq!(request_status(&h, old_request), RequestStatus::Expired);
    assert_eq!(request_status(&h, fresh_request), RequestStatus::Pending);
    let expired_offer = offer(&h, old_request, p1);
    assert_eq!(expired_offer.status, OfferStatus::Expired);
    assert!(expired_offer.responded_at.is_some());

    // Second run over unchanged state does nothing.
    assert_eq!(h.lifecycle.expire_stale().await.unwrap(), 0);
    assert_eq!(request_status(&h, old_request), RequestStatus::Expired);

    // An expired request cannot be accepted.
    assert_eq!(
        h.lifecycle.accept_offer(p1, old_request).await,
        Err(EngineError::InvalidState)
    );
}

#[tokio::test]
async fn rating_preconditions_and_average() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 0.0);

    let scores = [4, 5, 3];
    let mut request_ids = Vec::new();

    for score in scores {
        let request_id =
            h.lifecycle.create_request(seeker, plumbing_request(vec![p1])).await.unwrap();
        h.lifecycle.accept_offer(p1, request_id).await.unwrap();

        // Rating before completion is rejected.
        assert_eq!(
            h.ratings.create_rating(seeker, request_id, score, None).await,
            Err(EngineError::NotCompleted)
        );

        h.lifecycle.complete_request(p1, request_id).await.unwrap();
        h.ratings.create_rating(seeker, request_id, score, None).await.unwrap();
        request_ids.push(request_id);
    }

    assert_eq!(h.ratings.calculate_average_rating(p1).unwrap(), 4.0);
    let p1_row = provider_row(&h, p1);
    assert_eq!(p1_row.rating, 4.0);
    assert_eq!(p1_row.total_reviews, 3);
    assert_eq!(p1_row.total_jobs, 3);

    // Out-of-range scores and foreign requests are rejected.
    assert_eq!(
        h.ratings.create_rating(seeker, request_ids[0], 6, None).await,
        Err(EngineError::InvalidScore)
    );
    assert_eq!(
        h.ratings.create_rating(Uuid::new_v4(), request_ids[0], 4, None).await,
        Err(EngineError::InvalidRequest)
    );

    // Unrated provider averages to zero, not an error.
    assert_eq!(h.ratings.calculate_average_rating(Uuid::new_v4()).unwrap(), 0.0);

    let history = h.ratings.get_provider_ratings(p1).unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn seeker_history_and_provider_queue() {
    let h = harness();
    let seeker = seed_seeker(&h, "Sara");
    let p1 = seed_provider(&h, "P1", 31.81, -7.09, 4.8);

    let request_id =
        h.lifecycle.create_request(seeker, plumbing_request(vec![p1])).await.unwrap();
    h.lifecycle.accept_offer(p1, request_id).await.unwrap();
    h.lifecycle.complete_request(p1, request_id).await.unwrap();
    h.ratings.create_rating(seeker, request_id, 5, None).await.unwrap();

    let history = h.lifecycle.seeker_requests(seeker).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, RequestStatus::Done);
    assert!(history[0].is_rated);
    assert_eq!(history[0].provider_name.as_deref(), Some("P1"));

    let queue = h.lifecycle.provider_requests(p1, Some(RequestStatus::Done)).unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].offer_status, OfferStatus::Accepted);
    assert!(queue[0].distance_km.is_some());
    assert_eq!(queue[0].seeker_name.as_deref(), Some("Sara"));

    assert!(h.lifecycle.provider_requests(p1, Some(RequestStatus::Pending)).unwrap().is_empty());
}
