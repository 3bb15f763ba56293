//! Persistence boundary for the engine.
//!
//! `Tables` is the whole data set; `Store` is the transaction contract over
//! it. Every multi-row transition in the engine runs inside one `with_txn`
//! closure, which either commits fully or rolls back, and all conditional
//! status writes go through the compare-and-swap helpers so a check and its
//! write can never straddle two transactions. The shipped implementation is
//! [`memory::MemStore`]; a SQL-backed store would implement the same trait
//! with database transactions.

pub mod memory;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::models::{
    OfferStatus, Provider, ProviderOffer, Rating, RequestStatus, Seeker, ServiceRequest,
};
use crate::services::error::EngineError;

pub use memory::MemStore;

/// Transactional access to the data set.
pub trait Store: Send + Sync + 'static {
    /// Runs `f` as one atomic unit. On `Err` every change made by the
    /// closure is rolled back. Lock acquisition is bounded; contention past
    /// the deadline surfaces as `EngineError::StoreBusy`.
    fn with_txn<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut Tables) -> Result<R, EngineError>;

    /// Read-only snapshot access, same bounded lock acquisition.
    fn read<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&Tables) -> Result<R, EngineError>;
}

/// Bounded retry for transient store contention.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { attempts: 3, base_delay_ms: 25 }
    }
}

/// Retries `op` on `StoreBusy` with jittered backoff, up to the configured
/// attempt count. Every other outcome passes straight through.
pub async fn with_retry<R, F>(policy: &RetryPolicy, mut op: F) -> Result<R, EngineError>
where
    F: FnMut() -> Result<R, EngineError>,
{
    let mut attempt = 0u32;
    loop {
        match op() {
            Err(EngineError::StoreBusy) if attempt < policy.attempts => {
                attempt += 1;
                let backoff = policy.base_delay_ms.saturating_mul(1 << attempt.min(6));
                let jitter = rand::thread_rng().gen_range(0..policy.base_delay_ms.max(1));
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
            other => return other,
        }
    }
}

/// The full data set. Offers are keyed by (request_id, provider_id) in a
/// BTreeMap so sibling iteration is deterministic.
#[derive(Default, Clone)]
pub struct Tables {
    seekers: HashMap<Uuid, Seeker>,
    providers: HashMap<Uuid, Provider>,
    requests: HashMap<Uuid, ServiceRequest>,
    offers: BTreeMap<(Uuid, Uuid), ProviderOffer>,
    ratings: HashMap<Uuid, Rating>,
}

impl Tables {
    // ---- seekers ----

    pub fn insert_seeker(&mut self, seeker: Seeker) {
        self.seekers.insert(seeker.id, seeker);
    }

    pub fn seeker(&self, id: Uuid) -> Option<&Seeker> {
        self.seekers.get(&id)
    }

    pub fn seeker_mut(&mut self, id: Uuid) -> Option<&mut Seeker> {
        self.seekers.get_mut(&id)
    }

    pub fn seeker_by_user(&self, user_id: Uuid) -> Option<&Seeker> {
        self.seekers.values().find(|s| s.user_id == user_id)
    }

    // ---- providers ----

    pub fn insert_provider(&mut self, provider: Provider) {
        self.providers.insert(provider.id, provider);
    }

    pub fn provider(&self, id: Uuid) -> Option<&Provider> {
        self.providers.get(&id)
    }

    pub fn provider_mut(&mut self, id: Uuid) -> Option<&mut Provider> {
        self.providers.get_mut(&id)
    }

    pub fn provider_by_user(&self, user_id: Uuid) -> Option<&Provider> {
        self.providers.values().find(|p| p.user_id == user_id)
    }

    pub fn providers_iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    // ---- requests ----

    pub fn insert_request(&mut self, request: ServiceRequest) {
        self.requests.insert(request.id, request);
    }

    pub fn request(&self, id: Uuid) -> Option<&ServiceRequest> {
        self.requests.get(&id)
    }

    pub fn requests_for_seeker(&self, seeker_id: Uuid) -> Vec<&ServiceRequest> {
        self.requests.values().filter(|r| r.seeker_id == seeker_id).collect()
    }

    /// Active means Pending or InProgress; used for the duplicate-request
    /// rule on creation.
    pub fn has_active_request(&self, seeker_id: Uuid, service_type: &str) -> bool {
        self.requests.values().any(|r| {
            r.seeker_id == seeker_id && r.service_type == service_type && r.status.is_active()
        })
    }

    pub fn pending_requests_created_before(&self, cutoff: DateTime<Utc>) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending && r.created_at < cutoff)
            .map(|r| r.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn requests_in_progress_for(&self, provider_id: Uuid) -> i64 {
        self.requests
            .values()
            .filter(|r| r.provider_id == Some(provider_id) && r.status == RequestStatus::InProgress)
            .count() as i64
    }

    /// Conditional update: applies `apply` only while the request's status
    /// is one of `expect`. Returns false on a miss (unknown id or the row
    /// moved on), leaving the row untouched.
    pub fn update_request_if(
        &mut self,
        id: Uuid,
        expect: &[RequestStatus],
        apply: impl FnOnce(&mut ServiceRequest),
    ) -> bool {
        match self.requests.get_mut(&id) {
            Some(request) if expect.contains(&request.status) => {
                apply(request);
                true
            }
            _ => false,
        }
    }

    // ---- offers ----

    pub fn insert_offer(&mut self, offer: ProviderOffer) {
        self.offers.insert((offer.request_id, offer.provider_id), offer);
    }

    pub fn offer(&self, request_id: Uuid, provider_id: Uuid) -> Option<&ProviderOffer> {
        self.offers.get(&(request_id, provider_id))
    }

    pub fn offers_for_request(&self, request_id: Uuid) -> Vec<&ProviderOffer> {
        self.offers
            .range((request_id, Uuid::nil())..=(request_id, Uuid::from_u128(u128::MAX)))
            .map(|(_, offer)| offer)
            .collect()
    }

    pub fn offers_for_provider(&self, provider_id: Uuid) -> Vec<&ProviderOffer> {
        self.offers.values().filter(|o| o.provider_id == provider_id).collect()
    }

    pub fn pending_offer_providers(&self, request_id: Uuid) -> Vec<Uuid> {
        self.offers_for_request(request_id)
            .into_iter()
            .filter(|o| o.status == OfferStatus::Pending)
            .map(|o| o.provider_id)
            .collect()
    }

    pub fn pending_offer_count(&self, provider_id: Uuid) -> i64 {
        self.offers
            .values()
            .filter(|o| o.provider_id == provider_id && o.status == OfferStatus::Pending)
            .count() as i64
    }

    /// Offer counterpart of [`Tables::update_request_if`].
    pub fn update_offer_if(
        &mut self,
        request_id: Uuid,
        provider_id: Uuid,
        expect: &[OfferStatus],
        apply: impl FnOnce(&mut ProviderOffer),
    ) -> bool {
        match self.offers.get_mut(&(request_id, provider_id)) {
            Some(offer) if expect.contains(&offer.status) => {
                apply(offer);
                true
            }
            _ => false,
        }
    }

    // ---- ratings ----

    pub fn insert_rating(&mut self, rating: Rating) {
        self.ratings.insert(rating.request_id, rating);
    }

    pub fn rating_for_request(&self, request_id: Uuid) -> Option<&Rating> {
        self.ratings.get(&request_id)
    }

    pub fn ratings_for_provider(&self, provider_id: Uuid) -> Vec<&Rating> {
        self.ratings.values().filter(|r| r.provider_id == provider_id).collect()
    }
}
