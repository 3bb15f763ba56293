use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::info;
use uuid::Uuid;

use crate::models::{
    DomainEvent, EventKind, OfferStatus, OfferView, ProviderOffer, ProviderRequestItem,
    RatingView, RequestDetailResponse, RequestStatus, SeekerRequestItem, ServiceRequest,
};
use crate::services::clock::{Clock, IdSource};
use crate::services::error::EngineError;
use crate::services::events::EventSink;
use crate::services::geo;
use crate::store::{RetryPolicy, Store, with_retry};

#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    /// Pending requests older than this are swept to Expired.
    pub expiry_threshold: Duration,
    /// Whether a seeker may cancel after a provider accepted.
    pub allow_cancel_in_progress: bool,
    pub retry: RetryPolicy,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        LifecyclePolicy {
            expiry_threshold: Duration::hours(24),
            allow_cancel_in_progress: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Engine-level request creation input; the HTTP layer parses ids before
/// handing over.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub service_type: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub preferred_time: Option<DateTime<Utc>>,
    pub provider_ids: Vec<Uuid>,
}

/// The request state machine. Every transition runs as one store
/// transaction with its preconditions re-checked inside, so concurrent
/// callers serialize on the store and exactly one side of a race wins.
pub struct RequestService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    events: Arc<dyn EventSink>,
    policy: LifecyclePolicy,
}

impl<S: Store> Clone for RequestService<S> {
    fn clone(&self) -> Self {
        RequestService {
            store: self.store.clone(),
            clock: self.clock.clone(),
            ids: self.ids.clone(),
            events: self.events.clone(),
            policy: self.policy,
        }
    }
}

impl<S: Store> RequestService<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        events: Arc<dyn EventSink>,
        policy: LifecyclePolicy,
    ) -> Self {
        RequestService { store, clock, ids, events, policy }
    }

    pub async fn create_request(
        &self,
        seeker_id: Uuid,
        new: NewRequest,
    ) -> Result<Uuid, EngineError> {
        let now = self.clock.now();
        let request_id = self.ids.next_id();

        let mut candidates = new.provider_ids.clone();
        candidates.sort();
        candidates.dedup();

        let events = with_retry(&self.policy.retry, || {
            self.store.with_txn(|t| {
                if t.seeker(seeker_id).is_none() {
                    return Err(EngineError::InvalidSeeker);
                }
                if t.has_active_request(seeker_id, &new.service_type) {
                    return Err(EngineError::DuplicateActiveRequest);
                }
                for provider_id in &candidates {
                    match t.provider(*provider_id) {
                        Some(p) if p.availability && !p.is_deleted => {}
                        _ => return Err(EngineError::ProviderUnavailable),
                    }
                }

                t.insert_request(ServiceRequest {
                    id: request_id,
                    seeker_id,
                    service_type: new.service_type.clone(),
                    description: new.description.clone(),
                    latitude: new.latitude,
                    longitude: new.longitude,
                    preferred_time: new.preferred_time.unwrap_or(now),
                    status: RequestStatus::Pending,
                    provider_id: None,
                    created_at: now,
                    updated_at: now,
                });

                let mut events = Vec::with_capacity(candidates.len());
                for provider_id in &candidates {
                    t.insert_offer(ProviderOffer {
                        request_id,
                        provider_id: *provider_id,
                        status: OfferStatus::Pending,
                        responded_at: None,
                        created_at: now,
                    });
                    events.push(DomainEvent::new(
                        request_id,
                        EventKind::OfferCreated,
                        seeker_id,
                        now,
                    ));
                }
                Ok(events)
            })
        })
        .await?;

        info!(
            "request {request_id} created for service '{}' with {} offers",
            new.service_type,
            candidates.len()
        );
        self.emit_all(events);
        Ok(request_id)
    }

    /// First-to-accept wins: the winning transaction assigns the request and
    /// declines every pending sibling offer. A losing concurrent caller
    /// finds the request already assigned and gets `AlreadyAssigned`.
    pub async fn accept_offer(
        &self,
        provider_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();

        let events = with_retry(&self.policy.retry, || {
            self.store.with_txn(|t| {
                let offer_status =
                    t.offer(request_id, provider_id).ok_or(EngineError::NotFound)?.status;
                let request = t.request(request_id).ok_or(EngineError::NotFound)?;
                let (request_status, assigned) = (request.status, request.provider_id);

                match request_status {
                    RequestStatus::Pending => {}
                    RequestStatus::InProgress => return Err(EngineError::AlreadyAssigned),
                    _ => return Err(EngineError::InvalidState),
                }
                if offer_status != OfferStatus::Pending {
                    return Err(if assigned.is_some() {
                        EngineError::AlreadyAssigned
                    } else {
                        EngineError::OfferNotPending
                    });
                }

                if !t.update_offer_if(request_id, provider_id, &[OfferStatus::Pending], |o| {
                    o.status = OfferStatus::Accepted;
                    o.responded_at = Some(now);
                }) {
                    return Err(EngineError::OfferNotPending);
                }
                if !t.update_request_if(request_id, &[RequestStatus::Pending], |r| {
                    r.status = RequestStatus::InProgress;
                    r.provider_id = Some(provider_id);
                    r.updated_at = now;
                }) {
                    return Err(EngineError::AlreadyAssigned);
                }

                let mut events =
                    vec![DomainEvent::new(request_id, EventKind::OfferAccepted, provider_id, now)];
                for sibling in t.pending_offer_providers(request_id) {
                    t.update_offer_if(request_id, sibling, &[OfferStatus::Pending], |o| {
                        o.status = OfferStatus::Declined;
                        o.responded_at = Some(now);
                    });
                    events.push(DomainEvent::new(
                        request_id,
                        EventKind::OfferDeclined,
                        provider_id,
                        now,
                    ));
                }
                Ok(events)
            })
        })
        .await?;

        info!("request {request_id} accepted by provider {provider_id}");
        self.emit_all(events);
        Ok(())
    }

    /// Declining leaves the request open for the remaining candidates.
    pub async fn decline_offer(
        &self,
        provider_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();

        with_retry(&self.policy.retry, || {
            self.store.with_txn(|t| {
                let offer = t.offer(request_id, provider_id).ok_or(EngineError::NotFound)?;
                if offer.status != OfferStatus::Pending {
                    return Err(EngineError::OfferNotPending);
                }
                t.update_offer_if(request_id, provider_id, &[OfferStatus::Pending], |o| {
                    o.status = OfferStatus::Declined;
                    o.responded_at = Some(now);
                });
                Ok(())
            })
        })
        .await?;

        self.events.emit(DomainEvent::new(request_id, EventKind::OfferDeclined, provider_id, now));
        Ok(())
    }

    pub async fn complete_request(
        &self,
        provider_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();

        with_retry(&self.policy.retry, || {
            self.store.with_txn(|t| {
                let request = t.request(request_id).ok_or(EngineError::NotFound)?;
                if request.status != RequestStatus::InProgress {
                    return Err(EngineError::InvalidState);
                }
                if request.provider_id != Some(provider_id) {
                    return Err(EngineError::NotAssignedProvider);
                }

                t.update_request_if(request_id, &[RequestStatus::InProgress], |r| {
                    r.status = RequestStatus::Done;
                    r.updated_at = now;
                });
                let provider = t.provider_mut(provider_id).ok_or(EngineError::NotFound)?;
                provider.total_jobs += 1;
                provider.updated_at = now;
                Ok(())
            })
        })
        .await?;

        info!("request {request_id} completed by provider {provider_id}");
        self.events
            .emit(DomainEvent::new(request_id, EventKind::RequestCompleted, provider_id, now));
        Ok(())
    }

    pub async fn cancel_request(
        &self,
        seeker_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let allow_in_progress = self.policy.allow_cancel_in_progress;

        with_retry(&self.policy.retry, || {
            self.store.with_txn(|t| {
                let request = t.request(request_id).ok_or(EngineError::NotFound)?;
                if request.seeker_id != seeker_id {
                    return Err(EngineError::NotOwner);
                }
                match request.status {
                    RequestStatus::Pending => {}
                    RequestStatus::InProgress if allow_in_progress => {}
                    _ => return Err(EngineError::InvalidState),
                }
                t.update_request_if(
                    request_id,
                    &[RequestStatus::Pending, RequestStatus::InProgress],
                    |r| {
                        r.status = RequestStatus::Cancelled;
                        r.updated_at = now;
                    },
                );
                Ok(())
            })
        })
        .await?;

        info!("request {request_id} cancelled by seeker {seeker_id}");
        self.events
            .emit(DomainEvent::new(request_id, EventKind::RequestCancelled, seeker_id, now));
        Ok(())
    }

    /// Sweeps Pending requests older than the threshold, expiring them and
    /// their still-pending offers. Idempotent: a second run over the same
    /// state finds nothing to do.
    pub async fn expire_stale(&self) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let cutoff = now - self.policy.expiry_threshold;

        let events = with_retry(&self.policy.retry, || {
            self.store.with_txn(|t| {
                let mut events = Vec::new();
                for request_id in t.pending_requests_created_before(cutoff) {
                    let expired = t.update_request_if(request_id, &[RequestStatus::Pending], |r| {
                        r.status = RequestStatus::Expired;
                        r.updated_at = now;
                    });
                    if !expired {
                        continue;
                    }
                    for provider_id in t.pending_offer_providers(request_id) {
                        t.update_offer_if(
                            request_id,
                            provider_id,
                            &[OfferStatus::Pending],
                            |o| {
                                o.status = OfferStatus::Expired;
                                o.responded_at = Some(now);
                            },
                        );
                    }
                    events.push(DomainEvent::new(
                        request_id,
                        EventKind::RequestExpired,
                        Uuid::nil(),
                        now,
                    ));
                }
                Ok(events)
            })
        })
        .await?;

        let count = events.len();
        if count > 0 {
            info!("expired {count} stale pending requests");
        }
        self.emit_all(events);
        Ok(count)
    }

    pub fn get_request_detail(
        &self,
        request_id: Uuid,
    ) -> Result<RequestDetailResponse, EngineError> {
        self.store.read(|t| {
            let request = t.request(request_id).ok_or(EngineError::NotFound)?;
            let seeker = t.seeker(request.seeker_id);
            let assigned = request.provider_id.and_then(|id| t.provider(id));

            let offers = t
                .offers_for_request(request_id)
                .into_iter()
                .map(|offer| {
                    let provider = t.provider(offer.provider_id);
                    OfferView {
                        provider_id: offer.provider_id.to_string(),
                        provider_name: provider.map(|p| p.full_name.clone()),
                        provider_phone: provider.map(|p| p.phone.clone()),
                        provider_rating: provider.map(|p| p.rating).unwrap_or(0.0),
                        status: offer.status,
                        responded_at: offer.responded_at,
                    }
                })
                .collect();

            let rating = t.rating_for_request(request_id).map(|r| RatingView {
                score: r.score,
                comment: r.comment.clone(),
                created_at: r.created_at,
            });

            Ok(RequestDetailResponse {
                id: request.id.to_string(),
                service_type: request.service_type.clone(),
                description: request.description.clone(),
                status: request.status,
                latitude: request.latitude,
                longitude: request.longitude,
                preferred_time: request.preferred_time,
                created_at: request.created_at,
                updated_at: request.updated_at,
                seeker_id: request.seeker_id.to_string(),
                seeker_name: seeker.map(|s| s.full_name.clone()),
                seeker_phone: seeker.map(|s| s.phone.clone()),
                provider_id: request.provider_id.map(|id| id.to_string()),
                provider_name: assigned.map(|p| p.full_name.clone()),
                provider_phone: assigned.map(|p| p.phone.clone()),
                provider_rating: assigned.map(|p| p.rating),
                offers,
                rating,
            })
        })
    }

    /// Seeker-side history, newest first.
    pub fn seeker_requests(&self, seeker_id: Uuid) -> Result<Vec<SeekerRequestItem>, EngineError> {
        self.store.read(|t| {
            let mut requests = t.requests_for_seeker(seeker_id);
            requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            Ok(requests
                .into_iter()
                .map(|r| {
                    let provider = r.provider_id.and_then(|id| t.provider(id));
                    SeekerRequestItem {
                        id: r.id.to_string(),
                        service_type: r.service_type.clone(),
                        description: r.description.clone(),
                        status: r.status,
                        preferred_time: r.preferred_time,
                        created_at: r.created_at,
                        provider_id: r.provider_id.map(|id| id.to_string()),
                        provider_name: provider.map(|p| p.full_name.clone()),
                        provider_phone: provider.map(|p| p.phone.clone()),
                        provider_rating: provider.map(|p| p.rating),
                        is_rated: t.rating_for_request(r.id).is_some(),
                    }
                })
                .collect())
        })
    }

    /// Provider work queue: everything this provider was offered, joined
    /// with the request and the distance from the provider's location.
    pub fn provider_requests(
        &self,
        provider_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ProviderRequestItem>, EngineError> {
        self.store.read(|t| {
            let provider = t.provider(provider_id).ok_or(EngineError::NotFound)?;
            let location = provider.location();

            let mut items: Vec<ProviderRequestItem> = t
                .offers_for_provider(provider_id)
                .into_iter()
                .filter_map(|offer| {
                    let request = t.request(offer.request_id)?;
                    if let Some(wanted) = status {
                        if request.status != wanted {
                            return None;
                        }
                    }
                    let seeker = t.seeker(request.seeker_id);
                    Some(ProviderRequestItem {
                        id: request.id.to_string(),
                        service_type: request.service_type.clone(),
                        description: request.description.clone(),
                        status: request.status,
                        offer_status: offer.status,
                        preferred_time: request.preferred_time,
                        created_at: request.created_at,
                        latitude: request.latitude,
                        longitude: request.longitude,
                        distance_km: location.map(|(lat, lon)| {
                            let d = geo::distance_km(lat, lon, request.latitude, request.longitude);
                            (d * 10.0).round() / 10.0
                        }),
                        seeker_id: request.seeker_id.to_string(),
                        seeker_name: seeker.map(|s| s.full_name.clone()),
                        seeker_phone: seeker.map(|s| s.phone.clone()),
                    })
                })
                .collect();

            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(items)
        })
    }

    fn emit_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.events.emit(event);
        }
    }
}
