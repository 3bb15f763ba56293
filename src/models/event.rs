use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OfferCreated,
    OfferAccepted,
    OfferDeclined,
    RequestCompleted,
    RequestCancelled,
    RequestExpired,
}

/// Lifecycle transition notification handed to the external
/// notification/chat subsystem. Delivery is that subsystem's problem.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub request_id: Uuid,
    pub kind: EventKind,
    /// Who caused the transition. The nil uuid marks system-driven
    /// transitions such as expiry sweeps.
    pub actor_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(request_id: Uuid, kind: EventKind, actor_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        DomainEvent { request_id, kind, actor_id, timestamp }
    }
}
