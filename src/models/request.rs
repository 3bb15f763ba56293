use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::validation::validate_service_type;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Done,
    Cancelled,
    Expired,
}

impl RequestStatus {
    /// Pending and InProgress are the only non-terminal states.
    pub fn is_active(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::InProgress)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// A seeker's service request. `provider_id` is set exactly once, when an
/// offer is accepted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub seeker_id: Uuid,
    pub service_type: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub preferred_time: DateTime<Utc>,
    pub status: RequestStatus,
    pub provider_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-provider proposal attached to a request, keyed by
/// (request_id, provider_id). At most one offer per request ever reaches
/// Accepted; acceptance declines every pending sibling in the same
/// transaction.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderOffer {
    pub request_id: Uuid,
    pub provider_id: Uuid,
    pub status: OfferStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn validate_service_type_field(service_type: &str) -> Result<(), ValidationError> {
    if validate_service_type(service_type) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_service_type"))
    }
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateRequestDto {
    #[validate(custom = "validate_service_type_field")]
    pub service_type: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub preferred_time: Option<DateTime<Utc>>,
    /// Candidate providers to contact, usually taken from a matching search.
    pub provider_ids: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct OfferView {
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub provider_phone: Option<String>,
    pub provider_rating: f64,
    pub status: OfferStatus,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RatingView {
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RequestDetailResponse {
    pub id: String,
    pub service_type: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub preferred_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seeker_id: String,
    pub seeker_name: Option<String>,
    pub seeker_phone: Option<String>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub provider_phone: Option<String>,
    pub provider_rating: Option<f64>,
    pub offers: Vec<OfferView>,
    pub rating: Option<RatingView>,
}

/// Seeker-side history entry.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SeekerRequestItem {
    pub id: String,
    pub service_type: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub preferred_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub provider_phone: Option<String>,
    pub provider_rating: Option<f64>,
    pub is_rated: bool,
}

/// Provider-side work queue entry: the request joined with this provider's
/// own offer state and the distance from the provider's location.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProviderRequestItem {
    pub id: String,
    pub service_type: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub offer_status: OfferStatus,
    pub preferred_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: Option<f64>,
    pub seeker_id: String,
    pub seeker_name: Option<String>,
    pub seeker_phone: Option<String>,
}
