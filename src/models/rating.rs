use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One rating per completed request. Immutable once created.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rating {
    pub id: Uuid,
    pub request_id: Uuid,
    pub provider_id: Uuid,
    pub seeker_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateRatingDto {
    pub request_id: String,
    #[validate(range(min = 1, max = 5))]
    pub score: i32,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema, PartialEq)]
pub struct RatingResponse {
    pub id: String,
    pub request_id: String,
    pub provider_id: String,
    pub seeker_id: String,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub provider_name: Option<String>,
    pub seeker_name: Option<String>,
    pub service_type: Option<String>,
}
