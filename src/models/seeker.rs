use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Seeker profile. References the external identity principal via `user_id`;
/// the server never stores credentials.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Seeker {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateSeekerProfileDto {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 4, max = 20))]
    pub phone: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdateSeekerProfileDto {
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[validate(length(min = 4, max = 20))]
    pub phone: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SeekerResponse {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

impl From<Seeker> for SeekerResponse {
    fn from(seeker: Seeker) -> Self {
        SeekerResponse {
            id: seeker.id.to_string(),
            user_id: seeker.user_id.to_string(),
            full_name: seeker.full_name,
            phone: seeker.phone,
            latitude: seeker.latitude,
            longitude: seeker.longitude,
            address: seeker.address,
        }
    }
}
