use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::validation::validate_service_type;

/// Provider profile row. `rating`, `total_reviews` and `total_jobs` are
/// aggregates maintained by the rating ledger and the request lifecycle.
/// Providers are soft-deleted only, so historical requests keep resolving.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Provider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub availability: bool,
    pub rating: f64,
    pub total_reviews: i32,
    pub total_jobs: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    /// Matching only considers providers with a known position.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn has_skill(&self, service_type: &str) -> bool {
        self.skills.iter().any(|s| s == service_type)
    }
}

fn validate_skills(skills: &Vec<String>) -> Result<(), ValidationError> {
    if skills.is_empty() {
        return Err(ValidationError::new("skills_empty"));
    }
    if !skills.iter().all(|s| validate_service_type(s)) {
        return Err(ValidationError::new("invalid_service_type"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateProviderProfileDto {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 4, max = 20))]
    pub phone: String,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(custom = "validate_skills")]
    pub skills: Vec<String>,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdateProviderProfileDto {
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[validate(length(min = 4, max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(custom = "validate_skills")]
    pub skills: Option<Vec<String>>,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateAvailabilityDto {
    pub availability: bool,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdateLocationDto {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProviderResponse {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone: String,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub availability: bool,
    pub rating: f64,
    pub total_reviews: i32,
    pub total_jobs: i32,
}

impl From<Provider> for ProviderResponse {
    fn from(provider: Provider) -> Self {
        ProviderResponse {
            id: provider.id.to_string(),
            user_id: provider.user_id.to_string(),
            full_name: provider.full_name,
            phone: provider.phone,
            bio: provider.bio,
            skills: provider.skills,
            experience_years: provider.experience_years,
            latitude: provider.latitude,
            longitude: provider.longitude,
            availability: provider.availability,
            rating: provider.rating,
            total_reviews: provider.total_reviews,
            total_jobs: provider.total_jobs,
        }
    }
}

/// One matching-engine result. `distance_km` is rounded to one decimal.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProviderSummary {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<i32>,
    pub rating: f64,
    pub total_jobs: i32,
    pub distance_km: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProviderDashboardResponse {
    pub total_jobs_completed: i32,
    pub pending_offers: i64,
    pub jobs_in_progress: i64,
    pub average_rating: f64,
    pub currently_available: bool,
}
