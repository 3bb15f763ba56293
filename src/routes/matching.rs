use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::Matcher;
use crate::services::matching::MatchCriteria;
use crate::utils::validation::{validate_coordinates, validate_service_type};
use crate::utils::{ApiError, ApiResponse};

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct MatchSearchQuery {
    pub service_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub max_results: Option<i64>,
}

#[openapi(tag = "Matching")]
#[get("/match/search?<query..>")]
pub async fn search_providers(
    matcher: &State<Matcher>,
    query: MatchSearchQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_service_type(&query.service_type) {
        return Err(ApiError::bad_request("Invalid service type"));
    }
    if !validate_coordinates(query.latitude, query.longitude) {
        return Err(ApiError::bad_request("Invalid coordinates"));
    }
    if !query.radius_km.is_finite() || query.radius_km <= 0.0 {
        return Err(ApiError::bad_request("Invalid search radius"));
    }

    let candidates = matcher.find_candidates(&MatchCriteria {
        service_type: query.service_type,
        latitude: query.latitude,
        longitude: query.longitude,
        radius_km: query.radius_km,
        // Non-positive values fall back to the configured default cap.
        max_results: query.max_results.unwrap_or(0),
    })?;

    let count = candidates.len();
    Ok(Json(ApiResponse::success(serde_json::json!({
        "providers": candidates,
        "count": count
    }))))
}
