use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

use crate::Providers;
use crate::guards::{AuthGuard, ProviderGuard};
use crate::models::{
    CreateProviderProfileDto, ProviderResponse, UpdateAvailabilityDto, UpdateLocationDto,
    UpdateProviderProfileDto,
};
use crate::services::EngineError;
use crate::services::jwt::Role;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Provider")]
#[post("/provider/profile", data = "<dto>")]
pub async fn create_provider_profile(
    providers: &State<Providers>,
    auth: AuthGuard,
    dto: Json<CreateProviderProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if auth.role != Role::Provider {
        return Err(ApiError::forbidden("Provider role required"));
    }
    dto.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid profile payload: {e}")))?;

    let provider_id = providers
        .create_profile(auth.user_id, dto.into_inner())
        .await
        .map_err(|e| match e {
            EngineError::InvalidState => ApiError::bad_request("Provider profile already exists"),
            other => other.into(),
        })?;

    Ok(Json(ApiResponse::success_with_message(
        "Provider profile created successfully".to_string(),
        serde_json::json!({ "provider_id": provider_id.to_string() }),
    )))
}

#[openapi(tag = "Provider")]
#[get("/provider/profile")]
pub async fn get_provider_profile(
    provider: ProviderGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let response = ProviderResponse::from(provider.provider);
    Ok(Json(ApiResponse::success(serde_json::json!(response))))
}

#[openapi(tag = "Provider")]
#[get("/provider/profile/<provider_id>")]
pub async fn get_provider_profile_by_id(
    providers: &State<Providers>,
    provider_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let provider_id =
        Uuid::parse_str(&provider_id).map_err(|_| ApiError::bad_request("Invalid provider ID"))?;

    let profile = providers.get_profile(provider_id)?;
    let response = ProviderResponse::from(profile);
    Ok(Json(ApiResponse::success(serde_json::json!(response))))
}

#[openapi(tag = "Provider")]
#[put("/provider/profile", data = "<dto>")]
pub async fn update_provider_profile(
    providers: &State<Providers>,
    provider: ProviderGuard,
    dto: Json<UpdateProviderProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid profile payload: {e}")))?;

    let updated = providers.update_profile(provider.provider.id, dto.into_inner()).await?;
    let response = ProviderResponse::from(updated);

    Ok(Json(ApiResponse::success_with_message(
        "Provider profile updated successfully".to_string(),
        serde_json::json!(response),
    )))
}

#[openapi(tag = "Provider")]
#[put("/provider/availability", data = "<dto>")]
pub async fn update_availability(
    providers: &State<Providers>,
    provider: ProviderGuard,
    dto: Json<UpdateAvailabilityDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    providers.update_availability(provider.provider.id, dto.availability).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Availability updated successfully"
    }))))
}

#[openapi(tag = "Provider")]
#[post("/provider/location", data = "<dto>")]
pub async fn update_provider_location(
    providers: &State<Providers>,
    provider: ProviderGuard,
    dto: Json<UpdateLocationDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate().map_err(|_| ApiError::bad_request("Invalid coordinates"))?;

    providers.update_location(provider.provider.id, dto.latitude, dto.longitude).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Location updated successfully"
    }))))
}

#[openapi(tag = "Provider")]
#[delete("/provider/profile")]
pub async fn delete_provider_profile(
    providers: &State<Providers>,
    provider: ProviderGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    providers.soft_delete(provider.provider.id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Provider profile deleted"
    }))))
}

#[openapi(tag = "Provider")]
#[get("/provider/dashboard")]
pub async fn provider_dashboard(
    providers: &State<Providers>,
    provider: ProviderGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let dashboard = providers.dashboard(provider.provider.id)?;
    Ok(Json(ApiResponse::success(serde_json::json!(dashboard))))
}
