use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use validator::Validate;

use crate::Seekers;
use crate::guards::{AuthGuard, SeekerGuard};
use crate::models::{CreateSeekerProfileDto, SeekerResponse, UpdateSeekerProfileDto};
use crate::services::EngineError;
use crate::services::jwt::Role;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Seeker")]
#[post("/seeker/profile", data = "<dto>")]
pub async fn create_seeker_profile(
    seekers: &State<Seekers>,
    auth: AuthGuard,
    dto: Json<CreateSeekerProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if auth.role != Role::Seeker {
        return Err(ApiError::forbidden("Seeker role required"));
    }
    dto.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid profile payload: {e}")))?;

    let seeker_id = seekers
        .create_profile(auth.user_id, dto.into_inner())
        .await
        .map_err(|e| match e {
            EngineError::InvalidState => ApiError::bad_request("Seeker profile already exists"),
            other => other.into(),
        })?;

    Ok(Json(ApiResponse::success_with_message(
        "Seeker profile created successfully".to_string(),
        serde_json::json!({ "seeker_id": seeker_id.to_string() }),
    )))
}

#[openapi(tag = "Seeker")]
#[get("/seeker/profile")]
pub async fn get_seeker_profile(
    seeker: SeekerGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let response = SeekerResponse::from(seeker.seeker);
    Ok(Json(ApiResponse::success(serde_json::json!(response))))
}

#[openapi(tag = "Seeker")]
#[put("/seeker/profile", data = "<dto>")]
pub async fn update_seeker_profile(
    seekers: &State<Seekers>,
    seeker: SeekerGuard,
    dto: Json<UpdateSeekerProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid profile payload: {e}")))?;

    let updated = seekers.update_profile(seeker.seeker.id, dto.into_inner()).await?;
    let response = SeekerResponse::from(updated);

    Ok(Json(ApiResponse::success_with_message(
        "Seeker profile updated successfully".to_string(),
        serde_json::json!(response),
    )))
}
