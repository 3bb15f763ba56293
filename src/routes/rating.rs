use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

use crate::Ratings;
use crate::guards::{AuthGuard, SeekerGuard};
use crate::models::CreateRatingDto;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Rating")]
#[post("/rating/create", data = "<dto>")]
pub async fn create_rating(
    ratings: &State<Ratings>,
    seeker: SeekerGuard,
    dto: Json<CreateRatingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid rating payload: {e}")))?;

    let request_id = Uuid::parse_str(&dto.request_id)
        .map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    let rating = ratings
        .create_rating(seeker.seeker.id, request_id, dto.score, dto.comment.clone())
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        "Rating submitted successfully".to_string(),
        serde_json::json!(rating),
    )))
}

#[openapi(tag = "Rating")]
#[get("/rating/request/<request_id>")]
pub async fn get_request_rating(
    ratings: &State<Ratings>,
    _auth: AuthGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    let rating = ratings
        .get_rating_for_request(request_id)?
        .ok_or_else(|| ApiError::not_found("Rating not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!(rating))))
}

#[openapi(tag = "Rating")]
#[get("/rating/provider/<provider_id>")]
pub async fn get_provider_ratings(
    ratings: &State<Ratings>,
    provider_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let provider_id =
        Uuid::parse_str(&provider_id).map_err(|_| ApiError::bad_request("Invalid provider ID"))?;

    let list = ratings.get_provider_ratings(provider_id)?;
    let average = ratings.calculate_average_rating(provider_id)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "ratings": list,
        "average": average
    }))))
}
