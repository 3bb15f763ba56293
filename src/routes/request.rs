use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

use crate::Lifecycle;
use crate::guards::{AuthGuard, ProviderGuard, SeekerGuard};
use crate::models::{CreateRequestDto, RequestStatus};
use crate::services::request::NewRequest;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Request")]
#[post("/request/create", data = "<dto>")]
pub async fn create_request(
    lifecycle: &State<Lifecycle>,
    seeker: SeekerGuard,
    dto: Json<CreateRequestDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid request payload: {e}")))?;

    let mut provider_ids = Vec::with_capacity(dto.provider_ids.len());
    for raw in &dto.provider_ids {
        let id = Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid provider ID"))?;
        provider_ids.push(id);
    }

    let request_id = lifecycle
        .create_request(
            seeker.seeker.id,
            NewRequest {
                service_type: dto.service_type.clone(),
                description: dto.description.clone(),
                latitude: dto.latitude,
                longitude: dto.longitude,
                preferred_time: dto.preferred_time,
                provider_ids,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        "Request created successfully".to_string(),
        serde_json::json!({ "request_id": request_id.to_string() }),
    )))
}

#[openapi(tag = "Request")]
#[get("/request/<request_id>")]
pub async fn get_request_detail(
    lifecycle: &State<Lifecycle>,
    _auth: AuthGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    let detail = lifecycle.get_request_detail(request_id)?;
    Ok(Json(ApiResponse::success(serde_json::json!(detail))))
}

#[openapi(tag = "Request")]
#[post("/request/<request_id>/accept")]
pub async fn accept_offer(
    lifecycle: &State<Lifecycle>,
    provider: ProviderGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    lifecycle.accept_offer(provider.provider.id, request_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Offer accepted, request is now in progress"
    }))))
}

#[openapi(tag = "Request")]
#[post("/request/<request_id>/decline")]
pub async fn decline_offer(
    lifecycle: &State<Lifecycle>,
    provider: ProviderGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    lifecycle.decline_offer(provider.provider.id, request_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Offer declined"
    }))))
}

#[openapi(tag = "Request")]
#[post("/request/<request_id>/complete")]
pub async fn complete_request(
    lifecycle: &State<Lifecycle>,
    provider: ProviderGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    lifecycle.complete_request(provider.provider.id, request_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Request marked as completed"
    }))))
}

#[openapi(tag = "Request")]
#[post("/request/<request_id>/cancel")]
pub async fn cancel_request(
    lifecycle: &State<Lifecycle>,
    seeker: SeekerGuard,
    request_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let request_id =
        Uuid::parse_str(&request_id).map_err(|_| ApiError::bad_request("Invalid request ID"))?;

    lifecycle.cancel_request(seeker.seeker.id, request_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Request cancelled"
    }))))
}

#[openapi(tag = "Request")]
#[get("/seeker/requests")]
pub async fn seeker_requests(
    lifecycle: &State<Lifecycle>,
    seeker: SeekerGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let requests = lifecycle.seeker_requests(seeker.seeker.id)?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "requests": requests }))))
}

fn parse_status(raw: &str) -> Result<RequestStatus, ApiError> {
    match raw {
        "pending" => Ok(RequestStatus::Pending),
        "in_progress" => Ok(RequestStatus::InProgress),
        "done" => Ok(RequestStatus::Done),
        "cancelled" => Ok(RequestStatus::Cancelled),
        "expired" => Ok(RequestStatus::Expired),
        _ => Err(ApiError::bad_request("Invalid status filter")),
    }
}

#[openapi(tag = "Request")]
#[get("/provider/requests?<status>")]
pub async fn provider_requests(
    lifecycle: &State<Lifecycle>,
    provider: ProviderGuard,
    status: Option<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let status = status.as_deref().map(parse_status).transpose()?;

    let requests = lifecycle.provider_requests(provider.provider.id, status)?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "requests": requests }))))
}
