use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::Lifecycle;
use crate::guards::AuthGuard;
use crate::utils::{ApiError, ApiResponse};

/// Manual trigger for the expiry sweep. Same code path as the background
/// reaper; safe to run while the reaper is ticking because the sweep is
/// idempotent.
#[openapi(tag = "Ops")]
#[post("/ops/expire-stale")]
pub async fn expire_stale(
    lifecycle: &State<Lifecycle>,
    _auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let expired = lifecycle.expire_stale().await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "expired": expired }))))
}
