use axum::{
    extract::State,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extractors::{ValidJson, ValidPath},
    state::AppState,
    users::{
        directory,
        dto::{
            DriversResponse, LocationResponse, SetStatusRequest, StatusResponse,
            UpdateLocationRequest,
        },
        presence,
    },
};

pub fn presence_routes() -> Router<AppState> {
    Router::new()
        .route("/update-location", post(update_location))
        .route("/driver/set-status/:id", patch(set_status))
}

pub fn directory_routes() -> Router<AppState> {
    Router::new().route("/get-drivers", get(get_drivers))
}

#[instrument(skip(state, payload))]
pub async fn update_location(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    let user =
        presence::update_location(state.store.as_ref(), user_id, payload.lat, payload.lng).await?;
    Ok(Json(LocationResponse {
        message: "Location updated successfully.",
        user,
    }))
}

// Any authenticated caller may switch any account; the target comes from the path.
#[instrument(skip(state, payload))]
pub async fn set_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<SetStatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let requested = presence::parse_online_flag(payload.is_online.as_ref())?;
    debug!(%caller, user_id = %id, requested, "status change requested");
    let is_online = presence::set_online_status(state.store.as_ref(), id, requested).await?;
    Ok(Json(StatusResponse {
        message: format!("User is now {}.", if is_online { "live" } else { "not live" }),
        is_online,
    }))
}

#[instrument(skip(state))]
pub async fn get_drivers(State(state): State<AppState>) -> Result<Json<DriversResponse>, AppError> {
    let drivers = directory::list_drivers(state.store.as_ref()).await?;
    Ok(Json(DriversResponse { drivers }))
}
