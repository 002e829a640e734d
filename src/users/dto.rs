use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::users::repo_types::{DriverSummary, User};

/// Both fields are optional here so a missing coordinate gets the
/// presence-specific message instead of a generic body error.
#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub is_online: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub message: String,
    pub is_online: bool,
}

#[derive(Debug, Serialize)]
pub struct DriversResponse {
    pub drivers: Vec<DriverSummary>,
}
