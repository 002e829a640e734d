use tracing::{debug, instrument};

use crate::{
    error::AppError,
    users::{repo::UserStore, repo_types::DriverSummary},
};

/// All registered drivers, online or not. No drivers is an empty list.
#[instrument(skip(store))]
pub async fn list_drivers(store: &dyn UserStore) -> Result<Vec<DriverSummary>, AppError> {
    let drivers = store.list_drivers().await?;
    debug!(count = drivers.len(), "drivers listed");
    Ok(drivers)
}
