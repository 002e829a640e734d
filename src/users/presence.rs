use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::PresenceConfig,
    error::AppError,
    users::{
        repo::UserStore,
        repo_types::{GeoPoint, User},
    },
};

/// Record a position fix: stores the point, stamps the update time and marks
/// the user online.
#[instrument(skip(store))]
pub async fn update_location(
    store: &dyn UserStore,
    user_id: Uuid,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<User, AppError> {
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(AppError::InvalidArgument(
            "Latitude and Longitude are required.".into(),
        ));
    };
    let point = GeoPoint::new(lng, lat)?;

    let user = store
        .record_location(user_id, point, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    debug!(user_id = %user.id, lng, lat, "location updated");
    Ok(user)
}

/// Boundary check for the `isOnline` field: anything but a JSON boolean is
/// rejected, including numbers and strings that look like one.
pub fn parse_online_flag(raw: Option<&Value>) -> Result<bool, AppError> {
    raw.and_then(Value::as_bool).ok_or_else(|| {
        AppError::InvalidArgument("Invalid input. \"isOnline\" must be a boolean.".into())
    })
}

/// Explicit on/off switch; leaves location and its timestamp alone.
#[instrument(skip(store))]
pub async fn set_online_status(
    store: &dyn UserStore,
    user_id: Uuid,
    is_online: bool,
) -> Result<bool, AppError> {
    let flag = store
        .set_online(user_id, is_online)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;
    info!(%user_id, is_online = flag, "online status set");
    Ok(flag)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub marked_offline: usize,
    pub failed: usize,
}

/// `now - staleness`, or `None` when that falls outside the representable range.
pub fn stale_cutoff(now: OffsetDateTime, staleness: Duration) -> Option<OffsetDateTime> {
    let staleness = time::Duration::try_from(staleness).ok()?;
    now.checked_sub(staleness)
}

/// Mark offline every online user whose last update is more than `staleness`
/// older than `now`. A failure on one user is logged and counted; the rest of
/// the batch still runs.
pub async fn sweep_stale_users(
    store: &dyn UserStore,
    now: OffsetDateTime,
    staleness: Duration,
) -> Result<SweepReport, AppError> {
    let cutoff = stale_cutoff(now, staleness).ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "staleness of {}s is out of range",
            staleness.as_secs()
        ))
    })?;
    let ids = store.stale_online_ids(cutoff).await?;

    let mut report = SweepReport {
        examined: ids.len(),
        ..SweepReport::default()
    };
    for id in ids {
        match store.mark_offline_if_stale(id, cutoff).await {
            Ok(true) => {
                report.marked_offline += 1;
                info!(user_id = %id, "user marked offline due to inactivity");
            }
            // refreshed between snapshot and update
            Ok(false) => {}
            Err(e) => {
                report.failed += 1;
                warn!(user_id = %id, error = %e, "failed to mark user offline");
            }
        }
    }
    Ok(report)
}

/// Run [`sweep_stale_users`] every `sweep_interval` until the handle is aborted.
pub fn spawn_sweeper(store: Arc<dyn UserStore>, cfg: PresenceConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = cfg.sweep_interval.as_secs_f64(),
            staleness_secs = cfg.staleness.as_secs_f64(),
            "presence sweeper started"
        );
        let mut ticker = tokio::time::interval(cfg.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep_stale_users(store.as_ref(), OffsetDateTime::now_utc(), cfg.staleness).await
            {
                Ok(report) if report.examined > 0 => debug!(?report, "presence sweep done"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "presence sweep failed"),
            }
        }
    })
}
