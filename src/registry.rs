//! Driver registry: the single source of truth for driver position and
//! availability. Every successful write is immediately visible to readers;
//! there is no caching tier in front of this map.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::driver::{Driver, DriverStatus};
use crate::state::AppState;

pub fn get(state: &AppState, driver_id: Uuid) -> Result<Driver, DispatchError> {
    state
        .drivers
        .get(&driver_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| DispatchError::NotFound(format!("driver {driver_id} not found")))
}

pub fn upsert_location(
    state: &AppState,
    driver_id: Uuid,
    location: GeoPoint,
) -> Result<Driver, DispatchError> {
    location.validate()?;

    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| DispatchError::NotFound(format!("driver {driver_id} not found")))?;

    driver.location = location;
    driver.updated_at = Utc::now();

    Ok(driver.clone())
}

/// Toggles `Offline <-> Available`. A driver claimed by an active ride can
/// change status only through ride completion or cancellation.
pub fn set_availability(
    state: &AppState,
    driver_id: Uuid,
    status: DriverStatus,
) -> Result<Driver, DispatchError> {
    if status == DriverStatus::Claimed {
        return Err(DispatchError::BadRequest(
            "claimed status is set by the dispatcher, not by clients".to_string(),
        ));
    }

    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| DispatchError::NotFound(format!("driver {driver_id} not found")))?;

    if driver.status == DriverStatus::Claimed {
        return Err(DispatchError::DriverBusy);
    }

    if driver.status != status {
        match status {
            DriverStatus::Available => state.metrics.drivers_available.inc(),
            _ => {
                if driver.status == DriverStatus::Available {
                    state.metrics.drivers_available.dec();
                }
            }
        }
    }

    driver.status = status;
    driver.updated_at = Utc::now();

    Ok(driver.clone())
}

/// Atomic conditional update: `Available -> Claimed` only if the driver is
/// currently `Available`. The check and the write happen under the map's
/// entry guard, so two racing claims for the same driver cannot both
/// succeed.
pub fn try_claim(state: &AppState, driver_id: Uuid) -> bool {
    let Some(mut driver) = state.drivers.get_mut(&driver_id) else {
        return false;
    };

    if driver.status != DriverStatus::Available {
        return false;
    }

    driver.status = DriverStatus::Claimed;
    driver.updated_at = Utc::now();
    state.metrics.drivers_available.dec();

    debug!(driver_id = %driver_id, "driver claimed");
    true
}

/// `Claimed -> Available`; the only path by which a claimed driver returns
/// to the dispatchable pool.
pub fn release(state: &AppState, driver_id: Uuid) {
    let Some(mut driver) = state.drivers.get_mut(&driver_id) else {
        return;
    };

    if driver.status != DriverStatus::Claimed {
        return;
    }

    driver.status = DriverStatus::Available;
    driver.updated_at = Utc::now();
    state.metrics.drivers_available.inc();

    debug!(driver_id = %driver_id, "driver released");
}
