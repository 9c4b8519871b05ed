use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::driver::{Driver, DriverStatus, VehicleClass};
use crate::models::ride::RideStatus;
use crate::registry;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(register_driver).get(list_drivers))
        .route("/drivers/:id/status", patch(update_driver_status))
        .route("/drivers/:id/location", patch(update_driver_location))
        .route("/drivers/:id/stats", get(driver_stats))
}

#[derive(Deserialize)]
pub struct RegisterDriverRequest {
    pub name: String,
    pub plate: String,
    pub vehicle_class: VehicleClass,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DriverStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, DispatchError> {
    if payload.name.trim().is_empty() {
        return Err(DispatchError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.plate.trim().is_empty() {
        return Err(DispatchError::BadRequest("plate cannot be empty".to_string()));
    }

    payload.location.validate()?;

    // Drivers register offline and toggle themselves available when ready
    // to take rides.
    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        plate: payload.plate,
        vehicle_class: payload.vehicle_class,
        location: payload.location,
        status: DriverStatus::Offline,
        updated_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    let drivers = state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(drivers)
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Driver>, DispatchError> {
    let driver = registry::set_availability(&state, id, payload.status)?;
    Ok(Json(driver))
}

async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Driver>, DispatchError> {
    let driver = registry::upsert_location(&state, id, payload.location)?;
    Ok(Json(driver))
}

/// Until online time is tracked per session, approximate it from ride
/// volume at half an hour per completed ride.
const ASSUMED_HOURS_PER_RIDE: f64 = 0.5;

/// Flat placeholder until rider feedback feeds a real rating.
const PLACEHOLDER_RATING: f64 = 4.8;

#[derive(Serialize)]
pub struct DriverStats {
    pub total_rides: usize,
    pub total_earnings: f64,
    pub today_rides: usize,
    pub today_earnings: f64,
    pub hours_online: f64,
    pub rating: f64,
}

/// Read-only settlement rollup over this driver's completed rides.
async fn driver_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverStats>, DispatchError> {
    registry::get(&state, id)?;

    let today = Utc::now().date_naive();
    let mut stats = DriverStats {
        total_rides: 0,
        total_earnings: 0.0,
        today_rides: 0,
        today_earnings: 0.0,
        hours_online: 0.0,
        rating: PLACEHOLDER_RATING,
    };

    for entry in state.rides.iter() {
        let ride = entry.value();
        if ride.driver_id != id || ride.status != RideStatus::Completed {
            continue;
        }
        stats.total_rides += 1;
        stats.total_earnings += ride.fare;
        if ride.created_at.date_naive() == today {
            stats.today_rides += 1;
            stats.today_earnings += ride.fare;
        }
    }

    stats.hours_online = stats.total_rides as f64 * ASSUMED_HOURS_PER_RIDE;

    Ok(Json(stats))
}
