//! Radius queries over the driver registry.
//!
//! Distances are great-circle (haversine, spherical-Earth approximation),
//! not geodesic-exact. The linear scan below returns the same set as any
//! spatial partitioning would; swapping in grid buckets or a store-native
//! geo query must not change the result set. Callers must not rely on
//! result ordering.

use crate::geo::{haversine_km, GeoPoint};
use crate::models::driver::{Driver, DriverStatus, VehicleClass};
use crate::state::AppState;

/// All `Available` drivers within `radius_km` of `center`, optionally
/// narrowed to one vehicle class. An empty result is not an error; it means
/// no driver is currently dispatchable.
pub fn query_within_radius(
    state: &AppState,
    center: &GeoPoint,
    radius_km: f64,
    class: Option<VehicleClass>,
) -> Vec<Driver> {
    state
        .drivers
        .iter()
        .filter_map(|entry| {
            let driver = entry.value();
            let in_scope = driver.status == DriverStatus::Available
                && class.is_none_or(|c| driver.vehicle_class == c)
                && haversine_km(&driver.location, center) <= radius_km;

            if in_scope {
                Some(driver.clone())
            } else {
                None
            }
        })
        .collect()
}
