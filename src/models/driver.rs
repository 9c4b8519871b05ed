use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// The fixed set of dispatchable vehicle classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    Car,
    Motorcycle,
    AutoRickshaw,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [
        VehicleClass::Car,
        VehicleClass::Motorcycle,
        VehicleClass::AutoRickshaw,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    Offline,
    Available,
    /// Reserved for exactly one active ride; only the ride lifecycle
    /// (complete/cancel) releases the driver back to `Available`.
    Claimed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub plate: String,
    pub vehicle_class: VehicleClass,
    pub location: GeoPoint,
    pub status: DriverStatus,
    pub updated_at: DateTime<Utc>,
}
