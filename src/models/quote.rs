use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::driver::VehicleClass;

/// Per-vehicle-class availability and price estimate. Derived on every
/// request, never persisted standalone, and never names a specific driver:
/// the claim step re-queries anyway, so a driver id here would be stale by
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub vehicle_class: VehicleClass,
    pub available: bool,
    pub count: usize,
    pub eta_seconds: Option<u32>,
    pub distance_meters: Option<f64>,
    pub fare: f64,
    /// True when any part of this quote came from the degraded local
    /// fallback rather than the route provider.
    pub estimated: bool,
}

/// One rider's quoting session. Held until confirmed, replaced by a newer
/// request, or rejected as stale; abandonment needs no cleanup because
/// nothing is reserved at quote time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSet {
    pub rider_id: Uuid,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    pub quotes: Vec<Quote>,
    pub created_at: DateTime<Utc>,
}

impl QuoteSet {
    pub fn quote_for(&self, class: VehicleClass) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.vehicle_class == class)
    }
}
