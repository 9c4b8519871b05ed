use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::estimator::{Estimator, NullRouteProvider, RouteProvider};
use crate::models::driver::Driver;
use crate::models::quote::QuoteSet;
use crate::models::ride::{Ride, RideEvent};
use crate::observability::metrics::Metrics;

/// Knobs governing a dispatch attempt, separate from pricing.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    pub search_radius_km: f64,
    pub quote_staleness: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            search_radius_km: 10.0,
            quote_staleness: Duration::from_secs(30),
        }
    }
}

pub struct AppState {
    pub drivers: DashMap<Uuid, Driver>,
    pub rides: DashMap<Uuid, Ride>,
    /// Latest quoting session per rider; replaced on re-quote, removed on
    /// confirm. Nothing here reserves a driver.
    pub quote_sessions: DashMap<Uuid, QuoteSet>,
    pub ride_events_tx: broadcast::Sender<RideEvent>,
    pub estimator: Estimator,
    pub policy: DispatchPolicy,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        policy: DispatchPolicy,
        estimator: Estimator,
        event_buffer_size: usize,
    ) -> Self {
        let (ride_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            drivers: DashMap::new(),
            rides: DashMap::new(),
            quote_sessions: DashMap::new(),
            ride_events_tx,
            estimator,
            policy,
            metrics: Metrics::new(),
        }
    }

    pub fn from_config(config: &Config, provider: Arc<dyn RouteProvider>) -> Self {
        Self::new(
            DispatchPolicy {
                search_radius_km: config.search_radius_km,
                quote_staleness: Duration::from_secs(config.quote_staleness_secs),
            },
            Estimator::new(provider, config.tariffs.clone()),
            config.event_buffer_size,
        )
    }

    /// Test/default wiring: every estimate takes the flagged fallback path.
    pub fn with_defaults() -> Self {
        Self::new(
            DispatchPolicy::default(),
            Estimator::new(Arc::new(NullRouteProvider), Default::default()),
            1024,
        )
    }

    pub fn publish(&self, event: RideEvent) {
        // Fire and forget: no subscribers is fine.
        let _ = self.ride_events_tx.send(event);
    }
}
