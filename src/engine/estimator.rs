//! Arrival and fare estimation.
//!
//! Routing distance/duration comes from an external capability behind
//! [`RouteProvider`]. When the provider fails the estimator degrades to a
//! locally computed haversine distance and a synthetic ETA so dispatch never
//! blocks on a third-party outage; degraded results carry `estimated: true`
//! so callers can tell them from authoritative ones.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::config::TariffTable;
use crate::geo::{haversine_km, GeoPoint};
use crate::models::driver::VehicleClass;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("route provider unavailable")]
    Unavailable,

    #[error("no route found")]
    NoRoute,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub distance_meters: f64,
    pub duration_seconds: u32,
}

/// External distance/ETA capability. Implementations wrap whatever mapping
/// vendor the deployment uses; this crate only consumes the seam.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn distance_and_duration(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<Route, ProviderError>;
}

/// Provider that is never reachable, forcing every estimate onto the
/// flagged fallback path. Default wiring until a vendor integration is
/// plugged in.
pub struct NullRouteProvider;

#[async_trait]
impl RouteProvider for NullRouteProvider {
    async fn distance_and_duration(
        &self,
        _origin: &GeoPoint,
        _destination: &GeoPoint,
    ) -> Result<Route, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArrivalEstimate {
    pub eta_seconds: u32,
    pub distance_meters: f64,
    pub estimated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FareQuote {
    pub fare: f64,
    pub estimated: bool,
}

#[derive(Clone)]
pub struct Estimator {
    provider: Arc<dyn RouteProvider>,
    tariffs: TariffTable,
}

impl Estimator {
    pub fn new(provider: Arc<dyn RouteProvider>, tariffs: TariffTable) -> Self {
        Self { provider, tariffs }
    }

    /// How long until a driver at `driver_location` reaches `pickup`.
    pub async fn estimate_arrival(
        &self,
        driver_location: &GeoPoint,
        pickup: &GeoPoint,
        class: VehicleClass,
    ) -> ArrivalEstimate {
        let (route, estimated) = self.route(driver_location, pickup, class).await;
        ArrivalEstimate {
            eta_seconds: route.duration_seconds,
            distance_meters: route.distance_meters,
            estimated,
        }
    }

    /// Trip fare for `pickup -> destination` in the given class:
    /// base fare + per-km and per-minute components, rounded to whole
    /// currency units.
    pub async fn fare_quote(
        &self,
        pickup: &GeoPoint,
        destination: &GeoPoint,
        class: VehicleClass,
    ) -> FareQuote {
        let (route, estimated) = self.route(pickup, destination, class).await;
        FareQuote {
            fare: self.fare_for(class, route.distance_meters, route.duration_seconds),
            estimated,
        }
    }

    fn fare_for(&self, class: VehicleClass, distance_meters: f64, duration_seconds: u32) -> f64 {
        let tariff = self.tariffs.for_class(class);
        let km = distance_meters / 1_000.0;
        let minutes = f64::from(duration_seconds) / 60.0;
        (tariff.base_fare + tariff.per_km * km + tariff.per_minute * minutes).round()
    }

    async fn route(&self, origin: &GeoPoint, destination: &GeoPoint, class: VehicleClass) -> (Route, bool) {
        match self.provider.distance_and_duration(origin, destination).await {
            Ok(route) => (route, false),
            Err(err) => {
                warn!(error = %err, "route provider failed, using fallback estimate");
                (self.fallback_route(origin, destination, class), true)
            }
        }
    }

    /// Straight-line haversine distance plus a synthetic duration from the
    /// class's configured average speed.
    fn fallback_route(&self, origin: &GeoPoint, destination: &GeoPoint, class: VehicleClass) -> Route {
        let tariff = self.tariffs.for_class(class);
        let km = haversine_km(origin, destination);
        let hours = km / tariff.fallback_speed_kmh;
        Route {
            distance_meters: km * 1_000.0,
            duration_seconds: (hours * 3_600.0).round() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        route: Route,
    }

    #[async_trait]
    impl RouteProvider for FixedProvider {
        async fn distance_and_duration(
            &self,
            _origin: &GeoPoint,
            _destination: &GeoPoint,
        ) -> Result<Route, ProviderError> {
            Ok(self.route)
        }
    }

    struct NoRouteProvider;

    #[async_trait]
    impl RouteProvider for NoRouteProvider {
        async fn distance_and_duration(
            &self,
            _origin: &GeoPoint,
            _destination: &GeoPoint,
        ) -> Result<Route, ProviderError> {
            Err(ProviderError::NoRoute)
        }
    }

    fn pickup() -> GeoPoint {
        GeoPoint {
            lat: 33.69,
            lng: 73.05,
        }
    }

    fn destination() -> GeoPoint {
        GeoPoint {
            lat: 33.72,
            lng: 73.09,
        }
    }

    #[tokio::test]
    async fn provider_route_is_authoritative() {
        let estimator = Estimator::new(
            Arc::new(FixedProvider {
                route: Route {
                    distance_meters: 5_000.0,
                    duration_seconds: 600,
                },
            }),
            TariffTable::default(),
        );

        let arrival = estimator
            .estimate_arrival(&pickup(), &destination(), VehicleClass::Car)
            .await;
        assert!(!arrival.estimated);
        assert_eq!(arrival.eta_seconds, 600);
        assert!((arrival.distance_meters - 5_000.0).abs() < 1e-9);

        // base 50 + 15 * 5 km + 3 * 10 min = 155
        let quote = estimator
            .fare_quote(&pickup(), &destination(), VehicleClass::Car)
            .await;
        assert!(!quote.estimated);
        assert!((quote.fare - 155.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unreachable_provider_degrades_to_flagged_fallback() {
        let estimator = Estimator::new(Arc::new(NullRouteProvider), TariffTable::default());

        let arrival = estimator
            .estimate_arrival(&pickup(), &destination(), VehicleClass::Car)
            .await;
        assert!(arrival.estimated);
        assert!(arrival.distance_meters > 0.0);
        assert!(arrival.eta_seconds > 0);

        let quote = estimator
            .fare_quote(&pickup(), &destination(), VehicleClass::Car)
            .await;
        assert!(quote.estimated);
        assert!(quote.fare > TariffTable::default().car.base_fare);
    }

    #[tokio::test]
    async fn no_route_also_takes_the_fallback() {
        let estimator = Estimator::new(Arc::new(NoRouteProvider), TariffTable::default());

        let arrival = estimator
            .estimate_arrival(&pickup(), &destination(), VehicleClass::Motorcycle)
            .await;
        assert!(arrival.estimated);
    }

    #[tokio::test]
    async fn fallback_eta_follows_class_speed() {
        let estimator = Estimator::new(Arc::new(NullRouteProvider), TariffTable::default());

        let car = estimator
            .estimate_arrival(&pickup(), &destination(), VehicleClass::Car)
            .await;
        let moto = estimator
            .estimate_arrival(&pickup(), &destination(), VehicleClass::Motorcycle)
            .await;

        // Same distance, faster class, shorter synthetic ETA.
        assert!(moto.eta_seconds < car.eta_seconds);
    }
}
