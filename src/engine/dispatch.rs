//! Dispatch coordination: quote a ride request per vehicle class, then turn
//! a rider's confirmation into exactly one claimed driver and a new ride.
//!
//! Quoting reserves nothing; an abandoned quote needs no cleanup. The only
//! synchronized mutation on the confirm path is the per-driver conditional
//! claim in [`crate::registry::try_claim`]; quoting for different riders
//! runs fully in parallel.

use std::time::Instant;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::estimator::ArrivalEstimate;
use crate::engine::spatial;
use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::driver::{Driver, VehicleClass};
use crate::models::quote::{Quote, QuoteSet};
use crate::models::ride::{Ride, RideEvent, RideStatus};
use crate::registry;
use crate::state::AppState;

/// One radius query per vehicle class, reduced to a single quote each. The
/// representative for a class is its lowest-ETA driver; a class with no
/// drivers in radius still quotes a fare from the tariff so riders see a
/// price even when nothing is dispatchable.
pub async fn request_quotes(
    state: &AppState,
    rider_id: Uuid,
    pickup: GeoPoint,
    destination: GeoPoint,
) -> Result<QuoteSet, DispatchError> {
    pickup.validate()?;
    destination.validate()?;

    let start = Instant::now();
    let mut quotes = Vec::with_capacity(VehicleClass::ALL.len());

    for class in VehicleClass::ALL {
        let candidates = spatial::query_within_radius(
            state,
            &pickup,
            state.policy.search_radius_km,
            Some(class),
        );
        let fare = state.estimator.fare_quote(&pickup, &destination, class).await;

        let quote = match best_arrival(state, &candidates, &pickup, class).await {
            Some(best) => Quote {
                vehicle_class: class,
                available: true,
                count: candidates.len(),
                eta_seconds: Some(best.eta_seconds),
                distance_meters: Some(best.distance_meters),
                fare: fare.fare,
                estimated: fare.estimated || best.estimated,
            },
            None => Quote {
                vehicle_class: class,
                available: false,
                count: 0,
                eta_seconds: None,
                distance_meters: None,
                fare: fare.fare,
                estimated: fare.estimated,
            },
        };
        quotes.push(quote);
    }

    let session = QuoteSet {
        rider_id,
        pickup,
        destination,
        quotes,
        created_at: Utc::now(),
    };
    state.quote_sessions.insert(rider_id, session.clone());

    state.metrics.quotes_total.inc();
    state
        .metrics
        .dispatch_latency_seconds
        .with_label_values(&["quote"])
        .observe(start.elapsed().as_secs_f64());

    Ok(session)
}

/// Commits the rider's choice: re-queries the index (the quote may be
/// stale), walks candidates in ascending fresh-ETA order, and claims the
/// first driver still `Available`. Exactly one of N racing confirms can win
/// a given driver; the rest fall through to the next candidate or exhaust
/// the pool.
pub async fn confirm(
    state: &AppState,
    rider_id: Uuid,
    class: VehicleClass,
) -> Result<Ride, DispatchError> {
    let start = Instant::now();

    let session = state
        .quote_sessions
        .get(&rider_id)
        .map(|entry| entry.value().clone())
        .ok_or(DispatchError::StaleQuote)?;

    let age = Utc::now().signed_duration_since(session.created_at);
    if age.to_std().unwrap_or_default() > state.policy.quote_staleness {
        state.quote_sessions.remove(&rider_id);
        return Err(DispatchError::StaleQuote);
    }

    let fare = session
        .quote_for(class)
        .map(|q| q.fare)
        .ok_or_else(|| DispatchError::BadRequest(format!("no quote for class {class:?}")))?;

    let candidates = spatial::query_within_radius(
        state,
        &session.pickup,
        state.policy.search_radius_km,
        Some(class),
    );

    let mut ranked = Vec::with_capacity(candidates.len());
    for driver in candidates {
        let arrival = state
            .estimator
            .estimate_arrival(&driver.location, &session.pickup, class)
            .await;
        ranked.push((arrival.eta_seconds, driver));
    }
    ranked.sort_by_key(|(eta, _)| *eta);

    for (eta, driver) in ranked {
        if !registry::try_claim(state, driver.id) {
            // Lost the race for this driver; try the next-best candidate.
            debug!(driver_id = %driver.id, "claim contended, moving on");
            state
                .metrics
                .claims_total
                .with_label_values(&["contended"])
                .inc();
            continue;
        }

        let ride = create_ride(state, &session, &driver, class, fare);
        state.quote_sessions.remove(&rider_id);
        state.publish(RideEvent::RideRequested(ride.clone()));

        state
            .metrics
            .claims_total
            .with_label_values(&["committed"])
            .inc();
        state
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&["confirm"])
            .observe(start.elapsed().as_secs_f64());

        info!(
            ride_id = %ride.id,
            rider_id = %rider_id,
            driver_id = %driver.id,
            eta_seconds = eta,
            fare = ride.fare,
            "ride dispatched"
        );
        return Ok(ride);
    }

    state
        .metrics
        .claims_total
        .with_label_values(&["exhausted"])
        .inc();
    state
        .metrics
        .dispatch_latency_seconds
        .with_label_values(&["confirm"])
        .observe(start.elapsed().as_secs_f64());

    Err(DispatchError::NoDriverAvailable)
}

async fn best_arrival(
    state: &AppState,
    candidates: &[Driver],
    pickup: &GeoPoint,
    class: VehicleClass,
) -> Option<ArrivalEstimate> {
    let mut best: Option<ArrivalEstimate> = None;
    for driver in candidates {
        let arrival = state
            .estimator
            .estimate_arrival(&driver.location, pickup, class)
            .await;
        if best.is_none_or(|b| arrival.eta_seconds < b.eta_seconds) {
            best = Some(arrival);
        }
    }
    best
}

fn create_ride(
    state: &AppState,
    session: &QuoteSet,
    driver: &Driver,
    class: VehicleClass,
    fare: f64,
) -> Ride {
    let ride = Ride {
        id: Uuid::new_v4(),
        rider_id: session.rider_id,
        driver_id: driver.id,
        pickup: session.pickup,
        destination: session.destination,
        vehicle_class: class,
        fare,
        otp: generate_otp(state),
        status: RideStatus::Requested,
        cancelled_by: None,
        created_at: Utc::now(),
        accepted_at: None,
        started_at: None,
        ended_at: None,
    };

    state.rides.insert(ride.id, ride.clone());
    ride
}

/// Uniformly random 6-digit code, re-drawn until it collides with no
/// concurrently active ride.
fn generate_otp(state: &AppState) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let code = format!("{}", rng.gen_range(100_000..=999_999));
        let in_use = state
            .rides
            .iter()
            .any(|entry| entry.value().status.is_active() && entry.value().otp == code);
        if !in_use {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::driver::DriverStatus;

    fn seed_driver(state: &AppState, lat: f64, lng: f64, class: VehicleClass) -> Uuid {
        let id = Uuid::new_v4();
        state.drivers.insert(
            id,
            Driver {
                id,
                name: "driver".to_string(),
                plate: "ISB-100".to_string(),
                vehicle_class: class,
                location: GeoPoint { lat, lng },
                status: DriverStatus::Available,
                updated_at: Utc::now(),
            },
        );
        id
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
    async fn quotes_cover_every_class() {
        let state = AppState::with_defaults();
        seed_driver(&state, 33.6844, 73.0479, VehicleClass::Car);

        let set = request_quotes(&state, Uuid::new_v4(), pickup(), destination())
            .await
            .unwrap();
        assert_eq!(set.quotes.len(), VehicleClass::ALL.len());

        let car = set.quote_for(VehicleClass::Car).unwrap();
        assert!(car.available);
        assert_eq!(car.count, 1);
        assert!(car.eta_seconds.is_some());
        assert!(car.distance_meters.is_some());

        // No motorcycles anywhere: not available, but still priced.
        let moto = set.quote_for(VehicleClass::Motorcycle).unwrap();
        assert!(!moto.available);
        assert_eq!(moto.count, 0);
        assert!(moto.eta_seconds.is_none());
        assert!(moto.distance_meters.is_none());
        assert!(moto.fare > 0.0);
    }

    #[tokio::test]
    async fn quote_rejects_invalid_pickup() {
        let state = AppState::with_defaults();
        let err = request_quotes(
            &state,
            Uuid::new_v4(),
            GeoPoint { lat: 120.0, lng: 0.0 },
            destination(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidCoordinate(_)));
    }

    #[tokio::test]
    async fn confirm_without_quote_is_stale() {
        let state = AppState::with_defaults();
        let err = confirm(&state, Uuid::new_v4(), VehicleClass::Car)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::StaleQuote));
    }

    #[tokio::test]
    async fn confirm_with_expired_quote_is_stale() {
        let state = AppState::with_defaults();
        seed_driver(&state, 33.6844, 73.0479, VehicleClass::Car);

        let rider = Uuid::new_v4();
        request_quotes(&state, rider, pickup(), destination())
            .await
            .unwrap();

        // Age the session past the staleness window.
        state
            .quote_sessions
            .get_mut(&rider)
            .unwrap()
            .created_at = Utc::now() - ChronoDuration::seconds(120);

        let err = confirm(&state, rider, VehicleClass::Car).await.unwrap_err();
        assert!(matches!(err, DispatchError::StaleQuote));
        assert!(state.quote_sessions.get(&rider).is_none());
    }

    #[tokio::test]
    async fn confirm_claims_driver_and_creates_ride() {
        let state = AppState::with_defaults();
        let driver_id = seed_driver(&state, 33.6844, 73.0479, VehicleClass::Car);

        let rider = Uuid::new_v4();
        let set = request_quotes(&state, rider, pickup(), destination())
            .await
            .unwrap();
        let quoted_fare = set.quote_for(VehicleClass::Car).unwrap().fare;

        let ride = confirm(&state, rider, VehicleClass::Car).await.unwrap();
        assert_eq!(ride.driver_id, driver_id);
        assert_eq!(ride.status, RideStatus::Requested);
        assert_eq!(ride.fare, quoted_fare);
        assert_eq!(ride.otp.len(), 6);
        assert!(ride.otp.chars().all(|c| c.is_ascii_digit()));

        assert_eq!(
            state.drivers.get(&driver_id).unwrap().status,
            DriverStatus::Claimed
        );
        // Session consumed; a second confirm must re-quote.
        let err = confirm(&state, rider, VehicleClass::Car).await.unwrap_err();
        assert!(matches!(err, DispatchError::StaleQuote));
    }

    #[tokio::test]
    async fn confirm_with_no_dispatchable_driver_fails_cleanly() {
        let state = AppState::with_defaults();
        let driver_id = seed_driver(&state, 33.6844, 73.0479, VehicleClass::Car);

        let rider = Uuid::new_v4();
        request_quotes(&state, rider, pickup(), destination())
            .await
            .unwrap();

        // Driver goes offline between quote and confirm.
        registry::set_availability(&state, driver_id, DriverStatus::Offline).unwrap();

        let err = confirm(&state, rider, VehicleClass::Car).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoDriverAvailable));
        assert!(state.rides.is_empty());
    }

    #[tokio::test]
    async fn contended_claim_falls_through_to_next_candidate() {
        let state = AppState::with_defaults();
        let near = seed_driver(&state, 33.6900, 73.0500, VehicleClass::Car);
        let far = seed_driver(&state, 33.6600, 73.0200, VehicleClass::Car);

        let rider = Uuid::new_v4();
        request_quotes(&state, rider, pickup(), destination())
            .await
            .unwrap();

        // The nearest driver is snatched by someone else first.
        assert!(registry::try_claim(&state, near));

        let ride = confirm(&state, rider, VehicleClass::Car).await.unwrap();
        assert_eq!(ride.driver_id, far);
    }

    #[tokio::test]
    async fn active_rides_never_share_an_otp() {
        let state = AppState::with_defaults();
        for i in 0..20 {
            seed_driver(
                &state,
                33.6844 + f64::from(i) * 1e-4,
                73.0479,
                VehicleClass::Car,
            );
        }

        let mut otps = std::collections::HashSet::new();
        for _ in 0..20 {
            let rider = Uuid::new_v4();
            request_quotes(&state, rider, pickup(), destination())
                .await
                .unwrap();
            let ride = confirm(&state, rider, VehicleClass::Car).await.unwrap();
            assert!(otps.insert(ride.otp), "duplicate otp among active rides");
        }
    }
}
