//! Ride lifecycle orchestration. Transition rules themselves live on
//! [`Ride`]; this layer looks rides up, applies the transition, releases
//! the driver when a ride reaches a terminal state, and publishes events.

use tracing::info;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::ride::{CancelActor, Ride, RideEvent};
use crate::registry;
use crate::state::AppState;

fn with_ride<F>(state: &AppState, ride_id: Uuid, apply: F) -> Result<Ride, DispatchError>
where
    F: FnOnce(&mut Ride) -> Result<(), DispatchError>,
{
    let mut entry = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| DispatchError::NotFound(format!("ride {ride_id} not found")))?;

    apply(entry.value_mut())?;
    Ok(entry.value().clone())
}

pub fn accept_ride(
    state: &AppState,
    ride_id: Uuid,
    driver_id: Uuid,
) -> Result<Ride, DispatchError> {
    let ride = with_ride(state, ride_id, |r| r.accept(driver_id))?;

    info!(ride_id = %ride.id, driver_id = %driver_id, "ride accepted");
    state.publish(RideEvent::RideAccepted(ride.clone()));
    Ok(ride)
}

pub fn verify_otp(state: &AppState, ride_id: Uuid, otp: &str) -> Result<Ride, DispatchError> {
    let ride = with_ride(state, ride_id, |r| r.verify_otp(otp))?;

    info!(ride_id = %ride.id, "otp verified, ride started");
    state.publish(RideEvent::RideStarted(ride.clone()));
    Ok(ride)
}

/// Settles the ride at the fare fixed at creation and returns the driver to
/// the dispatchable pool.
pub fn complete_ride(state: &AppState, ride_id: Uuid) -> Result<Ride, DispatchError> {
    let ride = with_ride(state, ride_id, Ride::complete)?;

    registry::release(state, ride.driver_id);

    info!(ride_id = %ride.id, fare = ride.fare, "ride completed");
    state.publish(RideEvent::RideCompleted(ride.clone()));
    Ok(ride)
}

pub fn cancel_ride(
    state: &AppState,
    ride_id: Uuid,
    actor: CancelActor,
) -> Result<Ride, DispatchError> {
    let ride = with_ride(state, ride_id, |r| r.cancel(actor))?;

    registry::release(state, ride.driver_id);

    info!(ride_id = %ride.id, actor = ?actor, "ride cancelled");
    state.publish(RideEvent::RideCancelled(ride.clone()));
    Ok(ride)
}
