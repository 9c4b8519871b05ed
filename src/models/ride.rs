use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::driver::VehicleClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideStatus {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Rides in these states hold a claimed driver and a live OTP.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelActor {
    Rider,
    Driver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    /// Set exactly once, at creation (the moment of a successful claim),
    /// and never reassigned.
    pub driver_id: Uuid,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    pub vehicle_class: VehicleClass,
    /// Fixed at creation; not recomputed at completion.
    pub fare: f64,
    pub otp: String,
    pub status: RideStatus,
    pub cancelled_by: Option<CancelActor>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Lifecycle notification pushed to connected clients over the real-time
/// channel. Delivery is fire-and-forget; losing an event never fails the
/// transition that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "ride")]
pub enum RideEvent {
    RideRequested(Ride),
    RideAccepted(Ride),
    RideStarted(Ride),
    RideCompleted(Ride),
    RideCancelled(Ride),
}

impl Ride {
    /// `Requested -> Accepted`, by the claimed driver only.
    pub fn accept(&mut self, driver_id: Uuid) -> Result<(), DispatchError> {
        if driver_id != self.driver_id {
            return Err(DispatchError::NotFound(format!(
                "driver {driver_id} is not assigned to ride {}",
                self.id
            )));
        }
        if self.status != RideStatus::Requested {
            return Err(DispatchError::InvalidTransition(format!(
                "cannot accept ride in state {:?}",
                self.status
            )));
        }
        self.status = RideStatus::Accepted;
        self.accepted_at = Some(Utc::now());
        Ok(())
    }

    /// `Accepted -> InProgress` on an exact OTP match. A mismatch leaves the
    /// ride in `Accepted` so the check can be retried.
    pub fn verify_otp(&mut self, otp: &str) -> Result<(), DispatchError> {
        if self.status != RideStatus::Accepted {
            return Err(DispatchError::InvalidTransition(format!(
                "cannot verify otp for ride in state {:?}",
                self.status
            )));
        }
        if otp != self.otp {
            return Err(DispatchError::OtpMismatch);
        }
        self.status = RideStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `InProgress -> Completed`.
    pub fn complete(&mut self) -> Result<(), DispatchError> {
        if self.status != RideStatus::InProgress {
            return Err(DispatchError::InvalidTransition(format!(
                "cannot complete ride in state {:?}",
                self.status
            )));
        }
        self.status = RideStatus::Completed;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// `Requested | Accepted -> Cancelled`.
    pub fn cancel(&mut self, actor: CancelActor) -> Result<(), DispatchError> {
        if !matches!(self.status, RideStatus::Requested | RideStatus::Accepted) {
            return Err(DispatchError::InvalidTransition(format!(
                "cannot cancel ride in state {:?}",
                self.status
            )));
        }
        self.status = RideStatus::Cancelled;
        self.cancelled_by = Some(actor);
        self.ended_at = Some(Utc::now());
        Ok(())
    }
}
