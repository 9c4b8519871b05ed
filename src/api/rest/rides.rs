use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{dispatch, lifecycle};
use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::driver::VehicleClass;
use crate::models::quote::QuoteSet;
use crate::models::ride::{CancelActor, Ride};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", post(request_quotes))
        .route("/rides/confirm", post(confirm_ride))
        .route("/rides/:id", get(get_ride))
        .route("/rides/:id/accept", post(accept_ride))
        .route("/rides/:id/verify-otp", post(verify_otp))
        .route("/rides/:id/complete", post(complete_ride))
        .route("/rides/:id/cancel", post(cancel_ride))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub rider_id: Uuid,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub rider_id: Uuid,
    pub vehicle_class: VehicleClass,
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub otp: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub actor: CancelActor,
}

async fn request_quotes(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteSet>, DispatchError> {
    let quotes =
        dispatch::request_quotes(&state, payload.rider_id, payload.pickup, payload.destination)
            .await?;
    Ok(Json(quotes))
}

async fn confirm_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<Ride>, DispatchError> {
    let ride = dispatch::confirm(&state, payload.rider_id, payload.vehicle_class).await?;
    Ok(Json(ride))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, DispatchError> {
    let ride = state
        .rides
        .get(&id)
        .ok_or_else(|| DispatchError::NotFound(format!("ride {id} not found")))?;

    Ok(Json(ride.value().clone()))
}

async fn accept_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<Ride>, DispatchError> {
    let ride = lifecycle::accept_ride(&state, id, payload.driver_id)?;
    Ok(Json(ride))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<Ride>, DispatchError> {
    let ride = lifecycle::verify_otp(&state, id, &payload.otp)?;
    Ok(Json(ride))
}

async fn complete_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, DispatchError> {
    let ride = lifecycle::complete_ride(&state, id)?;
    Ok(Json(ride))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Ride>, DispatchError> {
    let ride = lifecycle::cancel_ride(&state, id, payload.actor)?;
    Ok(Json(ride))
}
