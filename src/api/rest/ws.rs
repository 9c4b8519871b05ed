use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::ride::Ride;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Sent once on connect so a client joining mid-stream knows the rides
/// currently in flight before live events start arriving.
#[derive(Debug, Serialize)]
struct ActiveRidesSnapshot {
    event: &'static str,
    rides: Vec<Ride>,
}

fn active_rides_snapshot(state: &AppState) -> ActiveRidesSnapshot {
    let rides = state
        .rides
        .iter()
        .filter(|entry| entry.value().status.is_active())
        .map(|entry| entry.value().clone())
        .collect();

    ActiveRidesSnapshot {
        event: "Snapshot",
        rides,
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before snapshotting so transitions landing in between are
    // not lost; a client may see a transition it already knows about from
    // the snapshot, which is harmless.
    let mut rx = state.ride_events_tx.subscribe();

    info!("websocket client connected");

    let snapshot = active_rides_snapshot(&state);
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                info!("websocket client disconnected");
                return;
            }
        }
        Err(err) => warn!(error = %err, "failed to serialize ride snapshot for ws"),
    }

    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize ride event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::active_rides_snapshot;
    use crate::geo::GeoPoint;
    use crate::models::driver::VehicleClass;
    use crate::models::ride::{Ride, RideStatus};
    use crate::state::AppState;

    fn seed_ride(state: &AppState, status: RideStatus) -> Uuid {
        let id = Uuid::new_v4();
        state.rides.insert(
            id,
            Ride {
                id,
                rider_id: Uuid::new_v4(),
                driver_id: Uuid::new_v4(),
                pickup: GeoPoint {
                    lat: 33.69,
                    lng: 73.05,
                },
                destination: GeoPoint {
                    lat: 33.72,
                    lng: 73.09,
                },
                vehicle_class: VehicleClass::Car,
                fare: 160.0,
                otp: "246801".to_string(),
                status,
                cancelled_by: None,
                created_at: Utc::now(),
                accepted_at: None,
                started_at: None,
                ended_at: None,
            },
        );
        id
    }

    #[test]
    fn snapshot_contains_only_active_rides() {
        let state = AppState::with_defaults();
        let requested = seed_ride(&state, RideStatus::Requested);
        let in_progress = seed_ride(&state, RideStatus::InProgress);
        seed_ride(&state, RideStatus::Completed);
        seed_ride(&state, RideStatus::Cancelled);

        let snapshot = active_rides_snapshot(&state);
        assert_eq!(snapshot.event, "Snapshot");
        assert_eq!(snapshot.rides.len(), 2);

        let ids: Vec<Uuid> = snapshot.rides.iter().map(|r| r.id).collect();
        assert!(ids.contains(&requested));
        assert!(ids.contains(&in_progress));
    }

    #[test]
    fn snapshot_serializes_with_event_tag() {
        let state = AppState::with_defaults();
        seed_ride(&state, RideStatus::Accepted);

        let json = serde_json::to_string(&active_rides_snapshot(&state)).unwrap();
        assert!(json.contains("\"event\":\"Snapshot\""));
        assert!(json.contains("\"status\":\"Accepted\""));
    }
}
