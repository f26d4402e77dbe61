use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::RequestEvent;
use crate::models::identity::{Identity, Role};
use crate::models::pickup::RequestStatus;
use crate::state::AppState;

/// Browsers cannot set headers on a websocket handshake, so the session
/// token travels in the query string.
#[derive(Deserialize)]
pub struct WsParams {
    pub token: Uuid,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = state.sessions.resolve(params.token)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, viewer)))
}

/// Whether `viewer` should hear about `event`.
pub fn concerns(viewer: &Identity, event: &RequestEvent) -> bool {
    match viewer.role {
        Role::Customer => event.customer_id == viewer.id,
        Role::Partner => {
            event.status == RequestStatus::Pending || event.partner_id == Some(viewer.id)
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, viewer: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.request_events_tx.subscribe();

    info!(user_id = %viewer.id, "websocket client connected");

    let user_id = viewer.id;
    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %viewer.id, skipped, "websocket client lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !concerns(&viewer, &event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize request event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(user_id = %user_id, "websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::concerns;
    use crate::models::event::RequestEvent;
    use crate::models::identity::{Identity, Role};
    use crate::models::pickup::RequestStatus;

    fn identity(seed: u128, role: Role) -> Identity {
        Identity {
            id: Uuid::from_u128(seed),
            phone: "+1234567890".to_string(),
            name: "Test".to_string(),
            role,
        }
    }

    fn event(customer: u128, partner: Option<u128>, status: RequestStatus) -> RequestEvent {
        RequestEvent {
            request_id: Uuid::new_v4(),
            customer_id: Uuid::from_u128(customer),
            partner_id: partner.map(Uuid::from_u128),
            status,
            at: Utc::now(),
        }
    }

    #[test]
    fn customers_only_hear_about_their_requests() {
        let customer = identity(1, Role::Customer);
        assert!(concerns(&customer, &event(1, None, RequestStatus::Pending)));
        assert!(!concerns(&customer, &event(2, None, RequestStatus::Pending)));
    }

    #[test]
    fn partners_hear_open_requests_and_their_own_jobs() {
        let partner = identity(7, Role::Partner);
        assert!(concerns(&partner, &event(1, None, RequestStatus::Pending)));
        assert!(concerns(&partner, &event(1, Some(7), RequestStatus::InProcess)));
        assert!(!concerns(&partner, &event(1, Some(8), RequestStatus::Accepted)));
    }
}
