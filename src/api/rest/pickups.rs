use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::auth::current_identity;
use crate::api::rest::blocking;
use crate::engine::lifecycle;
use crate::engine::schedule::ScheduleInput;
use crate::error::AppError;
use crate::models::identity::{Identity, Role};
use crate::models::pickup::{PickupItem, PickupRequest};
use crate::state::AppState;
use crate::store::{newest_first, PartnerStats};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pickups", post(schedule_pickup).get(list_pickups))
        .route("/pickups/pending", get(list_pending))
        .route("/pickups/feed", get(partner_feed))
        .route("/pickups/stats", get(partner_stats))
        .route("/pickups/:id", get(get_pickup))
        .route("/pickups/:id/accept", post(accept_pickup))
        .route("/pickups/:id/start", post(start_pickup))
        .route("/pickups/:id/items", post(submit_items))
        .route("/pickups/:id/approve", post(approve_pickup))
        .route("/pickups/:id/reject", post(reject_pickup))
}

#[derive(Deserialize)]
pub struct SchedulePickupRequest {
    pub pickup_date: String,
    pub time_slot: String,
    pub address: String,
    pub map_link: Option<String>,
}

#[derive(Deserialize)]
pub struct StartPickupRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct SubmitItemsRequest {
    pub items: Vec<PickupItem>,
}

fn require_partner(identity: &Identity) -> Result<(), AppError> {
    if identity.role == Role::Partner {
        Ok(())
    } else {
        Err(AppError::Forbidden("partners only".to_string()))
    }
}

fn for_viewer(viewer: &Identity, requests: Vec<PickupRequest>) -> Vec<PickupRequest> {
    requests
        .into_iter()
        .map(|request| lifecycle::redact_for(viewer, request))
        .collect()
}

async fn schedule_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SchedulePickupRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    let customer = current_identity(&state, &headers)?;
    let input = ScheduleInput {
        pickup_date: payload.pickup_date,
        time_slot: payload.time_slot,
        address: payload.address,
        map_link: payload.map_link,
    };
    let request = blocking(&state, move |state| {
        lifecycle::schedule_pickup(state, &customer, input)
    })
    .await?;

    Ok(Json(request))
}

/// A customer's order history, or the jobs a partner holds, newest first.
async fn list_pickups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let viewer = current_identity(&state, &headers)?;
    let requests = match viewer.role {
        Role::Customer => state.requests.filter_by_customer(viewer.id),
        Role::Partner => state.requests.filter_by_partner(viewer.id),
    };

    Ok(Json(for_viewer(&viewer, newest_first(requests))))
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let partner = current_identity(&state, &headers)?;
    require_partner(&partner)?;

    Ok(Json(for_viewer(&partner, state.requests.filter_pending())))
}

async fn partner_feed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let partner = current_identity(&state, &headers)?;
    require_partner(&partner)?;

    Ok(Json(for_viewer(
        &partner,
        state.requests.partner_feed(partner.id),
    )))
}

async fn partner_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PartnerStats>, AppError> {
    let partner = current_identity(&state, &headers)?;
    require_partner(&partner)?;

    Ok(Json(state.requests.partner_stats(partner.id)))
}

async fn get_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let viewer = current_identity(&state, &headers)?;
    Ok(Json(lifecycle::view_request(&state, &viewer, id)?))
}

async fn accept_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let partner = current_identity(&state, &headers)?;
    let viewer = partner.clone();
    let request = blocking(&state, move |state| {
        lifecycle::accept_request(state, &partner, id)
    })
    .await?;
    Ok(Json(lifecycle::redact_for(&viewer, request)))
}

async fn start_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartPickupRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    let partner = current_identity(&state, &headers)?;
    let viewer = partner.clone();
    let request = blocking(&state, move |state| {
        lifecycle::start_pickup(state, &partner, id, &payload.code)
    })
    .await?;
    Ok(Json(lifecycle::redact_for(&viewer, request)))
}

async fn submit_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitItemsRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    let partner = current_identity(&state, &headers)?;
    let viewer = partner.clone();
    let request = blocking(&state, move |state| {
        lifecycle::submit_items(state, &partner, id, payload.items)
    })
    .await?;
    Ok(Json(lifecycle::redact_for(&viewer, request)))
}

async fn approve_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let customer = current_identity(&state, &headers)?;
    let request = blocking(&state, move |state| {
        lifecycle::approve_request(state, &customer, id)
    })
    .await?;
    Ok(Json(request))
}

async fn reject_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let customer = current_identity(&state, &headers)?;
    let request = blocking(&state, move |state| {
        lifecycle::reject_request(state, &customer, id)
    })
    .await?;
    Ok(Json(request))
}
