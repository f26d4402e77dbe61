use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::items::price_items;
use crate::engine::pickup_code::code_matches;
use crate::engine::schedule::{build_draft, ScheduleInput};
use crate::engine::transition::{evaluate, SideEffect, Trigger};
use crate::error::AppError;
use crate::models::event::RequestEvent;
use crate::models::identity::{Identity, Role};
use crate::models::pickup::{
    PickupDraft, PickupItem, PickupRequest, RequestStatus, StatusUpdate,
};
use crate::state::AppState;

pub fn schedule_pickup(
    state: &AppState,
    customer: &Identity,
    input: ScheduleInput,
) -> Result<PickupRequest, AppError> {
    if customer.role != Role::Customer {
        return Err(AppError::Forbidden(
            "only customers can schedule pickups".to_string(),
        ));
    }

    let draft = build_draft(customer, input)?;
    let request = state.requests.create(draft)?;

    state.metrics.requests_created_total.inc();
    state.metrics.pickup_requests.set(state.requests.len() as i64);
    publish(state, &request);

    info!(
        request_id = %request.id,
        customer_id = %customer.id,
        pickup_date = %request.pickup_date,
        "pickup scheduled"
    );

    Ok(request)
}

pub fn accept_request(
    state: &AppState,
    partner: &Identity,
    id: Uuid,
) -> Result<PickupRequest, AppError> {
    apply(state, partner, id, Trigger::Accept, Payload::default(), |_| Ok(()))
}

/// Moves an accepted request into service once the partner presents the
/// customer's pickup code.
pub fn start_pickup(
    state: &AppState,
    partner: &Identity,
    id: Uuid,
    code: &str,
) -> Result<PickupRequest, AppError> {
    let payload = Payload {
        code: Some(code),
        ..Payload::default()
    };
    apply(state, partner, id, Trigger::Start, payload, |current| {
        ensure_assigned(current, partner)
    })
}

pub fn submit_items(
    state: &AppState,
    partner: &Identity,
    id: Uuid,
    items: Vec<PickupItem>,
) -> Result<PickupRequest, AppError> {
    let payload = Payload {
        items: Some(items),
        ..Payload::default()
    };
    apply(state, partner, id, Trigger::SubmitItems, payload, |current| {
        ensure_assigned(current, partner)
    })
}

pub fn approve_request(
    state: &AppState,
    customer: &Identity,
    id: Uuid,
) -> Result<PickupRequest, AppError> {
    apply(state, customer, id, Trigger::Approve, Payload::default(), |current| {
        ensure_owner(current, customer)
    })
}

/// Sends a submission back to the partner. The request returns to
/// `accepted` with its original pickup code and without the rejected items.
pub fn reject_request(
    state: &AppState,
    customer: &Identity,
    id: Uuid,
) -> Result<PickupRequest, AppError> {
    apply(state, customer, id, Trigger::Reject, Payload::default(), |current| {
        ensure_owner(current, customer)
    })
}

/// Returns the request as `viewer` may see it. Customers see their own
/// requests; partners see open requests and the ones they hold, without the
/// pickup code they are supposed to collect from the customer.
pub fn view_request(
    state: &AppState,
    viewer: &Identity,
    id: Uuid,
) -> Result<PickupRequest, AppError> {
    let request = state.requests.get(id)?;

    let visible = match viewer.role {
        Role::Customer => request.customer_id == viewer.id,
        Role::Partner => {
            request.status == RequestStatus::Pending || request.partner_id == Some(viewer.id)
        }
    };

    if !visible {
        return Err(AppError::Forbidden(format!(
            "pickup request {id} is not visible to this user"
        )));
    }

    Ok(redact_for(viewer, request))
}

pub fn redact_for(viewer: &Identity, mut request: PickupRequest) -> PickupRequest {
    if viewer.role == Role::Partner {
        request.pickup_code = None;
    }
    request
}

/// Adds the sample request new installs start with, if the store is empty.
pub fn seed_demo_data(state: &AppState) -> Result<(), AppError> {
    if !state.requests.is_empty() {
        return Ok(());
    }

    let pickup_date = NaiveDate::from_ymd_opt(2024, 7, 10)
        .ok_or_else(|| AppError::Internal("invalid seed date".to_string()))?;

    let request = state.requests.create(PickupDraft {
        customer_id: Uuid::nil(),
        customer_name: "John Doe".to_string(),
        customer_phone: "+1234567890".to_string(),
        pickup_date,
        time_slot: "10:00 AM - 11:00 AM".to_string(),
        address: "123 Main St, City, State".to_string(),
        map_link: Some("https://maps.google.com".to_string()),
    })?;

    state.metrics.pickup_requests.set(state.requests.len() as i64);
    info!(request_id = %request.id, "seeded demo pickup request");
    Ok(())
}

/// Operation input consumed by the side effect of the chosen edge.
#[derive(Default)]
struct Payload<'a> {
    code: Option<&'a str>,
    items: Option<Vec<PickupItem>>,
}

/// Performs `trigger` for `actor`: the edge is looked up first, then the
/// operation's own `check`, then the edge's side effect builds the update.
fn apply<F>(
    state: &AppState,
    actor: &Identity,
    id: Uuid,
    trigger: Trigger,
    payload: Payload<'_>,
    check: F,
) -> Result<PickupRequest, AppError>
where
    F: FnOnce(&PickupRequest) -> Result<(), AppError>,
{
    let result = state.requests.transition(id, |current| {
        let step = evaluate(current.status, trigger, actor.role)?;
        check(current)?;
        let update = side_effect_update(step.effect, current, actor, payload)?;
        Ok((step.to, update))
    });

    match &result {
        Ok(request) => {
            state.metrics.record_transition(trigger.as_str(), "success");
            publish(state, request);
            info!(
                request_id = %id,
                user_id = %actor.id,
                status = %request.status,
                trigger = %trigger,
                "pickup request transitioned"
            );
        }
        Err(err) => {
            state.metrics.record_transition(trigger.as_str(), "error");
            warn!(
                request_id = %id,
                user_id = %actor.id,
                trigger = %trigger,
                error = %err,
                "pickup transition refused"
            );
        }
    }

    result
}

fn side_effect_update(
    effect: SideEffect,
    current: &PickupRequest,
    actor: &Identity,
    payload: Payload<'_>,
) -> Result<StatusUpdate, AppError> {
    match effect {
        SideEffect::AssignPartner => Ok(StatusUpdate::assign_partner(
            actor.id,
            actor.name.clone(),
        )),
        SideEffect::VerifyPickupCode => {
            let stored = current.pickup_code.as_deref().unwrap_or_default();
            let supplied = payload.code.unwrap_or_default();
            if stored.is_empty() || !code_matches(stored, supplied) {
                return Err(AppError::Forbidden("invalid pickup code".to_string()));
            }
            Ok(StatusUpdate::default())
        }
        SideEffect::AttachItems => {
            let (items, total) = price_items(payload.items.unwrap_or_default())?;
            Ok(StatusUpdate::attach_items(items, total))
        }
        SideEffect::None => Ok(StatusUpdate::default()),
    }
}

fn ensure_assigned(request: &PickupRequest, partner: &Identity) -> Result<(), AppError> {
    if request.partner_id == Some(partner.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "request is assigned to another partner".to_string(),
        ))
    }
}

fn ensure_owner(request: &PickupRequest, customer: &Identity) -> Result<(), AppError> {
    if request.customer_id == customer.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "request belongs to another customer".to_string(),
        ))
    }
}

fn publish(state: &AppState, request: &PickupRequest) {
    let _ = state
        .request_events_tx
        .send(RequestEvent::from_request(request));
}
