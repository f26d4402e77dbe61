use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::pickup::{PickupRequest, RequestStatus};

/// Broadcast to websocket subscribers whenever a request is created or changes status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEvent {
    pub request_id: Uuid,
    pub customer_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub status: RequestStatus,
    pub at: DateTime<Utc>,
}

impl RequestEvent {
    pub fn from_request(request: &PickupRequest) -> Self {
        Self {
            request_id: request.id,
            customer_id: request.customer_id,
            partner_id: request.partner_id,
            status: request.status,
            at: Utc::now(),
        }
    }
}
