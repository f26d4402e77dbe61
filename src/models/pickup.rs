use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    InProcess,
    PendingApproval,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::InProcess => "in-process",
            RequestStatus::PendingApproval => "pending-approval",
            RequestStatus::Completed => "completed",
        }
    }

    /// Whether a record in this status carries items and a total.
    pub fn carries_items(&self) -> bool {
        matches!(
            self,
            RequestStatus::PendingApproval | RequestStatus::Completed
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl PickupItem {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub partner_id: Option<Uuid>,
    pub partner_name: Option<String>,
    pub pickup_date: NaiveDate,
    pub time_slot: String,
    pub address: String,
    pub map_link: Option<String>,
    pub status: RequestStatus,
    pub pickup_code: Option<String>,
    pub items: Option<Vec<PickupItem>>,
    pub total_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Everything a new request needs except the fields the store assigns.
#[derive(Debug, Clone)]
pub struct PickupDraft {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_date: NaiveDate,
    pub time_slot: String,
    pub address: String,
    pub map_link: Option<String>,
}

/// Fields merged into a record alongside a status change. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub partner_id: Option<Uuid>,
    pub partner_name: Option<String>,
    pub items: Option<Vec<PickupItem>>,
    pub total_amount: Option<f64>,
}

impl StatusUpdate {
    pub fn assign_partner(partner_id: Uuid, partner_name: impl Into<String>) -> Self {
        Self {
            partner_id: Some(partner_id),
            partner_name: Some(partner_name.into()),
            ..Self::default()
        }
    }

    pub fn attach_items(items: Vec<PickupItem>, total_amount: f64) -> Self {
        Self {
            items: Some(items),
            total_amount: Some(total_amount),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PickupItem, RequestStatus};

    #[test]
    fn status_serializes_in_kebab_case() {
        let json = serde_json::to_string(&RequestStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"pending-approval\"");

        let parsed: RequestStatus = serde_json::from_str("\"in-process\"").unwrap();
        assert_eq!(parsed, RequestStatus::InProcess);
    }

    #[test]
    fn only_late_statuses_carry_items() {
        assert!(!RequestStatus::Pending.carries_items());
        assert!(!RequestStatus::Accepted.carries_items());
        assert!(!RequestStatus::InProcess.carries_items());
        assert!(RequestStatus::PendingApproval.carries_items());
        assert!(RequestStatus::Completed.carries_items());
    }

    #[test]
    fn line_total_multiplies_quantity_by_price() {
        let item = PickupItem {
            name: "Copper Wire".to_string(),
            quantity: 2,
            unit_price: 50.0,
        };
        assert_eq!(item.line_total(), 100.0);
    }
}
