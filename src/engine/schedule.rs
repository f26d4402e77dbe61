use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::identity::Identity;
use crate::models::pickup::PickupDraft;

pub const TIME_SLOTS: [&str; 8] = [
    "9:00 AM - 10:00 AM",
    "10:00 AM - 11:00 AM",
    "11:00 AM - 12:00 PM",
    "12:00 PM - 1:00 PM",
    "2:00 PM - 3:00 PM",
    "3:00 PM - 4:00 PM",
    "4:00 PM - 5:00 PM",
    "5:00 PM - 6:00 PM",
];

/// Raw scheduling input as a customer submits it.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    pub pickup_date: String,
    pub time_slot: String,
    pub address: String,
    pub map_link: Option<String>,
}

pub fn build_draft(customer: &Identity, input: ScheduleInput) -> Result<PickupDraft, AppError> {
    let pickup_date = NaiveDate::parse_from_str(input.pickup_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("pickup date must be YYYY-MM-DD".to_string()))?;

    let time_slot = input.time_slot.trim();
    if !TIME_SLOTS.contains(&time_slot) {
        return Err(AppError::BadRequest(format!(
            "unknown time slot: {time_slot}"
        )));
    }

    let address = input.address.trim();
    if address.is_empty() {
        return Err(AppError::BadRequest("address cannot be empty".to_string()));
    }

    let map_link = match input.map_link.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(link) if link.starts_with("https://") || link.starts_with("http://") => {
            Some(link.to_string())
        }
        Some(_) => {
            return Err(AppError::BadRequest(
                "map link must be an http(s) URL".to_string(),
            ))
        }
    };

    Ok(PickupDraft {
        customer_id: customer.id,
        customer_name: customer.name.clone(),
        customer_phone: customer.phone.clone(),
        pickup_date,
        time_slot: time_slot.to_string(),
        address: address.to_string(),
        map_link,
    })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{build_draft, ScheduleInput};
    use crate::error::AppError;
    use crate::models::identity::{Identity, Role};

    fn customer() -> Identity {
        Identity {
            id: Uuid::from_u128(1),
            phone: "+1234567890".to_string(),
            name: "John Doe".to_string(),
            role: Role::Customer,
        }
    }

    fn input(date: &str, slot: &str, address: &str, map_link: Option<&str>) -> ScheduleInput {
        ScheduleInput {
            pickup_date: date.to_string(),
            time_slot: slot.to_string(),
            address: address.to_string(),
            map_link: map_link.map(str::to_string),
        }
    }

    #[test]
    fn valid_input_copies_customer_details() {
        let draft = build_draft(
            &customer(),
            input("2024-07-10", "10:00 AM - 11:00 AM", "123 Main St", None),
        )
        .unwrap();

        assert_eq!(draft.customer_id, Uuid::from_u128(1));
        assert_eq!(draft.customer_name, "John Doe");
        assert_eq!(draft.pickup_date.to_string(), "2024-07-10");
        assert_eq!(draft.map_link, None);
    }

    #[test]
    fn blank_map_link_is_dropped() {
        let draft = build_draft(
            &customer(),
            input("2024-07-10", "9:00 AM - 10:00 AM", "123 Main St", Some("  ")),
        )
        .unwrap();
        assert_eq!(draft.map_link, None);
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = [
            input("10/07/2024", "10:00 AM - 11:00 AM", "123 Main St", None),
            input("2024-07-10", "1:00 PM - 2:00 PM", "123 Main St", None),
            input("2024-07-10", "10:00 AM - 11:00 AM", "   ", None),
            input("2024-07-10", "10:00 AM - 11:00 AM", "123 Main St", Some("maps")),
        ];

        for case in cases {
            let err = build_draft(&customer(), case).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }
}
