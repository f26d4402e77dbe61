use crate::error::AppError;
use crate::models::pickup::PickupItem;

/// Drops rows with a blank name or zero quantity and prices the rest.
/// Returns the kept items and their total.
pub fn price_items(items: Vec<PickupItem>) -> Result<(Vec<PickupItem>, f64), AppError> {
    let mut kept = Vec::with_capacity(items.len());

    for mut item in items {
        if item.name.trim().is_empty() || item.quantity == 0 {
            continue;
        }

        if !item.unit_price.is_finite() || item.unit_price < 0.0 || !item.line_total().is_finite()
        {
            return Err(AppError::BadRequest(format!(
                "invalid price for {}",
                item.name.trim()
            )));
        }

        item.name = item.name.trim().to_string();
        kept.push(item);
    }

    if kept.is_empty() {
        return Err(AppError::BadRequest(
            "at least one item is required".to_string(),
        ));
    }

    let total: f64 = kept.iter().map(PickupItem::line_total).sum();
    if !total.is_finite() {
        return Err(AppError::BadRequest("total amount is out of range".to_string()));
    }

    Ok((kept, total))
}
