//! Order line snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One validated cart line, frozen at order-creation time.
///
/// Carries the product name and unit price as they were when the order
/// was written, so later catalog edits never change a historical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Catalog product id.
    #[serde(rename = "id")]
    pub product_id: String,
    /// Product display name.
    pub name: String,
    /// Unit price in whole currency units.
    #[serde(rename = "price", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
}

impl OrderLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            product_id: "prod_001".to_owned(),
            name: "HEART BEAT ARM SLEEVE".to_owned(),
            unit_price: Decimal::new(37, 0),
            quantity: 3,
            selected_size: None,
        };
        assert_eq!(line.line_total(), Decimal::new(111, 0));
    }

    #[test]
    fn test_snapshot_keys() {
        let line: OrderLine = serde_json::from_value(serde_json::json!({
            "id": "prod_006",
            "name": "TRACK ATHLETE T-SHIRT",
            "price": 49.0,
            "quantity": 1,
            "selectedSize": "M"
        }))
        .unwrap();
        assert_eq!(line.unit_price, Decimal::new(49, 0));
        assert_eq!(line.selected_size.as_deref(), Some("M"));

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["id"], "prod_006");
        assert_eq!(json["selectedSize"], "M");
    }
}
