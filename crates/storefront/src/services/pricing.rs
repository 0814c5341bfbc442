//! Cart price validation.
//!
//! The only place an order total is computed. Client carts name products
//! and quantities; every amount comes from the [`Catalog`]. Any client-sent
//! total or unit price is ignored.

use rust_decimal::Decimal;
use serde_json::Value;

use aerox_core::OrderLine;

use crate::catalog::Catalog;

/// Error reported when the cart itself is unusable.
pub const EMPTY_CART: &str = "Items array is required and must not be empty.";

/// Outcome of validating a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceValidation {
    /// `true` iff every line was well-formed.
    pub valid: bool,
    /// Sum of `price * quantity` over the cart; zero when invalid.
    pub total: Decimal,
    /// One message per rejected line, in cart order.
    pub errors: Vec<String>,
    /// Snapshot lines for the order; empty when invalid.
    pub lines: Vec<OrderLine>,
}

impl PriceValidation {
    fn rejected(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            total: Decimal::ZERO,
            errors,
            lines: Vec::new(),
        }
    }
}

/// Validate a raw `items` value against the catalog.
///
/// Lines are priced independently, so a product listed twice counts twice.
/// A single bad line invalidates the whole cart.
#[must_use]
pub fn validate_cart(catalog: &Catalog, items: Option<&Value>, max_quantity: u32) -> PriceValidation {
    let Some(lines) = items.and_then(Value::as_array).filter(|a| !a.is_empty()) else {
        return PriceValidation::rejected(vec![EMPTY_CART.to_owned()]);
    };

    let mut errors = Vec::new();
    let mut snapshot = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for item in lines {
        let Some(id) = product_id(item) else {
            errors.push("Item missing product ID.".to_owned());
            continue;
        };

        let Some(product) = catalog.by_id(&id) else {
            errors.push(format!("Unknown product ID: {id}"));
            continue;
        };

        let quantity = parse_quantity(item.get("quantity"));
        let Some(quantity) = u32::try_from(quantity)
            .ok()
            .filter(|q| (1..=max_quantity).contains(q))
        else {
            errors.push(format!("Invalid quantity for {id}: {quantity}"));
            continue;
        };

        let line = OrderLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            selected_size: item
                .get("selectedSize")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        };
        total += line.line_total();
        snapshot.push(line);
    }

    if !errors.is_empty() {
        return PriceValidation::rejected(errors);
    }

    PriceValidation {
        valid: true,
        total,
        errors,
        lines: snapshot,
    }
}

/// Product id under `id` (or `productId`). Empty strings, zero, and
/// non-scalar values count as missing.
fn product_id(item: &Value) -> Option<String> {
    let raw = item.get("id").or_else(|| item.get("productId"))?;
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f.abs() > 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_owned()),
        _ => None,
    }
}

/// Requested quantity. Missing, unparseable, or zero quantities read as 1.
fn parse_quantity(raw: Option<&Value>) -> i64 {
    let parsed = match raw {
        None | Some(Value::Null) => Some(1),
        Some(Value::Number(n)) => n.as_i64().or_else(|| leading_integer(&n.to_string())),
        Some(Value::String(s)) => leading_integer(s),
        Some(_) => None,
    };

    match parsed {
        None | Some(0) => 1,
        Some(q) => q,
    }
}

/// Integer prefix of `s`: optional leading whitespace and sign, then the
/// longest run of ASCII digits. Saturates instead of overflowing.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let value = rest
        .get(..digits)
        .and_then(|d| d.parse::<i64>().ok())
        .unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    const MAX: u32 = 100;

    fn validate(items: &Value) -> PriceValidation {
        validate_cart(&Catalog::embedded().unwrap(), Some(items), MAX)
    }

    #[test]
    fn test_total_from_server_prices() {
        let result = validate(&json!([
            {"id": "prod_001", "quantity": 2, "price": 0.01},
            {"id": "prod_006", "quantity": "1", "selectedSize": "M"}
        ]));
        assert!(result.valid);
        assert_eq!(result.total, Decimal::new(123, 0));
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].unit_price, Decimal::new(37, 0));
        assert_eq!(result.lines[1].selected_size.as_deref(), Some("M"));
    }

    #[test]
    fn test_quantity_defaults() {
        for quantity in [json!("abc"), json!(0), json!(null), json!("0"), json!(true)] {
            let result = validate(&json!([{"id": "prod_001", "quantity": quantity}]));
            assert!(result.valid, "quantity {quantity}");
            assert_eq!(result.total, Decimal::new(37, 0));
        }
        let missing = validate(&json!([{"id": "prod_001"}]));
        assert_eq!(missing.total, Decimal::new(37, 0));
    }

    #[test]
    fn test_quantity_leading_integer() {
        let result = validate(&json!([{"id": "prod_001", "quantity": " 3 pairs"}]));
        assert_eq!(result.total, Decimal::new(111, 0));
        let fractional = validate(&json!([{"id": "prod_001", "quantity": 2.7}]));
        assert_eq!(fractional.total, Decimal::new(74, 0));
    }

    #[test]
    fn test_quantity_out_of_range() {
        let result = validate(&json!([{"id": "prod_001", "quantity": 150}]));
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Invalid quantity for prod_001: 150"]);
        assert_eq!(result.total, Decimal::ZERO);

        let negative = validate(&json!([{"id": "prod_001", "quantity": "-2"}]));
        assert_eq!(negative.errors, vec!["Invalid quantity for prod_001: -2"]);

        let at_max = validate(&json!([{"id": "prod_001", "quantity": 100}]));
        assert!(at_max.valid);
    }

    #[test]
    fn test_one_bad_line_rejects_cart() {
        let result = validate(&json!([
            {"id": "prod_001", "quantity": 1},
            {"id": "nope", "quantity": 1},
            {"quantity": 1}
        ]));
        assert!(!result.valid);
        assert_eq!(result.total, Decimal::ZERO);
        assert!(result.lines.is_empty());
        assert_eq!(
            result.errors,
            vec!["Unknown product ID: nope", "Item missing product ID."]
        );
    }

    #[test]
    fn test_duplicate_lines_not_merged() {
        let result = validate(&json!([
            {"id": "prod_002", "quantity": 1},
            {"id": "prod_002", "quantity": 1}
        ]));
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.total, Decimal::new(74, 0));
    }

    #[test]
    fn test_empty_or_non_list() {
        let catalog = Catalog::embedded().unwrap();
        for items in [json!([]), json!({"id": "prod_001"}), json!("prod_001")] {
            let result = validate_cart(&catalog, Some(&items), MAX);
            assert_eq!(result.errors, vec![EMPTY_CART]);
        }
        assert!(!validate_cart(&catalog, None, MAX).valid);
    }

    #[test]
    fn test_product_id_alias() {
        let result = validate(&json!([{"productId": "prod_003", "quantity": 1}]));
        assert!(result.valid);
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("42"), Some(42));
        assert_eq!(leading_integer("  -7x"), Some(-7));
        assert_eq!(leading_integer("+5"), Some(5));
        assert_eq!(leading_integer("x5"), None);
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer("1e21"), Some(1));
    }
}
