//! Accessors for the server's cart response envelopes.
//!
//! The backend returns the cart identifier and item list at different
//! nesting depths depending on the operation. These accessors probe the
//! known shapes in a documented priority order and nothing else; new
//! shapes are a backend contract change, not something to guess at.

use serde_json::Value;

use super::guest::normalize_cart_id;

/// Extract the cart identifier from a response body.
///
/// Probes, in priority order: `cart_id`, `cart.cart.id`, `cart.id`.
/// Numeric and string identifiers are both accepted; the result is
/// normalized to a decimal-digit string.
#[must_use]
pub fn extract_cart_id(body: &Value) -> Option<String> {
    [
        body.get("cart_id"),
        body.pointer("/cart/cart/id"),
        body.pointer("/cart/id"),
    ]
    .into_iter()
    .flatten()
    .find_map(id_as_string)
}

/// Extract the item list from a response body.
///
/// Probes, in priority order: `items`, `cart.items`, `cart.cart.items`.
/// Returns an empty list when none are present.
#[must_use]
pub fn extract_items(body: &Value) -> Vec<Value> {
    [
        body.get("items"),
        body.pointer("/cart/items"),
        body.pointer("/cart/cart/items"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_array)
    .cloned()
    .unwrap_or_default()
}

fn id_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_cart_id(s),
        Value::Number(n) => normalize_cart_id(&n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cart_id_flat_shape() {
        let body = json!({ "cart_id": 123, "items": [] });
        assert_eq!(extract_cart_id(&body), Some("123".to_string()));
    }

    #[test]
    fn test_cart_id_double_nested_shape() {
        let body = json!({ "cart": { "cart": { "id": "456" }, "items": [] } });
        assert_eq!(extract_cart_id(&body), Some("456".to_string()));
    }

    #[test]
    fn test_cart_id_single_nested_shape() {
        let body = json!({ "cart": { "id": 789 } });
        assert_eq!(extract_cart_id(&body), Some("789".to_string()));
    }

    #[test]
    fn test_cart_id_priority_order() {
        // All three present: the flat field wins
        let body = json!({
            "cart_id": 1,
            "cart": { "id": 3, "cart": { "id": 2 } }
        });
        assert_eq!(extract_cart_id(&body), Some("1".to_string()));

        // Flat absent: the deeper nesting wins over cart.id
        let body = json!({ "cart": { "id": 3, "cart": { "id": 2 } } });
        assert_eq!(extract_cart_id(&body), Some("2".to_string()));
    }

    #[test]
    fn test_cart_id_rejects_non_numeric() {
        assert_eq!(extract_cart_id(&json!({ "cart_id": "abc" })), None);
        assert_eq!(extract_cart_id(&json!({ "cart_id": null })), None);
        assert_eq!(extract_cart_id(&json!({})), None);
    }

    #[test]
    fn test_items_shapes() {
        let flat = json!({ "items": [{ "product_id": 5 }] });
        assert_eq!(extract_items(&flat).len(), 1);

        let nested = json!({ "cart": { "items": [{ "product_id": 5 }, { "product_id": 6 }] } });
        assert_eq!(extract_items(&nested).len(), 2);

        let deep = json!({ "cart": { "cart": { "items": [{ "product_id": 7 }] } } });
        assert_eq!(extract_items(&deep).len(), 1);

        assert!(extract_items(&json!({})).is_empty());
    }
}
