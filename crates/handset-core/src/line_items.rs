//! # Line-Item Codec
//!
//! Sales and returns persist their lines as a JSON array in a text column.
//! Rows written by older clients are not always well-formed, so decoding is
//! lenient: it never fails.
//!
//! ## Decoding Rules
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Input                        │ Result                                   │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ not JSON / not an array      │ empty Vec                                │
//! │ array element not an object  │ skipped                                  │
//! │ numeric field missing/bogus  │ 0                                        │
//! │ numeric field as "12"        │ 12                                       │
//! │ string field missing/bogus   │ ""                                       │
//! │ imeis as "a, b"              │ ["a", "b"]                               │
//! │ legacy "price": 150.5        │ unitPriceCents = 15050                   │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```

use serde_json::{Map, Value};

use crate::money::Money;
use crate::types::SaleItem;

/// Serialises lines for storage.
pub fn encode(items: &[SaleItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Parses stored lines, degrading to an empty collection on malformed input.
pub fn decode(raw: &str) -> Vec<SaleItem> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(elements)) => elements
            .iter()
            .filter_map(Value::as_object)
            .map(decode_item)
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_item(obj: &Map<String, Value>) -> SaleItem {
    let unit_price_cents = match field(obj, &["unitPriceCents", "unit_price_cents"]) {
        Some(v) => integer(v),
        None => field(obj, &["price", "unitPrice", "unit_price"])
            .map(decimal_cents)
            .unwrap_or(0),
    };

    SaleItem {
        product_id: field(obj, &["productId", "product_id"])
            .map(string)
            .unwrap_or_default(),
        product_name: field(obj, &["productName", "product_name", "name"])
            .map(string)
            .unwrap_or_default(),
        quantity: field(obj, &["quantity", "qty"]).map(integer).unwrap_or(0),
        unit_price_cents,
        imeis: field(obj, &["imeis", "imei"]).map(strings).unwrap_or_default(),
        inventory_item_ids: field(obj, &["inventoryItemIds", "inventory_item_ids"])
            .map(strings)
            .unwrap_or_default(),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

fn string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Whole numbers; fractions truncate, anything else is 0.
fn integer(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Major-unit decimal amounts (`150.5` or `"150.50"`) converted to cents.
fn decimal_cents(v: &Value) -> i64 {
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return 0,
    };
    Money::parse(&text).map(|m| m.cents()).unwrap_or(0)
}

fn strings(v: &Value) -> Vec<String> {
    match v {
        Value::Array(values) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_camel_case() {
        let item = SaleItem::new("p-1", 2, Money::from_cents(1_500)).with_imeis(["123456789012345"]);
        let json = encode(&[item]);
        assert!(json.contains("\"productId\":\"p-1\""));
        assert!(json.contains("\"unitPriceCents\":1500"));
        assert!(json.contains("\"imeis\":[\"123456789012345\"]"));
        assert!(!json.contains("inventoryItemIds"));
    }

    #[test]
    fn test_decode_reads_what_encode_wrote() {
        let mut item = SaleItem::new("p-1", 2, Money::from_cents(1_500));
        item.product_name = "Charger".to_string();
        item.inventory_item_ids = vec!["i-1".to_string(), "i-2".to_string()];
        assert_eq!(decode(&encode(&[item.clone()])), vec![item]);
    }

    #[test]
    fn test_decode_garbage_is_empty() {
        assert!(decode("").is_empty());
        assert!(decode("not json").is_empty());
        assert!(decode("{\"productId\":\"p\"}").is_empty());
        assert!(decode("null").is_empty());
    }

    #[test]
    fn test_decode_defaults_bad_fields() {
        let items = decode(r#"[{"productId": 7, "quantity": "abc", "imeis": {}}, 5, "x"]"#);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, "7");
        assert_eq!(items[0].quantity, 0);
        assert_eq!(items[0].unit_price_cents, 0);
        assert_eq!(items[0].product_name, "");
        assert!(items[0].imeis.is_empty());
    }

    #[test]
    fn test_decode_legacy_shapes() {
        let items = decode(
            r#"[{"product_id":"p-2","name":"Case","qty":"3","price":150.5,"imeis":"111, 222"}]"#,
        );
        assert_eq!(items[0].product_id, "p-2");
        assert_eq!(items[0].product_name, "Case");
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_price_cents, 15_050);
        assert_eq!(items[0].imeis, vec!["111", "222"]);
    }

    #[test]
    fn test_decode_truncates_fractional_quantity() {
        let items = decode(r#"[{"productId":"p","quantity":2.9}]"#);
        assert_eq!(items[0].quantity, 2);
    }
}
