//! Request argument extraction.
//!
//! Params arrive either positionally (`["id", {..}]`, like event arguments)
//! or by name (`{"itemId": "id", "itemUpdate": {..}}`).

use serde_json::{Value, json};

/// Argument at `index` of an array, or under `name` of an object.
fn argument(params: Option<&Value>, index: usize, name: &str) -> Option<Value> {
    match params? {
        Value::Array(args) => args.get(index).cloned(),
        Value::Object(map) => map.get(name).cloned(),
        _ => None,
    }
}

/// Payload of a create request. A named call may either wrap the fields in
/// `itemInfo` or send them directly. Anything else is handed on as-is so the
/// schema can report it.
pub fn item_info(params: Option<Value>) -> Value {
    match params {
        Some(Value::Array(mut args)) => {
            if args.is_empty() {
                Value::Null
            } else {
                args.swap_remove(0)
            }
        }
        Some(Value::Object(mut map)) => match map.remove("itemInfo") {
            Some(info) => info,
            None => Value::Object(map),
        },
        Some(other) => other,
        None => Value::Null,
    }
}

/// Payload of an update request. Missing is reported by the schema.
pub fn item_update(params: Option<&Value>) -> Value {
    argument(params, 1, "itemUpdate").unwrap_or(Value::Null)
}

/// A usable item id: a non-empty string.
///
/// On rejection returns the `fail` payload naming the offending value.
pub fn item_id(params: Option<&Value>) -> Result<String, Value> {
    match argument(params, 0, "itemId") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id),
        Some(other) => Err(invalid_item_id(&other.to_string())),
        None => Err(invalid_item_id("undefined")),
    }
}

fn invalid_item_id(shown: &str) -> Value {
    json!({ "itemId": format!("invalid itemId={shown}") })
}

/// `fail` payload for an id that matched no stored item.
pub fn item_not_found(id: &str) -> Value {
    json!({ "itemId": format!("item with id={id} not found") })
}
