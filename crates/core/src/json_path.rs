// SPDX-License-Identifier: MIT

//! Dotted-path lookup over `serde_json::Value`.
//!
//! `structuredGate.intentField` (spec §4.9) and hand-off field reads both
//! need to reach into the model's untyped JSON reply without duck-typing
//! their way through it ad hoc. This is the one place that happens.

use serde_json::Value;

/// Look up a dotted path (e.g. `"next_action.action"`) inside a JSON value.
///
/// Each segment indexes into an object by key. A segment that parses as a
/// `usize` additionally indexes into an array. Returns `None` if any segment
/// along the way is missing or the value at that point isn't indexable.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Read a dotted path and coerce the result to a string.
///
/// String values are returned as-is; other scalar JSON values are rendered
/// via their `Display`-equivalent (`to_string` on the underlying `Value`,
/// stripped of surrounding quotes for strings — handled above). Objects and
/// arrays are rejected (`None`) since intents and hand-off scalars are never
/// compound values.
pub fn get_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    match get(value, path)? {
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_object_path() {
        let v = json!({"next_action": {"action": "complete"}});
        assert_eq!(get_str(&v, "next_action.action"), Some("complete"));
    }

    #[test]
    fn reads_top_level_field() {
        let v = json!({"status": "completed"});
        assert_eq!(get_str(&v, "status"), Some("completed"));
    }

    #[test]
    fn returns_none_for_missing_path() {
        let v = json!({"status": "completed"});
        assert_eq!(get(&v, "result.code"), None);
    }

    #[test]
    fn indexes_into_arrays_by_numeric_segment() {
        let v = json!({"items": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(get_str(&v, "items.1.id"), Some("b"));
    }

    #[test]
    fn non_string_scalar_is_not_a_string() {
        let v = json!({"code": 0});
        assert_eq!(get_str(&v, "code"), None);
        assert_eq!(get(&v, "code"), Some(&json!(0)));
    }
}
