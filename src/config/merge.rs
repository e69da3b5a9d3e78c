//! Field-by-field merging of configuration tiers.
//!
//! Tier files are parsed into `serde_json::Value` and folded together, so a
//! tier only needs to name the keys it changes.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// Objects merge key by key, recursively. Any other overlay value replaces the
/// base value, except `null`, which means "not specified" and keeps the base.
///
/// # Example
/// ```
/// use serde_json::json;
/// use task_manager::config::deep_merge;
///
/// let defaults = json!({ "server": { "host": "127.0.0.1", "port": 5000 } });
/// let project = json!({ "server": { "port": 8080 } });
///
/// let merged = deep_merge(defaults, project);
/// assert_eq!(merged, json!({ "server": { "host": "127.0.0.1", "port": 8080 } }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold tiers in order, lowest priority first.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
