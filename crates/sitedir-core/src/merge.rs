//! Deep merge of caller-supplied configuration over defaults.
//!
//! Rules, applied recursively:
//! 1. object over object: merge key by key
//! 2. `null` in the overlay: the default is kept
//! 3. key missing from the defaults: inserted as-is
//! 4. anything else: the overlay value replaces the default
//!
//! Arrays count as leaves, so a caller-supplied array replaces the default
//! array wholesale instead of being merged index by index.

use serde_json::Value;

/// Merge `overlay` into `base`, with overlay leaves taking precedence.
pub fn merge_over_defaults(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_over_defaults(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge() {
        let mut base = json!({
            "a": {
                "b": 1,
                "c": 2
            }
        });

        merge_over_defaults(
            &mut base,
            json!({
                "a": {
                    "c": 3,
                    "d": 4
                }
            }),
        );

        assert_eq!(base["a"]["b"], 1);
        assert_eq!(base["a"]["c"], 3);
        assert_eq!(base["a"]["d"], 4);
    }

    #[test]
    fn test_null_keeps_default() {
        let mut base = json!({ "locale": "en", "theme": { "dark": false } });
        merge_over_defaults(&mut base, json!({ "locale": null, "theme": null }));
        assert_eq!(base, json!({ "locale": "en", "theme": { "dark": false } }));
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let mut base = json!({ "pageExtensions": ["md", "html", "txt"] });
        merge_over_defaults(&mut base, json!({ "pageExtensions": ["adoc"] }));
        assert_eq!(base["pageExtensions"], json!(["adoc"]));
    }

    #[test]
    fn test_scalar_over_object_replaces() {
        let mut base = json!({ "robots": { "index": true } });
        merge_over_defaults(&mut base, json!({ "robots": false }));
        assert_eq!(base["robots"], json!(false));
    }
}
