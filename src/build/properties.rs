// ABOUTME: Per-build property bag threading values between steps.
// ABOUTME: Write-by-later-steps overwrites; reads before writes yield the caller's default.

use serde_json::Value;
use std::collections::HashMap;

use crate::cloud::Tags;

/// Well-known property keys written and read by the pipeline steps.
pub mod key {
    pub const APPLIANCE: &str = "appliance";
    pub const REPOURL: &str = "repourl";
    pub const BRANCH: &str = "branch";
    pub const GOT_REVISION: &str = "got_revision";
    pub const INSTANCE_ID: &str = "instance_id";
    pub const VOLUME_ID: &str = "volume_id";
    pub const DEVICE: &str = "device";
    pub const VOLUME_TAGS: &str = "volume_tags";
    pub const IMAGE_ID: &str = "image_id";
    pub const IMAGE_NAME: &str = "image_name";
    pub const IMAGE_TAGS: &str = "image_tags";
    pub const DESCRIPTION: &str = "description";
    pub const CUSTOM_TAGS: &str = "custom_tags";
}

/// Key/value store scoped to exactly one build.
///
/// Values are JSON so steps can thread strings and tag maps through the
/// same store, as the pipeline has always done. A read before the
/// corresponding write returns the supplied default; optional properties
/// (image description, custom tags) make that a normal occurrence, not an
/// error.
#[derive(Debug, Default, Clone)]
pub struct PropertyBag {
    values: HashMap<String, Value>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn set_tags(&mut self, key: &str, tags: &Tags) {
        let map: serde_json::Map<String, Value> = tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.values.insert(key.to_string(), Value::Object(map));
    }

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    /// String property, `None` when unset or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Tag-map property; unset or wrongly-typed yields the default (empty).
    pub fn get_tags(&self, key: &str) -> Tags {
        let Some(Value::Object(map)) = self.values.get(key) else {
            return Tags::new();
        };
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_before_write_returns_default() {
        let bag = PropertyBag::new();
        assert_eq!(bag.get(key::DESCRIPTION, Value::Null), Value::Null);
        assert_eq!(bag.get_str(key::DESCRIPTION), None);
        assert!(bag.get_tags(key::CUSTOM_TAGS).is_empty());
    }

    #[test]
    fn later_writes_overwrite() {
        let mut bag = PropertyBag::new();
        bag.set(key::BRANCH, "master");
        bag.set(key::BRANCH, "devel");
        assert_eq!(bag.get_str(key::BRANCH), Some("devel"));
    }

    #[test]
    fn tags_round_trip() {
        let mut bag = PropertyBag::new();
        let mut tags = Tags::new();
        tags.insert("timestamp".into(), "260101_0000".into());
        tags.insert("slave".into(), "slave".into());
        bag.set_tags(key::VOLUME_TAGS, &tags);
        assert_eq!(bag.get_tags(key::VOLUME_TAGS), tags);
        assert_eq!(bag.get(key::VOLUME_TAGS, json!({}))["slave"], "slave");
    }
}
