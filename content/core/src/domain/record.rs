// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! CMS records
//!
//! Records are opaque JSON objects keyed by a unique, immutable `name`. The
//! content layer only interprets a handful of fields (titles, child tables,
//! attachments, "section enabled" flags); everything else is passed through
//! to the renderer untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::attachment::normalize_url;
use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CmsRecord(Map<String, Value>);

impl CmsRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_value(value: Value) -> Result<Self, ContentError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ContentError::Decode(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    /// Set `name` when the server omitted it; an existing name is never changed.
    pub fn ensure_name(&mut self, name: &str) {
        if self.name().is_none() {
            self.0.insert("name".to_string(), Value::String(name.to_string()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Rows of a child table. Non-object rows are skipped.
    pub fn array_field(&self, field: &str) -> Vec<&Map<String, Value>> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    /// Title shown to visitors and used for slugs.
    pub fn display_name(&self, kind: EntityKind) -> Option<&str> {
        [kind.title_field(), "title", "name"]
            .into_iter()
            .filter_map(|field| self.str_field(field))
            .find(|value| !value.trim().is_empty())
    }

    /// Numeric-boolean section flag (`1`, `"1"` or `true` mean enabled).
    pub fn flag(&self, field: &str) -> bool {
        match self.0.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::String(s)) => s.trim() == "1",
            _ => false,
        }
    }

    /// Absolute URLs of every `attachments[].attach` entry.
    pub fn attachment_urls(&self, host: &str) -> Vec<String> {
        self.array_field("attachments")
            .into_iter()
            .filter_map(|row| row.get("attach").and_then(Value::as_str))
            .map(|path| normalize_url(path, host))
            .filter(|url| !url.is_empty())
            .collect()
    }
}

impl From<Map<String, Value>> for CmsRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> CmsRecord {
        CmsRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = CmsRecord::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ContentError::Decode(ref m) if m.contains("an array")));
    }

    #[test]
    fn test_ensure_name_only_fills_missing() {
        let mut rec = record(json!({"full_title": "Acme"}));
        rec.ensure_name("CaseStudy-0001");
        assert_eq!(rec.name(), Some("CaseStudy-0001"));

        rec.ensure_name("CaseStudy-9999");
        assert_eq!(rec.name(), Some("CaseStudy-0001"));
    }

    #[test]
    fn test_display_name_prefers_kind_title() {
        let rec = record(json!({"name": "CS-1", "title": "Generic", "full_title": "Acme Rebrand"}));
        assert_eq!(rec.display_name(EntityKind::CaseStudy), Some("Acme Rebrand"));
        assert_eq!(rec.display_name(EntityKind::Insight), Some("Generic"));

        let bare = record(json!({"name": "CS-2", "full_title": "  "}));
        assert_eq!(bare.display_name(EntityKind::CaseStudy), Some("CS-2"));
    }

    #[test]
    fn test_numeric_boolean_flags() {
        let rec = record(json!({"a": 1, "b": 0, "c": "1", "d": true, "e": "yes"}));
        assert!(rec.flag("a"));
        assert!(!rec.flag("b"));
        assert!(rec.flag("c"));
        assert!(rec.flag("d"));
        assert!(!rec.flag("e"));
        assert!(!rec.flag("missing"));
    }

    #[test]
    fn test_attachment_urls_are_normalized() {
        let rec = record(json!({
            "attachments": [
                {"attach": "/files/hero.png"},
                {"attach": "https://cdn.example.com/x.jpg"},
                {"attach": ""},
                "not-a-row"
            ]
        }));
        assert_eq!(
            rec.attachment_urls("https://cms.alpheric.com"),
            vec![
                "https://cms.alpheric.com/files/hero.png".to_string(),
                "https://cdn.example.com/x.jpg".to_string(),
            ]
        );
    }
}
