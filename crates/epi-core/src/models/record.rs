//! Record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const RESERVED_FIELDS: [&str; 2] = ["id", "updated_at"];

/// A single row of a collection.
///
/// Domain fields are opaque to the engine; only `id` and `updated_at` carry
/// meaning. The JSON form is flat, matching the remote row layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique within its collection and never reassigned
    pub id: String,
    /// Wall-clock time of the last write that produced this copy
    #[serde(default = "Utc::now", deserialize_with = "deserialize_updated_at")]
    pub updated_at: DateTime<Utc>,
    /// Collection-specific fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn deserialize_updated_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    crate::util::parse_remote_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid updated_at '{text}'")))
}

impl Record {
    /// Create an empty record with the given id, stamped now
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            updated_at: Utc::now(),
            fields: Map::new(),
        }
    }

    /// Set a domain field.
    ///
    /// `id` and `updated_at` are owned by the engine and are ignored here.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if !RESERVED_FIELDS.contains(&name.as_str()) {
            self.fields.insert(name, value.into());
        }
        self
    }

    /// Read a domain field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Parse a record from a JSON object
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Render the flat JSON row
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Compare identity and domain fields, ignoring the write timestamp.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id && self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_form_is_flat() {
        let record = Record::new("EST-001")
            .with_field("nome", "Capacete classe B")
            .with_field("estoqueAtual", 178);

        let value = record.to_json().unwrap();
        assert_eq!(value["id"], json!("EST-001"));
        assert_eq!(value["estoqueAtual"], json!(178));
        assert!(value["updated_at"].is_string());
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn test_parse_remote_row() {
        let row = json!({
            "id": "forn-01",
            "updated_at": "2025-09-02T08:00:00.000000+00:00",
            "nome": "ProtegeMax",
            "telefone": "(11) 3888-9001"
        });

        let record = Record::from_json(row).unwrap();
        assert_eq!(record.id, "forn-01");
        assert_eq!(record.field("nome"), Some(&json!("ProtegeMax")));
        assert_eq!(record.fields.len(), 2);
    }

    #[test]
    fn test_updated_at_without_offset_is_utc() {
        let record = Record::from_json(json!({
            "id": "EST-001",
            "updated_at": "2025-09-02T08:00:00.123456"
        }))
        .unwrap();
        assert_eq!(
            crate::util::format_timestamp(record.updated_at),
            "2025-09-02T08:00:00.123456Z"
        );
    }

    #[test]
    fn test_invalid_updated_at_is_rejected() {
        let row = json!({ "id": "EST-001", "updated_at": "ontem" });
        assert!(Record::from_json(row).is_err());
    }

    #[test]
    fn test_missing_updated_at_defaults_to_now() {
        let before = Utc::now();
        let record = Record::from_json(json!({ "id": "col-01" })).unwrap();
        assert!(record.updated_at >= before);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(Record::from_json(json!({ "nome": "sem id" })).is_err());
    }

    #[test]
    fn test_with_field_ignores_reserved_names() {
        let record = Record::new("a").with_field("id", "b").with_field("updated_at", "x");
        assert_eq!(record.id, "a");
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_same_content_ignores_timestamp() {
        let first = Record::new("PRZ-001").with_field("status", "No prazo");
        let mut second = first.clone();
        second.updated_at = first.updated_at + chrono::Duration::seconds(5);

        assert!(first.same_content(&second));
        assert!(!first.same_content(&second.with_field("status", "Vencido")));
    }
}
