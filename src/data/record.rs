use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Contents of a per-sample summary file.
///
/// `notes` and `timestamps` may be written either as an object keyed by
/// note id or as a list; either way they keep file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub summary: String,
    #[serde(default, deserialize_with = "ordered_texts")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_specialty: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_ordered_texts",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamps: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderedTexts {
    Keyed(serde_json::Map<String, Value>),
    Listed(Vec<Value>),
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

impl OrderedTexts {
    fn into_texts(self) -> Vec<String> {
        match self {
            OrderedTexts::Keyed(map) => map.into_iter().map(|(_, v)| text_of(v)).collect(),
            OrderedTexts::Listed(list) => list.into_iter().map(text_of).collect(),
        }
    }
}

fn ordered_texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    OrderedTexts::deserialize(deserializer).map(OrderedTexts::into_texts)
}

fn optional_ordered_texts<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OrderedTexts>::deserialize(deserializer)?.map(OrderedTexts::into_texts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_notes_keep_file_order() {
        let record: SummaryRecord = serde_json::from_value(json!({
            "summary": "s",
            "notes": {"n9": "ninth", "n1": "first", "n5": "fifth"},
            "target_specialty": "cardiology"
        }))
        .unwrap();

        assert_eq!(record.notes, vec!["ninth", "first", "fifth"]);
        assert_eq!(record.target_specialty.as_deref(), Some("cardiology"));
        assert_eq!(record.timestamps, None);
    }

    #[test]
    fn test_listed_notes_and_timestamps() {
        let record: SummaryRecord = serde_json::from_value(json!({
            "summary": "s",
            "notes": ["a", "b"],
            "timestamps": ["2024-01-01", 20240102]
        }))
        .unwrap();

        assert_eq!(record.notes, vec!["a", "b"]);
        assert_eq!(
            record.timestamps,
            Some(vec!["2024-01-01".to_string(), "20240102".to_string()])
        );
    }

    #[test]
    fn test_null_timestamps() {
        let record: SummaryRecord =
            serde_json::from_value(json!({"summary": "s", "timestamps": null})).unwrap();
        assert!(record.notes.is_empty());
        assert_eq!(record.timestamps, None);
    }

    #[test]
    fn test_summary_required() {
        assert!(serde_json::from_value::<SummaryRecord>(json!({})).is_err());
    }
}
