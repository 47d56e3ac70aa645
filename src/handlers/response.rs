//! Success response envelope

use serde::Serialize;
use serde_json::{json, Map, Value};

/// The envelope every successful JSON response uses:
/// `{"status": "success", "results"?: n, "data": {"data": ...}}`
#[derive(Debug, Serialize)]
pub struct Envelope {
    /// Always `success`; failures render through the error envelope
    pub status: &'static str,

    /// Number of documents, present on list responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,

    /// Payload wrapper
    pub data: Value,
}

impl Envelope {
    /// Envelope for a single document
    pub fn item(doc: Map<String, Value>) -> Self {
        Self {
            status: "success",
            results: None,
            data: json!({ "data": doc }),
        }
    }

    /// Envelope for an ordered document list, with its count
    pub fn list(docs: Vec<Map<String, Value>>) -> Self {
        Self {
            status: "success",
            results: Some(docs.len()),
            data: json!({ "data": docs }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_envelope_shape() {
        let mut doc = Map::new();
        doc.insert("id".to_string(), json!("t1"));
        let envelope = Envelope::item(doc);

        let rendered = serde_json::to_value(&envelope).unwrap();
        assert_eq!(rendered["status"], "success");
        assert_eq!(rendered["data"]["data"]["id"], "t1");
        assert!(rendered.get("results").is_none());
    }

    #[test]
    fn test_list_envelope_counts() {
        let docs = vec![Map::new(), Map::new(), Map::new()];
        let envelope = Envelope::list(docs);

        let rendered = serde_json::to_value(&envelope).unwrap();
        assert_eq!(rendered["results"], 3);
        assert!(rendered["data"]["data"].is_array());
    }
}
