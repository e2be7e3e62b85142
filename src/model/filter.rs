use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Id, JsonObject, ID_FIELD};

/// Selection for `find_many`: optional id set, top-level field equality and
/// a limit. Results keep store insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<Id>>,

    #[serde(rename = "where", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub equals: BTreeMap<String, serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl DocumentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_ids(ids: impl IntoIterator<Item = Id>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, document: &JsonObject) -> bool {
        if let Some(ids) = &self.ids {
            let Some(id) = document.get(ID_FIELD).and_then(|v| v.as_str()) else {
                return false;
            };
            if !ids.iter().any(|candidate| candidate == id) {
                return false;
            }
        }

        self.equals
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(DocumentFilter::all().matches(&doc(json!({ "_id": "x" }))));
    }

    #[test]
    fn ids_and_equality_combine() {
        let filter = DocumentFilter::by_ids(vec!["c1".to_string(), "c2".to_string()])
            .where_eq("docModel", "Post");

        assert!(filter.matches(&doc(json!({ "_id": "c1", "docModel": "Post" }))));
        assert!(!filter.matches(&doc(json!({ "_id": "c1", "docModel": "Article" }))));
        assert!(!filter.matches(&doc(json!({ "_id": "c3", "docModel": "Post" }))));
    }

    #[test]
    fn deserializes_where_clause() {
        let filter: DocumentFilter =
            serde_json::from_value(json!({ "where": { "docsModel": "Article" }, "limit": 1 })).unwrap();
        assert_eq!(filter.limit, Some(1));
        assert_eq!(filter.equals.get("docsModel"), Some(&json!("Article")));
    }

    #[test]
    fn equality_compares_whole_values() {
        let pair = doc(json!({ "_id": "s1", "docs": ["p1", "p2"] }));
        assert!(!DocumentFilter::all().where_eq("docs", json!(["p1"])).matches(&pair));
        assert!(!DocumentFilter::all().where_eq("docs", json!([])).matches(&pair));
        assert!(DocumentFilter::all().where_eq("docs", json!(["p1", "p2"])).matches(&pair));
        assert!(!DocumentFilter::all().where_eq("missing", serde_json::Value::Null).matches(&pair));
    }
}
