use serde::{Deserialize, Serialize};

use crate::model::{DocModel, Document, Id, Ref};

/// An ordered selection of articles or posts. Every entry of `docs` targets
/// the collection named by `docs_model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spotlight {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default)]
    pub docs: Vec<Ref<Document>>,
    #[serde(rename = "docsModel")]
    pub docs_model: DocModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSpotlight {
    pub docs: Vec<Id>,
    #[serde(rename = "docsModel")]
    pub docs_model: DocModel,
}
