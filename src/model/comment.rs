use serde::{Deserialize, Serialize};

use crate::model::{Author, DocModel, Document, Id, Ref};

/// A comment on either an article or a post; `doc_model` names which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Id,
    pub author: Ref<Author>,
    pub content: String,
    pub doc: Ref<Document>,
    #[serde(rename = "docModel")]
    pub doc_model: DocModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub author: Id,
    pub content: String,
    pub doc: Id,
    #[serde(rename = "docModel")]
    pub doc_model: DocModel,
}
