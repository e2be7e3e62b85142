use serde::{Deserialize, Serialize};

use crate::model::{Author, Id, Ref};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Ref<Author>>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Id>,
    pub content: String,
}
