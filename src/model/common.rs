use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::OdmError;

pub type Id = String;

/// A raw stored document: field name to JSON value.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Name of the identifier field on every stored record.
pub const ID_FIELD: &str = "_id";

pub fn generate_id() -> Id {
    Uuid::new_v4().simple().to_string()
}

/// Every collection the resolver knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    Author,
    Article,
    Post,
    Comment,
    Spotlight,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Author,
        Collection::Article,
        Collection::Post,
        Collection::Comment,
        Collection::Spotlight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Author => "Author",
            Collection::Article => "Article",
            Collection::Post => "Post",
            Collection::Comment => "Comment",
            Collection::Spotlight => "Spotlight",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = OdmError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| OdmError::UnknownTargetCollection {
                name: name.to_string(),
            })
    }
}

/// Targets a comment or a spotlight may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocModel {
    Article,
    Post,
}

impl DocModel {
    pub const ALLOWED: [Collection; 2] = [Collection::Article, Collection::Post];
}

impl From<DocModel> for Collection {
    fn from(model: DocModel) -> Self {
        match model {
            DocModel::Article => Collection::Article,
            DocModel::Post => Collection::Post,
        }
    }
}

impl TryFrom<Collection> for DocModel {
    type Error = OdmError;

    fn try_from(collection: Collection) -> Result<Self, Self::Error> {
        match collection {
            Collection::Article => Ok(DocModel::Article),
            Collection::Post => Ok(DocModel::Post),
            other => Err(OdmError::UnknownTargetCollection {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DocModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Collection::from(*self).fmt(f)
    }
}
