use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{OdmError, OdmResult};
use crate::model::{
    entity_schema, Article, Author, Collection, Comment, FieldKind, Id, Identified, JsonObject,
    Post, Spotlight,
};

/// A record of any kind, as fetched from the store.
///
/// This is the target type of every dynamic reference: which variant a
/// reference resolves to is decided by the sibling model-name field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    Author(Author),
    Article(Article),
    Post(Post),
    Comment(Comment),
    Spotlight(Spotlight),
}

/// A record kind with its own collection.
pub trait Entity:
    Identified
    + Clone
    + Serialize
    + DeserializeOwned
    + Into<Document>
    + TryFrom<Document, Error = OdmError>
    + Send
    + Sync
    + 'static
{
    const COLLECTION: Collection;
}

macro_rules! entity {
    ($kind:ident) => {
        impl Identified for $kind {
            fn id(&self) -> &Id {
                &self.id
            }
        }

        impl Entity for $kind {
            const COLLECTION: Collection = Collection::$kind;
        }

        impl From<$kind> for Document {
            fn from(record: $kind) -> Self {
                Document::$kind(record)
            }
        }

        impl TryFrom<Document> for $kind {
            type Error = OdmError;

            fn try_from(document: Document) -> Result<Self, Self::Error> {
                match document {
                    Document::$kind(record) => Ok(record),
                    other => Err(OdmError::CollectionMismatch {
                        expected: Collection::$kind,
                        found: other.collection(),
                    }),
                }
            }
        }
    };
}

entity!(Author);
entity!(Article);
entity!(Post);
entity!(Comment);
entity!(Spotlight);

impl Identified for Document {
    fn id(&self) -> &Id {
        match self {
            Document::Author(r) => r.id(),
            Document::Article(r) => r.id(),
            Document::Post(r) => r.id(),
            Document::Comment(r) => r.id(),
            Document::Spotlight(r) => r.id(),
        }
    }
}

impl Document {
    pub fn collection(&self) -> Collection {
        match self {
            Document::Author(_) => Collection::Author,
            Document::Article(_) => Collection::Article,
            Document::Post(_) => Collection::Post,
            Document::Comment(_) => Collection::Comment,
            Document::Spotlight(_) => Collection::Spotlight,
        }
    }

    /// Decode a raw stored record of `collection`.
    ///
    /// Model-name fields are checked before anything else so that a name the
    /// resolver cannot query surfaces as `UnknownTargetCollection` rather than
    /// a generic decode failure.
    pub fn decode(collection: Collection, raw: JsonObject) -> OdmResult<Self> {
        check_model_names(collection, &raw)?;
        let value = serde_json::Value::Object(raw);
        let document = match collection {
            Collection::Author => Document::Author(from_value(collection, value)?),
            Collection::Article => Document::Article(from_value(collection, value)?),
            Collection::Post => Document::Post(from_value(collection, value)?),
            Collection::Comment => Document::Comment(from_value(collection, value)?),
            Collection::Spotlight => Document::Spotlight(from_value(collection, value)?),
        };
        Ok(document)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Best guess of a record's kind from the fields it carries. Only used
    /// when a populated record is read back without its collection.
    fn infer_collection(raw: &JsonObject) -> Collection {
        if raw.contains_key("docModel") {
            Collection::Comment
        } else if raw.contains_key("docsModel") {
            Collection::Spotlight
        } else if raw.contains_key("sections") {
            Collection::Article
        } else if raw.contains_key("content") {
            Collection::Post
        } else {
            Collection::Author
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonObject::deserialize(deserializer)?;
        let collection = Document::infer_collection(&raw);
        Document::decode(collection, raw).map_err(serde::de::Error::custom)
    }
}

fn from_value<T: DeserializeOwned>(collection: Collection, value: serde_json::Value) -> OdmResult<T> {
    serde_json::from_value(value).map_err(|source| OdmError::Decode { collection, source })
}

fn check_model_name(value: Option<&serde_json::Value>, allowed: &[Collection]) -> OdmResult<()> {
    let Some(serde_json::Value::String(name)) = value else {
        return Ok(());
    };
    let target: Collection = name.parse()?;
    if !allowed.contains(&target) {
        return Err(OdmError::UnknownTargetCollection { name: name.clone() });
    }
    Ok(())
}

fn check_model_names(collection: Collection, raw: &JsonObject) -> OdmResult<()> {
    for field in entity_schema(collection).fields {
        match field.kind {
            FieldKind::ModelName { allowed } => check_model_name(raw.get(field.name), allowed)?,
            FieldKind::Sections => {
                let Some(serde_json::Value::Array(sections)) = raw.get(field.name) else {
                    continue;
                };
                for section in sections.iter().filter_map(|s| s.as_object()) {
                    if section.get("type").and_then(|t| t.as_str()) == Some("embed") {
                        check_model_name(section.get("embedType"), &Collection::ALL)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ref;
    use serde_json::json;

    fn object(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn decodes_comment_with_bare_references() {
        let document = Document::decode(
            Collection::Comment,
            object(json!({
                "_id": "c1",
                "author": "a1",
                "content": "nice",
                "doc": "p1",
                "docModel": "Post",
            })),
        )
        .unwrap();

        let comment = Comment::try_from(document).unwrap();
        assert_eq!(comment.doc, Ref::Id("p1".to_string()));
        assert_eq!(comment.author.id(), "a1");
    }

    #[test]
    fn unknown_model_name_is_a_target_collection_error() {
        let result = Document::decode(
            Collection::Spotlight,
            object(json!({ "_id": "s1", "docs": [], "docsModel": "Video" })),
        );
        assert!(matches!(
            result,
            Err(OdmError::UnknownTargetCollection { ref name }) if name == "Video"
        ));

        // A known collection that the field does not admit is just as unknown to it.
        let result = Document::decode(
            Collection::Comment,
            object(json!({
                "_id": "c1", "author": "a1", "content": "x", "doc": "a2", "docModel": "Author",
            })),
        );
        assert!(matches!(result, Err(OdmError::UnknownTargetCollection { .. })));
    }

    #[test]
    fn unknown_embed_type_in_stored_section_is_rejected() {
        let result = Document::decode(
            Collection::Article,
            object(json!({
                "_id": "ar1",
                "name": "n",
                "author": "a1",
                "sections": [{ "type": "embed", "embeds": ["x"], "embedType": "Video" }],
            })),
        );
        assert!(matches!(result, Err(OdmError::UnknownTargetCollection { .. })));
    }

    #[test]
    fn mismatched_kind_conversion_fails() {
        let document = Document::Author(Author {
            id: "a1".to_string(),
            name: "Ada".to_string(),
            description: None,
        });
        match Post::try_from(document) {
            Err(OdmError::CollectionMismatch { expected, found }) => {
                assert_eq!(expected, Collection::Post);
                assert_eq!(found, Collection::Author);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn populated_record_reads_back_by_shape() {
        let reference: Ref<Document> = serde_json::from_value(json!({
            "_id": "p1",
            "content": "hello",
        }))
        .unwrap();
        assert_eq!(reference.populated().unwrap().collection(), Collection::Post);
    }
}
