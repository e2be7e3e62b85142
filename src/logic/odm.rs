use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{OdmError, OdmResult};
use crate::logic::populate::Populator;
use crate::logic::resolve::DanglingPolicy;
use crate::logic::validate::SchemaValidator;
use crate::model::{Collection, Document, DocumentFilter, Entity, Id, Identified, PopulateSpec};
use crate::store::traits::DocumentStore;

/// Result of creating from a payload that may hold one record or many.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Created {
    One(Document),
    Many(Vec<Document>),
}

impl Created {
    pub fn len(&self) -> usize {
        match self {
            Created::One(_) => 1,
            Created::Many(documents) => documents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Typed front door over a `DocumentStore`.
///
/// Every write is validated against its entity schema before it reaches the
/// store. Reads return decoded records with references left as identifiers
/// unless a `PopulateSpec` asks for more. Population is always an explicit
/// step and never happens as a side effect of a plain fetch.
pub struct Odm<S: ?Sized> {
    store: Arc<S>,
    dangling: DanglingPolicy,
}

impl<S: ?Sized> Clone for Odm<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dangling: self.dangling,
        }
    }
}

impl<S: DocumentStore + ?Sized> Odm<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            dangling: DanglingPolicy::default(),
        }
    }

    pub fn with_dangling_policy(mut self, policy: DanglingPolicy) -> Self {
        self.dangling = policy;
        self
    }

    pub fn dangling_policy(&self) -> DanglingPolicy {
        self.dangling
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn populator(&self) -> Populator<'_, S> {
        Populator::new(self.store.as_ref(), self.dangling)
    }

    /// Validate and store one record. The returned record carries its
    /// assigned `_id`.
    pub async fn create(&self, collection: Collection, candidate: &Value) -> OdmResult<Document> {
        let document = SchemaValidator::validate(collection, candidate)?;
        let stored = self.store.insert_one(collection.as_str(), document).await?;
        let created = Document::decode(collection, stored)?;
        log::debug!("created {} {}", collection, created.id());
        Ok(created)
    }

    /// Validate every candidate, then store them together. Nothing is
    /// written if any candidate fails.
    pub async fn create_many(&self, collection: Collection, candidates: &[Value]) -> OdmResult<Vec<Document>> {
        let documents = SchemaValidator::validate_many(collection, candidates)?;
        let stored = self.store.insert_many(collection.as_str(), documents).await?;
        let created = stored
            .into_iter()
            .map(|raw| Document::decode(collection, raw))
            .collect::<OdmResult<Vec<_>>>()?;
        log::info!("created {} {} record(s)", created.len(), collection);
        Ok(created)
    }

    /// Create from a JSON payload holding either one record or an array.
    pub async fn create_payload(&self, collection: Collection, payload: &Value) -> OdmResult<Created> {
        match payload {
            Value::Array(candidates) => Ok(Created::Many(self.create_many(collection, candidates).await?)),
            candidate => Ok(Created::One(self.create(collection, candidate).await?)),
        }
    }

    /// Create a record of a statically known kind from any serializable
    /// input, such as `NewComment`.
    pub async fn insert<T: Entity>(&self, input: &impl Serialize) -> OdmResult<T> {
        let candidate = serde_json::to_value(input).map_err(|source| OdmError::Decode {
            collection: T::COLLECTION,
            source,
        })?;
        T::try_from(self.create(T::COLLECTION, &candidate).await?)
    }

    pub async fn find_by_id(
        &self,
        collection: Collection,
        id: &Id,
        populate: Option<&PopulateSpec>,
    ) -> OdmResult<Option<Document>> {
        let Some(raw) = self.store.find_by_id(collection.as_str(), id).await? else {
            log::debug!("{} {} not found", collection, id);
            return Ok(None);
        };
        let mut document = Document::decode(collection, raw)?;
        if let Some(spec) = populate.filter(|spec| !spec.is_empty()) {
            self.populate(&mut document, spec).await?;
        }
        Ok(Some(document))
    }

    /// Records of `collection` matching `filter`, in insertion order.
    pub async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        populate: Option<&PopulateSpec>,
    ) -> OdmResult<Vec<Document>> {
        let raw = self.store.find_many(collection.as_str(), filter).await?;
        let mut documents = raw
            .into_iter()
            .map(|record| Document::decode(collection, record))
            .collect::<OdmResult<Vec<_>>>()?;
        if let Some(spec) = populate {
            self.populator().populate_many(&mut documents, spec).await?;
        }
        Ok(documents)
    }

    /// Resolve the fields named by `spec` in place on an already fetched
    /// record. A failed populate leaves the record as it was.
    pub async fn populate(&self, document: &mut Document, spec: &PopulateSpec) -> OdmResult<()> {
        log::debug!("populating '{}' on {} {}", spec, document.collection(), document.id());
        self.populator().populate(document, spec).await
    }

    pub async fn get<T: Entity>(&self, id: &Id, populate: Option<&PopulateSpec>) -> OdmResult<Option<T>> {
        self.find_by_id(T::COLLECTION, id, populate)
            .await?
            .map(T::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, NewAuthor, NewPost, Post};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn odm() -> Odm<MemoryStore> {
        Odm::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_assigns_ids_and_find_returns_bare_references() {
        let odm = odm();
        let author: Author = odm
            .insert(&NewAuthor {
                name: "Ada".to_string(),
                description: None,
            })
            .await
            .unwrap();
        assert!(!author.id.is_empty());

        let post: Post = odm
            .insert(&NewPost {
                author: Some(author.id.clone()),
                content: "hello".to_string(),
            })
            .await
            .unwrap();

        let fetched: Post = odm.get(&post.id, None).await.unwrap().unwrap();
        assert_eq!(fetched.author.as_ref().unwrap().id(), &author.id);
        assert!(!fetched.author.unwrap().is_populated());

        let populated: Post = odm
            .get(&post.id, Some(&PopulateSpec::parse("author")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(populated.author.unwrap().populated().unwrap(), &author);
    }

    #[tokio::test]
    async fn invalid_record_is_never_stored() {
        let odm = odm();
        let err = odm
            .create_many(Collection::Author, &[json!({ "name": "ok" }), json!({ "nom": "bad" })])
            .await
            .unwrap_err();
        match err {
            OdmError::SchemaValidation(e) => assert!(e.has_error_at("[1].nom")),
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(odm.store().count("Author"), 0);
    }

    #[tokio::test]
    async fn payload_may_be_one_record_or_many() {
        let odm = odm();
        let one = odm
            .create_payload(Collection::Author, &json!({ "name": "x" }))
            .await
            .unwrap();
        assert!(matches!(one, Created::One(_)));

        let many = odm
            .create_payload(Collection::Author, &json!([{ "name": "y" }, { "name": "z" }]))
            .await
            .unwrap();
        assert_eq!(many.len(), 2);

        let all = odm
            .find_many(Collection::Author, &DocumentFilter::all(), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let odm = odm();
        let found = odm
            .find_by_id(Collection::Post, &"nope".to_string(), Some(&PopulateSpec::parse("author")))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn typed_get_looks_only_in_its_own_collection() {
        let odm = odm();
        let created = odm.create(Collection::Author, &json!({ "name": "x" })).await.unwrap();
        let id = created.id().clone();

        let as_post: OdmResult<Option<Post>> = odm.get(&id, None).await;
        assert!(matches!(as_post, Ok(None)));
    }
}
