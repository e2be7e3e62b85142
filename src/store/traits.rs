use crate::model::{DocumentFilter, Id, JsonObject};
use anyhow::Result;

/// The document-store client the ODM layer is written against.
///
/// Collections are addressed by name and documents are raw JSON objects
/// keyed by `_id`. Shape validation is not the store's concern.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert documents, assigning an `_id` to any that lack one. Returns
    /// the stored documents in input order.
    async fn insert_many(&self, collection: &str, documents: Vec<JsonObject>) -> Result<Vec<JsonObject>>;

    async fn find_by_id(&self, collection: &str, id: &Id) -> Result<Option<JsonObject>>;

    /// Fetch every document whose `_id` is in `ids`, in no particular order.
    /// Missing ids are simply absent from the result.
    async fn find_by_ids(&self, collection: &str, ids: &[Id]) -> Result<Vec<JsonObject>>;

    /// Documents matching `filter`, in insertion order.
    async fn find_many(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<JsonObject>>;

    async fn insert_one(&self, collection: &str, document: JsonObject) -> Result<JsonObject> {
        self.insert_many(collection, vec![document])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("store returned no document for insert into {}", collection))
    }
}
