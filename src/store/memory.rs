use anyhow::{anyhow, Result};
use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::model::{generate_id, DocumentFilter, Id, JsonObject, ID_FIELD};
use crate::store::traits::DocumentStore;

#[derive(Debug, Default)]
struct CollectionData {
    documents: Vec<JsonObject>,
    index: HashMap<Id, usize>,
}

/// Ephemeral in-process document store.
///
/// Each collection keeps its documents in insertion order with an id index
/// beside them. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |data| data.documents.len())
    }

    /// Insert a document exactly as given, bypassing id assignment. Meant
    /// for seeding raw fixtures.
    pub fn insert_raw(&self, collection: &str, document: JsonObject) -> Result<()> {
        let id = document_id(&document)?
            .ok_or_else(|| anyhow!("raw insert into {} requires an {}", collection, ID_FIELD))?;
        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();
        if data.index.contains_key(&id) {
            return Err(anyhow!("duplicate key {} in {}", id, collection));
        }
        data.index.insert(id, data.documents.len());
        data.documents.push(document);
        Ok(())
    }
}

fn document_id(document: &JsonObject) -> Result<Option<Id>> {
    match document.get(ID_FIELD) {
        None => Ok(None),
        Some(serde_json::Value::String(id)) => Ok(Some(id.clone())),
        Some(other) => Err(anyhow!("{} must be a string, found {}", ID_FIELD, other)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_many(&self, collection: &str, documents: Vec<JsonObject>) -> Result<Vec<JsonObject>> {
        let mut prepared = Vec::with_capacity(documents.len());
        let mut batch_ids = HashSet::new();
        for mut document in documents {
            let id = match document_id(&document)? {
                Some(id) => id,
                None => {
                    let id = generate_id();
                    document.insert(ID_FIELD.to_string(), serde_json::Value::String(id.clone()));
                    id
                }
            };
            if !batch_ids.insert(id.clone()) {
                return Err(anyhow!("duplicate key {} in {} batch", id, collection));
            }
            prepared.push((id, document));
        }

        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();
        if let Some((id, _)) = prepared.iter().find(|(id, _)| data.index.contains_key(id)) {
            return Err(anyhow!("duplicate key {} in {}", id, collection));
        }

        let mut stored = Vec::with_capacity(prepared.len());
        for (id, document) in prepared {
            data.index.insert(id, data.documents.len());
            data.documents.push(document.clone());
            stored.push(document);
        }
        log::debug!("memory store: inserted {} document(s) into {}", stored.len(), collection);
        Ok(stored)
    }

    async fn find_by_id(&self, collection: &str, id: &Id) -> Result<Option<JsonObject>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|data| data.index.get(id).map(|&slot| data.documents[slot].clone())))
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Id]) -> Result<Vec<JsonObject>> {
        let collections = self.collections.read();
        let Some(data) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .unique()
            .filter_map(|id| data.index.get(id).map(|&slot| data.documents[slot].clone()))
            .collect())
    }

    async fn find_many(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<JsonObject>> {
        let collections = self.collections.read();
        let Some(data) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(data
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
