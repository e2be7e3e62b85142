use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{OdmError, OdmResult};
use crate::model::{Collection, Document, Entity, Id, Identified, Ref};
use crate::store::traits::DocumentStore;

/// What to do when a referenced identifier has no backing record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    /// Fail with `OdmError::DanglingReference`.
    #[default]
    Fail,
    /// Leave the bare identifier in place.
    Keep,
}

/// Replaces bare identifiers with the records they point at.
///
/// The target collection is passed in by the caller, who reads it off the
/// record's model-name field (or the field's fixed target). Entries that are
/// already populated are left alone, so resolving twice changes nothing.
pub struct ReferenceResolver<'a, S: ?Sized> {
    store: &'a S,
    policy: DanglingPolicy,
}

impl<'a, S: DocumentStore + ?Sized> ReferenceResolver<'a, S> {
    pub fn new(store: &'a S, policy: DanglingPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> DanglingPolicy {
        self.policy
    }

    /// One batched lookup, decoded and keyed by id.
    pub async fn fetch_targets(&self, target: Collection, ids: &[Id]) -> OdmResult<HashMap<Id, Document>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let unique: Vec<Id> = ids.iter().unique().cloned().collect();
        let raw = self.store.find_by_ids(target.as_str(), &unique).await?;

        let mut found = HashMap::with_capacity(raw.len());
        for record in raw {
            let document = Document::decode(target, record)?;
            found.insert(document.id().clone(), document);
        }
        log::debug!(
            "resolved {}/{} distinct {} reference(s)",
            found.len(),
            unique.len(),
            target
        );
        Ok(found)
    }

    /// Resolve a scalar reference against `target`.
    pub async fn resolve_one(&self, field: &mut Ref<Document>, target: Collection, path: &str) -> OdmResult<()> {
        self.resolve_many(std::slice::from_mut(field), target, path).await
    }

    /// Resolve a vector of references, all against `target`. Output order
    /// and repeats follow the input exactly.
    pub async fn resolve_many(&self, fields: &mut [Ref<Document>], target: Collection, path: &str) -> OdmResult<()> {
        let pending: Vec<Id> = fields
            .iter()
            .filter_map(|field| match field {
                Ref::Id(id) => Some(id.clone()),
                Ref::Populated(_) => None,
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let found = self.fetch_targets(target, &pending).await?;
        for field in fields.iter_mut() {
            let resolved = match field {
                Ref::Populated(_) => continue,
                Ref::Id(id) => match found.get(id) {
                    Some(document) => document.clone(),
                    None => {
                        self.dangling(target, id, path)?;
                        continue;
                    }
                },
            };
            *field = Ref::Populated(Box::new(resolved));
        }
        Ok(())
    }

    /// Resolve a reference whose target collection is fixed by its type.
    pub async fn resolve_typed<T: Entity>(&self, field: &mut Ref<T>, path: &str) -> OdmResult<()> {
        let id = match field {
            Ref::Id(id) => id.clone(),
            Ref::Populated(_) => return Ok(()),
        };
        match self.store.find_by_id(T::COLLECTION.as_str(), &id).await? {
            Some(raw) => {
                let record = T::try_from(Document::decode(T::COLLECTION, raw)?)?;
                *field = Ref::Populated(Box::new(record));
                Ok(())
            }
            None => self.dangling(T::COLLECTION, &id, path),
        }
    }

    fn dangling(&self, collection: Collection, id: &Id, path: &str) -> OdmResult<()> {
        match self.policy {
            DanglingPolicy::Fail => Err(OdmError::DanglingReference {
                collection,
                id: id.clone(),
                path: path.to_string(),
            }),
            DanglingPolicy::Keep => {
                log::warn!("leaving dangling {} reference '{}' at '{}' unresolved", collection, id, path);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Author;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store_with_authors() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, name) in [("a1", "Ada"), ("a2", "Bo"), ("a3", "Cy")] {
            store
                .insert_raw("Author", json!({ "_id": id, "name": name }).as_object().cloned().unwrap())
                .unwrap();
        }
        store
    }

    fn ids(refs: &[Ref<Document>]) -> Vec<&str> {
        refs.iter().map(|r| r.id().as_str()).collect()
    }

    #[tokio::test]
    async fn vector_resolution_preserves_order_and_repeats() {
        let store = store_with_authors();
        let resolver = ReferenceResolver::new(&store, DanglingPolicy::Fail);
        let mut refs: Vec<Ref<Document>> = ["a3", "a1", "a3", "a2"].into_iter().map(Ref::from).collect();

        resolver.resolve_many(&mut refs, Collection::Author, "embeds").await.unwrap();

        assert!(refs.iter().all(Ref::is_populated));
        assert_eq!(ids(&refs), vec!["a3", "a1", "a3", "a2"]);
        assert!(refs
            .iter()
            .all(|r| r.populated().unwrap().collection() == Collection::Author));
    }

    #[tokio::test]
    async fn resolving_twice_is_a_no_op() {
        let store = store_with_authors();
        let resolver = ReferenceResolver::new(&store, DanglingPolicy::Fail);
        let mut once: Ref<Document> = Ref::from("a2");
        resolver.resolve_one(&mut once, Collection::Author, "doc").await.unwrap();
        let mut twice = once.clone();
        resolver.resolve_one(&mut twice, Collection::Author, "doc").await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn dangling_reference_fails_by_default() {
        let store = store_with_authors();
        let resolver = ReferenceResolver::new(&store, DanglingPolicy::Fail);
        let mut refs: Vec<Ref<Document>> = vec![Ref::from("a1"), Ref::from("ghost")];

        match resolver.resolve_many(&mut refs, Collection::Author, "docs").await {
            Err(OdmError::DanglingReference { collection, id, path }) => {
                assert_eq!(collection, Collection::Author);
                assert_eq!(id, "ghost");
                assert_eq!(path, "docs");
            }
            other => panic!("expected dangling reference, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn keep_policy_leaves_identifier() {
        let store = store_with_authors();
        let resolver = ReferenceResolver::new(&store, DanglingPolicy::Keep);
        let mut refs: Vec<Ref<Document>> = vec![Ref::from("ghost"), Ref::from("a1")];

        resolver.resolve_many(&mut refs, Collection::Author, "docs").await.unwrap();
        assert_eq!(refs[0], Ref::Id("ghost".to_string()));
        assert!(refs[1].is_populated());
    }

    #[tokio::test]
    async fn typed_reference_resolves_against_its_fixed_collection() {
        let store = store_with_authors();
        let resolver = ReferenceResolver::new(&store, DanglingPolicy::Fail);
        let mut author: Ref<Author> = Ref::from("a1");

        resolver.resolve_typed(&mut author, "author").await.unwrap();
        assert_eq!(author.populated().unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn wrong_target_collection_does_not_resolve() {
        let store = store_with_authors();
        let resolver = ReferenceResolver::new(&store, DanglingPolicy::Keep);
        let mut doc: Ref<Document> = Ref::from("a1");

        // The id exists, but only as an Author.
        resolver.resolve_one(&mut doc, Collection::Post, "doc").await.unwrap();
        assert!(!doc.is_populated());
    }
}
