use itertools::Itertools;
use std::future::Future;
use std::pin::Pin;

use crate::error::{OdmError, OdmResult};
use crate::logic::resolve::{DanglingPolicy, ReferenceResolver};
use crate::logic::sections::SectionResolver;
use crate::logic::validate::join;
use crate::model::{entity_schema, Collection, Document, Entity, FieldKind, PopulatePath, PopulateSpec, Ref};
use crate::store::traits::DocumentStore;

type PopulateFuture<'b> = Pin<Box<dyn Future<Output = OdmResult<()>> + Send + 'b>>;

/// Walks a `PopulateSpec` over decoded records, resolving each named
/// reference field and then descending into what it resolved to.
pub struct Populator<'a, S: ?Sized> {
    resolver: ReferenceResolver<'a, S>,
}

impl<'a, S: DocumentStore + ?Sized> Populator<'a, S> {
    pub fn new(store: &'a S, policy: DanglingPolicy) -> Self {
        Self {
            resolver: ReferenceResolver::new(store, policy),
        }
    }

    pub fn resolver(&self) -> &ReferenceResolver<'a, S> {
        &self.resolver
    }

    /// Populate `document` as `spec` asks. The whole spec is checked before
    /// anything is fetched, and the record is only updated once every path
    /// resolved. On failure it is left exactly as it was.
    pub async fn populate(&self, document: &mut Document, spec: &PopulateSpec) -> OdmResult<()> {
        check_spec(document.collection(), &spec.paths)?;
        let mut working = document.clone();
        self.populate_paths(&mut working, &spec.paths, "").await?;
        *document = working;
        Ok(())
    }

    /// Like `populate`, for a batch. Either every record is updated or none is.
    pub async fn populate_many(&self, documents: &mut [Document], spec: &PopulateSpec) -> OdmResult<()> {
        if spec.is_empty() {
            return Ok(());
        }
        for collection in documents.iter().map(Document::collection).unique() {
            check_spec(collection, &spec.paths)?;
        }
        let mut working = documents.to_vec();
        for document in working.iter_mut() {
            self.populate_paths(document, &spec.paths, "").await?;
        }
        for (document, populated) in documents.iter_mut().zip(working) {
            *document = populated;
        }
        Ok(())
    }

    /// Apply `children` to every populated entry of `refs`. Entries left as
    /// bare identifiers are skipped.
    pub(crate) async fn populate_targets(
        &self,
        refs: &mut [Ref<Document>],
        children: &[PopulatePath],
        prefix: &str,
    ) -> OdmResult<()> {
        if children.is_empty() {
            return Ok(());
        }
        for (index, reference) in refs.iter_mut().enumerate() {
            let at = join(prefix, &index.to_string());
            self.populate_target(reference, children, &at).await?;
        }
        Ok(())
    }

    async fn populate_target(&self, reference: &mut Ref<Document>, children: &[PopulatePath], at: &str) -> OdmResult<()> {
        if let Ref::Populated(document) = reference {
            self.populate_paths(document, children, at).await?;
        }
        Ok(())
    }

    async fn populate_typed<T: Entity>(&self, field: &mut Ref<T>, children: &[PopulatePath], at: &str) -> OdmResult<()> {
        self.resolver.resolve_typed(field, at).await?;
        if children.is_empty() {
            return Ok(());
        }
        if let Ref::Populated(record) = field {
            let mut document: Document = (**record).clone().into();
            self.populate_paths(&mut document, children, at).await?;
            **record = T::try_from(document)?;
        }
        Ok(())
    }

    fn populate_paths<'b>(
        &'b self,
        document: &'b mut Document,
        paths: &'b [PopulatePath],
        prefix: &'b str,
    ) -> PopulateFuture<'b> {
        Box::pin(async move {
            let collection = document.collection();
            let schema = entity_schema(collection);

            for entry in paths {
                // Under a dynamic reference a path may belong to only some of
                // the possible targets. It does not apply to the others.
                if !schema.field(&entry.path).is_some_and(|field| field.kind.is_populatable()) {
                    continue;
                }
                let at = join(prefix, &entry.path);
                match (&mut *document, entry.path.as_str()) {
                    (Document::Article(article), "author") => {
                        self.populate_typed(&mut article.author, &entry.populate, &at).await?;
                    }
                    (Document::Article(article), "sections") => {
                        SectionResolver::populate(self, &mut article.sections, &entry.populate, &at).await?;
                    }
                    (Document::Post(post), "author") => {
                        if let Some(author) = post.author.as_mut() {
                            self.populate_typed(author, &entry.populate, &at).await?;
                        }
                    }
                    (Document::Comment(comment), "author") => {
                        self.populate_typed(&mut comment.author, &entry.populate, &at).await?;
                    }
                    (Document::Comment(comment), "doc") => {
                        let target = comment.doc_model.into();
                        self.resolver.resolve_one(&mut comment.doc, target, &at).await?;
                        self.populate_target(&mut comment.doc, &entry.populate, &at).await?;
                    }
                    (Document::Spotlight(spotlight), "docs") => {
                        let target = spotlight.docs_model.into();
                        self.resolver.resolve_many(&mut spotlight.docs, target, &at).await?;
                        self.populate_targets(&mut spotlight.docs, &entry.populate, &at).await?;
                    }
                    _ => {
                        return Err(OdmError::InvalidPopulatePath {
                            collection,
                            path: at,
                        })
                    }
                }
            }
            Ok(())
        })
    }
}

/// Check a populate tree rooted at `collection` without touching the store.
///
/// Below a reference, paths are checked against every collection the
/// reference can land in: a fixed target, or all the names its model field
/// admits. A path must be populatable on at least one of them. Errors name
/// the root collection and the full dotted path.
pub fn check_spec(collection: Collection, paths: &[PopulatePath]) -> OdmResult<()> {
    check_across(collection, &[collection], paths, "")
}

pub(crate) fn check_across(
    root: Collection,
    candidates: &[Collection],
    paths: &[PopulatePath],
    prefix: &str,
) -> OdmResult<()> {
    for entry in paths {
        let at = join(prefix, &entry.path);
        let mut found = false;
        let mut targets = Vec::new();
        for &candidate in candidates {
            let schema = entity_schema(candidate);
            let Some(field) = schema
                .field(&entry.path)
                .filter(|field| field.kind.is_populatable())
            else {
                continue;
            };
            found = true;
            if field.kind == FieldKind::Sections {
                SectionResolver::check_children(root, &entry.populate, &at)?;
            }
            targets.extend_from_slice(schema.targets(field));
        }
        if !found {
            return Err(OdmError::InvalidPopulatePath { collection: root, path: at });
        }
        if !entry.populate.is_empty() && !targets.is_empty() {
            let targets: Vec<Collection> = targets.into_iter().unique().collect();
            check_across(root, &targets, &entry.populate, &at)?;
        }
    }
    Ok(())
}
