use crate::model::{Collection, DocModel, SectionKind};

/// Declarative shape of one record kind.
#[derive(Debug)]
pub struct EntitySchema {
    pub collection: Collection,
    pub fields: &'static [FieldDef],
}

/// Declarative shape of one article section variant. The `type` tag itself
/// is implied and not listed.
#[derive(Debug)]
pub struct SectionSchema {
    pub kind: SectionKind,
    pub fields: &'static [FieldDef],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Reference into a fixed collection.
    Ref { target: Collection },
    /// Reference whose collection is named by the sibling `model_field`.
    DynamicRef { model_field: &'static str },
    /// Ordered references, all into the collection named by `model_field`.
    DynamicRefArray { model_field: &'static str },
    /// Names a target collection; must be one of `allowed`.
    ModelName { allowed: &'static [Collection] },
    /// Ordered article sections, discriminated by `type`.
    Sections,
}

impl FieldDef {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

impl FieldKind {
    /// Whether population can descend into a field of this kind.
    pub fn is_populatable(&self) -> bool {
        matches!(
            self,
            FieldKind::Ref { .. }
                | FieldKind::DynamicRef { .. }
                | FieldKind::DynamicRefArray { .. }
                | FieldKind::Sections
        )
    }

    pub fn describe(&self) -> String {
        match self {
            FieldKind::String => "string".to_string(),
            FieldKind::Ref { target } => format!("reference to {}", target),
            FieldKind::DynamicRef { model_field } => format!("reference selected by '{}'", model_field),
            FieldKind::DynamicRefArray { model_field } => {
                format!("array of references selected by '{}'", model_field)
            }
            FieldKind::ModelName { allowed } => format!(
                "one of [{}]",
                allowed.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            ),
            FieldKind::Sections => "array of article sections".to_string(),
        }
    }
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn populatable_paths(&self) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .filter(|field| field.kind.is_populatable())
            .map(|field| field.name)
    }

    /// Collections `field` can resolve into.
    pub fn targets(&self, field: &'static FieldDef) -> &'static [Collection] {
        reference_targets(self.fields, field)
    }
}

impl SectionSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn targets(&self, field: &'static FieldDef) -> &'static [Collection] {
        reference_targets(self.fields, field)
    }
}

/// A dynamic reference may land in any collection its model-name field
/// admits. Non-reference fields resolve into nothing.
fn reference_targets(fields: &'static [FieldDef], field: &'static FieldDef) -> &'static [Collection] {
    match &field.kind {
        FieldKind::Ref { target } => std::slice::from_ref(target),
        FieldKind::DynamicRef { model_field } | FieldKind::DynamicRefArray { model_field } => fields
            .iter()
            .find(|candidate| candidate.name == *model_field)
            .and_then(|candidate| match candidate.kind {
                FieldKind::ModelName { allowed } => Some(allowed),
                _ => None,
            })
            .unwrap_or(&[]),
        _ => &[],
    }
}

static AUTHOR: EntitySchema = EntitySchema {
    collection: Collection::Author,
    fields: &[
        FieldDef::required("name", FieldKind::String),
        FieldDef::optional("description", FieldKind::String),
    ],
};

static ARTICLE: EntitySchema = EntitySchema {
    collection: Collection::Article,
    fields: &[
        FieldDef::required("name", FieldKind::String),
        FieldDef::required(
            "author",
            FieldKind::Ref {
                target: Collection::Author,
            },
        ),
        FieldDef::required("sections", FieldKind::Sections),
    ],
};

static POST: EntitySchema = EntitySchema {
    collection: Collection::Post,
    fields: &[
        FieldDef::optional(
            "author",
            FieldKind::Ref {
                target: Collection::Author,
            },
        ),
        FieldDef::required("content", FieldKind::String),
    ],
};

static COMMENT: EntitySchema = EntitySchema {
    collection: Collection::Comment,
    fields: &[
        FieldDef::required(
            "author",
            FieldKind::Ref {
                target: Collection::Author,
            },
        ),
        FieldDef::required("content", FieldKind::String),
        FieldDef::required(
            "doc",
            FieldKind::DynamicRef {
                model_field: "docModel",
            },
        ),
        FieldDef::required(
            "docModel",
            FieldKind::ModelName {
                allowed: &DocModel::ALLOWED,
            },
        ),
    ],
};

static SPOTLIGHT: EntitySchema = EntitySchema {
    collection: Collection::Spotlight,
    fields: &[
        FieldDef::optional(
            "docs",
            FieldKind::DynamicRefArray {
                model_field: "docsModel",
            },
        ),
        FieldDef::required(
            "docsModel",
            FieldKind::ModelName {
                allowed: &DocModel::ALLOWED,
            },
        ),
    ],
};

static TEXT_SECTION: SectionSchema = SectionSchema {
    kind: SectionKind::Text,
    fields: &[FieldDef::required("content", FieldKind::String)],
};

static IMAGE_SECTION: SectionSchema = SectionSchema {
    kind: SectionKind::Image,
    fields: &[
        FieldDef::required("uri", FieldKind::String),
        FieldDef::optional("credits", FieldKind::String),
    ],
};

static EMBED_SECTION: SectionSchema = SectionSchema {
    kind: SectionKind::Embed,
    fields: &[
        FieldDef::required(
            "embeds",
            FieldKind::DynamicRefArray {
                model_field: "embedType",
            },
        ),
        FieldDef::required(
            "embedType",
            FieldKind::ModelName {
                allowed: &Collection::ALL,
            },
        ),
    ],
};

pub fn entity_schema(collection: Collection) -> &'static EntitySchema {
    match collection {
        Collection::Author => &AUTHOR,
        Collection::Article => &ARTICLE,
        Collection::Post => &POST,
        Collection::Comment => &COMMENT,
        Collection::Spotlight => &SPOTLIGHT,
    }
}

pub fn section_schema(kind: SectionKind) -> &'static SectionSchema {
    match kind {
        SectionKind::Text => &TEXT_SECTION,
        SectionKind::Image => &IMAGE_SECTION,
        SectionKind::Embed => &EMBED_SECTION,
    }
}
