use serde_json::Value;

use crate::error::{OdmError, OdmResult, SchemaValidationError, ValidationError, ValidationErrorType};
use crate::logic::populate::{check_across, Populator};
use crate::logic::validate::{error, join, json_type, validate_fields};
use crate::model::{
    section_schema, ArticleSection, Collection, JsonObject, PopulatePath, SectionKind, ID_FIELD,
};
use crate::store::traits::DocumentStore;

/// Parsing and population of an article's tagged sections.
pub struct SectionResolver;

impl SectionResolver {
    /// Check one raw section against the schema its `type` selects and
    /// return the normalized object. Sections carry no `_id`, so one is an
    /// unknown field like any other.
    pub fn validate_section(raw: &Value, path: &str, errors: &mut Vec<ValidationError>) -> Option<JsonObject> {
        let Some(object) = raw.as_object() else {
            errors.push(error(
                path,
                ValidationErrorType::NotAnObject,
                "section must be an object".to_string(),
                Some("object"),
                Some(json_type(raw)),
            ));
            return None;
        };

        let kind = match object.get("type") {
            None | Some(Value::Null) => {
                errors.push(error(
                    &join(path, "type"),
                    ValidationErrorType::MissingRequiredField,
                    "path 'type' is required".to_string(),
                    Some("text, image or embed"),
                    None,
                ));
                return None;
            }
            Some(Value::String(tag)) => match SectionKind::from_tag(tag) {
                Some(kind) => kind,
                None => {
                    errors.push(error(
                        &join(path, "type"),
                        ValidationErrorType::UnknownDiscriminator,
                        format!("'{}' is not a valid section type", tag),
                        Some("text, image or embed"),
                        Some(tag.as_str()),
                    ));
                    return None;
                }
            },
            Some(other) => {
                errors.push(error(
                    &join(path, "type"),
                    ValidationErrorType::TypeMismatch,
                    "section type must be a string".to_string(),
                    Some("string"),
                    Some(json_type(other)),
                ));
                return None;
            }
        };

        let body: JsonObject = object
            .iter()
            .filter(|(key, _)| key.as_str() != "type")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut normalized = JsonObject::new();
        normalized.insert("type".to_string(), Value::String(kind.tag().to_string()));
        let before = errors.len();
        validate_fields(section_schema(kind).fields, &body, path, &mut normalized, errors);
        (errors.len() == before).then_some(normalized)
    }

    /// Parse raw sections into their variants. Every element is checked and
    /// all violations are reported together, indexed by position.
    pub fn parse(raw: &[Value]) -> Result<Vec<ArticleSection>, SchemaValidationError> {
        let mut errors = Vec::new();
        let mut sections = Vec::with_capacity(raw.len());

        for (index, item) in raw.iter().enumerate() {
            let path = join("sections", &index.to_string());
            let Some(normalized) = Self::validate_section(item, &path, &mut errors) else {
                continue;
            };
            match serde_json::from_value::<ArticleSection>(Value::Object(normalized)) {
                Ok(section) => sections.push(section),
                Err(e) => errors.push(error(
                    &path,
                    ValidationErrorType::TypeMismatch,
                    e.to_string(),
                    None,
                    None,
                )),
            }
        }

        if errors.is_empty() {
            Ok(sections)
        } else {
            Err(SchemaValidationError {
                collection: Collection::Article,
                errors,
            })
        }
    }

    /// Check the children of a `sections` path. Only `embeds` can be
    /// populated, and what follows it is checked against every collection an
    /// embed section may target, whether or not the article has any.
    pub fn check_children(root: Collection, children: &[PopulatePath], path: &str) -> OdmResult<()> {
        let embed_schema = section_schema(SectionKind::Embed);
        for child in children {
            let at = join(path, &child.path);
            let field = embed_schema
                .field(&child.path)
                .filter(|field| field.kind.is_populatable() && child.path != ID_FIELD);
            let Some(field) = field else {
                return Err(OdmError::InvalidPopulatePath {
                    collection: root,
                    path: at,
                });
            };
            check_across(root, embed_schema.targets(field), &child.populate, &at)?;
        }
        Ok(())
    }

    /// Populate the `embeds` of every embed section. Text and image sections
    /// are skipped, and each embed section resolves against its own
    /// `embed_type`, independently of its siblings. Deeper paths apply to the
    /// embedded records whose collection has them.
    pub async fn populate<S: DocumentStore + ?Sized>(
        populator: &Populator<'_, S>,
        sections: &mut [ArticleSection],
        children: &[PopulatePath],
        path: &str,
    ) -> OdmResult<()> {
        if children.is_empty() {
            return Ok(());
        }
        Self::check_children(Collection::Article, children, path)?;

        for (index, section) in sections.iter_mut().enumerate() {
            let Some(embed) = section.as_embed_mut() else {
                continue;
            };
            let at = join(&join(path, &index.to_string()), "embeds");
            populator
                .resolver()
                .resolve_many(&mut embed.embeds, embed.embed_type, &at)
                .await?;
            for child in children {
                populator
                    .populate_targets(&mut embed.embeds, &child.populate, &at)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmbedSection, Ref, SectionState};
    use serde_json::json;

    #[test]
    fn parses_each_variant_from_exactly_its_fields() {
        let sections = SectionResolver::parse(&[
            json!({ "type": "text", "content": "words" }),
            json!({ "type": "image", "uri": "https://img.example/a.png", "credits": "me" }),
            json!({ "type": "image", "uri": "https://img.example/b.png" }),
            json!({ "type": "embed", "embeds": ["a1", "a2"], "embedType": "Author" }),
        ])
        .unwrap();

        assert_eq!(
            sections.iter().map(ArticleSection::kind).collect::<Vec<_>>(),
            vec![SectionKind::Text, SectionKind::Image, SectionKind::Image, SectionKind::Embed]
        );
        assert_eq!(
            sections[3],
            ArticleSection::Embed(EmbedSection {
                embeds: vec![Ref::from("a1"), Ref::from("a2")],
                embed_type: Collection::Author,
            })
        );
        assert!(sections.iter().all(|s| s.state() == SectionState::Validated));
    }

    #[test]
    fn foreign_field_under_a_tag_is_rejected() {
        let err = SectionResolver::parse(&[json!({ "type": "text", "invalid": "x" })]).unwrap_err();
        assert_eq!(err.collection, Collection::Article);
        assert!(err.has_error_at("sections.0.invalid"));
        assert!(err.has_error_at("sections.0.content"));

        // A field that is legal for another variant is still foreign here.
        let err = SectionResolver::parse(&[json!({ "type": "text", "content": "x", "uri": "u" })]).unwrap_err();
        assert_eq!(err.path(), "sections.0.uri");
        assert_eq!(err.errors[0].error_type, ValidationErrorType::UndefinedField);
    }

    #[test]
    fn unknown_or_missing_tag_is_reported() {
        let err = SectionResolver::parse(&[
            json!({ "type": "video", "uri": "u" }),
            json!({ "content": "untagged" }),
            json!(["not", "an", "object"]),
        ])
        .unwrap_err();

        let found: Vec<_> = err.errors.iter().map(|e| (e.path.as_str(), e.error_type)).collect();
        assert_eq!(
            found,
            vec![
                ("sections.0.type", ValidationErrorType::UnknownDiscriminator),
                ("sections.1.type", ValidationErrorType::MissingRequiredField),
                ("sections.2", ValidationErrorType::NotAnObject),
            ]
        );
    }

    #[test]
    fn embed_requires_known_embed_type_and_rejects_section_ids() {
        let err = SectionResolver::parse(&[json!({
            "type": "embed",
            "embeds": ["x"],
            "embedType": "Video",
        })])
        .unwrap_err();
        assert_eq!(err.path(), "sections.0.embedType");
        assert_eq!(err.errors[0].error_type, ValidationErrorType::InvalidEnumValue);

        let err = SectionResolver::parse(&[json!({ "_id": "s1", "type": "text", "content": "x" })]).unwrap_err();
        assert_eq!(err.path(), "sections.0._id");
    }
}
