use serde_json::Value;

use crate::error::{SchemaValidationError, ValidationError, ValidationErrorType};
use crate::logic::sections::SectionResolver;
use crate::model::{entity_schema, Collection, FieldDef, FieldKind, JsonObject, ID_FIELD};

/// Validates candidate records against their entity schema.
///
/// Validation also normalizes: a whole record given in a reference position
/// is reduced to its `_id`, and an absent optional reference array becomes
/// empty. The returned object is what gets stored.
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn validate(collection: Collection, candidate: &Value) -> Result<JsonObject, SchemaValidationError> {
        let mut errors = Vec::new();
        let normalized = Self::validate_into(collection, candidate, "", &mut errors);
        match normalized {
            Some(document) if errors.is_empty() => Ok(document),
            _ => Err(SchemaValidationError { collection, errors }),
        }
    }

    /// Validate every candidate, reporting paths prefixed with the candidate
    /// index (`[2].name`). Nothing is returned unless all pass.
    pub fn validate_many(
        collection: Collection,
        candidates: &[Value],
    ) -> Result<Vec<JsonObject>, SchemaValidationError> {
        let mut errors = Vec::new();
        let mut documents = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            let prefix = format!("[{}]", index);
            if let Some(document) = Self::validate_into(collection, candidate, &prefix, &mut errors) {
                documents.push(document);
            }
        }
        if errors.is_empty() {
            Ok(documents)
        } else {
            Err(SchemaValidationError { collection, errors })
        }
    }

    fn validate_into(
        collection: Collection,
        candidate: &Value,
        prefix: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<JsonObject> {
        let Some(object) = candidate.as_object() else {
            errors.push(error(
                prefix,
                ValidationErrorType::NotAnObject,
                format!("{} record must be an object", collection),
                Some("object"),
                Some(json_type(candidate)),
            ));
            return None;
        };

        let mut normalized = JsonObject::new();
        match object.get(ID_FIELD) {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) => {
                normalized.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            }
            Some(other) => errors.push(error(
                &join(prefix, ID_FIELD),
                ValidationErrorType::TypeMismatch,
                format!("{} must be a string identifier", ID_FIELD),
                Some("string"),
                Some(json_type(other)),
            )),
        }

        let fields = entity_schema(collection).fields;
        let rest: JsonObject = object
            .iter()
            .filter(|(key, _)| key.as_str() != ID_FIELD)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        validate_fields(fields, &rest, prefix, &mut normalized, errors);
        Some(normalized)
    }
}

/// Check `object` against `fields`, writing accepted values into `out`.
///
/// Shared by top-level records and section variants: unknown keys, missing
/// required fields and per-kind shape errors all land in `errors`.
pub(crate) fn validate_fields(
    fields: &[FieldDef],
    object: &JsonObject,
    prefix: &str,
    out: &mut JsonObject,
    errors: &mut Vec<ValidationError>,
) {
    for key in object.keys() {
        if !fields.iter().any(|field| field.name == key) {
            errors.push(error(
                &join(prefix, key),
                ValidationErrorType::UndefinedField,
                format!("field '{}' is not defined here", key),
                None,
                Some(key.as_str()),
            ));
        }
    }

    for field in fields {
        let path = join(prefix, field.name);
        match object.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    errors.push(error(
                        &path,
                        ValidationErrorType::MissingRequiredField,
                        format!("path '{}' is required", field.name),
                        Some(field.kind.describe().as_str()),
                        None,
                    ));
                } else if matches!(field.kind, FieldKind::DynamicRefArray { .. }) {
                    out.insert(field.name.to_string(), Value::Array(Vec::new()));
                }
            }
            Some(value) => {
                if let Some(accepted) = validate_value(&field.kind, value, &path, errors) {
                    out.insert(field.name.to_string(), accepted);
                }
            }
        }
    }
}

fn validate_value(kind: &FieldKind, value: &Value, path: &str, errors: &mut Vec<ValidationError>) -> Option<Value> {
    match kind {
        FieldKind::String => match value {
            Value::String(_) => Some(value.clone()),
            other => {
                errors.push(type_mismatch(path, "string", other));
                None
            }
        },
        FieldKind::Ref { .. } | FieldKind::DynamicRef { .. } => normalize_reference(value, path, errors),
        FieldKind::DynamicRefArray { .. } => {
            let Value::Array(items) = value else {
                errors.push(type_mismatch(path, "array of identifiers", value));
                return None;
            };
            let before = errors.len();
            let ids: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| normalize_reference(item, &join(path, &index.to_string()), errors))
                .collect();
            (errors.len() == before).then_some(Value::Array(ids))
        }
        FieldKind::ModelName { allowed } => match value {
            Value::String(name) if allowed.iter().any(|c| c.as_str() == name) => Some(value.clone()),
            Value::String(name) => {
                errors.push(error(
                    path,
                    ValidationErrorType::InvalidEnumValue,
                    format!("'{}' is not a valid enum value for path '{}'", name, path),
                    Some(kind.describe().as_str()),
                    Some(name.as_str()),
                ));
                None
            }
            other => {
                errors.push(type_mismatch(path, "string", other));
                None
            }
        },
        FieldKind::Sections => {
            let Value::Array(items) = value else {
                errors.push(type_mismatch(path, "array of sections", value));
                return None;
            };
            let before = errors.len();
            let sections: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    SectionResolver::validate_section(item, &join(path, &index.to_string()), errors)
                        .map(Value::Object)
                })
                .collect();
            (errors.len() == before).then_some(Value::Array(sections))
        }
    }
}

/// A reference is stored as a bare identifier; a record object stands in for
/// its `_id`.
fn normalize_reference(value: &Value, path: &str, errors: &mut Vec<ValidationError>) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Object(record) => match record.get(ID_FIELD) {
            Some(Value::String(id)) => Some(Value::String(id.clone())),
            _ => {
                errors.push(error(
                    path,
                    ValidationErrorType::TypeMismatch,
                    format!("referenced record at '{}' has no string {}", path, ID_FIELD),
                    Some("identifier"),
                    Some("object"),
                ));
                None
            }
        },
        other => {
            errors.push(type_mismatch(path, "identifier", other));
            None
        }
    }
}

pub(crate) fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

pub(crate) fn error(
    path: &str,
    error_type: ValidationErrorType,
    message: String,
    expected: Option<&str>,
    actual: Option<&str>,
) -> ValidationError {
    ValidationError {
        path: path.to_string(),
        error_type,
        message,
        expected: expected.map(str::to_string),
        actual: actual.map(str::to_string),
    }
}

fn type_mismatch(path: &str, expected: &str, actual: &Value) -> ValidationError {
    error(
        path,
        ValidationErrorType::TypeMismatch,
        format!("cast to {} failed for value at path '{}'", expected, path),
        Some(expected),
        Some(json_type(actual)),
    )
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_types(err: &SchemaValidationError) -> Vec<(String, ValidationErrorType)> {
        err.errors.iter().map(|e| (e.path.clone(), e.error_type)).collect()
    }

    #[test]
    fn author_requires_name_only() {
        let ok = SchemaValidator::validate(Collection::Author, &json!({ "name": "Ada" })).unwrap();
        assert_eq!(ok.get("name"), Some(&json!("Ada")));
        assert!(!ok.contains_key("description"));

        let err = SchemaValidator::validate(Collection::Author, &json!({ "description": "bio" })).unwrap_err();
        assert_eq!(err.path(), "name");
        assert_eq!(err.errors[0].error_type, ValidationErrorType::MissingRequiredField);
    }

    #[test]
    fn rejects_unknown_fields_and_wrong_types() {
        let err = SchemaValidator::validate(
            Collection::Post,
            &json!({ "content": 7, "title": "extra" }),
        )
        .unwrap_err();

        let found = error_types(&err);
        assert!(found.contains(&("title".to_string(), ValidationErrorType::UndefinedField)));
        assert!(found.contains(&("content".to_string(), ValidationErrorType::TypeMismatch)));
    }

    #[test]
    fn model_name_outside_enum_fails() {
        let err = SchemaValidator::validate(
            Collection::Comment,
            &json!({ "author": "a1", "content": "x", "doc": "a2", "docModel": "Author" }),
        )
        .unwrap_err();
        assert_eq!(err.path(), "docModel");
        assert_eq!(err.errors[0].error_type, ValidationErrorType::InvalidEnumValue);
    }

    #[test]
    fn records_in_reference_positions_become_ids() {
        let comment = SchemaValidator::validate(
            Collection::Comment,
            &json!({
                "author": { "_id": "a2", "name": "Bo" },
                "content": "x",
                "doc": "ar1",
                "docModel": "Article",
            }),
        )
        .unwrap();
        assert_eq!(comment.get("author"), Some(&json!("a2")));

        let err = SchemaValidator::validate(
            Collection::Comment,
            &json!({ "author": { "name": "Bo" }, "content": "x", "doc": "ar1", "docModel": "Article" }),
        )
        .unwrap_err();
        assert_eq!(err.path(), "author");
    }

    #[test]
    fn spotlight_docs_default_to_empty_and_normalize() {
        let empty = SchemaValidator::validate(Collection::Spotlight, &json!({ "docsModel": "Post" })).unwrap();
        assert_eq!(empty.get("docs"), Some(&json!([])));

        let docs = SchemaValidator::validate(
            Collection::Spotlight,
            &json!({ "docs": ["p1", { "_id": "p2", "content": "c" }, "p1"], "docsModel": "Post" }),
        )
        .unwrap();
        assert_eq!(docs.get("docs"), Some(&json!(["p1", "p2", "p1"])));

        let err = SchemaValidator::validate(
            Collection::Spotlight,
            &json!({ "docs": ["p1", 4], "docsModel": "Post" }),
        )
        .unwrap_err();
        assert_eq!(err.path(), "docs.1");
    }

    #[test]
    fn caller_supplied_id_is_kept_but_must_be_a_string() {
        let ok = SchemaValidator::validate(Collection::Author, &json!({ "_id": "a1", "name": "x" })).unwrap();
        assert_eq!(ok.get("_id"), Some(&json!("a1")));

        let err = SchemaValidator::validate(Collection::Author, &json!({ "_id": 1, "name": "x" })).unwrap_err();
        assert_eq!(err.path(), "_id");
    }

    #[test]
    fn null_counts_as_absent() {
        let err = SchemaValidator::validate(Collection::Post, &json!({ "content": null })).unwrap_err();
        assert_eq!(err.errors[0].error_type, ValidationErrorType::MissingRequiredField);

        let ok = SchemaValidator::validate(Collection::Post, &json!({ "content": "x", "author": null })).unwrap();
        assert!(!ok.contains_key("author"));
    }

    #[test]
    fn batch_validation_prefixes_candidate_index() {
        let err = SchemaValidator::validate_many(
            Collection::Author,
            &[json!({ "name": "ok" }), json!("not a record"), json!({})],
        )
        .unwrap_err();
        let found = error_types(&err);
        assert_eq!(
            found,
            vec![
                ("[1]".to_string(), ValidationErrorType::NotAnObject),
                ("[2].name".to_string(), ValidationErrorType::MissingRequiredField),
            ]
        );
    }

    #[test]
    fn article_sections_are_checked_per_element() {
        let err = SchemaValidator::validate(
            Collection::Article,
            &json!({
                "name": "n",
                "author": "a1",
                "sections": [
                    { "type": "text", "content": "fine" },
                    { "type": "text", "invalid": "x" },
                ],
            }),
        )
        .unwrap_err();
        assert!(err.has_error_at("sections.1.invalid"));
        assert!(err.has_error_at("sections.1.content"));
        assert!(!err.has_error_at("sections.0.content"));
    }
}
