use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Collection, Id};

/// Errors raised by the ODM layer.
///
/// Store-transport failures are carried through untouched in `Store`.
#[derive(Debug, Error)]
pub enum OdmError {
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    #[error("unknown target collection '{name}'")]
    UnknownTargetCollection { name: String },

    #[error("dangling reference at '{path}': no {collection} with id '{id}'")]
    DanglingReference {
        collection: Collection,
        id: Id,
        path: String,
    },

    #[error("'{path}' is not a populatable path of {collection}")]
    InvalidPopulatePath { collection: Collection, path: String },

    #[error("expected a {expected} record, found a {found} record")]
    CollectionMismatch {
        expected: Collection,
        found: Collection,
    },

    #[error("stored {collection} record could not be decoded: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type OdmResult<T> = Result<T, OdmError>;

/// A candidate record (or one of its sections) does not match its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaValidationError {
    pub collection: Collection,
    pub errors: Vec<ValidationError>,
}

impl SchemaValidationError {
    /// Path of the first violation, e.g. `sections.0.content`.
    pub fn path(&self) -> &str {
        self.errors.first().map_or("", |e| e.path.as_str())
    }

    /// Message of the first violation.
    pub fn reason(&self) -> &str {
        self.errors
            .first()
            .map_or("no violations recorded", |e| e.message.as_str())
    }

    pub fn has_error_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} validation failed at '{}': {}",
            self.collection,
            self.path(),
            self.reason()
        )?;
        if self.errors.len() > 1 {
            write!(f, " (and {} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaValidationError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub error_type: ValidationErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    NotAnObject,
    MissingRequiredField,
    UndefinedField,
    TypeMismatch,
    InvalidEnumValue,
    UnknownDiscriminator,
}
