use serde::{Deserialize, Serialize};

use crate::model::Id;

/// Anything that carries a store-assigned identifier.
pub trait Identified {
    fn id(&self) -> &Id;
}

/// A reference field: a bare identifier until it is populated, then the
/// fetched record itself.
///
/// Serializes as the identifier string in the first state and as the full
/// record in the second, so a populated document renders inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(Id),
    Populated(Box<T>),
}

impl<T: Identified> Ref<T> {
    /// Identifier of the referenced record, in either state.
    pub fn id(&self) -> &Id {
        match self {
            Ref::Id(id) => id,
            Ref::Populated(target) => target.id(),
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Ref::Populated(_))
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(target) => Some(target.as_ref()),
        }
    }

    /// Drop a populated target back to its identifier.
    pub fn depopulate(&mut self) {
        if let Ref::Populated(target) = self {
            *self = Ref::Id(target.id().clone());
        }
    }
}

impl<T> From<Id> for Ref<T> {
    fn from(id: Id) -> Self {
        Ref::Id(id)
    }
}

impl<T> From<&str> for Ref<T> {
    fn from(id: &str) -> Self {
        Ref::Id(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Author;

    fn author() -> Author {
        Author {
            id: "a1".to_string(),
            name: "Ada".to_string(),
            description: None,
        }
    }

    #[test]
    fn id_is_stable_across_states() {
        let mut reference: Ref<Author> = Ref::Populated(Box::new(author()));
        assert!(reference.is_populated());
        assert_eq!(reference.id(), "a1");

        reference.depopulate();
        assert_eq!(reference, Ref::Id("a1".to_string()));
        assert!(reference.populated().is_none());
    }

    #[test]
    fn serializes_as_id_or_inline_record() {
        let bare: Ref<Author> = Ref::from("a1");
        assert_eq!(serde_json::to_value(&bare).unwrap(), serde_json::json!("a1"));

        let full: Ref<Author> = Ref::Populated(Box::new(author()));
        assert_eq!(
            serde_json::to_value(&full).unwrap(),
            serde_json::json!({ "_id": "a1", "name": "Ada" })
        );
    }

    #[test]
    fn deserializes_bare_identifier() {
        let reference: Ref<Author> = serde_json::from_value(serde_json::json!("a9")).unwrap();
        assert_eq!(reference, Ref::Id("a9".to_string()));
    }
}
