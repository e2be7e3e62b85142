use serde::{Deserialize, Serialize};

use crate::model::{ArticleSection, Author, Id, Ref};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub author: Ref<Author>,
    pub sections: Vec<ArticleSection>,
}

impl Article {
    /// Embed sections in document order, with their positions.
    pub fn embed_sections(&self) -> impl Iterator<Item = (usize, &crate::model::EmbedSection)> {
        self.sections
            .iter()
            .enumerate()
            .filter_map(|(index, section)| section.as_embed().map(|embed| (index, embed)))
    }
}

/// Article input for creation. Sections go through the same tagged shape as
/// stored sections, with `embeds` holding bare identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub name: String,
    pub author: Id,
    pub sections: Vec<ArticleSection>,
}
