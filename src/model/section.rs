use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Collection, Document, Id, Ref};

/// One embedded section of an article, selected by its `type` tag.
///
/// Sections have no identity of their own. Only the `embed` variant carries
/// references, so it is the only one population ever touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArticleSection {
    Text(TextSection),
    Image(ImageSection),
    Embed(EmbedSection),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSection {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSection {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<String>,
}

/// References into a single collection, named by `embed_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedSection {
    pub embeds: Vec<Ref<Document>>,
    #[serde(rename = "embedType")]
    pub embed_type: Collection,
}

impl EmbedSection {
    pub fn new(embed_type: Collection, ids: impl IntoIterator<Item = Id>) -> Self {
        Self {
            embeds: ids.into_iter().map(Ref::Id).collect(),
            embed_type,
        }
    }

    /// True once every entry has been replaced by its record.
    pub fn is_populated(&self) -> bool {
        self.embeds.iter().all(Ref::is_populated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Text,
    Image,
    Embed,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [SectionKind::Text, SectionKind::Image, SectionKind::Embed];

    pub fn tag(&self) -> &'static str {
        match self {
            SectionKind::Text => "text",
            SectionKind::Image => "image",
            SectionKind::Embed => "embed",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        SectionKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lifecycle of a section once it has been read back from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Validated,
    Populated,
}

impl ArticleSection {
    pub fn text(content: impl Into<String>) -> Self {
        ArticleSection::Text(TextSection {
            content: content.into(),
        })
    }

    pub fn image(uri: impl Into<String>, credits: Option<String>) -> Self {
        ArticleSection::Image(ImageSection {
            uri: uri.into(),
            credits,
        })
    }

    pub fn embed(embed_type: Collection, ids: impl IntoIterator<Item = Id>) -> Self {
        ArticleSection::Embed(EmbedSection::new(embed_type, ids))
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            ArticleSection::Text(_) => SectionKind::Text,
            ArticleSection::Image(_) => SectionKind::Image,
            ArticleSection::Embed(_) => SectionKind::Embed,
        }
    }

    pub fn as_embed(&self) -> Option<&EmbedSection> {
        match self {
            ArticleSection::Embed(embed) => Some(embed),
            _ => None,
        }
    }

    pub fn as_embed_mut(&mut self) -> Option<&mut EmbedSection> {
        match self {
            ArticleSection::Embed(embed) => Some(embed),
            _ => None,
        }
    }

    /// `Populated` is only reachable for an embed section whose entries have
    /// all been resolved; text and image sections stay `Validated`.
    pub fn state(&self) -> SectionState {
        match self {
            ArticleSection::Embed(embed) if !embed.embeds.is_empty() && embed.is_populated() => {
                SectionState::Populated
            }
            _ => SectionState::Validated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sections_serialize_with_their_tag() {
        let sections = vec![
            ArticleSection::text("hello"),
            ArticleSection::image("https://img.example/1.png", None),
            ArticleSection::embed(Collection::Author, vec!["a1".to_string()]),
        ];

        assert_eq!(
            serde_json::to_value(&sections).unwrap(),
            json!([
                { "type": "text", "content": "hello" },
                { "type": "image", "uri": "https://img.example/1.png" },
                { "type": "embed", "embeds": ["a1"], "embedType": "Author" },
            ])
        );
    }

    #[test]
    fn tag_selects_variant_on_decode() {
        let section: ArticleSection = serde_json::from_value(json!({
            "type": "embed",
            "embeds": ["p1", "p2"],
            "embedType": "Post",
        }))
        .unwrap();

        assert_eq!(section.kind(), SectionKind::Embed);
        let embed = section.as_embed().unwrap();
        assert_eq!(embed.embed_type, Collection::Post);
        assert_eq!(embed.embeds.len(), 2);
        assert_eq!(section.state(), SectionState::Validated);
    }

    #[test]
    fn kinds_map_to_tags() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(SectionKind::from_tag("video"), None);
    }
}
