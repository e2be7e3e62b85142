use anyhow::{Context, Result};
use fake::faker::lorem::en::{Paragraph, Sentence, Words};
use fake::faker::name::en::Name;
use fake::Fake;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::logic::Odm;
use crate::model::{
    Article, ArticleSection, Author, Collection, Comment, DocModel, Id, NewArticle, NewAuthor,
    NewComment, NewPost, NewSpotlight, Post, Spotlight,
};
use crate::store::traits::DocumentStore;

/// Identifiers of everything seeded, grouped by collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSummary {
    pub authors: Vec<Id>,
    pub articles: Vec<Id>,
    pub posts: Vec<Id>,
    pub spotlights: Vec<Id>,
    pub comments: Vec<Id>,
    /// Article whose sections exercise every variant and both embed kinds.
    pub sample_article: Id,
}

/// Seed a small interlinked data set. Text is generated from `rng_seed`, so
/// the same seed always produces the same content.
pub async fn load_seed_data<S: DocumentStore + ?Sized>(odm: &Odm<S>, rng_seed: u64) -> Result<SeedSummary> {
    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
    let mut summary = SeedSummary::default();

    // Authors: the last one has no description
    for index in 0..3 {
        let description: Option<String> = if index < 2 {
            Some(Sentence(4..9).fake_with_rng(&mut rng))
        } else {
            None
        };
        let author: Author = odm
            .insert(&NewAuthor {
                name: Name().fake_with_rng(&mut rng),
                description,
            })
            .await
            .context("Failed to seed author")?;
        summary.authors.push(author.id);
    }

    for index in 0..2 {
        let article: Article = odm
            .insert(&NewArticle {
                name: title(&mut rng),
                author: summary.authors[index].clone(),
                sections: vec![ArticleSection::text(paragraph(&mut rng))],
            })
            .await
            .context("Failed to seed article")?;
        summary.articles.push(article.id);
    }

    // Posts by the second and third author, then an anonymous one
    for index in 0..3 {
        let post: Post = odm
            .insert(&NewPost {
                author: (index < 2).then(|| summary.authors[index + 1].clone()),
                content: paragraph(&mut rng),
            })
            .await
            .context("Failed to seed post")?;
        summary.posts.push(post.id);
    }

    for (docs, docs_model) in [
        (summary.articles.clone(), DocModel::Article),
        (summary.posts.clone(), DocModel::Post),
    ] {
        let spotlight: Spotlight = odm
            .insert(&NewSpotlight { docs, docs_model })
            .await
            .context("Failed to seed spotlight")?;
        summary.spotlights.push(spotlight.id);
    }

    let targets = [
        (summary.articles[0].clone(), DocModel::Article),
        (summary.articles[1].clone(), DocModel::Article),
        (summary.posts[0].clone(), DocModel::Post),
        (summary.posts[1].clone(), DocModel::Post),
        (summary.posts[2].clone(), DocModel::Post),
    ];
    for (doc, doc_model) in targets {
        let author = summary.authors[rng.random_range(0..summary.authors.len())].clone();
        let comment: Comment = odm
            .insert(&NewComment {
                author,
                content: Sentence(3..12).fake_with_rng(&mut rng),
                doc,
                doc_model,
            })
            .await
            .context("Failed to seed comment")?;
        summary.comments.push(comment.id);
    }

    let sample: Article = odm
        .insert(&NewArticle {
            name: title(&mut rng),
            author: summary.authors[2].clone(),
            sections: vec![
                ArticleSection::text(paragraph(&mut rng)),
                ArticleSection::embed(
                    Collection::Author,
                    [summary.authors[0].clone(), summary.authors[1].clone()],
                ),
                ArticleSection::image(
                    format!("https://picsum.photos/seed/{}/800/600", rng.random::<u32>()),
                    Some(Name().fake_with_rng(&mut rng)),
                ),
                ArticleSection::embed(Collection::Spotlight, summary.spotlights.clone()),
            ],
        })
        .await
        .context("Failed to seed sample article")?;
    summary.articles.push(sample.id.clone());
    summary.sample_article = sample.id;

    log::info!(
        "seeded {} authors, {} articles, {} posts, {} spotlights, {} comments",
        summary.authors.len(),
        summary.articles.len(),
        summary.posts.len(),
        summary.spotlights.len(),
        summary.comments.len()
    );
    Ok(summary)
}

fn title(rng: &mut ChaCha8Rng) -> String {
    let words: Vec<String> = Words(2..5).fake_with_rng(rng);
    words.join(" ")
}

fn paragraph(rng: &mut ChaCha8Rng) -> String {
    Paragraph(2..4).fake_with_rng(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, PopulateSpec, Ref};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn seeds_the_documented_shape() {
        let store = Arc::new(MemoryStore::new());
        let odm = Odm::new(store.clone());
        let summary = load_seed_data(&odm, 7).await.unwrap();

        assert_eq!(store.count("Author"), 3);
        assert_eq!(store.count("Article"), 3);
        assert_eq!(store.count("Post"), 3);
        assert_eq!(store.count("Spotlight"), 2);
        assert_eq!(store.count("Comment"), 5);

        let post_author = |post: Post| post.author.map(|author| author.id().clone());
        let mut authors = Vec::new();
        for id in &summary.posts {
            authors.push(post_author(odm.get(id, None).await.unwrap().unwrap()));
        }
        assert_eq!(
            authors,
            vec![Some(summary.authors[1].clone()), Some(summary.authors[2].clone()), None]
        );

        let sample: Article = odm.get(&summary.sample_article, None).await.unwrap().unwrap();
        assert_eq!(sample.author.id(), &summary.authors[2]);
        let quiet: Author = odm.get(&summary.authors[2], None).await.unwrap().unwrap();
        assert!(quiet.description.is_none());
    }

    #[tokio::test]
    async fn sample_article_populates_every_embed() {
        let odm = Odm::new(Arc::new(MemoryStore::new()));
        let summary = load_seed_data(&odm, 7).await.unwrap();

        let article: Article = odm
            .get(&summary.sample_article, Some(&PopulateSpec::parse("author sections.embeds")))
            .await
            .unwrap()
            .unwrap();

        assert!(article.author.is_populated());
        let embeds: Vec<_> = article.embed_sections().collect();
        assert_eq!(embeds.len(), 2);
        assert!(embeds[0].1.embeds.iter().all(|r| matches!(r.populated(), Some(Document::Author(_)))));
        assert!(embeds[1].1.embeds.iter().all(|r| matches!(r.populated(), Some(Document::Spotlight(_)))));
        // Spotlight docs stay as identifiers unless asked for.
        if let Some(Document::Spotlight(spotlight)) = embeds[1].1.embeds[0].populated() {
            assert!(spotlight.docs.iter().all(|d| matches!(d, Ref::Id(_))));
        }
    }

    #[tokio::test]
    async fn same_seed_same_text() {
        let first = Odm::new(Arc::new(MemoryStore::new()));
        let second = Odm::new(Arc::new(MemoryStore::new()));
        let a = load_seed_data(&first, 11).await.unwrap();
        let b = load_seed_data(&second, 11).await.unwrap();

        let author_a: Author = first.get(&a.authors[0], None).await.unwrap().unwrap();
        let author_b: Author = second.get(&b.authors[0], None).await.unwrap().unwrap();
        assert_eq!(author_a.name, author_b.name);
        assert_eq!(author_a.description, author_b.description);
    }
}
