//! The full, ordered set of posts of one build

use std::collections::HashMap;

use super::loader::{ContentLoader, LoadFailure};
use super::paginate::sort_posts;
use super::{MarkdownRenderer, Page, Paginator, Post, PostMeta, RenderedBody, TagIndex};
use crate::error::ContentError;

/// Posts sorted newest first, with their listing projections and tag index
#[derive(Debug, Clone, Default)]
pub struct Collection {
    posts: Vec<Post>,
    metas: Vec<PostMeta>,
    by_id: HashMap<String, usize>,
    tags: TagIndex,
}

impl Collection {
    /// Build a collection from posts in any order.
    ///
    /// Identifiers must be unique; the loader guarantees this.
    pub fn from_posts(mut posts: Vec<Post>) -> Self {
        sort_posts(&mut posts);
        let metas: Vec<PostMeta> = posts.iter().map(Post::meta).collect();
        let by_id = posts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let tags = TagIndex::build(&metas);

        Self {
            posts,
            metas,
            by_id,
            tags,
        }
    }

    /// Load every post from `loader`, returning the files that failed
    /// alongside the collection of those that did not
    pub fn load(loader: &ContentLoader) -> (Self, Vec<LoadFailure>) {
        let report = loader.load_all();
        tracing::debug!(
            "Loaded {} posts ({} failed)",
            report.posts.len(),
            report.failures.len()
        );
        (Self::from_posts(report.posts), report.failures)
    }

    /// Posts, newest first
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Listing projections, newest first
    pub fn metas(&self) -> &[PostMeta] {
        &self.metas
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    /// Look up a post by identifier
    pub fn post(&self, id: &str) -> Result<&Post, ContentError> {
        self.by_id
            .get(id)
            .map(|&i| &self.posts[i])
            .ok_or_else(|| ContentError::NotFound(id.to_string()))
    }

    /// One page of the blog index
    pub fn page(&self, paginator: &Paginator, page: usize) -> Result<Page, ContentError> {
        paginator.page(&self.metas, page)
    }

    /// Posts carrying `tag`, newest first. Unknown tags give an empty listing.
    pub fn tagged(&self, tag: &str) -> &[PostMeta] {
        self.tags.posts(tag)
    }

    /// Render the body of post `id`
    pub fn render(
        &self,
        renderer: &MarkdownRenderer,
        id: &str,
    ) -> Result<(&Post, RenderedBody), ContentError> {
        let post = self.post(id)?;
        let rendered = renderer
            .render(&post.body)
            .map_err(|source| ContentError::Render {
                id: post.id.clone(),
                source,
            })?;
        Ok((post, rendered))
    }

    /// A collection without the given posts, for when some fail to render
    pub fn without(&self, ids: &[String]) -> Self {
        let posts = self
            .posts
            .iter()
            .filter(|p| !ids.contains(&p.id))
            .cloned()
            .collect();
        Self::from_posts(posts)
    }
}
