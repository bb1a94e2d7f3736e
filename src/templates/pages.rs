//! Renders the pages of the blog: index pages, posts, tag listings

use tera::Context;

use super::{PaginationData, PostData, SiteData, TagLink, TagSummary, TemplateRenderer, TocEntry};
use crate::config::SiteConfig;
use crate::content::{
    Collection, ComponentRegistry, MarkdownRenderer, Paginator, Post, PostMeta, RenderedBody,
};
use crate::error::SiteError;
use crate::helpers::{html_escape, tag_url};

/// Everything needed to turn a [`Collection`] into HTML pages.
///
/// Shared by the static generator and the development server, so both
/// produce the same markup.
pub struct SitePages {
    config: SiteConfig,
    site: SiteData,
    templates: TemplateRenderer,
    markdown: MarkdownRenderer,
    paginator: Paginator,
}

impl SitePages {
    pub fn new(config: &SiteConfig, components: ComponentRegistry) -> Result<Self, SiteError> {
        Ok(Self {
            config: config.clone(),
            site: SiteData::new(config),
            templates: TemplateRenderer::new()?,
            markdown: MarkdownRenderer::from_config(config, components),
            paginator: Paginator::new(config.per_page),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn markdown(&self) -> &MarkdownRenderer {
        &self.markdown
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Create base context shared by every page
    fn base_context(&self, description: &str) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("description", description);
        context.insert("version", env!("CARGO_PKG_VERSION"));
        context
    }

    fn post_list(&self, posts: &[PostMeta]) -> Vec<PostData> {
        posts
            .iter()
            .map(|meta| PostData::new(&self.config, meta))
            .collect()
    }

    /// Page `page` (1-based) of the blog index
    pub fn blog_page(&self, collection: &Collection, page: usize) -> Result<String, SiteError> {
        let page = collection.page(&self.paginator, page)?;

        let mut context = self.base_context(&self.site.description);
        context.insert("posts", &self.post_list(&page.posts));
        context.insert("pagination", &PaginationData::new(&self.config, &page));

        Ok(self.templates.render("blog.html", &context)?)
    }

    /// Render the body of post `id` and its page
    pub fn post_page(&self, collection: &Collection, id: &str) -> Result<String, SiteError> {
        let (post, body) = collection.render(&self.markdown, id)?;
        self.render_post(post, &body)
    }

    /// Page of a post whose body is already rendered
    pub fn render_post(&self, post: &Post, body: &RenderedBody) -> Result<String, SiteError> {
        let description = if post.excerpt.is_empty() {
            self.site.description.clone()
        } else {
            html_escape(&post.excerpt)
        };
        let toc: Vec<TocEntry> = body.headings.iter().map(TocEntry::from).collect();

        let mut context = self.base_context(&description);
        context.insert("post", &PostData::new(&self.config, &post.meta()));
        context.insert("toc", &toc);
        context.insert("content", &body.html);

        Ok(self.templates.render("post.html", &context)?)
    }

    /// Listing of the posts carrying `tag`. Unknown tags give an empty listing.
    pub fn tag_page(&self, collection: &Collection, tag: &str) -> Result<String, SiteError> {
        let mut context = self.base_context(&self.site.description);
        context.insert("tag", &TagLink::new(&self.config, tag));
        context.insert("posts", &self.post_list(collection.tagged(tag)));

        Ok(self.templates.render("tag.html", &context)?)
    }

    /// Every tag with its post count
    pub fn tags_page(&self, collection: &Collection) -> Result<String, SiteError> {
        let tags: Vec<TagSummary> = collection
            .tags()
            .counts()
            .into_iter()
            .map(|(name, count)| TagSummary {
                name: html_escape(name),
                url: tag_url(&self.config, name),
                count,
            })
            .collect();

        let mut context = self.base_context(&self.site.description);
        context.insert("tags", &tags);

        Ok(self.templates.render("tags.html", &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn post(id: &str, day: u32, tags: &[&str], body: &str) -> Post {
        Post {
            id: id.to_string(),
            title: format!("Title {}", id),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            excerpt: String::new(),
            cover_image: if day == 1 { "c.jpg".to_string() } else { String::new() },
            image_alt: "alt".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            body: body.to_string(),
            source: PathBuf::from(format!("{}.md", id)),
        }
    }

    fn pages() -> SitePages {
        let config = SiteConfig {
            per_page: 2,
            ..SiteConfig::default()
        };
        SitePages::new(&config, ComponentRegistry::with_builtins()).unwrap()
    }

    fn collection() -> Collection {
        Collection::from_posts(vec![
            post("a", 1, &["rust"], "# A\n\n## Details\n\nText"),
            post("b", 2, &["rust", "web"], "Plain"),
            post("c", 3, &[], "<InfoText>Note</InfoText>"),
        ])
    }

    #[test]
    fn test_blog_pages() {
        let pages = pages();
        let collection = collection();

        let first = pages.blog_page(&collection, 1).unwrap();
        assert!(first.contains("Title c"));
        assert!(first.contains("Title b"));
        assert!(!first.contains("Title a"));
        assert!(first.contains(r#"href="/blog/page/2/""#));
        assert!(first.contains("pager-prev disabled"));
        assert!(first.contains("<title>Blog - Page 1 of 2 | Folio</title>"));
        assert!(first.contains(r#"<span class="pager-page active" aria-current="page">1</span>"#));
        assert!(first.contains(r#"<a class="pager-page" href="/blog/page/2/">2</a>"#));

        let second = pages.blog_page(&collection, 2).unwrap();
        assert!(second.contains("Title a"));
        assert!(second.contains(r#"src="/images/posts/a/c.jpg""#));
        assert!(second.contains("pager-next disabled"));
        assert!(second.contains(r#"<a class="pager-page" href="/blog/">1</a>"#));
        assert!(second.contains(r#"<span class="pager-page active" aria-current="page">2</span>"#));

        let err = pages.blog_page(&collection, 3).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_blog_has_one_page() {
        let html = pages().blog_page(&Collection::default(), 1).unwrap();
        assert!(html.contains("No posts yet."));
        assert!(html.contains("Page 1 of 1"));
    }

    #[test]
    fn test_post_page() {
        let pages = pages();
        let collection = collection();

        let html = pages.post_page(&collection, "a").unwrap();
        assert!(html.contains("<title>Title a | Folio</title>"));
        assert!(html.contains(r##"<a href="#details">Details</a>"##));
        assert!(html.contains(r#"<a href="/tags/rust/">rust</a>"#));

        let html = pages.post_page(&collection, "c").unwrap();
        assert!(html.contains(r#"<aside class="info-text info-text-info">"#));

        assert!(pages.post_page(&collection, "zzz").unwrap_err().is_not_found());
    }

    #[test]
    fn test_tag_pages() {
        let pages = pages();
        let collection = collection();

        let html = pages.tag_page(&collection, "rust").unwrap();
        assert!(html.contains("Title a"));
        assert!(html.contains("Title b"));
        assert!(!html.contains("Title c"));

        let html = pages.tag_page(&collection, "python").unwrap();
        assert!(html.contains("No posts yet."));

        let html = pages.tags_page(&collection).unwrap();
        assert!(html.contains(r#"<a href="/tags/rust/">rust</a> <span class="count">2</span>"#));
        assert!(html.contains(r#"<a href="/tags/web/">web</a> <span class="count">1</span>"#));
    }

    #[test]
    fn test_text_is_escaped() {
        let pages = pages();
        let mut p = post("x", 4, &["<script>"], "Body");
        p.title = "<script>alert(1)</script>".to_string();
        let collection = Collection::from_posts(vec![p]);

        let html = pages.post_page(&collection, "x").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }
}
