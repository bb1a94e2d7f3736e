//! Generator module - writes the static blog using the built-in Tera templates

use anyhow::{Context as _, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::content::{Collection, ComponentRegistry, LoadFailure, Post};
use crate::error::{ContentError, SiteError};
use crate::templates::SitePages;
use crate::Folio;

/// Outcome of a build
#[derive(Debug, Default)]
pub struct BuildReport {
    /// HTML pages written to the public directory
    pub pages_written: usize,
    /// Posts that made it into the site
    pub posts_published: usize,
    /// Static files copied
    pub files_copied: usize,
    /// Posts left out because they failed to load or render
    pub failures: Vec<LoadFailure>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Static site generator
pub struct Generator {
    folio: Folio,
    pages: SitePages,
}

impl Generator {
    /// Create a new generator with the built-in components
    pub fn new(folio: &Folio) -> Result<Self> {
        Self::with_components(folio, ComponentRegistry::with_builtins())
    }

    pub fn with_components(folio: &Folio, components: ComponentRegistry) -> Result<Self> {
        let pages = SitePages::new(&folio.config, components)?;
        Ok(Self {
            folio: folio.clone(),
            pages,
        })
    }

    /// Generate the entire blog.
    ///
    /// A post that fails to load or render is left out of every page and
    /// reported; the rest of the site is still written.
    pub fn generate(&self) -> Result<BuildReport> {
        let (collection, mut failures) = Collection::load(&self.folio.loader());
        tracing::info!("Loaded {} posts", collection.len());

        // Render every post body up front so failed posts never reach a listing
        let rendered: Vec<(&Post, Result<String, SiteError>)> = collection
            .posts()
            .par_iter()
            .map(|post| (post, self.render_post(post)))
            .collect();

        let mut post_pages = Vec::with_capacity(rendered.len());
        let mut failed_ids = Vec::new();
        for (post, result) in rendered {
            match result {
                Ok(html) => post_pages.push((post.id.clone(), html)),
                Err(SiteError::Content(error)) => {
                    tracing::error!("Failed to render post `{}`: {}", post.id, error);
                    failed_ids.push(post.id.clone());
                    failures.push(LoadFailure {
                        id: post.id.clone(),
                        path: post.source.clone(),
                        error,
                    });
                }
                // The templates are built in, so this is not the post's fault
                Err(error) => return Err(error.into()),
            }
        }

        let collection = if failed_ids.is_empty() {
            collection
        } else {
            collection.without(&failed_ids)
        };

        self.clean_generated_dirs()?;
        fs::create_dir_all(&self.folio.public_dir)?;

        let mut report = BuildReport {
            posts_published: collection.len(),
            ..BuildReport::default()
        };

        // Generate post pages
        let config = &self.folio.config;
        for (id, html) in &post_pages {
            self.write_page(&Path::new(&config.post_dir).join(id), html)?;
            report.pages_written += 1;
        }

        report.pages_written += self.generate_blog_pages(&collection)?;
        report.pages_written += self.generate_tag_pages(&collection)?;
        report.files_copied = self.copy_static_files()?;

        failures.sort_by(|a, b| a.path.cmp(&b.path));
        report.failures = failures;

        tracing::info!(
            "Wrote {} pages for {} posts, copied {} static files",
            report.pages_written,
            report.posts_published,
            report.files_copied
        );
        Ok(report)
    }

    fn render_post(&self, post: &Post) -> Result<String, SiteError> {
        let body = self
            .pages
            .markdown()
            .render(&post.body)
            .map_err(|source| ContentError::Render {
                id: post.id.clone(),
                source,
            })?;
        self.pages.render_post(post, &body)
    }

    /// Generate index pages (with pagination)
    fn generate_blog_pages(&self, collection: &Collection) -> Result<usize> {
        let config = &self.folio.config;
        let total_pages = self.pages.paginator().total_pages(collection.len());

        for page in 1..=total_pages {
            let html = self.pages.blog_page(collection, page)?;
            let dir = if page == 1 {
                PathBuf::from(&config.blog_dir)
            } else {
                Path::new(&config.blog_dir)
                    .join(&config.pagination_dir)
                    .join(page.to_string())
            };
            self.write_page(&dir, &html)?;
        }

        tracing::debug!("Generated {} blog index pages", total_pages);
        Ok(total_pages)
    }

    /// Generate tag pages and the tag list
    fn generate_tag_pages(&self, collection: &Collection) -> Result<usize> {
        let config = &self.folio.config;
        let tags = collection.tags().tags();

        for tag in &tags {
            let html = self.pages.tag_page(collection, tag)?;
            self.write_page(&Path::new(&config.tag_dir).join(tag), &html)?;
        }

        let html = self.pages.tags_page(collection)?;
        self.write_page(Path::new(&config.tag_dir), &html)?;

        tracing::debug!("Generated {} tag pages", tags.len());
        Ok(tags.len() + 1)
    }

    /// Write `html` as `<public>/<dir>/index.html`
    fn write_page(&self, dir: &Path, html: &str) -> Result<()> {
        let output_path = self.folio.public_dir.join(dir).join("index.html");
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Remove pages of an earlier build so deleted posts and tags disappear
    fn clean_generated_dirs(&self) -> Result<()> {
        let config = &self.folio.config;
        for dir in [&config.blog_dir, &config.post_dir, &config.tag_dir] {
            if dir.trim_matches('/').is_empty() {
                continue;
            }
            let path = self.folio.public_dir.join(dir);
            if path.is_dir() {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove {:?}", path))?;
            }
        }
        Ok(())
    }

    /// Copy static assets (images, css, etc.) to public directory
    fn copy_static_files(&self) -> Result<usize> {
        let static_dir = &self.folio.static_dir;
        if !static_dir.is_dir() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.folio.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest).with_context(|| format!("Failed to copy {:?}", path))?;
            copied += 1;
        }

        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_with_posts(posts: &[(&str, String)]) -> (tempfile::TempDir, Folio) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_config.yml"), "title: Test\nper_page: 2\n").unwrap();
        let content = dir.path().join("posts");
        fs::create_dir_all(&content).unwrap();
        for (name, text) in posts {
            fs::write(content.join(name), text).unwrap();
        }
        let folio = Folio::new(dir.path()).unwrap();
        (dir, folio)
    }

    fn post(title: &str, date: &str, tags: &str, body: &str) -> String {
        format!(
            "---\ntitle: {}\ndate: {}\nexcerpt: ''\ncover_image: ''\nimage_alt: ''\ntags: [{}]\n---\n\n{}\n",
            title, date, tags, body
        )
    }

    #[test]
    fn test_generate_writes_every_page() {
        let (_dir, folio) = site_with_posts(&[
            ("a.md", post("A", "2024-01-01", "rust", "# A")),
            ("b.md", post("B", "2024-01-02", "rust, web", "B body")),
            ("c.md", post("C", "2024-01-03", "", "C body")),
        ]);
        fs::create_dir_all(folio.static_dir.join("css")).unwrap();
        fs::write(folio.static_dir.join("css/style.css"), "body {}").unwrap();

        let report = Generator::new(&folio).unwrap().generate().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.posts_published, 3);
        assert_eq!(report.files_copied, 1);
        // 3 posts + 2 blog pages + 2 tags + tag list
        assert_eq!(report.pages_written, 8);

        let public = &folio.public_dir;
        for page in [
            "posts/a/index.html",
            "posts/b/index.html",
            "posts/c/index.html",
            "blog/index.html",
            "blog/page/2/index.html",
            "tags/index.html",
            "tags/rust/index.html",
            "tags/web/index.html",
            "css/style.css",
        ] {
            assert!(public.join(page).is_file(), "missing {}", page);
        }
        assert!(!public.join("blog/page/3").exists());
    }

    #[test]
    fn test_failed_posts_are_excluded_and_reported() {
        let (_dir, folio) = site_with_posts(&[
            ("good.md", post("Good", "2024-01-01", "rust", "Fine")),
            ("unknown.md", post("Unknown", "2024-01-02", "rust", "<Nope />")),
            ("broken.md", "no front-matter".to_string()),
        ]);

        let report = Generator::new(&folio).unwrap().generate().unwrap();
        let ids: Vec<_> = report.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["broken", "unknown"]);
        assert!(matches!(
            report.failures[1].error,
            ContentError::Render { .. }
        ));
        assert_eq!(report.posts_published, 1);

        let index = fs::read_to_string(folio.public_dir.join("blog/index.html")).unwrap();
        assert!(index.contains("Good"));
        assert!(!index.contains("Unknown"));
        assert!(!folio.public_dir.join("posts/unknown").exists());

        let tag = fs::read_to_string(folio.public_dir.join("tags/rust/index.html")).unwrap();
        assert!(!tag.contains("Unknown"));
    }

    #[test]
    fn test_stale_pages_are_removed() {
        let (dir, folio) = site_with_posts(&[("a.md", post("A", "2024-01-01", "old", "A"))]);
        Generator::new(&folio).unwrap().generate().unwrap();
        assert!(folio.public_dir.join("tags/old/index.html").exists());

        fs::remove_file(dir.path().join("posts/a.md")).unwrap();
        let report = Generator::new(&folio).unwrap().generate().unwrap();
        assert_eq!(report.posts_published, 0);
        assert!(!folio.public_dir.join("posts/a").exists());
        assert!(!folio.public_dir.join("tags/old").exists());
        assert!(folio.public_dir.join("blog/index.html").exists());
    }
}
