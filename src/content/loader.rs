//! Content loader - loads posts from the content directory

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{FrontMatter, Post};
use crate::error::ContentError;

/// A source file that could not be turned into a post
#[derive(Debug)]
pub struct LoadFailure {
    pub id: String,
    pub path: PathBuf,
    pub error: ContentError,
}

/// Result of loading every post in the content directory
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully parsed posts, in source path order
    pub posts: Vec<Post>,
    /// Files that failed, in source path order
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads posts from a content directory
#[derive(Debug, Clone)]
pub struct ContentLoader {
    content_dir: PathBuf,
}

impl ContentLoader {
    /// Create a new content loader
    pub fn new<P: AsRef<Path>>(content_dir: P) -> Self {
        Self {
            content_dir: content_dir.as_ref().to_path_buf(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// List the post source files, sorted by path
    pub fn source_files(&self) -> Vec<PathBuf> {
        if !self.content_dir.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.content_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|path| path.is_file() && is_markdown_file(path))
            .collect();
        files.sort();
        files
    }

    /// Load all posts. A file that fails does not stop the others.
    pub fn load_all(&self) -> LoadReport {
        let files = self.source_files();
        tracing::debug!(
            "Loading {} source files from {:?}",
            files.len(),
            self.content_dir
        );

        let results: Vec<(PathBuf, Result<Post, ContentError>)> = files
            .into_par_iter()
            .map(|path| {
                let result = load_post(&path);
                (path, result)
            })
            .collect();

        let mut report = LoadReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (path, result) in results {
            match result {
                Ok(post) if !seen.insert(post.id.clone()) => {
                    tracing::warn!("Skipping {:?}: duplicate post id `{}`", path, post.id);
                    report.failures.push(LoadFailure {
                        id: post.id.clone(),
                        error: ContentError::DuplicateId {
                            id: post.id,
                            path: path.clone(),
                        },
                        path,
                    });
                }
                Ok(post) => report.posts.push(post),
                Err(error) => {
                    let id = post_id(&path);
                    tracing::warn!("Failed to load post `{}`: {}", id, error);
                    report.failures.push(LoadFailure { id, path, error });
                }
            }
        }

        report
    }

    /// Load a single post by identifier
    pub fn load(&self, id: &str) -> Result<Post, ContentError> {
        let path = self
            .source_files()
            .into_iter()
            .find(|path| post_id(path) == id)
            .ok_or_else(|| ContentError::NotFound(id.to_string()))?;
        load_post(&path)
    }
}

/// Load a single post from a file
fn load_post(path: &Path) -> Result<Post, ContentError> {
    let id = post_id(path);
    let content =
        fs::read_to_string(path).map_err(|e| ContentError::Io(path.to_path_buf(), e))?;
    let (fm, body) = FrontMatter::parse(&id, &content)?;
    fm.into_post(&id, body, path)
}

/// Post identifier derived from the file name
pub fn post_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_post(dir: &Path, name: &str, title: &str, date: &str) {
        let content = format!(
            "---\ntitle: {}\ndate: {}\nexcerpt: ''\ncover_image: ''\nimage_alt: ''\ntags: [rust]\n---\n\nBody of {}.\n",
            title, date, title
        );
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_all_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a.md", "A", "2024-01-01");
        write_post(dir.path(), "b.markdown", "B", "2024-01-02");
        fs::write(dir.path().join("broken.md"), "no front-matter here").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let report = ContentLoader::new(dir.path()).load_all();
        let ids: Vec<_> = report.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "broken");
        assert!(matches!(
            report.failures[0].error,
            ContentError::Parse { .. }
        ));
    }

    #[test]
    fn test_missing_metadata_key_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "full.md", "Full", "2024-01-01");
        fs::write(
            dir.path().join("no-cover.md"),
            "---\ntitle: No cover\ndate: 2024-01-02\nexcerpt: ''\nimage_alt: ''\ntags: []\n---\n\nBody.\n",
        )
        .unwrap();

        let report = ContentLoader::new(dir.path()).load_all();
        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.posts[0].id, "full");
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0].error,
            ContentError::Parse { id, reason } if id == "no-cover" && reason.contains("cover_image")
        ));
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "same.markdown", "First", "2024-01-01");
        write_post(dir.path(), "same.md", "Second", "2024-01-02");

        let report = ContentLoader::new(dir.path()).load_all();
        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            ContentError::DuplicateId { .. }
        ));
    }

    #[test]
    fn test_load_single_post() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "hello-world.md", "Hello", "2024-01-01");

        let loader = ContentLoader::new(dir.path());
        let post = loader.load("hello-world").unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.tags, vec!["rust"]);
        assert!(post.body.contains("Body of Hello."));

        let err = loader.load("missing").unwrap_err();
        assert!(matches!(err, ContentError::NotFound(ref id) if id == "missing"));
    }

    #[test]
    fn test_missing_content_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let report = ContentLoader::new(dir.path().join("nope")).load_all();
        assert!(report.posts.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_nested_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        write_post(&dir.path().join("drafts"), "draft.md", "Draft", "2024-01-01");
        write_post(dir.path(), "top.md", "Top", "2024-01-01");

        let report = ContentLoader::new(dir.path()).load_all();
        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.posts[0].id, "top");
    }
}
