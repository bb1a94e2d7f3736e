//! Content cache for the development server
//!
//! Loading and sorting every post on each request is wasteful, but a cache
//! that outlives edits to the content directory serves stale pages. The
//! [`ContentCache`] keeps the last loaded [`Collection`] together with a
//! [`Fingerprint`] of the content directory and reloads whenever the
//! fingerprint changes.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::content::{Collection, ContentLoader, LoadFailure};
use crate::error::ContentError;

/// Summary of the content directory's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    /// Modification time of the directory itself, catches renames/deletes
    pub dir_mtime: u128,
    /// Newest modification time among the source files
    pub newest_mtime: u128,
    /// Number of source files
    pub file_count: usize,
    /// Hash of every source file's path, size and modification time
    pub entries_hash: u64,
}

impl Fingerprint {
    /// Fingerprint the source files `loader` would read
    pub fn compute(loader: &ContentLoader) -> Result<Self, ContentError> {
        let dir = loader.content_dir();
        let dir_mtime = if dir.is_dir() { get_mtime(dir)? } else { 0 };

        let files = loader.source_files();
        let mut hasher = DefaultHasher::new();
        let mut newest_mtime = 0;

        for path in &files {
            let metadata = fs::metadata(path).map_err(|e| ContentError::Io(path.clone(), e))?;
            let mtime = modified_nanos(path, &metadata)?;
            newest_mtime = newest_mtime.max(mtime);

            path.hash(&mut hasher);
            metadata.len().hash(&mut hasher);
            mtime.hash(&mut hasher);
        }

        Ok(Self {
            dir_mtime,
            newest_mtime,
            file_count: files.len(),
            entries_hash: hasher.finish(),
        })
    }
}

/// Get a modification time in nanoseconds since the unix epoch
fn get_mtime(path: &Path) -> Result<u128, ContentError> {
    let metadata = fs::metadata(path).map_err(|e| ContentError::Io(path.to_path_buf(), e))?;
    modified_nanos(path, &metadata)
}

fn modified_nanos(path: &Path, metadata: &fs::Metadata) -> Result<u128, ContentError> {
    let mtime = metadata
        .modified()
        .map_err(|e| ContentError::Io(path.to_path_buf(), e))?;
    Ok(mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos())
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: Fingerprint,
    collection: Arc<Collection>,
    failures: Vec<LoadFailure>,
}

/// The last loaded collection, keyed by the content directory fingerprint
#[derive(Debug)]
pub struct ContentCache {
    loader: ContentLoader,
    entry: Option<CacheEntry>,
}

impl ContentCache {
    pub fn new(loader: ContentLoader) -> Self {
        Self {
            loader,
            entry: None,
        }
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    /// Return the cached collection, reloading it first if the content
    /// directory changed since it was loaded
    pub fn get_or_load(&mut self) -> Result<Arc<Collection>, ContentError> {
        let fingerprint = Fingerprint::compute(&self.loader)?;

        if let Some(entry) = &self.entry {
            if entry.fingerprint == fingerprint {
                return Ok(Arc::clone(&entry.collection));
            }
            tracing::debug!("Content directory changed, reloading");
        }

        let (collection, failures) = Collection::load(&self.loader);
        for failure in &failures {
            tracing::warn!("Post `{}` excluded: {}", failure.id, failure.error);
        }
        let collection = Arc::new(collection);

        self.entry = Some(CacheEntry {
            fingerprint,
            collection: Arc::clone(&collection),
            failures,
        });
        Ok(collection)
    }

    /// Files that failed in the last load
    pub fn failures(&self) -> &[LoadFailure] {
        self.entry
            .as_ref()
            .map(|e| e.failures.as_slice())
            .unwrap_or(&[])
    }

    /// Drop the cached collection; the next access reloads from disk
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_post(dir: &Path, id: &str, title: &str) {
        let content = format!("---\ntitle: {}\ndate: 2024-02-01\nexcerpt: ''\ncover_image: ''\nimage_alt: ''\ntags: []\n---\n\nBody.\n", title);
        fs::write(dir.join(format!("{}.md", id)), content).unwrap();
    }

    #[test]
    fn test_unchanged_directory_reuses_collection() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "A");

        let mut cache = ContentCache::new(ContentLoader::new(dir.path()));
        assert!(!cache.is_loaded());

        let first = cache.get_or_load().unwrap();
        let second = cache.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_edit_and_new_file_trigger_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "A");

        let mut cache = ContentCache::new(ContentLoader::new(dir.path()));
        let first = cache.get_or_load().unwrap();

        // A longer title changes the file size even if the mtime does not move
        write_post(dir.path(), "a", "A longer title");
        let edited = cache.get_or_load().unwrap();
        assert!(!Arc::ptr_eq(&first, &edited));
        assert_eq!(edited.post("a").unwrap().title, "A longer title");

        write_post(dir.path(), "b", "B");
        assert_eq!(cache.get_or_load().unwrap().len(), 2);

        fs::remove_file(dir.path().join("a.md")).unwrap();
        let removed = cache.get_or_load().unwrap();
        assert_eq!(removed.len(), 1);
        assert!(removed.post("a").is_err());
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "A");

        let mut cache = ContentCache::new(ContentLoader::new(dir.path()));
        let first = cache.get_or_load().unwrap();
        cache.invalidate();
        assert!(!cache.is_loaded());
        let second = cache.get_or_load().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failures_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "A");
        fs::write(dir.path().join("bad.md"), "---\ntitle: x\n---\n").unwrap();

        let mut cache = ContentCache::new(ContentLoader::new(dir.path()));
        let collection = cache.get_or_load().unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(cache.failures().len(), 1);
        assert_eq!(cache.failures()[0].id, "bad");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ContentCache::new(ContentLoader::new(dir.path().join("none")));
        assert!(cache.get_or_load().unwrap().is_empty());
    }
}
