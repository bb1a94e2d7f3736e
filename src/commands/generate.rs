//! Generate static files

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::generator::{BuildReport, Generator};
use crate::Folio;

/// Generate the static site, logging every post that was left out
pub fn run(folio: &Folio) -> Result<BuildReport> {
    let start = Instant::now();

    let report = Generator::new(folio)?.generate()?;
    for failure in &report.failures {
        tracing::error!(
            "Post `{}` was not published ({:?}): {}",
            failure.id,
            failure.path,
            failure.error
        );
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}

/// Turn a report with failures into an error, after the site was written
pub fn ensure_clean(report: &BuildReport) -> Result<()> {
    if !report.is_clean() {
        anyhow::bail!(
            "{} post(s) failed to build: {}",
            report.failures.len(),
            report
                .failures
                .iter()
                .map(|f| f.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

/// Paths whose changes affect the generated site
pub fn watch_targets(folio: &Folio) -> Vec<(PathBuf, RecursiveMode)> {
    let mut targets = Vec::new();
    if folio.content_dir.exists() {
        targets.push((folio.content_dir.clone(), RecursiveMode::NonRecursive));
    }
    if folio.static_dir.exists() {
        targets.push((folio.static_dir.clone(), RecursiveMode::Recursive));
    }
    let config_path = folio.config_path();
    if config_path.exists() {
        targets.push((config_path, RecursiveMode::NonRecursive));
    }
    targets
}

/// Filter out editor and VCS noise
pub fn is_relevant_change(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".git")
        && !path_str.contains(".DS_Store")
        && !path_str.ends_with('~')
        && !path_str.ends_with(".swp")
}

/// Watch for file changes and regenerate
pub async fn watch(folio: &Folio) -> Result<()> {
    let folio = folio.clone();
    tokio::task::spawn_blocking(move || watch_blocking(folio)).await?
}

fn watch_blocking(mut folio: Folio) -> Result<()> {
    let (tx, rx) = channel();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    for (path, mode) in watch_targets(&folio) {
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if !events.iter().any(|e| is_relevant_change(&e.path)) {
                    continue;
                }
                for event in &events {
                    tracing::info!("File changed: {}", event.path.display());
                }

                // Pick up configuration edits too
                match Folio::new(&folio.base_dir) {
                    Ok(reloaded) => folio = reloaded,
                    Err(e) => {
                        tracing::error!("Invalid configuration, keeping the old one: {}", e);
                    }
                }

                match run(&folio) {
                    Ok(report) if report.is_clean() => tracing::info!("Regenerated successfully"),
                    Ok(report) => tracing::warn!(
                        "Regenerated with {} failed post(s)",
                        report.failures.len()
                    ),
                    Err(e) => tracing::error!("Generation failed: {}", e),
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_ensure_clean() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("posts/bad.md"), "nothing").unwrap();
        let folio = Folio::new(dir.path()).unwrap();

        let report = run(&folio).unwrap();
        let err = ensure_clean(&report).unwrap_err();
        assert!(err.to_string().contains("bad"));
        // The rest of the site is still written
        assert!(folio.public_dir.join("blog/index.html").is_file());
    }

    #[test]
    fn test_relevant_changes() {
        assert!(is_relevant_change(Path::new("posts/a.md")));
        assert!(!is_relevant_change(Path::new("posts/.a.md.swp")));
        assert!(!is_relevant_change(Path::new("posts/a.md~")));
        assert!(!is_relevant_change(Path::new(".git/index")));
    }

    #[test]
    fn test_watch_targets() {
        let dir = tempfile::tempdir().unwrap();
        let folio = Folio::new(dir.path()).unwrap();
        assert!(watch_targets(&folio).is_empty());

        fs::create_dir_all(&folio.content_dir).unwrap();
        let targets = watch_targets(&folio);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, folio.content_dir);
        assert_eq!(targets[0].1, RecursiveMode::NonRecursive);

        fs::create_dir_all(folio.static_dir.join("css")).unwrap();
        let targets = watch_targets(&folio);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1], (folio.static_dir.clone(), RecursiveMode::Recursive));
    }
}
