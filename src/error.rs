//! Error types for the content pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, paginating or rendering posts.
///
/// Every variant names the post identifier or page request it belongs to.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("post `{0}` not found")]
    NotFound(String),

    #[error("failed to parse post `{id}`: {reason}")]
    Parse { id: String, reason: String },

    #[error("page {page} is out of range (1..={total_pages})")]
    OutOfRange { page: i64, total_pages: usize },

    #[error("failed to render post `{id}`: {source}")]
    Render {
        id: String,
        #[source]
        source: RenderError,
    },

    #[error("duplicate post id `{id}` from `{}`", .path.display())]
    DuplicateId { id: String, path: PathBuf },

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
}

impl ContentError {
    pub(crate) fn parse(id: &str, reason: impl Into<String>) -> Self {
        ContentError::Parse {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that surface as "page not found" at the boundary
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::NotFound(_) | ContentError::OutOfRange { .. }
        )
    }
}

/// Errors raised by the Markdown renderer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown component `<{0}>`")]
    UnknownComponent(String),

    #[error("component `<{0}>` is never closed")]
    UnclosedComponent(String),

    #[error("component `<{0}>` is closed outside the block it was opened in")]
    CrossesBlock(String),

    #[error("closing tag `</{found}>` does not match an open component{}", expected_suffix(.expected))]
    UnexpectedClose {
        found: String,
        expected: Option<String>,
    },

    #[error("component `<{name}>` failed: {message}")]
    Component { name: String, message: String },
}

fn expected_suffix(expected: &Option<String>) -> String {
    match expected {
        Some(name) => format!(" (expected `</{}>`)", name),
        None => String::new(),
    }
}

/// Errors raised while producing a page of the site
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl SiteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SiteError::Content(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_content_error_display() {
        let err = ContentError::parse("hello", "missing `title`");
        assert_eq!(
            err.to_string(),
            "failed to parse post `hello`: missing `title`"
        );

        let err = ContentError::OutOfRange {
            page: 3,
            total_pages: 2,
        };
        assert!(err.to_string().contains("page 3"));

        let err = ContentError::Io(
            PathBuf::from("posts/a.md"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("posts/a.md"));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ContentError::NotFound("x".into()).is_not_found());
        assert!(ContentError::OutOfRange {
            page: 0,
            total_pages: 1
        }
        .is_not_found());
        assert!(!ContentError::parse("x", "bad").is_not_found());

        let err: SiteError = ContentError::NotFound("x".into()).into();
        assert!(err.is_not_found());
        let err: SiteError = tera::Error::msg("boom").into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_unexpected_close_display() {
        let err = RenderError::UnexpectedClose {
            found: "Foo".into(),
            expected: Some("InfoText".into()),
        };
        assert!(err.to_string().contains("expected `</InfoText>`"));

        let err = RenderError::UnexpectedClose {
            found: "Foo".into(),
            expected: None,
        };
        assert!(!err.to_string().contains("expected"));
    }
}
