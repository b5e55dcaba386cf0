//! Error types for the preview pipeline.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by [`crate::vfs::VirtualFileStore`] operations.
///
/// All of these are caller-correctable and fail only the offending call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum VfsError {
    #[error("Invalid path: {path} ({reason})")]
    InvalidPath { path: String, reason: String },

    #[error("Path not found: {path}")]
    NotFound { path: String },

    #[error("Path already exists: {path}")]
    Conflict { path: String },

    #[error("Expected {expected} occurrence(s) of the search text in {path}, found {found}")]
    AmbiguousMatch {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("Line {line} is out of range for {path} ({line_count} lines)")]
    LineOutOfRange {
        path: String,
        line: usize,
        line_count: usize,
    },
}

impl VfsError {
    pub(crate) fn invalid(path: &str, reason: &str) -> Self {
        VfsError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        VfsError::NotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn conflict(path: &str) -> Self {
        VfsError::Conflict {
            path: path.to_string(),
        }
    }
}

/// A source file that could not be parsed.
///
/// `line` and `column` are 1-based. `frame` holds a short code excerpt with a
/// caret under the failing column when the location is known.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{path}:{line}:{column}: {message}")]
pub struct SyntaxError {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
}

/// Build-fatal failures. Everything else degrades to placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum BuildError {
    #[error("Syntax error in {0}")]
    SyntaxError(SyntaxError),

    #[error("No entry point: add /App.jsx or another .jsx/.tsx file")]
    NoEntryPoint,
}

impl From<SyntaxError> for BuildError {
    fn from(err: SyntaxError) -> Self {
        BuildError::SyntaxError(err)
    }
}
