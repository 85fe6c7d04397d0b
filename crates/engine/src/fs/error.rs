//! Errors raised by the virtual filesystem.

use thiserror::Error;

/// Navigation and construction failures.
///
/// All of these are recoverable: the session reports them as an error line
/// and keeps its previous working directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// A path segment does not name an existing entry.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A path tried to descend into (or insert under) a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A node name is empty, contains a separator, or is `.`/`..`.
    #[error("invalid node name: {0:?}")]
    InvalidName(String),

    /// A sibling with the same case-insensitive name already exists.
    #[error("duplicate name in directory: {0}")]
    DuplicateName(String),
}

/// Reasons a file cannot be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The node is a directory.
    #[error("is a directory")]
    IsADirectory,

    /// The node is flagged executable.
    #[error("cannot display executable file")]
    Executable,

    /// The content exceeds the display ceiling.
    #[error("file too large to display: {lines} lines exceeds limit of {limit}")]
    TooLarge {
        /// Number of lines in the file.
        lines: usize,
        /// Configured ceiling.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_display() {
        assert_eq!(
            FsError::NotFound("docs".to_string()).to_string(),
            "no such file or directory: docs"
        );
        assert_eq!(
            FsError::InvalidName("..".to_string()).to_string(),
            r#"invalid node name: "..""#
        );
    }

    #[test]
    fn test_read_error_display() {
        let err = ReadError::TooLarge {
            lines: 1200,
            limit: 1000,
        };
        assert_eq!(
            err.to_string(),
            "file too large to display: 1200 lines exceeds limit of 1000"
        );
    }
}
