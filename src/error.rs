//! Error types shared across the crate

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShortlistError {
    /// The scan root is missing or is not a directory
    #[error("cannot scan {}: {reason}", path.display())]
    Scan { path: PathBuf, reason: String },

    /// An image could not be decoded
    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// A shortlist copy failed
    #[error("cannot copy {}: {reason}", source_path.display())]
    Copy { source_path: PathBuf, reason: String },

    /// The resume file exists but cannot be read back
    #[error("resume file {} is unreadable: {reason}", path.display())]
    ResumeCorrupt { path: PathBuf, reason: String },

    /// `--resume` was asked for but there is nothing usable to resume
    #[error("cannot resume: {0}")]
    ResumeUnavailable(String),

    #[error("cannot use output directory {}: {reason}", path.display())]
    OutputDir { path: PathBuf, reason: String },

    #[error("no images found in {}", root.display())]
    NoImages { root: PathBuf },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShortlistError {
    pub fn scan(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Scan {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn copy(source_path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Copy {
            source_path: source_path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn resume_corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ResumeCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for an error that ends the program
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoImages { .. } => 0,
            Self::Scan { .. } | Self::OutputDir { .. } | Self::Prompt(_) => 1,
            Self::ResumeUnavailable(_) | Self::ResumeCorrupt { .. } => 2,
            Self::Decode { .. } | Self::Copy { .. } | Self::ConfigError(_) | Self::Io(_) => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShortlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_message_names_path() {
        let err = ShortlistError::scan("/photos/missing", "does not exist");
        assert_eq!(err.to_string(), "cannot scan /photos/missing: does not exist");
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: ShortlistError = io_err.into();
        assert!(matches!(err, ShortlistError::Io(_)));
    }

    #[test]
    fn test_no_images_message() {
        let err = ShortlistError::NoImages {
            root: PathBuf::from("/empty"),
        };
        assert_eq!(err.to_string(), "no images found in /empty");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            ShortlistError::NoImages {
                root: PathBuf::from("/empty")
            }
            .exit_code(),
            0
        );
        assert_eq!(ShortlistError::scan("/x", "gone").exit_code(), 1);
        assert_eq!(
            ShortlistError::ResumeUnavailable("no saved session".into()).exit_code(),
            2
        );
        let io_err: ShortlistError = io::Error::other("tty").into();
        assert_eq!(io_err.exit_code(), 3);
    }
}
