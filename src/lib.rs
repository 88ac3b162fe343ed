//! Shortlist - a keyboard-driven terminal image triage viewer
//!
//! This crate provides the scanner, the viewer state machine, the background
//! copier and the resume store behind the `shortlist` binary.

pub mod async_preview;
pub mod cli;
pub mod config;
pub mod copier;
pub mod domain;
pub mod error;
pub mod logging;
pub mod preview;
pub mod prompt;
pub mod resume;
pub mod session;
pub mod tui;

// Re-export primary types for convenience
pub use config::UserConfig;
pub use copier::{ConflictPolicy, Copier, CopyEvent, CopyOptions, CopyOutcome};
pub use domain::{scan_images, ImageEntry, ImageFormat, ScanOptions, Viewer, ViewerState};
pub use error::{Result, ShortlistError};
pub use resume::{ResumeRecord, ResumeStore};
pub use session::{Session, SessionContext, SessionSummary};
