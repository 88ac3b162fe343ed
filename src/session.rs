//! The running triage session: viewer, copier and preloader wired to the
//! resume store.

mod startup;

pub use startup::{establish, Startup, StartupOptions};

use crate::async_preview::{PreviewState, Preloader};
use crate::copier::{Copier, CopyEvent, CopyOutcome, RequestStatus};
use crate::domain::{ImageEntry, Viewer};
use crate::error::Result;
use crate::preview::CellSize;
use crate::resume::{ResumeRecord, ResumeStore};
use crate::tui::KeyAction;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a session reads from, writes to, and saves its position
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub images_root: PathBuf,
    pub output_dir: PathBuf,
    /// `None` when no state directory could be determined
    pub store: Option<ResumeStore>,
    /// Whether the image list was scanned without hidden entries
    pub skip_hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

/// Whether the input loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Totals printed when the program exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub viewed: usize,
    pub copied: usize,
    pub already_present: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub last_index: Option<usize>,
}

pub struct Session {
    context: SessionContext,
    viewer: Viewer,
    copier: Copier,
    preloader: Preloader,
    prefetch: bool,
    status: Option<StatusMessage>,
    viewed: HashSet<usize>,
    last_index: Option<usize>,
    copied: usize,
    already_present: usize,
    failed: usize,
}

impl Session {
    pub fn new(
        context: SessionContext,
        images: Vec<ImageEntry>,
        copier: Copier,
        preloader: Preloader,
        prefetch: bool,
    ) -> Self {
        let viewer = Viewer::new(context.images_root.clone(), images);
        Self {
            context,
            viewer,
            copier,
            preloader,
            prefetch,
            status: None,
            viewed: HashSet::new(),
            last_index: None,
            copied: 0,
            already_present: 0,
            failed: 0,
        }
    }

    /// Shows the image at `cursor` (clamped) and saves the position
    pub fn start(&mut self, cursor: usize) -> Result<usize> {
        let cursor = self.viewer.start(cursor)?;
        self.arrived(cursor);
        Ok(cursor)
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn output_dir(&self) -> &Path {
        &self.context.output_dir
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn copied(&self) -> usize {
        self.copied
    }

    pub fn copies_pending(&self) -> usize {
        self.copier.pending()
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
        });
    }

    /// Applies a browsing key. Overlay keys (help) are handled by the caller.
    pub fn handle_action(&mut self, action: KeyAction) -> Flow {
        match action {
            KeyAction::Next => {
                if self.viewer.next() {
                    self.after_move();
                }
            }
            KeyAction::Previous => {
                if self.viewer.previous() {
                    self.after_move();
                }
            }
            KeyAction::Select => self.select(),
            KeyAction::Quit => {
                if let Some(cursor) = self.viewer.quit() {
                    self.persist(cursor);
                }
                return Flow::Quit;
            }
            KeyAction::Help | KeyAction::None => {}
        }
        Flow::Continue
    }

    fn after_move(&mut self) {
        if let Some(cursor) = self.viewer.cursor() {
            self.arrived(cursor);
        }
    }

    fn arrived(&mut self, cursor: usize) {
        self.viewed.insert(cursor);
        self.last_index = Some(cursor);
        self.persist(cursor);
    }

    fn select(&mut self) {
        let Some(entry) = self.viewer.select() else {
            return;
        };
        let name = entry.name.clone();

        match self.copier.request(&entry.path, &self.context.output_dir) {
            Ok(RequestStatus::Queued) => {
                self.set_status(StatusLevel::Info, format!("Queued {}", name));
            }
            Ok(RequestStatus::AlreadyQueued) => {
                self.set_status(
                    StatusLevel::Info,
                    format!("{} is already being copied", name),
                );
            }
            Err(e) => {
                self.failed += 1;
                self.set_status(StatusLevel::Error, e.to_string());
            }
        }
    }

    fn persist(&mut self, cursor: usize) {
        let Some(store) = &self.context.store else {
            return;
        };
        let mut record = ResumeRecord::new(
            &self.context.images_root,
            &self.context.output_dir,
            cursor,
            self.viewer.len(),
        );
        record.current_image = self.viewer.images().get(cursor).map(|i| i.path.clone());
        record.skip_hidden = self.context.skip_hidden;
        if let Err(e) = store.save(&record) {
            tracing::warn!("could not save position: {}", e);
            self.set_status(StatusLevel::Warning, format!("Position not saved: {}", e));
        }
    }

    /// Drains finished background work into the status line and counters
    pub fn poll_background(&mut self) {
        self.preloader.poll();
        for event in self.copier.poll_events() {
            self.apply_copy_event(event);
        }
    }

    fn apply_copy_event(&mut self, event: CopyEvent) {
        match event {
            CopyEvent::Started { source } => {
                self.set_status(StatusLevel::Info, format!("Copying {}", file_name(&source)));
            }
            CopyEvent::Finished {
                source,
                destination,
                outcome,
            } => match outcome {
                CopyOutcome::AlreadyPresent => {
                    self.already_present += 1;
                    self.set_status(
                        StatusLevel::Info,
                        format!("{} is already shortlisted", file_name(&source)),
                    );
                }
                CopyOutcome::Copied | CopyOutcome::Renamed | CopyOutcome::Overwritten => {
                    self.copied += 1;
                    self.set_status(
                        StatusLevel::Success,
                        format!("Shortlisted {}", file_name(&destination)),
                    );
                }
            },
            CopyEvent::Failed { error, .. } => {
                self.failed += 1;
                self.set_status(StatusLevel::Error, error.to_string());
            }
        }
    }

    /// Preview of the current image at `area`.
    ///
    /// An image that fails to decode is marked and skipped here, so the
    /// returned state is only `Error` once nothing displayable is left.
    pub fn preview(&mut self, area: CellSize) -> PreviewState {
        self.poll_background();

        loop {
            let Some(current) = self.viewer.current() else {
                return PreviewState::Error("no image selected".to_string());
            };
            let next = if self.prefetch {
                self.viewer.peek()
            } else {
                None
            };

            match self.preloader.focus(current, next, area) {
                PreviewState::Error(reason) => {
                    if !self.skip_undecodable(&reason) {
                        return PreviewState::Error(reason);
                    }
                }
                state => return state,
            }
        }
    }

    /// Returns true if the viewer moved to another image
    fn skip_undecodable(&mut self, reason: &str) -> bool {
        let Some(index) = self.viewer.cursor() else {
            return false;
        };
        let name = self.viewer.images()[index].name.clone();
        self.viewer.mark_undisplayable(index);
        tracing::warn!("skipping undecodable image {}: {}", name, reason);

        match self.viewer.skip_undisplayable() {
            Some(cursor) => {
                self.set_status(StatusLevel::Warning, format!("Skipped {}: {}", name, reason));
                self.arrived(cursor);
                true
            }
            None => {
                self.set_status(StatusLevel::Error, "No displayable images left");
                false
            }
        }
    }

    /// Waits up to `wait` for queued copies and returns the session totals
    pub async fn finish(mut self, wait: Duration) -> SessionSummary {
        let report = self.copier.shutdown(wait).await;

        for event in report.events {
            self.apply_copy_event(event);
        }

        SessionSummary {
            total: self.viewer.len(),
            viewed: self.viewed.len(),
            copied: self.copied,
            already_present: self.already_present,
            failed: self.failed,
            abandoned: report.abandoned.len(),
            last_index: self.last_index,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
