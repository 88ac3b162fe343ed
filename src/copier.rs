//! Background shortlist copies.
//!
//! The UI thread hands selections to [`Copier::request`], which only enqueues.
//! A single worker task on the shared runtime performs the copies in FIFO
//! order, one at a time, and reports progress as [`CopyEvent`]s that the UI
//! loop drains with [`Copier::poll_events`].

use crate::error::{Result, ShortlistError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

const COMPARE_CHUNK: usize = 64 * 1024;

/// What to do when the destination name is already taken by different content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Write "name (1).ext", "name (2).ext", ...
    #[default]
    Rename,
    /// Replace the existing file
    Overwrite,
}

#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub conflict: ConflictPolicy,
    pub queue_capacity: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            conflict: ConflictPolicy::Rename,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// How a finished copy was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// Written under an auto-renamed destination
    Renamed,
    Overwritten,
    /// The destination already held identical content; nothing was written
    AlreadyPresent,
}

/// Acknowledgement returned by [`Copier::request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Queued,
    /// The same source is already queued or being copied
    AlreadyQueued,
}

#[derive(Debug)]
pub enum CopyEvent {
    Started {
        source: PathBuf,
    },
    Finished {
        source: PathBuf,
        destination: PathBuf,
        outcome: CopyOutcome,
    },
    Failed {
        source: PathBuf,
        error: ShortlistError,
    },
}

#[derive(Debug)]
struct CopyRequest {
    source: PathBuf,
    dest_dir: PathBuf,
}

/// What was left when the copier was shut down
#[derive(Debug, Default)]
pub struct DrainReport {
    pub events: Vec<CopyEvent>,
    pub abandoned: Vec<PathBuf>,
}

type Pending = Arc<Mutex<HashSet<PathBuf>>>;

pub struct Copier {
    request_tx: Option<mpsc::Sender<CopyRequest>>,
    event_rx: mpsc::UnboundedReceiver<CopyEvent>,
    /// Sources queued or in flight
    pending: Pending,
    worker: Option<JoinHandle<()>>,
}

impl Copier {
    /// Spawns the worker on `handle`.
    pub fn new(handle: Handle, options: CopyOptions) -> Self {
        let (request_tx, request_rx) = mpsc::channel(options.queue_capacity.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending: Pending = Arc::new(Mutex::new(HashSet::new()));

        let worker = handle.spawn(Self::worker(
            request_rx,
            event_tx,
            Arc::clone(&pending),
            options.conflict,
        ));

        Self {
            request_tx: Some(request_tx),
            event_rx,
            pending,
            worker: Some(worker),
        }
    }

    async fn worker(
        mut request_rx: mpsc::Receiver<CopyRequest>,
        event_tx: mpsc::UnboundedSender<CopyEvent>,
        pending: Pending,
        policy: ConflictPolicy,
    ) {
        while let Some(request) = request_rx.recv().await {
            let source = request.source.clone();
            let _ = event_tx.send(CopyEvent::Started {
                source: source.clone(),
            });

            let result = tokio::task::spawn_blocking(move || {
                copy_into(&request.source, &request.dest_dir, policy)
            })
            .await;

            let event = match result {
                Ok(Ok((destination, outcome))) => {
                    tracing::info!(
                        "shortlisted {} -> {} ({:?})",
                        source.display(),
                        destination.display(),
                        outcome
                    );
                    CopyEvent::Finished {
                        source: source.clone(),
                        destination,
                        outcome,
                    }
                }
                Ok(Err(error)) => {
                    tracing::error!("{}", error);
                    CopyEvent::Failed {
                        source: source.clone(),
                        error,
                    }
                }
                Err(e) => {
                    let error = ShortlistError::copy(&source, format!("copy task failed: {}", e));
                    tracing::error!("{}", error);
                    CopyEvent::Failed {
                        source: source.clone(),
                        error,
                    }
                }
            };

            pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&source);
            let _ = event_tx.send(event);
        }
    }

    /// Enqueues a copy of `source` into `dest_dir` without waiting for it.
    ///
    /// Fails with [`ShortlistError::Copy`] when the queue is full or the
    /// copier has been shut down.
    pub fn request(&self, source: &Path, dest_dir: &Path) -> Result<RequestStatus> {
        let Some(request_tx) = &self.request_tx else {
            return Err(ShortlistError::copy(source, "copier is shut down"));
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.contains(source) {
            return Ok(RequestStatus::AlreadyQueued);
        }

        let request = CopyRequest {
            source: source.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
        };
        match request_tx.try_send(request) {
            Ok(()) => {
                pending.insert(source.to_path_buf());
                tracing::debug!("queued copy of {}", source.display());
                Ok(RequestStatus::Queued)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("copy queue full, rejected {}", source.display());
                Err(ShortlistError::copy(source, "copy queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(ShortlistError::copy(source, "copier is shut down"))
            }
        }
    }

    /// Number of copies queued or in flight
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drains the status events produced since the last poll (non-blocking)
    pub fn poll_events(&mut self) -> Vec<CopyEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Closes the queue and waits up to `timeout` for outstanding copies.
    /// Later requests are rejected.
    pub async fn shutdown(&mut self, timeout: Duration) -> DrainReport {
        // Dropping the sender ends the worker loop once the queue is empty
        self.request_tx = None;

        if let Some(worker) = self.worker.take() {
            match tokio::time::timeout(timeout, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("copy worker failed: {}", e),
                Err(_) => tracing::warn!("copy drain timed out after {:?}", timeout),
            }
        }

        let mut abandoned: Vec<PathBuf> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        abandoned.sort();
        for path in &abandoned {
            tracing::warn!("abandoned pending copy of {}", path.display());
        }

        DrainReport {
            events: self.poll_events(),
            abandoned,
        }
    }
}

/// Copies `source` into `dest_dir` under its own basename, applying `policy`
/// to name collisions.
///
/// Data is written to a temporary file in `dest_dir` and renamed into place,
/// and the source permissions and modification time are carried over.
pub fn copy_into(
    source: &Path,
    dest_dir: &Path,
    policy: ConflictPolicy,
) -> Result<(PathBuf, CopyOutcome)> {
    let file_name = source
        .file_name()
        .ok_or_else(|| ShortlistError::copy(source, "source has no file name"))?;

    fs::create_dir_all(dest_dir).map_err(|e| {
        ShortlistError::copy(
            source,
            format!("cannot create {}: {}", dest_dir.display(), e),
        )
    })?;

    let wrap = |e: io::Error| ShortlistError::copy(source, e);

    let target = dest_dir.join(file_name);
    let (destination, outcome) = if !target.exists() {
        (target, CopyOutcome::Copied)
    } else if same_content(source, &target).map_err(wrap)? {
        return Ok((target, CopyOutcome::AlreadyPresent));
    } else {
        match policy {
            ConflictPolicy::Overwrite => (target, CopyOutcome::Overwritten),
            ConflictPolicy::Rename => match free_renamed_path(source, &target).map_err(wrap)? {
                Some(renamed) => (renamed, CopyOutcome::Renamed),
                None => {
                    // A renamed copy with the same bytes already exists
                    return Ok((target, CopyOutcome::AlreadyPresent));
                }
            },
        }
    };

    write_atomically(source, dest_dir, &destination, outcome).map_err(wrap)?;
    Ok((destination, outcome))
}

fn write_atomically(
    source: &Path,
    dest_dir: &Path,
    destination: &Path,
    outcome: CopyOutcome,
) -> io::Result<()> {
    let metadata = fs::metadata(source)?;

    let mut tmp = NamedTempFile::new_in(dest_dir)?;
    let mut reader = File::open(source)?;
    io::copy(&mut reader, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_modified(metadata.modified()?)?;
    fs::set_permissions(tmp.path(), metadata.permissions())?;

    if outcome == CopyOutcome::Overwritten {
        tmp.persist(destination).map_err(|e| e.error)?;
    } else {
        tmp.persist_noclobber(destination).map_err(|e| e.error)?;
    }
    Ok(())
}

/// First free "name (n).ext" next to `target`, or `None` if one of the
/// candidates already holds the same bytes as `source`.
fn free_renamed_path(source: &Path, target: &Path) -> io::Result<Option<PathBuf>> {
    let parent = target.parent().unwrap_or(Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target.extension().map(|e| e.to_string_lossy().into_owned());

    for i in 1..10_000 {
        let name = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return Ok(Some(candidate));
        }
        if same_content(source, &candidate)? {
            return Ok(None);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {}", target.display()),
    ))
}

fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];

    loop {
        let n = reader_a.read(&mut buf_a)?;
        if n == 0 {
            return Ok(true);
        }
        reader_b.read_exact(&mut buf_b[..n])?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}
