// Background decoding with caching and next-image prefetch

use crate::domain::ImageEntry;
use crate::preview::{render_image, CellSize, RenderedImage};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Maximum number of cached renders
pub const CACHE_SIZE: usize = 8;

const REQUEST_QUEUE: usize = 8;

type CacheKey = (PathBuf, CellSize);

/// Loading state of one image
#[derive(Debug, Clone)]
pub enum PreviewState {
    Loading,
    Ready(Arc<RenderedImage>),
    /// Decoding failed; the image cannot be shown
    Error(String),
}

struct PreviewRequest {
    entry: ImageEntry,
    area: CellSize,
}

enum LoadResult {
    Ready(CacheKey),
    Failed(CacheKey, String),
    /// Dropped because the cursor moved on before decoding started
    Skipped(CacheKey),
}

/// LRU cache of rendered images
#[derive(Debug)]
struct PreviewCache {
    cache: HashMap<CacheKey, Arc<RenderedImage>>,
    /// Most recent at the end
    access_order: Vec<CacheKey>,
    max_size: usize,
}

impl PreviewCache {
    fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::new(),
            access_order: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    fn get(&mut self, key: &CacheKey) -> Option<Arc<RenderedImage>> {
        let rendered = self.cache.get(key)?.clone();
        self.access_order.retain(|k| k != key);
        self.access_order.push(key.clone());
        Some(rendered)
    }

    fn insert(&mut self, key: CacheKey, rendered: Arc<RenderedImage>) {
        if self.cache.contains_key(&key) {
            self.access_order.retain(|k| k != &key);
        } else if self.cache.len() >= self.max_size && !self.access_order.is_empty() {
            let oldest = self.access_order.remove(0);
            self.cache.remove(&oldest);
        }

        self.cache.insert(key.clone(), rendered);
        self.access_order.push(key);
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

    fn len(&self) -> usize {
        self.cache.len()
    }
}

/// Decodes images on the shared runtime and caches the results.
///
/// Owned by the UI loop: every call returns immediately. [`focus`](Self::focus)
/// asks for the current image and prefetches the next one; [`poll`](Self::poll)
/// collects finished work.
pub struct Preloader {
    request_tx: mpsc::Sender<PreviewRequest>,
    result_rx: mpsc::UnboundedReceiver<LoadResult>,
    cache: Arc<Mutex<PreviewCache>>,
    /// Paths the worker should still decode
    wanted: Arc<Mutex<HashSet<PathBuf>>>,
    in_flight: HashSet<CacheKey>,
    failures: HashMap<PathBuf, String>,
}

impl Preloader {
    pub fn new(handle: &Handle, cache_size: usize) -> Self {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let cache = Arc::new(Mutex::new(PreviewCache::new(cache_size)));
        let wanted = Arc::new(Mutex::new(HashSet::new()));

        handle.spawn(Self::worker(
            request_rx,
            result_tx,
            Arc::clone(&cache),
            Arc::clone(&wanted),
        ));

        Self {
            request_tx,
            result_rx,
            cache,
            wanted,
            in_flight: HashSet::new(),
            failures: HashMap::new(),
        }
    }

    async fn worker(
        mut request_rx: mpsc::Receiver<PreviewRequest>,
        result_tx: mpsc::UnboundedSender<LoadResult>,
        cache: Arc<Mutex<PreviewCache>>,
        wanted: Arc<Mutex<HashSet<PathBuf>>>,
    ) {
        while let Some(PreviewRequest { entry, area }) = request_rx.recv().await {
            let key = (entry.path.clone(), area);

            let still_wanted = wanted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&entry.path);
            let cached = cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&key);

            let result = if cached {
                LoadResult::Ready(key)
            } else if !still_wanted {
                LoadResult::Skipped(key)
            } else {
                match tokio::task::spawn_blocking(move || render_image(&entry, area)).await {
                    Ok(Ok(rendered)) => {
                        cache
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(key.clone(), Arc::new(rendered));
                        LoadResult::Ready(key)
                    }
                    Ok(Err(e)) => LoadResult::Failed(key, e.to_string()),
                    Err(e) => LoadResult::Failed(key, format!("decode task failed: {}", e)),
                }
            };

            if result_tx.send(result).is_err() {
                break;
            }
        }
    }

    /// Requests `current` (and `next`, if given) at `area` and returns the
    /// state of `current`.
    pub fn focus(
        &mut self,
        current: &ImageEntry,
        next: Option<&ImageEntry>,
        area: CellSize,
    ) -> PreviewState {
        {
            let mut wanted = self.wanted.lock().unwrap_or_else(PoisonError::into_inner);
            wanted.clear();
            wanted.insert(current.path.clone());
            if let Some(next) = next {
                wanted.insert(next.path.clone());
            }
        }

        let state = self.request(current, area);
        if let Some(next) = next {
            self.request(next, area);
        }
        state
    }

    fn request(&mut self, entry: &ImageEntry, area: CellSize) -> PreviewState {
        if let Some(reason) = self.failures.get(&entry.path) {
            return PreviewState::Error(reason.clone());
        }

        let key = (entry.path.clone(), area);
        if let Some(rendered) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return PreviewState::Ready(rendered);
        }

        if !self.in_flight.contains(&key) {
            let request = PreviewRequest {
                entry: entry.clone(),
                area,
            };
            // A full queue is retried on the next frame
            if self.request_tx.try_send(request).is_ok() {
                self.in_flight.insert(key);
            }
        }
        PreviewState::Loading
    }

    /// Collects finished decodes. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.result_rx.try_recv() {
            match result {
                LoadResult::Ready(key) | LoadResult::Skipped(key) => {
                    self.in_flight.remove(&key);
                }
                LoadResult::Failed(key, reason) => {
                    tracing::warn!("{}", reason);
                    self.in_flight.remove(&key);
                    self.failures.insert(key.0, reason);
                }
            }
            changed = true;
        }
        changed
    }

    #[cfg(test)]
    fn cache_size(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
