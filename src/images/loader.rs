//! Asynchronous image loading with bounded retries.
//!
//! The state maps live behind one `parking_lot::Mutex` shared with worker
//! jobs. A job applies its result under the lock, then posts a notice over a
//! channel; `pump()` on the foreground turns notices into listener callbacks
//! and a list of cells to redraw.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::{ImageDrawState, ImageLoadListener, ImageSource, ImageState};
use crate::config::TableConfig;
use crate::error::{FormGridError, Result};
use crate::layout::{SheetLayout, VisibleRange};
use crate::provider::ImageProvider;
use crate::render::{Bitmap, LruCache, DEFAULT_IMAGE_CACHE_BYTES};
use crate::types::{Cell, CellKey, SheetInfo};

/// Unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs image jobs off the foreground.
pub trait ImageWorker: Send + Sync {
    fn spawn(&self, job: Job) -> Result<()>;
}

/// One OS thread per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadWorker;

impl ImageWorker for ThreadWorker {
    fn spawn(&self, job: Job) -> Result<()> {
        std::thread::Builder::new()
            .name("formgrid-image".to_string())
            .spawn(job)?;
        Ok(())
    }
}

/// Runs the job immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineWorker;

impl ImageWorker for InlineWorker {
    fn spawn(&self, job: Job) -> Result<()> {
        job();
        Ok(())
    }
}

struct Shared {
    cache: LruCache<CellKey, Bitmap>,
    states: HashMap<CellKey, ImageState>,
    retries: HashMap<CellKey, u32>,
    /// Keys whose last failure was a malformed source
    malformed: HashSet<CellKey>,
    generation: u64,
}

impl Shared {
    fn apply_failure(&mut self, key: CellKey, error: &FormGridError, max_retries: u32) -> u32 {
        let count = self.retries.entry(key).or_insert(0);
        *count += 1;
        let count = *count;
        self.states.insert(
            key,
            ImageState::Error {
                exhausted: count >= max_retries,
            },
        );
        if error.is_retryable() {
            self.malformed.remove(&key);
        } else {
            self.malformed.insert(key);
        }
        count
    }
}

enum Notice {
    Loaded(CellKey),
    Failed(CellKey, FormGridError),
}

/// Per-form image state: cache, load states, retry counters.
pub struct ImageCells {
    shared: Arc<Mutex<Shared>>,
    provider: Arc<dyn ImageProvider>,
    worker: Arc<dyn ImageWorker>,
    tx: Sender<Notice>,
    rx: Receiver<Notice>,
    listener: Option<Box<dyn ImageLoadListener>>,
    max_retries: u32,
    cache_enabled: bool,
    visible: HashSet<CellKey>,
}

impl ImageCells {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        worker: Arc<dyn ImageWorker>,
        config: &TableConfig,
    ) -> Self {
        Self::with_capacity(provider, worker, config, DEFAULT_IMAGE_CACHE_BYTES)
    }

    pub fn with_capacity(
        provider: Arc<dyn ImageProvider>,
        worker: Arc<dyn ImageWorker>,
        config: &TableConfig,
        cache_bytes: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            shared: Arc::new(Mutex::new(Shared {
                cache: LruCache::new(cache_bytes),
                states: HashMap::new(),
                retries: HashMap::new(),
                malformed: HashSet::new(),
                generation: 0,
            })),
            provider,
            worker,
            tx,
            rx,
            listener: None,
            max_retries: config.max_retry_count,
            cache_enabled: config.image_cache_enabled,
            visible: HashSet::new(),
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn ImageLoadListener>) {
        self.listener = Some(listener);
    }

    pub fn apply_config(&mut self, config: &TableConfig) {
        self.max_retries = config.max_retry_count;
        self.cache_enabled = config.image_cache_enabled;
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_count(&self, key: CellKey) -> u32 {
        self.shared.lock().retries.get(&key).copied().unwrap_or(0)
    }

    pub fn state(&self, key: CellKey) -> ImageState {
        self.shared.lock().states.get(&key).copied().unwrap_or_default()
    }

    pub fn is_cached(&self, key: CellKey) -> bool {
        self.shared.lock().cache.contains_key(&key)
    }

    pub fn cached_bytes(&self) -> usize {
        self.shared.lock().cache.used_bytes()
    }

    /// Start loading `cell`'s image unless it is loading, cached or out of retries.
    ///
    /// Returns `true` when a load was started.
    pub fn ensure_loaded(&mut self, key: CellKey, cell: &Cell) -> bool {
        if cell.value.is_empty() {
            return false;
        }
        let generation = {
            let mut shared = self.shared.lock();
            if shared.retries.get(&key).copied().unwrap_or(0) >= self.max_retries {
                return false;
            }
            if shared.states.get(&key) == Some(&ImageState::Loading)
                || shared.cache.get(&key).is_some()
            {
                return false;
            }
            shared.states.insert(key, ImageState::Loading);
            shared.generation
        };

        if let Some(listener) = self.listener.as_mut() {
            listener.on_start(key.row, key.col);
        }

        let source = match ImageSource::parse(&cell.value) {
            Ok(source) => source,
            Err(err) => {
                warn!(%key, error = %err, "image source rejected");
                self.fail_now(key, err);
                return true;
            }
        };

        debug!(%key, kind = ?source.kind, "dispatching image load");
        let shared = Arc::clone(&self.shared);
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        let max_retries = self.max_retries;
        let job: Job = Box::new(move || {
            let result = provider.load_image(&source);
            let mut guard = shared.lock();
            if guard.generation != generation {
                debug!(%key, "discarding image result for a replaced form");
                return;
            }
            let notice = match result {
                Ok(bitmap) => {
                    guard.cache.insert(key, bitmap);
                    guard.retries.remove(&key);
                    guard.malformed.remove(&key);
                    guard.states.insert(key, ImageState::Ready);
                    Notice::Loaded(key)
                }
                Err(err) => {
                    guard.apply_failure(key, &err, max_retries);
                    Notice::Failed(key, err)
                }
            };
            drop(guard);
            // Receiver gone means the owning view was dropped
            let _ = tx.send(notice);
        });

        if let Err(err) = self.worker.spawn(job) {
            error!(%key, error = %err, "failed to dispatch image load");
            self.fail_now(key, err);
        }
        true
    }

    fn fail_now(&mut self, key: CellKey, err: FormGridError) {
        self.shared.lock().apply_failure(key, &err, self.max_retries);
        let _ = self.tx.send(Notice::Failed(key, err));
    }

    /// Load every visible image cell that still needs it.
    ///
    /// Returns the number of loads started.
    pub fn update_visible_cells(
        &mut self,
        sheet: &SheetInfo,
        layout: &SheetLayout,
        range: VisibleRange,
    ) -> usize {
        let mut visible = HashSet::new();
        let mut started = 0;
        for (row, col) in range.cells() {
            if layout.should_skip_cell(row, col) {
                continue;
            }
            let Some(cell) = sheet.cell(row, col) else {
                continue;
            };
            if !cell.cell_type.is_image() {
                continue;
            }
            let key = CellKey::new(sheet.sheet_index, row, col);
            visible.insert(key);
            if self.ensure_loaded(key, cell) {
                started += 1;
            }
        }

        if !self.cache_enabled {
            let mut shared = self.shared.lock();
            let stale: Vec<CellKey> = self
                .visible
                .difference(&visible)
                .copied()
                .collect();
            for key in stale {
                shared.cache.remove(&key);
                if shared.states.get(&key) == Some(&ImageState::Ready) {
                    shared.states.insert(key, ImageState::Idle);
                }
            }
        }
        self.visible = visible;
        started
    }

    /// Apply finished loads on the foreground; returns cells to redraw.
    pub fn pump(&mut self) -> Vec<CellKey> {
        let mut redraw = Vec::new();
        while let Ok(notice) = self.rx.try_recv() {
            match notice {
                Notice::Loaded(key) => {
                    debug!(%key, "image ready");
                    if let Some(listener) = self.listener.as_mut() {
                        listener.on_success(key.row, key.col);
                    }
                    redraw.push(key);
                }
                Notice::Failed(key, err) => {
                    debug!(%key, error = %err, "image load failed");
                    if let Some(listener) = self.listener.as_mut() {
                        listener.on_failed(key.row, key.col, &err);
                    }
                    redraw.push(key);
                }
            }
        }
        redraw
    }

    /// What to draw for `cell` right now.
    pub fn draw_state(&self, key: CellKey, cell: &Cell) -> ImageDrawState {
        let mut shared = self.shared.lock();
        if let Some(bitmap) = shared.cache.get(&key) {
            return ImageDrawState::Ready(bitmap.clone());
        }
        if shared.states.get(&key) == Some(&ImageState::Loading) {
            return ImageDrawState::Loading;
        }
        if cell.value.is_empty() {
            return ImageDrawState::Placeholder;
        }
        let retries = shared.retries.get(&key).copied().unwrap_or(0);
        if retries >= self.max_retries {
            ImageDrawState::Exhausted {
                retries,
                max: self.max_retries,
            }
        } else {
            ImageDrawState::Placeholder
        }
    }

    /// Forget one cell's bitmap and state, e.g. after its value changed.
    pub fn clear_cell(&mut self, key: CellKey) {
        let mut shared = self.shared.lock();
        shared.cache.remove(&key);
        shared.states.remove(&key);
        shared.retries.remove(&key);
        shared.malformed.remove(&key);
    }

    /// Drop everything and invalidate in-flight loads.
    pub fn clear(&mut self) {
        let mut shared = self.shared.lock();
        shared.generation += 1;
        shared.cache.clear();
        shared.states.clear();
        shared.retries.clear();
        shared.malformed.clear();
        drop(shared);
        self.visible.clear();
        while self.rx.try_recv().is_ok() {}
    }

    /// Give exhausted cells a fresh retry budget.
    ///
    /// Cells whose source was malformed stay exhausted.
    pub fn retry_failed(&mut self) -> usize {
        let mut shared = self.shared.lock();
        let Shared {
            retries,
            states,
            malformed,
            ..
        } = &mut *shared;
        let max = self.max_retries;
        let reset: Vec<CellKey> = retries
            .iter()
            .filter(|(key, count)| **count >= max && !malformed.contains(key))
            .map(|(key, _)| *key)
            .collect();
        for key in &reset {
            retries.remove(key);
            states.insert(*key, ImageState::Idle);
        }
        reset.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::CellType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        succeed: bool,
    }

    impl ImageProvider for CountingProvider {
        fn load_image(&self, source: &ImageSource) -> Result<Bitmap> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(Bitmap::solid(4, 4, [255, 0, 0, 255]).expect("bitmap"))
            } else {
                Err(FormGridError::ImageLoadFailed {
                    source_uri: source.uri.clone(),
                    reason: "unreachable".into(),
                })
            }
        }
    }

    /// Holds jobs until the test runs them.
    #[derive(Default)]
    struct QueueWorker {
        jobs: Mutex<Vec<Job>>,
    }

    impl QueueWorker {
        fn run_all(&self) {
            let jobs: Vec<Job> = std::mem::take(&mut *self.jobs.lock());
            for job in jobs {
                job();
            }
        }
    }

    impl ImageWorker for QueueWorker {
        fn spawn(&self, job: Job) -> Result<()> {
            self.jobs.lock().push(job);
            Ok(())
        }
    }

    fn image_cell(value: &str) -> Cell {
        Cell::with_type(CellType::Image, value)
    }

    fn cells(succeed: bool) -> (ImageCells, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            succeed,
        });
        let cells = ImageCells::new(provider.clone(), Arc::new(InlineWorker), &TableConfig::default());
        (cells, provider)
    }

    #[test]
    fn success_caches_and_redraws() {
        let (mut images, provider) = cells(true);
        let key = CellKey::new(0, 1, 1);
        let cell = image_cell("https://example.com/a.png");

        assert!(images.ensure_loaded(key, &cell));
        assert_eq!(images.pump(), vec![key]);
        assert_eq!(images.state(key), ImageState::Ready);
        assert!(matches!(images.draw_state(key, &cell), ImageDrawState::Ready(_)));

        assert!(!images.ensure_loaded(key, &cell));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retries_stop_at_max() {
        let (mut images, provider) = cells(false);
        let key = CellKey::new(0, 0, 0);
        let cell = image_cell("https://unreachable.invalid/x.png");

        for expected in 1..=3 {
            assert_eq!(images.draw_state(key, &cell), ImageDrawState::Placeholder);
            assert!(images.ensure_loaded(key, &cell));
            images.pump();
            assert_eq!(images.retry_count(key), expected);
        }
        assert!(!images.ensure_loaded(key, &cell));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            images.draw_state(key, &cell),
            ImageDrawState::Exhausted { retries: 3, max: 3 }
        );
        assert_eq!(images.state(key), ImageState::Error { exhausted: true });
    }

    #[test]
    fn loading_state_is_visible_until_job_runs() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            succeed: true,
        });
        let worker = Arc::new(QueueWorker::default());
        let mut images = ImageCells::new(provider, worker.clone(), &TableConfig::default());
        let key = CellKey::new(0, 0, 0);
        let cell = image_cell("/tmp/a.png");

        assert!(images.ensure_loaded(key, &cell));
        assert_eq!(images.draw_state(key, &cell), ImageDrawState::Loading);
        assert!(!images.ensure_loaded(key, &cell));

        worker.run_all();
        assert_eq!(images.pump(), vec![key]);
        assert!(images.is_cached(key));
    }

    #[test]
    fn stale_generation_is_discarded() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            succeed: true,
        });
        let worker = Arc::new(QueueWorker::default());
        let mut images = ImageCells::new(provider, worker.clone(), &TableConfig::default());
        let key = CellKey::new(0, 0, 0);

        images.ensure_loaded(key, &image_cell("/tmp/a.png"));
        images.clear();
        worker.run_all();

        assert!(images.pump().is_empty());
        assert!(!images.is_cached(key));
        assert_eq!(images.state(key), ImageState::Idle);
    }

    #[test]
    fn malformed_sources_are_not_revived() {
        let (mut images, provider) = cells(false);
        let bad = CellKey::new(0, 0, 0);
        let unreachable = CellKey::new(0, 0, 1);
        for _ in 0..3 {
            images.ensure_loaded(bad, &image_cell("http://"));
            images.ensure_loaded(unreachable, &image_cell("https://host/x.png"));
            images.pump();
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        assert_eq!(images.retry_failed(), 1);
        assert_eq!(images.retry_count(unreachable), 0);
        assert_eq!(images.retry_count(bad), 3);
    }
}
