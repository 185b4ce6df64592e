use std::{
    sync::{Arc, Condvar, Mutex, OnceLock, PoisonError, Weak},
    time::Duration,
};

use crate::assets::{
    decode::{PreparedImage, decode_image},
    source::AssetSource,
};

/// Load state of one pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Loaded,
    Failed,
}

#[derive(Clone, Debug)]
enum AssetState {
    Pending,
    Loaded(Arc<PreparedImage>),
    Failed,
}

/// Immutable view of one pool slot at the time it was read.
///
/// A `Pending` asset may be loaded later; read it again from the [`PoolHandle`] to observe
/// that. `Failed` is permanent for the pool session.
#[derive(Clone, Debug)]
pub struct ImageAsset {
    index: usize,
    state: AssetState,
}

impl ImageAsset {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn readiness(&self) -> Readiness {
        match self.state {
            AssetState::Pending => Readiness::Pending,
            AssetState::Loaded(_) => Readiness::Loaded,
            AssetState::Failed => Readiness::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, AssetState::Loaded(_))
    }

    /// Decoded bitmap, only when loaded.
    pub fn image(&self) -> Option<&PreparedImage> {
        match &self.state {
            AssetState::Loaded(img) => Some(img.as_ref()),
            _ => None,
        }
    }
}

struct Slot {
    uri: String,
    // `None` marks a failed fetch or decode.
    result: OnceLock<Option<Arc<PreparedImage>>>,
}

struct PoolInner {
    slots: Vec<Slot>,
    settled: Mutex<usize>,
    settled_cv: Condvar,
}

impl PoolInner {
    fn settle(&self, index: usize, value: Option<Arc<PreparedImage>>) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        if slot.result.set(value).is_err() {
            return;
        }
        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        *settled += 1;
        self.settled_cv.notify_all();
    }
}

/// Shared, read-only handle to one pool session.
///
/// Cloning is cheap; every clone observes the same slots.
#[derive(Clone)]
pub struct PoolHandle {
    inner: Arc<PoolInner>,
}

impl PoolHandle {
    /// Asset at `index` with its current readiness. Out-of-range indices read as `Failed`.
    pub fn get(&self, index: usize) -> ImageAsset {
        let state = match self.inner.slots.get(index).map(|s| s.result.get()) {
            None => AssetState::Failed,
            Some(None) => AssetState::Pending,
            Some(Some(None)) => AssetState::Failed,
            Some(Some(Some(img))) => AssetState::Loaded(Arc::clone(img)),
        };
        ImageAsset { index, state }
    }

    /// Number of sources, loaded or not.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.inner.slots.iter().map(|s| s.uri.as_str())
    }

    pub fn ready_count(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|s| matches!(s.result.get(), Some(Some(_))))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|s| matches!(s.result.get(), Some(None)))
            .count()
    }

    /// Every slot is either loaded or failed.
    pub fn is_settled(&self) -> bool {
        *self
            .inner
            .settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            >= self.len()
    }

    /// Block until every slot settles or `timeout` elapses. Returns whether the pool settled.
    ///
    /// Not meant for the tick path; offline renderers and tests use it to get a
    /// deterministic first paint.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let total = self.len();
        let guard = self
            .inner
            .settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .inner
            .settled_cv
            .wait_timeout_while(guard, timeout, |settled| *settled < total)
            .unwrap_or_else(PoisonError::into_inner);
        *guard >= total
    }

    /// Both handles belong to the same pool session.
    pub fn same_session(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("len", &self.len())
            .field("ready", &self.ready_count())
            .field("failed", &self.failed_count())
            .finish()
    }
}

/// Load-once image pool shared by every instance on the page.
///
/// Lifecycle: [`new`](Self::new) -> [`load`](Self::load) (returns immediately, decodes in
/// the background) -> optional [`PoolHandle::wait_settled`] -> [`dispose`](Self::dispose).
pub struct ImagePool {
    source: Arc<dyn AssetSource>,
    session: OnceLock<PoolHandle>,
}

impl ImagePool {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            session: OnceLock::new(),
        }
    }

    /// Start loading `sources`, or return the session already started.
    ///
    /// Concurrent first callers race on a single initialization; all of them receive the
    /// same handle and each source is fetched exactly once.
    pub fn load(&self, sources: &[String]) -> PoolHandle {
        let handle = self.session.get_or_init(|| self.start(sources));
        if !handle.sources().eq(sources.iter().map(String::as_str)) {
            tracing::warn!(
                requested = sources.len(),
                loaded = handle.len(),
                "image pool already loaded with a different source list; reusing it"
            );
        }
        handle.clone()
    }

    /// Handle of the current session, if [`load`](Self::load) has run.
    pub fn handle(&self) -> Option<PoolHandle> {
        self.session.get().cloned()
    }

    /// End the session. Outstanding handles stay valid; background decodes that have not
    /// started yet are skipped once the last handle is gone.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.session.take() {
            tracing::debug!(len = handle.len(), "image pool disposed");
        }
    }

    fn start(&self, sources: &[String]) -> PoolHandle {
        tracing::debug!(count = sources.len(), "image pool load started");
        let inner = Arc::new(PoolInner {
            slots: sources
                .iter()
                .map(|uri| Slot {
                    uri: uri.clone(),
                    result: OnceLock::new(),
                })
                .collect(),
            settled: Mutex::new(0),
            settled_cv: Condvar::new(),
        });

        for index in 0..sources.len() {
            let weak: Weak<PoolInner> = Arc::downgrade(&inner);
            let source = Arc::clone(&self.source);
            rayon::spawn(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let uri = inner.slots[index].uri.as_str();
                let loaded = match source.fetch(uri).and_then(|bytes| decode_image(&bytes)) {
                    Ok(img) => Some(Arc::new(img)),
                    Err(err) => {
                        tracing::warn!(index, uri, error = %err, "pool asset failed to load");
                        None
                    }
                };
                inner.settle(index, loaded);
            });
        }

        PoolHandle { inner }
    }
}

impl std::fmt::Debug for ImagePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePool")
            .field("session", &self.session.get())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/pool.rs"]
mod tests;
