//! A scoped resource is a value whose release callback runs exactly once,
//! on whichever exit path drops it first. The load-shedder admission token
//! and a span guard are both modeled this way.

/// Type-erased RAII guard. Holds an `Option<FnOnce>` so `release()` can be
/// called early (idempotently) or left to `Drop`.
pub struct ScopedResource {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ScopedResource {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Releases the resource now. Safe to call at most once; a second call
    /// (or a later `Drop`) is a no-op.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ScopedResource {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for ScopedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedResource")
            .field("armed", &self.release.is_some())
            .finish()
    }
}
