use crate::foreground::registry::{lock, PendingRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct InterruptInner {
    interrupted: AtomicBool,
    parked: Mutex<Vec<Arc<PendingRequest>>>,
}

/// Cooperative interruption handle for a worker.
///
/// A worker passes its handle into every blocking call; any other thread
/// holding a clone may call [`Interrupt::interrupt`] to make the blocked call
/// return [`RequireError::Interrupted`](crate::foreground::RequireError).
/// Several workers may wait on clones of one handle at the same time; an
/// interrupt wakes all of them. The flag stays set until
/// [`Interrupt::clear`] is called, so later blocking calls return
/// immediately as well.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.inner.interrupted.store(true, Ordering::SeqCst);
        for request in lock(&self.inner.parked).iter() {
            request.wake();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Reset the flag, returning whether it was set.
    pub fn clear(&self) -> bool {
        self.inner.interrupted.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn park(&self, request: Arc<PendingRequest>) {
        lock(&self.inner.parked).push(request);
    }

    /// Forget `request`, leaving other waiters on this handle parked.
    pub(crate) fn unpark(&self, request: &Arc<PendingRequest>) {
        lock(&self.inner.parked).retain(|parked| !Arc::ptr_eq(parked, request));
    }

    #[cfg(test)]
    fn parked_count(&self) -> usize {
        lock(&self.inner.parked).len()
    }
}
