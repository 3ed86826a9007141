use crate::foreground::interrupt::Interrupt;
use crate::foreground::request::{RequestKind, Resolution};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct PendingState {
    ready: bool,
    resolution: Option<Resolution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// In-flight state of one blocking request.
#[derive(Debug)]
pub struct PendingRequest {
    id: RequestId,
    kind: RequestKind,
    state: Mutex<PendingState>,
    ready: Condvar,
}

impl PendingRequest {
    fn new(id: RequestId, kind: RequestKind) -> Self {
        Self {
            id,
            kind,
            state: Mutex::new(PendingState::default()),
            ready: Condvar::new(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.state).ready
    }

    /// Record the result and wake the waiter. Returns `false` when a result
    /// was already recorded; the earlier one is kept.
    pub fn resolve(&self, resolution: Resolution) -> bool {
        let mut state = lock(&self.state);
        if state.ready {
            return false;
        }
        state.resolution = Some(resolution);
        state.ready = true;
        self.ready.notify_all();
        true
    }

    pub fn release(&self) -> bool {
        self.resolve(Resolution::Released)
    }

    /// Block until a result is recorded or `interrupt` fires.
    pub fn wait(self: &Arc<Self>, interrupt: &Interrupt) -> Result<Resolution, Interrupted> {
        interrupt.park(Arc::clone(self));
        let outcome = {
            let state = lock(&self.state);
            let mut state = self
                .ready
                .wait_while(state, |s| !s.ready && !interrupt.is_interrupted())
                .unwrap_or_else(PoisonError::into_inner);
            if state.ready {
                Ok(state.resolution.take().unwrap_or(Resolution::Released))
            } else {
                Err(Interrupted)
            }
        };
        interrupt.unpark(self);
        outcome
    }

    pub(crate) fn wake(&self) {
        let _state = lock(&self.state);
        self.ready.notify_all();
    }
}

/// Thread-safe map of requests whose workers are still waiting.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    next_id: AtomicU64,
    requests: Mutex<HashMap<RequestId, Arc<PendingRequest>>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, kind: RequestKind) -> Arc<PendingRequest> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let request = Arc::new(PendingRequest::new(id, kind));
        lock(&self.requests).insert(id, Arc::clone(&request));
        request
    }

    pub fn get(&self, id: RequestId) -> Option<Arc<PendingRequest>> {
        lock(&self.requests).get(&id).cloned()
    }

    pub fn remove(&self, id: RequestId) -> Option<Arc<PendingRequest>> {
        lock(&self.requests).remove(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        lock(&self.requests).contains_key(&id)
    }

    pub fn len(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = lock(&self.requests).keys().copied().collect();
        ids.sort();
        ids
    }

    /// Release a still-registered request with an empty result.
    pub(crate) fn release(&self, id: RequestId) -> bool {
        match self.get(id) {
            Some(request) => {
                let released = request.release();
                if released {
                    tracing::debug!(%id, kind = ?request.kind(), "pending request released");
                }
                released
            }
            None => false,
        }
    }
}

/// Removes a request from the registry on every exit path of a blocking call.
pub(crate) struct RegistryGuard<'a> {
    pub(crate) registry: &'a RequestRegistry,
    pub(crate) id: RequestId,
}

impl Drop for RegistryGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
