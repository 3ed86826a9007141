use crate::foreground::messages::{Notice, ReplySender};
use crate::foreground::registry::RequestId;
use crate::foreground::request::RequestDescriptor;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Unbound,
    Active,
    Transient,
    TornDown,
}

impl HostState {
    pub fn can_present(self) -> bool {
        matches!(self, Self::Active)
    }
}

pub fn can_transition(from: HostState, to: HostState) -> bool {
    matches!(
        (from, to),
        (HostState::Unbound, HostState::Active)
            | (HostState::Unbound, HostState::Transient)
            | (HostState::Active, HostState::Transient)
            | (HostState::Transient, HostState::Active)
            | (HostState::Active, HostState::TornDown)
            | (HostState::Transient, HostState::TornDown)
    ) || from == to
}

/// Lifecycle notifications a host emits on the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The host can accept new presentations.
    Activated,
    /// The host is saving or restoring state and must not be mutated.
    Suspended,
    TornDown,
}

impl HostEvent {
    pub fn target_state(self) -> HostState {
        match self {
            Self::Activated => HostState::Active,
            Self::Suspended => HostState::Transient,
            Self::TornDown => HostState::TornDown,
        }
    }
}

/// Identity of a store that outlives individual hosts.
///
/// Requests presented or deferred while a store is bound stay parked on it
/// across host recreation, and are released once the store is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurvivalStoreId(u64);

impl SurvivalStoreId {
    pub fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// UI element rendering one request.
pub trait DialogPresenter {
    fn request_id(&self) -> RequestId;

    /// Remove the presenter from its host without reporting a result.
    fn dismiss(&self);

    /// Point a presenter restored by a recreated host back at the coordinator.
    fn reattach(&self, replies: ReplySender);
}

/// Toolkit side that knows how to draw each request kind.
pub trait PresenterFactory {
    fn create(&self, descriptor: &RequestDescriptor, replies: ReplySender)
        -> Rc<dyn DialogPresenter>;
}

/// The single place currently able to show presenters.
pub trait UiHost {
    fn show(&self, presenter: Rc<dyn DialogPresenter>);

    /// Presenters currently attached to this host, including ones it restored
    /// after being recreated.
    fn shown_presenters(&self) -> Vec<Rc<dyn DialogPresenter>>;

    fn notify(&self, _notice: Notice) {}
}

pub(crate) fn is_same_host(bound: &Weak<dyn UiHost>, host: &Rc<dyn UiHost>) -> bool {
    std::ptr::addr_eq(bound.as_ptr(), Rc::as_ptr(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHost;

    impl UiHost for NullHost {
        fn show(&self, _presenter: Rc<dyn DialogPresenter>) {}

        fn shown_presenters(&self) -> Vec<Rc<dyn DialogPresenter>> {
            Vec::new()
        }
    }

    #[test]
    fn torn_down_is_terminal() {
        assert!(can_transition(HostState::Active, HostState::TornDown));
        assert!(can_transition(HostState::Transient, HostState::Active));
        assert!(!can_transition(HostState::TornDown, HostState::Active));
        assert!(!can_transition(HostState::TornDown, HostState::Transient));
        assert!(!can_transition(HostState::Unbound, HostState::TornDown));
    }

    #[test]
    fn host_identity_is_by_allocation() {
        let a: Rc<dyn UiHost> = Rc::new(NullHost);
        let b: Rc<dyn UiHost> = Rc::new(NullHost);
        let weak = Rc::downgrade(&a);
        assert!(is_same_host(&weak, &a));
        assert!(!is_same_host(&weak, &b));
    }

    #[test]
    fn store_ids_are_distinct() {
        assert_ne!(SurvivalStoreId::next(), SurvivalStoreId::next());
    }
}
